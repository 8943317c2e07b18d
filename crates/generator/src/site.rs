use crate::content::load_content;
use crate::layout::Layout;
use crate::markdown::{MarkdownRenderer, slugify};
use crate::passthrough::copy_passthrough;
use sitekit_core::{
    ContentItem, Error, FilterRegistry, Result, SiteConfig, TagSet, TemplateFormat, collect_tags,
    tags,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Site tag list, published for client-side navigation
pub const TAG_LIST_FILE: &str = "tags.json";

/// Collection that feeds the home page post list
pub const POSTS_COLLECTION: &str = "posts";

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Inject the live reload script into every page
    pub preview: bool,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    pub pages: usize,
    pub tag_pages: usize,
    pub passthrough_files: usize,
    pub tags: TagSet,
}

/// Tracks output paths so two sources never silently overwrite each other
#[derive(Default)]
struct Outputs {
    claimed: HashSet<PathBuf>,
}

impl Outputs {
    fn claim(&mut self, path: &Path) -> bool {
        self.claimed.insert(path.to_path_buf())
    }

    fn contains(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }
}

fn write_page(output: &Path, rel: &Path, html: &str) -> Result<()> {
    let dst = output.join(rel);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dst, html)?;
    debug!(path = %rel.display(), "wrote page");
    Ok(())
}

/// Build the whole site under `root` into the configured output directory
pub fn build_site(root: &Path, config: &SiteConfig, options: BuildOptions) -> Result<BuildReport> {
    let started = Instant::now();

    // Filter names are checked here, before any content is read
    let layout = Layout::new(config, FilterRegistry::builtin(), options.preview)?;
    let renderer = MarkdownRenderer::new(config.markdown.clone());

    let items = load_content(root, config)?;
    let tag_list = collect_tags(&items);
    let posts = tags::collection(&items, POSTS_COLLECTION);

    let output = config.output_dir(root);
    fs::create_dir_all(&output)?;

    let mut outputs = Outputs::default();
    let mut pages = 0;

    for item in &items {
        if !outputs.claim(&item.output_path) {
            return Err(Error::InvalidData(format!(
                "{} writes to {}, which another content file already produces",
                item.input_path.display(),
                item.output_path.display()
            )));
        }

        let html = render_item(&layout, &renderer, item, &posts)?;
        write_page(&output, &item.output_path, &html)?;
        pages += 1;
    }

    let home = Path::new("index.html");
    if !outputs.contains(home) {
        outputs.claim(home);
        write_page(&output, home, &layout.render_home(None, &posts)?)?;
        pages += 1;
    }

    let tag_pages = write_tag_pages(&output, &layout, &items, &tag_list, &mut outputs)?;

    let tag_json = serde_json::to_string_pretty(&tag_list)?;
    fs::write(output.join(TAG_LIST_FILE), tag_json)?;

    let not_found = config.server.not_found_page.as_path();
    if !outputs.contains(not_found) {
        outputs.claim(not_found);
        write_page(&output, not_found, &layout.render_not_found())?;
        pages += 1;
    }

    let passthrough_files = copy_passthrough(root, &output, config)?;

    info!(
        pages,
        tag_pages,
        tags = tag_list.len(),
        passthrough_files,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "site built"
    );

    Ok(BuildReport {
        output,
        pages,
        tag_pages,
        passthrough_files,
        tags: tag_list,
    })
}

fn render_item(
    layout: &Layout<'_>,
    renderer: &MarkdownRenderer,
    item: &ContentItem,
    posts: &[&ContentItem],
) -> Result<String> {
    let body = match item.format {
        TemplateFormat::Markdown => renderer.render(&item.body),
        TemplateFormat::Html => item.body.clone(),
    };

    if item.url == "/" {
        layout.render_home(Some(&body), posts)
    } else {
        layout.render_page(item, &body)
    }
}

/// Tags sharing a URL slug, in first-seen order. Tags without a slug are
/// dropped since they have no page.
fn tags_by_slug(tag_list: &TagSet) -> Vec<(String, Vec<&str>)> {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
    for tag in tag_list {
        let slug = slugify(tag);
        if slug.is_empty() {
            warn!(tag = %tag, "tag has no URL-safe characters, skipping its page");
            continue;
        }
        match groups.iter_mut().find(|(existing, _)| *existing == slug) {
            Some((_, group)) => group.push(tag),
            None => groups.push((slug, vec![tag.as_str()])),
        }
    }
    groups
}

fn write_tag_pages(
    output: &Path,
    layout: &Layout<'_>,
    items: &[ContentItem],
    tag_list: &TagSet,
    outputs: &mut Outputs,
) -> Result<usize> {
    let mut written = 0;

    let index = PathBuf::from("tags").join("index.html");
    if outputs.claim(&index) {
        write_page(output, &index, &layout.render_tag_index(tag_list))?;
        written += 1;
    } else {
        warn!("content already provides tags/index.html, skipping generated tag index");
    }

    for (slug, group) in tags_by_slug(tag_list) {
        let path = PathBuf::from("tags").join(&slug).join("index.html");
        if !outputs.claim(&path) {
            warn!(slug = %slug, path = %path.display(), "tag page path already taken, skipping");
            continue;
        }

        let tagged: Vec<&ContentItem> = items
            .iter()
            .filter(|item| group.iter().any(|tag| item.has_tag(tag)))
            .collect();
        write_page(output, &path, &layout.render_tag_page(group[0], &tagged)?)?;
        written += 1;
    }

    Ok(written)
}
