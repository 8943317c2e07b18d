//! Content discovery and front matter.
//!
//! A content file may start with a TOML block between `+++` lines:
//!
//! ```text
//! +++
//! title = "Hello"
//! date = 2024-01-05
//! tags = ["posts", "rust"]
//! +++
//! Body text...
//! ```

use sitekit_core::config::validate_path;
use sitekit_core::{ContentItem, DateValue, Error, FrontMatter, Result, SiteConfig, TemplateFormat};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const FENCE: &str = "+++";

/// Split `source` into (front matter, body).
///
/// Returns `Ok(None)` when the file has no front matter block.
pub fn split_front_matter(source: &str) -> std::result::Result<Option<(&str, &str)>, String> {
    let Some(rest) = source.strip_prefix(FENCE) else {
        return Ok(None);
    };
    let Some(rest) = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
    else {
        return Ok(None);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok(Some((&rest[..offset], &rest[offset + line.len()..])));
        }
        offset += line.len();
    }

    Err("front matter opened with +++ but never closed".to_string())
}

/// Parse front matter and return it with the remaining body
pub fn parse_front_matter(path: &Path, source: &str) -> Result<(FrontMatter, String)> {
    let front_matter_error = |message: String| Error::FrontMatter {
        path: path.to_path_buf(),
        message,
    };

    match split_front_matter(source).map_err(front_matter_error)? {
        Some((raw, body)) => {
            let front: FrontMatter =
                toml::from_str(raw).map_err(|e| front_matter_error(e.to_string()))?;
            Ok((front, body.to_string()))
        }
        None => Ok((FrontMatter::default(), source.to_string())),
    }
}

/// Output URL and path for a source file relative to the input dir.
///
/// `posts/first.md` → `/posts/first/` written to `posts/first/index.html`;
/// `index.md` files map to their directory.
pub fn permalink_for(rel_path: &Path) -> (String, PathBuf) {
    let stem = rel_path.with_extension("");
    let dir = if stem.file_name().is_some_and(|n| n == "index") {
        stem.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        stem
    };

    let segments: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        return ("/".to_string(), PathBuf::from("index.html"));
    }

    let url = format!("/{}/", segments.join("/"));
    let output = segments.iter().collect::<PathBuf>().join("index.html");
    (url, output)
}

/// Output URL and path for an explicit `permalink` value
pub fn explicit_permalink(permalink: &str) -> Result<(String, PathBuf)> {
    let path = validate_path(permalink, "permalink")?;
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        return Ok(("/".to_string(), PathBuf::from("index.html")));
    }

    let joined: PathBuf = segments.iter().collect();
    if permalink.ends_with('/') {
        Ok((format!("/{}/", segments.join("/")), joined.join("index.html")))
    } else {
        Ok((format!("/{}", segments.join("/")), joined))
    }
}

/// Read one content file
pub fn load_item(input_dir: &Path, rel_path: &Path, format: TemplateFormat) -> Result<ContentItem> {
    let path = input_dir.join(rel_path);
    let source = fs::read_to_string(&path)?;
    let (front, body) = parse_front_matter(rel_path, &source)?;

    let date = match front.date_value().map_err(|e| Error::FrontMatter {
        path: rel_path.to_path_buf(),
        message: e.to_string(),
    })? {
        Some(date) => date,
        None => DateValue::from(fs::metadata(&path)?.modified()?),
    };

    let (url, output_path) = match &front.permalink {
        Some(permalink) => explicit_permalink(permalink).map_err(|e| Error::FrontMatter {
            path: rel_path.to_path_buf(),
            message: e.to_string(),
        })?,
        None => permalink_for(rel_path),
    };

    debug!(path = %rel_path.display(), %url, tags = front.tags.len(), "loaded content");

    Ok(ContentItem {
        input_path: rel_path.to_path_buf(),
        url,
        output_path,
        format,
        title: front.title,
        date,
        tags: front.tags,
        body,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.') || s.starts_with('_') || s == "node_modules")
}

/// Source files under the input dir, skipping output, includes, passthrough
/// and hidden or `_`-prefixed directories
pub fn discover(root: &Path, config: &SiteConfig) -> Vec<(PathBuf, TemplateFormat)> {
    let input_dir = config.input_dir(root);
    let excluded: Vec<PathBuf> = [config.dirs.output.clone(), config.dirs.includes.clone()]
        .into_iter()
        .chain(config.passthrough.iter().cloned())
        .map(|p| root.join(p))
        .collect();

    let mut found = Vec::new();
    for entry in WalkDir::new(&input_dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || excluded.iter().any(|x| x == e.path())))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(format) = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| config.accepts_extension(ext))
            .and_then(TemplateFormat::from_extension)
        else {
            continue;
        };

        if let Ok(rel) = entry.path().strip_prefix(&input_dir) {
            found.push((rel.to_path_buf(), format));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    found
}

/// Load every content item, sorted by date then input path
pub fn load_content(root: &Path, config: &SiteConfig) -> Result<Vec<ContentItem>> {
    let input_dir = config.input_dir(root);
    let mut items = discover(root, config)
        .into_iter()
        .map(|(rel, format)| load_item(&input_dir, &rel, format))
        .collect::<Result<Vec<_>>>()?;

    items.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.input_path.cmp(&b.input_path))
    });
    Ok(items)
}
