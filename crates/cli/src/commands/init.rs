use anyhow::{Context, Result};
use chrono::Local;
use sitekit_core::config::CONFIG_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TITLE: &str = "My Blog";

/// Escape a string for a TOML basic string.
///
/// The config is written from a commented template rather than serialized,
/// so values are escaped by hand.
///
/// See: https://toml.io/en/v1.0.0#string
fn toml_escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\x08', "\\b")
        .replace('\x0C', "\\f")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Initialize a new site directory.
///
/// Creates `site.toml`, a sample post, a 404 page and the `img/` and `css/`
/// passthrough directories. Refuses to touch a directory that already has a
/// `site.toml`.
pub async fn run(path: PathBuf, title: Option<String>) -> Result<()> {
    println!("Initializing site directory: {}", path.display());

    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!(
            "{} already exists at {}\nHint: Delete it first or use a different directory",
            CONFIG_FILE_NAME,
            config_path.display()
        );
    }

    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let title = title.as_deref().unwrap_or(DEFAULT_TITLE);
    create_structure(&path, title)?;

    println!("\n✓ Initialization complete!");
    println!("\nGenerated structure:");
    println!("  {}/", path.display());
    println!("  ├── site.toml            ← Site title, URL and build options");
    println!("  ├── 404.md");
    println!("  ├── css/");
    println!("  │   └── index.css");
    println!("  ├── img/");
    println!("  └── posts/");
    println!("      └── first-post.md    ← Your first post");

    println!("\nNext steps:");
    println!("  1. Edit site.toml (set title and url)");
    println!("  2. Write posts in posts/ with tags = [\"posts\", ...]");
    println!("  3. Preview: sitekit serve {}", path.display());

    Ok(())
}

fn create_structure(base: &Path, title: &str) -> Result<()> {
    fs::create_dir_all(base.join("posts"))?;
    fs::create_dir_all(base.join("img"))?;
    fs::create_dir_all(base.join("css"))?;

    fs::write(base.join(CONFIG_FILE_NAME), generate_site_toml(title))
        .context("Failed to write site.toml")?;
    fs::write(base.join("posts/first-post.md"), generate_first_post())?;
    fs::write(base.join("404.md"), NOT_FOUND_PAGE)?;
    fs::write(base.join("css/index.css"), STYLESHEET)?;

    Ok(())
}

fn generate_site_toml(title: &str) -> String {
    format!(
        r##"# Site configuration
# Every key is optional; the values below are the defaults.

template_formats = ["md", "html"]
# Copied verbatim into the output
passthrough = ["img", "css"]

[site]
title = "{}"
# Absolute URL of the deployed site
# url = "https://example.com"
# Prefix for every generated link, e.g. "/blog/" when hosted in a subdirectory
path_prefix = "/"
# Number of posts listed on the home page
recent_posts = 3

[dirs]
input = "."
includes = "_includes"
output = "_site"

[markdown]
# Allow raw HTML in markdown
html = true
# Treat single newlines as line breaks
breaks = true
# Turn bare URLs into links
linkify = true

[markdown.anchors]
enabled = true
symbol = "#"
class = "direct-link"
levels = [1, 2, 3, 4]

[server]
port = 8080
not_found_page = "404.html"
"##,
        toml_escape_string(title)
    )
}

fn generate_first_post() -> String {
    format!(
        r#"+++
title = "First post"
date = {}
tags = ["posts", "welcome"]
+++
## Hello

This is the first post. Every page tagged `posts` shows up on the home page;
other tags get their own page under /tags/.
"#,
        Local::now().format("%Y-%m-%d")
    )
}

const NOT_FOUND_PAGE: &str = r#"+++
title = "Page not found"
permalink = "404.html"
+++
# Content not found.

Use the links above to find your way back.
"#;

const STYLESHEET: &str = r#"body {
  max-width: 40em;
  margin: 0 auto;
  padding: 0 1em;
  font-family: system-ui, sans-serif;
  line-height: 1.5;
}

a[href].direct-link,
a[href].direct-link:visited {
  color: transparent;
}

a[href].direct-link:focus,
:hover > a[href].direct-link {
  color: #aaa;
}

.post-tag {
  margin-right: 0.5em;
}
"#;
