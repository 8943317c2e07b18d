use crate::error::{Error, Result};
use crate::types::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "site.toml";

/// Raw TOML configuration structure
/// Every key is optional; missing keys fall back to `SiteConfig::default()`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    site: RawSite,
    #[serde(default)]
    dirs: RawDirs,
    template_formats: Option<Vec<String>>,
    passthrough: Option<Vec<String>>,
    #[serde(default)]
    markdown: RawMarkdown,
    #[serde(default)]
    server: RawServer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSite {
    title: Option<String>,
    url: Option<String>,
    path_prefix: Option<String>,
    recent_posts: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDirs {
    input: Option<String>,    // Convert to PathBuf
    includes: Option<String>, // Convert to PathBuf
    output: Option<String>,   // Convert to PathBuf
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarkdown {
    html: Option<bool>,
    breaks: Option<bool>,
    linkify: Option<bool>,
    #[serde(default)]
    anchors: RawAnchors,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAnchors {
    enabled: Option<bool>,
    symbol: Option<String>,
    class: Option<String>,
    levels: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    port: Option<u16>,
    not_found_page: Option<String>, // Convert to PathBuf
}

/// Load `site.toml` from a site root, or defaults when the file is absent
pub fn load_site_config(root: &Path) -> Result<SiteConfig> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() {
        debug!(path = %path.display(), "loading site config");
        parse_site_toml(&path)
    } else {
        info!(root = %root.display(), "no {} found, using defaults", CONFIG_FILE_NAME);
        Ok(SiteConfig::default())
    }
}

/// Parse site.toml from a file path
pub fn parse_site_toml<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let content = fs::read_to_string(path)?;
    parse_site_toml_str(&content)
}

/// Parse site.toml from a string (useful for testing)
pub fn parse_site_toml_str(content: &str) -> Result<SiteConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let defaults = SiteConfig::default();

    let path_prefix = raw.site.path_prefix.unwrap_or(defaults.site.path_prefix);
    if !path_prefix.starts_with('/') {
        return Err(Error::ConfigParse(format!(
            "path_prefix must start with '/': '{}'",
            path_prefix
        )));
    }

    let site = SiteMeta {
        title: raw.site.title.unwrap_or(defaults.site.title),
        url: raw.site.url,
        path_prefix,
        recent_posts: raw.site.recent_posts.unwrap_or(defaults.site.recent_posts),
    };

    // Validate directory paths
    let dirs = Dirs {
        input: optional_path(raw.dirs.input, "dirs.input")?.unwrap_or(defaults.dirs.input),
        includes: optional_path(raw.dirs.includes, "dirs.includes")?
            .unwrap_or(defaults.dirs.includes),
        output: optional_path(raw.dirs.output, "dirs.output")?.unwrap_or(defaults.dirs.output),
    };

    if dirs.output.components().all(|c| c == std::path::Component::CurDir) {
        return Err(Error::ConfigParse(
            "dirs.output must name a directory below the site root".to_string(),
        ));
    }

    let template_formats = match raw.template_formats {
        Some(formats) => formats
            .iter()
            .map(|f| match f.as_str() {
                "md" => Ok(TemplateFormat::Markdown),
                "html" => Ok(TemplateFormat::Html),
                other => Err(Error::ConfigParse(format!(
                    "Unsupported template format '{}'. Supported: md, html",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        None => defaults.template_formats,
    };

    let passthrough = match raw.passthrough {
        Some(dirs) => dirs
            .iter()
            .map(|d| validate_path(d, "passthrough"))
            .collect::<Result<Vec<_>>>()?,
        None => defaults.passthrough,
    };

    let anchor_defaults = defaults.markdown.anchors;
    let levels = raw.markdown.anchors.levels.unwrap_or(anchor_defaults.levels);
    if let Some(bad) = levels.iter().find(|l| !(1..=6).contains(*l)) {
        return Err(Error::ConfigParse(format!(
            "Invalid heading level {} in markdown.anchors.levels, expected 1-6",
            bad
        )));
    }

    let markdown = MarkdownConfig {
        html: raw.markdown.html.unwrap_or(defaults.markdown.html),
        breaks: raw.markdown.breaks.unwrap_or(defaults.markdown.breaks),
        linkify: raw.markdown.linkify.unwrap_or(defaults.markdown.linkify),
        anchors: AnchorConfig {
            enabled: raw.markdown.anchors.enabled.unwrap_or(anchor_defaults.enabled),
            symbol: raw.markdown.anchors.symbol.unwrap_or(anchor_defaults.symbol),
            class: raw.markdown.anchors.class.unwrap_or(anchor_defaults.class),
            levels,
        },
    };

    let server = ServerConfig {
        port: raw.server.port.unwrap_or(defaults.server.port),
        not_found_page: optional_path(raw.server.not_found_page, "server.not_found_page")?
            .unwrap_or(defaults.server.not_found_page),
    };

    Ok(SiteConfig {
        site,
        dirs,
        template_formats,
        passthrough,
        markdown,
        server,
    })
}

fn optional_path(value: Option<String>, field_name: &str) -> Result<Option<PathBuf>> {
    value.map(|v| validate_path(&v, field_name)).transpose()
}

/// Validate and convert a path string to PathBuf.
///
/// This function prevents path traversal by rejecting:
/// - Absolute paths (starting with `/` or Windows drive letters)
/// - Paths containing parent directory references (`..`)
///
/// Used for every directory in site.toml and for front matter permalinks,
/// so that a build never writes outside its output directory.
///
/// # Examples
///
/// ```text
/// validate_path("img", "passthrough")  → Ok(PathBuf)
/// validate_path("errors/404.html", "permalink")  → Ok(PathBuf)
///
/// validate_path("/etc/passwd", "permalink")  → Err("Absolute paths not allowed...")
/// validate_path("../outside", "dirs.output")  → Err("Parent directory references...")
/// ```
pub fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    // Reject absolute paths
    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    // Check for parent directory references
    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    // Ensure path is not empty
    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_valid_relative() {
        assert!(validate_path("img", "passthrough").is_ok());
        assert!(validate_path("_site", "dirs.output").is_ok());
        assert!(validate_path(".", "dirs.input").is_ok());
        assert!(validate_path("errors/404.html", "permalink").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_absolute_unix() {
        let result = validate_path("/etc/passwd", "permalink");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Absolute paths not allowed")
        );
    }

    #[test]
    fn test_validate_path_rejects_parent_dir() {
        let result = validate_path("../outside", "dirs.output");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Parent directory references")
        );

        assert!(validate_path("css/../../secret", "passthrough").is_err());
    }

    #[test]
    fn test_validate_path_rejects_empty() {
        let result = validate_path("", "passthrough");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Empty path"));

        assert!(validate_path("   ", "passthrough").is_err());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_site_toml_str("").unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.dirs.output, PathBuf::from("_site"));
        assert_eq!(config.dirs.includes, PathBuf::from("_includes"));
        assert_eq!(config.passthrough, vec![PathBuf::from("img"), PathBuf::from("css")]);
        assert!(config.markdown.html && config.markdown.breaks && config.markdown.linkify);
        assert_eq!(config.markdown.anchors.levels, vec![1, 2, 3, 4]);
        assert_eq!(config.markdown.anchors.class, "direct-link");
        assert_eq!(config.server.not_found_page, PathBuf::from("404.html"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r##"
template_formats = ["md"]
passthrough = ["static"]

[site]
title = "Field Notes"
url = "https://notes.example.com"
path_prefix = "/notes/"
recent_posts = 5

[dirs]
input = "content"
output = "public"

[markdown]
breaks = false

[markdown.anchors]
symbol = "¶"
levels = [2, 3]

[server]
port = 3000
not_found_page = "errors/404.html"
        "##;

        let config = parse_site_toml_str(toml).unwrap();
        assert_eq!(config.site.title, "Field Notes");
        assert_eq!(config.site.path_prefix, "/notes/");
        assert_eq!(config.site.recent_posts, 5);
        assert_eq!(config.dirs.input, PathBuf::from("content"));
        assert_eq!(config.dirs.includes, PathBuf::from("_includes"));
        assert_eq!(config.template_formats, vec![TemplateFormat::Markdown]);
        assert_eq!(config.passthrough, vec![PathBuf::from("static")]);
        assert!(!config.markdown.breaks);
        assert!(config.markdown.html);
        assert_eq!(config.markdown.anchors.symbol, "¶");
        assert_eq!(config.markdown.anchors.levels, vec![2, 3]);
        assert_eq!(config.server.port, 3000);
        assert!(config.accepts_extension("md"));
        assert!(!config.accepts_extension("html"));
    }

    #[test]
    fn test_parse_config_rejects_path_traversal_in_output() {
        let toml = r##"
[dirs]
output = "../../var/www"
        "##;

        let result = parse_site_toml_str(toml);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Parent directory references")
        );
    }

    #[test]
    fn test_parse_config_rejects_output_at_root() {
        let result = parse_site_toml_str("[dirs]\noutput = \".\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_rejects_unknown_template_format() {
        let result = parse_site_toml_str(r#"template_formats = ["md", "njk"]"#);
        assert!(result.unwrap_err().to_string().contains("njk"));
    }

    #[test]
    fn test_template_formats_must_be_exact_names() {
        for format in ["markdown", "htm", "MD", "Html"] {
            let toml = format!("template_formats = [\"{}\"]", format);
            let err = parse_site_toml_str(&toml).unwrap_err();
            assert!(err.to_string().contains(format), "{}", err);
        }
        let config = parse_site_toml_str(r#"template_formats = ["html"]"#).unwrap();
        assert_eq!(config.template_formats, vec![TemplateFormat::Html]);
    }

    #[test]
    fn test_parse_config_rejects_misplaced_keys() {
        // Top-level keys written after a table header belong to that table
        let toml = r#"
[dirs]
output = "_site"
passthrough = ["static"]
"#;
        let err = parse_site_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("passthrough"), "{}", err);

        assert!(parse_site_toml_str("[site]\ntitel = \"Typo\"").is_err());
        assert!(parse_site_toml_str("[sever]\nport = 1").is_err());
    }

    #[test]
    fn test_parse_config_rejects_bad_anchor_level() {
        let result = parse_site_toml_str("[markdown.anchors]\nlevels = [1, 7]");
        assert!(result.unwrap_err().to_string().contains("heading level 7"));
    }

    #[test]
    fn test_parse_config_rejects_relative_prefix() {
        let result = parse_site_toml_str("[site]\npath_prefix = \"blog/\"");
        assert!(result.unwrap_err().to_string().contains("path_prefix"));
    }

    #[test]
    fn test_load_site_config_without_file() {
        let dir = std::env::temp_dir().join("sitekit-config-missing-test");
        let config = load_site_config(&dir).unwrap();
        assert_eq!(config, SiteConfig::default());
    }
}
