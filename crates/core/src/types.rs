use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Complete site configuration, resolved from `site.toml` with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfig {
    pub site: SiteMeta,
    pub dirs: Dirs,
    pub template_formats: Vec<TemplateFormat>,
    /// Directories copied verbatim into the output
    pub passthrough: Vec<PathBuf>,
    pub markdown: MarkdownConfig,
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteMeta::default(),
            dirs: Dirs::default(),
            template_formats: vec![TemplateFormat::Markdown, TemplateFormat::Html],
            passthrough: vec![PathBuf::from("img"), PathBuf::from("css")],
            markdown: MarkdownConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn input_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dirs.input)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.dirs.output)
    }

    /// Prefix an absolute site path with `path_prefix`.
    ///
    /// With the default prefix `/` the path is returned unchanged.
    pub fn url_for(&self, path: &str) -> String {
        let prefix = self.site.path_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", prefix, path)
        } else {
            format!("{}/{}", prefix, path)
        }
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.template_formats
            .iter()
            .any(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

/// Site-wide metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMeta {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub path_prefix: String,
    /// Number of posts listed on the home page
    pub recent_posts: usize,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            url: None,
            path_prefix: "/".to_string(),
            recent_posts: 3,
        }
    }
}

/// Input and output directory layout, relative to the site root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dirs {
    pub input: PathBuf,
    pub includes: PathBuf,
    pub output: PathBuf,
}

impl Default for Dirs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            includes: PathBuf::from("_includes"),
            output: PathBuf::from("_site"),
        }
    }
}

/// Source formats turned into pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[serde(rename = "md")]
    Markdown,
    Html,
}

impl TemplateFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TemplateFormat::Markdown => "md",
            TemplateFormat::Html => "html",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(TemplateFormat::Markdown),
            "html" | "htm" => Some(TemplateFormat::Html),
            _ => None,
        }
    }
}

/// Markdown renderer options
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdownConfig {
    /// Pass raw HTML through; when false it is escaped
    pub html: bool,
    /// Render soft line breaks as `<br>`
    pub breaks: bool,
    /// Turn bare `http(s)://` URLs into links
    pub linkify: bool,
    pub anchors: AnchorConfig,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            html: true,
            breaks: true,
            linkify: true,
            anchors: AnchorConfig::default(),
        }
    }
}

/// Heading anchor permalinks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorConfig {
    pub enabled: bool,
    pub symbol: String,
    pub class: String,
    pub levels: Vec<u8>,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbol: "#".to_string(),
            class: "direct-link".to_string(),
            levels: vec![1, 2, 3, 4],
        }
    }
}

/// Preview server settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Page served for every unmatched request, relative to the output dir
    pub not_found_page: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            not_found_page: PathBuf::from("404.html"),
        }
    }
}

/// An instant, always interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateValue(DateTime<Utc>);

impl DateValue {
    pub fn as_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.fff]` or RFC 3339 text.
    ///
    /// Values without an offset are taken as UTC.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.into());
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(naive.into());
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::from)
            .map_err(|e| Error::InvalidArgument(format!("Invalid date '{}': {}", s, e)))
    }

    /// Interpret an integer as milliseconds since the Unix epoch
    pub fn from_unix_millis(millis: i64) -> Result<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(DateValue)
            .ok_or_else(|| Error::InvalidArgument(format!("Timestamp out of range: {}", millis)))
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        DateValue(date.and_time(NaiveTime::MIN).and_utc())
    }
}

impl From<NaiveDateTime> for DateValue {
    fn from(naive: NaiveDateTime) -> Self {
        DateValue(naive.and_utc())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for DateValue {
    fn from(dt: DateTime<Tz>) -> Self {
        DateValue(dt.with_timezone(&Utc))
    }
}

impl From<SystemTime> for DateValue {
    fn from(time: SystemTime) -> Self {
        DateValue(DateTime::<Utc>::from(time))
    }
}

/// Deduplicated tags, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(pub(crate) Vec<String>);

impl TagSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single page or post processed by the build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    /// Source path relative to the input directory
    pub input_path: PathBuf,
    /// Public URL, without `path_prefix`
    pub url: String,
    /// Destination relative to the output directory
    pub output_path: PathBuf,
    pub format: TemplateFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub date: DateValue,
    pub tags: Vec<String>,
    #[serde(skip)]
    pub body: String,
}

impl ContentItem {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Title from front matter, falling back to the file stem
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        self.input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string()
    }
}

/// TOML front matter at the top of a content file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub title: Option<String>,
    /// TOML date/datetime or a date string
    #[serde(default)]
    pub date: Option<toml::Value>,
    /// A single tag or a list of tags
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

impl FrontMatter {
    pub fn date_value(&self) -> Result<Option<DateValue>> {
        match &self.date {
            None => Ok(None),
            Some(toml::Value::Datetime(dt)) => DateValue::parse(&dt.to_string()).map(Some),
            Some(toml::Value::String(s)) => DateValue::parse(s).map(Some),
            Some(other) => Err(Error::InvalidArgument(format!(
                "Expected a date, got {}",
                other.type_str()
            ))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsField {
    One(String),
    Many(Vec<String>),
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TagsField::deserialize(deserializer)? {
        TagsField::One(tag) => vec![tag],
        TagsField::Many(tags) => tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_value_parse_formats() {
        let expected: DateValue = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().into();
        assert_eq!(DateValue::parse("2024-01-05").unwrap(), expected);
        assert_eq!(DateValue::parse(" 2024-01-05 ").unwrap(), expected);
        assert_eq!(DateValue::parse("2024-01-05T00:00:00").unwrap(), expected);
        assert_eq!(DateValue::parse("2024-01-05T00:00:00Z").unwrap(), expected);
        assert_eq!(DateValue::parse("2024-01-05T00:00:00.000").unwrap(), expected);
        assert!(DateValue::parse("not a date").is_err());
        assert!(DateValue::parse("2024-13-01").is_err());
    }

    #[test]
    fn test_date_value_offset_converted_to_utc() {
        let date = DateValue::parse("2024-01-05T01:30:00+02:00").unwrap();
        assert_eq!(
            date.as_utc().format("%Y-%m-%d %H:%M").to_string(),
            "2024-01-04 23:30"
        );
    }

    #[test]
    fn test_date_value_from_unix_millis() {
        let date = DateValue::from_unix_millis(1_704_412_800_000).unwrap();
        assert_eq!(date, DateValue::parse("2024-01-05").unwrap());
        assert!(DateValue::from_unix_millis(i64::MAX).is_err());
    }

    #[test]
    fn test_front_matter_single_tag_becomes_list() {
        let fm: FrontMatter = toml::from_str(r#"tags = "post""#).unwrap();
        assert_eq!(fm.tags, vec!["post"]);

        let fm: FrontMatter = toml::from_str(r#"tags = ["post", "rust"]"#).unwrap();
        assert_eq!(fm.tags, vec!["post", "rust"]);

        let fm: FrontMatter = toml::from_str(r#"title = "No tags""#).unwrap();
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn test_front_matter_dates() {
        let fm: FrontMatter = toml::from_str("date = 2024-01-05").unwrap();
        assert_eq!(
            fm.date_value().unwrap(),
            Some(DateValue::parse("2024-01-05").unwrap())
        );

        let fm: FrontMatter = toml::from_str(r#"date = "2024-01-05""#).unwrap();
        assert!(fm.date_value().unwrap().is_some());

        let fm: FrontMatter = toml::from_str("date = 2024-01-05T10:00:00Z").unwrap();
        assert_eq!(
            fm.date_value().unwrap().unwrap().as_utc().format("%H").to_string(),
            "10"
        );

        let fm: FrontMatter = toml::from_str("date = 42").unwrap();
        assert!(fm.date_value().is_err());
    }

    #[test]
    fn test_url_for_path_prefix() {
        let mut config = SiteConfig::default();
        assert_eq!(config.url_for("/posts/"), "/posts/");

        config.site.path_prefix = "/blog/".to_string();
        assert_eq!(config.url_for("/posts/"), "/blog/posts/");
        assert_eq!(config.url_for("tags/"), "/blog/tags/");
    }

    #[test]
    fn test_display_title_falls_back_to_stem() {
        let item = ContentItem {
            input_path: PathBuf::from("posts/first-post.md"),
            url: "/posts/first-post/".to_string(),
            output_path: PathBuf::from("posts/first-post/index.html"),
            format: TemplateFormat::Markdown,
            title: None,
            date: DateValue::parse("2024-01-05").unwrap(),
            tags: vec![],
            body: String::new(),
        };
        assert_eq!(item.display_title(), "first-post");
    }
}
