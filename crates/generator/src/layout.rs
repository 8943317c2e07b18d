//! Built-in page layout.
//!
//! Pages are plain `format!` templates. Every value that a template would
//! pipe through a filter goes through the [`FilterRegistry`] by name, so the
//! same names a template author would write are the ones exercised here.

use crate::markdown::slugify;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sitekit_core::{ContentItem, Error, FilterRegistry, Result, SiteConfig, TagSet};

/// Filters the layout calls; checked when the layout is constructed
pub const LAYOUT_FILTERS: [&str; 5] = [
    "readableDate",
    "htmlDateString",
    "head",
    "min",
    "filterDenylist",
];

/// HTML-escape a string to prevent XSS attacks
///
/// Escapes: & < > " '
pub fn html_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#x27;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// What a post list needs from an item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostSummary {
    title: String,
    url: String,
    date: String,
}

impl PostSummary {
    fn from_item(item: &ContentItem) -> Self {
        Self {
            title: item.display_title(),
            url: item.url.clone(),
            date: item.date.as_utc().to_rfc3339(),
        }
    }
}

pub struct Layout<'a> {
    config: &'a SiteConfig,
    filters: FilterRegistry,
    is_preview: bool,
}

impl<'a> Layout<'a> {
    /// Fails with `UnknownFilter` if `filters` lacks any of [`LAYOUT_FILTERS`]
    pub fn new(config: &'a SiteConfig, filters: FilterRegistry, is_preview: bool) -> Result<Self> {
        filters.require(LAYOUT_FILTERS)?;
        Ok(Self {
            config,
            filters,
            is_preview,
        })
    }

    /// URL of a tag's listing page; `None` when the tag has no URL-safe
    /// characters and so gets no page
    pub fn tag_url(&self, tag: &str) -> Option<String> {
        let slug = slugify(tag);
        if slug.is_empty() {
            return None;
        }
        Some(self.config.url_for(&format!("/tags/{}/", slug)))
    }

    fn tag_link(&self, tag: &str) -> String {
        match self.tag_url(tag) {
            Some(url) => format!(
                r#"<a href="{}" class="post-tag">{}</a>"#,
                html_escape(&url),
                html_escape(tag)
            ),
            None => format!(r#"<span class="post-tag">{}</span>"#, html_escape(tag)),
        }
    }

    fn filter_str(&self, name: &str, input: &Value) -> Result<String> {
        match self.filters.apply(name, input, &[])? {
            Value::String(s) => Ok(s),
            other => Err(Error::InvalidData(format!(
                "Filter '{}' returned {}, expected a string",
                name, other
            ))),
        }
    }

    fn time_html(&self, date: &str) -> Result<String> {
        let date = Value::String(date.to_string());
        Ok(format!(
            r#"<time datetime="{}">{}</time>"#,
            self.filter_str("htmlDateString", &date)?,
            self.filter_str("readableDate", &date)?
        ))
    }

    fn tag_links(&self, tags: &[String]) -> Result<String> {
        let visible = self
            .filters
            .apply("filterDenylist", &json!(tags), &[])?;
        let links: Vec<String> = visible
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(|tag| self.tag_link(tag))
                    .collect()
            })
            .unwrap_or_default();
        Ok(links.join("\n            "))
    }

    fn post_list(&self, posts: &[Value]) -> Result<String> {
        let mut rows = Vec::with_capacity(posts.len());
        for post in posts {
            let summary: PostSummary = serde_json::from_value(post.clone())
                .map_err(|e| Error::InvalidData(format!("Bad post summary: {}", e)))?;
            rows.push(format!(
                r#"<li class="postlist-item">
            <a href="{}" class="postlist-link">{}</a>
            {}
        </li>"#,
                html_escape(&self.config.url_for(&summary.url)),
                html_escape(&summary.title),
                self.time_html(&summary.date)?
            ));
        }
        Ok(format!(
            "<ol class=\"postlist\">\n        {}\n    </ol>",
            rows.join("\n        ")
        ))
    }

    fn summaries(items: &[&ContentItem]) -> Result<Vec<Value>> {
        items
            .iter()
            .map(|item| serde_json::to_value(PostSummary::from_item(item)).map_err(Error::from))
            .collect()
    }

    /// A content page: title, date, tags and the rendered body
    pub fn render_page(&self, item: &ContentItem, body_html: &str) -> Result<String> {
        let title = item.display_title();
        let date = item.date.as_utc().to_rfc3339();
        let main = format!(
            r#"<article>
        <h1>{}</h1>
        <p class="post-meta">
            {}
            {}
        </p>
        {}
    </article>"#,
            html_escape(&title),
            self.time_html(&date)?,
            self.tag_links(&item.tags)?,
            body_html
        );
        Ok(self.document(&title, &main))
    }

    /// Home page: optional intro content followed by the latest posts.
    ///
    /// Shows `min(recent_posts, posts.len())` posts, newest first.
    pub fn render_home(&self, intro: Option<&str>, posts: &[&ContentItem]) -> Result<String> {
        let all = Value::Array(Self::summaries(posts)?);
        let count = self.filters.apply(
            "min",
            &json!(self.config.site.recent_posts),
            &[json!(posts.len())],
        )?;
        let count = count.as_i64().unwrap_or(0);
        let latest = self.filters.apply("head", &all, &[json!(-count)])?;
        let mut latest = latest.as_array().cloned().unwrap_or_default();
        latest.reverse();

        let list = if latest.is_empty() {
            "<p>No posts yet.</p>".to_string()
        } else {
            self.post_list(&latest)?
        };

        let main = format!(
            r#"{}
    <h2>Latest {} Post{}</h2>
    {}
    <p>More posts can be found in <a href="{}">the tag index</a>.</p>"#,
            intro.unwrap_or_default(),
            latest.len(),
            if latest.len() == 1 { "" } else { "s" },
            list,
            html_escape(&self.config.url_for("/tags/"))
        );
        Ok(self.document(&self.config.site.title, &main))
    }

    /// Every tag in the site tag list
    pub fn render_tag_index(&self, tags: &TagSet) -> String {
        let links: Vec<String> = tags
            .iter()
            .map(|tag| format!("<li>{}</li>", self.tag_link(tag)))
            .collect();
        let main = format!(
            "<h1>Tags</h1>\n    <ul class=\"taglist\">\n        {}\n    </ul>",
            links.join("\n        ")
        );
        self.document("Tags", &main)
    }

    /// Items tagged `tag`, newest first
    pub fn render_tag_page(&self, tag: &str, items: &[&ContentItem]) -> Result<String> {
        let mut posts = Self::summaries(items)?;
        posts.reverse();
        let main = format!(
            r#"<h1>Tagged “{}”</h1>
    {}
    <p>See <a href="{}">all tags</a>.</p>"#,
            html_escape(tag),
            self.post_list(&posts)?,
            html_escape(&self.config.url_for("/tags/"))
        );
        Ok(self.document(&format!("Tagged “{}”", tag), &main))
    }

    /// Fallback 404 page when the site does not provide one
    pub fn render_not_found(&self) -> String {
        let main = format!(
            r#"<h1>Content not found.</h1>
    <p>Go <a href="{}">home</a>.</p>"#,
            html_escape(&self.config.url_for("/"))
        );
        self.document("Not found", &main)
    }

    fn document(&self, title: &str, main: &str) -> String {
        let site_title = &self.config.site.title;
        let page_title = if title == site_title {
            html_escape(site_title)
        } else {
            format!("{} | {}", html_escape(title), html_escape(site_title))
        };

        // Hot reload script only in preview mode
        let reload_script = if self.is_preview {
            r#"<script>
        // Hot reload via Server-Sent Events
        const eventSource = new EventSource('/_reload');
        eventSource.onmessage = () => {
            console.log('Reloading...');
            location.reload();
        };
        eventSource.onerror = () => {
            console.log('Preview server disconnected');
            eventSource.close();
        };
    </script>"#
        } else {
            ""
        };

        let css_link = if self
            .config
            .passthrough
            .iter()
            .any(|p| p.as_os_str() == "css")
        {
            format!(
                r#"<link rel="stylesheet" href="{}">"#,
                html_escape(&self.config.url_for("/css/index.css"))
            )
        } else {
            String::new()
        };

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    {}
</head>
<body>
    <header>
        <h1 class="home"><a href="{}">{}</a></h1>
        <ul class="nav">
            <li class="nav-item"><a href="{}">Home</a></li>
            <li class="nav-item"><a href="{}">Tags</a></li>
        </ul>
    </header>

    <main>
    {}
    </main>

    {}
</body>
</html>
"#,
            page_title,
            css_link,
            html_escape(&self.config.url_for("/")),
            html_escape(site_title),
            html_escape(&self.config.url_for("/")),
            html_escape(&self.config.url_for("/tags/")),
            main,
            reload_script
        )
    }
}
