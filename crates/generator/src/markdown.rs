//! Markdown to HTML.
//!
//! pulldown-cmark does the parsing; this module rewrites the event stream
//! for the options in `[markdown]`: soft breaks as `<br>`, escaped raw HTML,
//! bare URL links and heading permalinks.

use crate::layout::html_escape;
use pulldown_cmark::{
    CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
    html::push_html,
};
use sitekit_core::MarkdownConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    config: MarkdownConfig,
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    text: String,
    events: Vec<Event<'a>>,
}

/// Tracks slugs already used on a page; repeats get `-1`, `-2`, ...
#[derive(Default)]
struct SlugCounter {
    seen: HashMap<String, usize>,
}

impl SlugCounter {
    fn unique(&mut self, slug: String) -> String {
        let count = self.seen.entry(slug.clone()).or_insert(0);
        let result = if *count == 0 {
            slug
        } else {
            format!("{}-{}", slug, count)
        };
        *count += 1;
        result
    }
}

impl MarkdownRenderer {
    pub fn new(config: MarkdownConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, content: &str) -> String {
        let options =
            Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS | Options::ENABLE_TABLES;
        let parser = TextMergeStream::new(Parser::new_ext(content, options));

        let events = self.transform(parser);

        let mut html = String::with_capacity(content.len() * 2);
        push_html(&mut html, events.into_iter());
        html
    }

    fn anchors_for(&self, level: HeadingLevel) -> bool {
        let anchors = &self.config.anchors;
        anchors.enabled && anchors.levels.contains(&(level as u8))
    }

    fn transform<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut out: Vec<Event<'a>> = Vec::new();
        let mut heading: Option<HeadingBuffer<'a>> = None;
        let mut slugs = SlugCounter::default();
        let mut link_depth = 0usize;
        let mut in_code_block = false;

        for event in events {
            match &event {
                Event::Start(Tag::Heading { level, .. }) if self.anchors_for(*level) => {
                    heading = Some(HeadingBuffer {
                        level: *level,
                        text: String::new(),
                        events: Vec::new(),
                    });
                    continue;
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(buffer) = heading.take() {
                        out.extend(self.finish_heading(buffer, &mut slugs));
                        continue;
                    }
                }
                Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                    link_depth += 1
                }
                Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1)
                }
                Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
                Event::End(TagEnd::CodeBlock) => in_code_block = false,
                Event::Text(text) | Event::Code(text) => {
                    if let Some(buffer) = heading.as_mut() {
                        buffer.text.push_str(text);
                    }
                }
                _ => {}
            }

            let mapped = match event {
                Event::SoftBreak if self.config.breaks => vec![Event::HardBreak],
                Event::Html(raw) | Event::InlineHtml(raw) if !self.config.html => {
                    vec![Event::Text(raw)]
                }
                Event::Text(text) if self.config.linkify && link_depth == 0 && !in_code_block => {
                    linkify(&text).unwrap_or_else(|| vec![Event::Text(text)])
                }
                other => vec![other],
            };

            match heading.as_mut() {
                Some(buffer) => buffer.events.extend(mapped),
                None => out.extend(mapped),
            }
        }

        out
    }

    /// Emit `<hN id="slug">…<a class=.. href="#slug" aria-hidden="true">#</a></hN>`
    fn finish_heading<'a>(
        &self,
        buffer: HeadingBuffer<'a>,
        slugs: &mut SlugCounter,
    ) -> Vec<Event<'a>> {
        let level = buffer.level as u8;
        let base = slugify(&buffer.text);

        let mut events = Vec::with_capacity(buffer.events.len() + 2);
        if base.is_empty() {
            events.push(Event::Html(format!("<h{}>", level).into()));
            events.extend(buffer.events);
            events.push(Event::Html(format!("</h{}>\n", level).into()));
            return events;
        }

        let slug = slugs.unique(base);
        let anchors = &self.config.anchors;
        events.push(Event::Html(format!("<h{} id=\"{}\">", level, slug).into()));
        events.extend(buffer.events);
        events.push(Event::Html(
            format!(
                " <a class=\"{}\" href=\"#{}\" aria-hidden=\"true\">{}</a></h{}>\n",
                html_escape(&anchors.class),
                slug,
                html_escape(&anchors.symbol),
                level
            )
            .into(),
        ));
        events
    }
}

/// Slugify text for ids and tag URLs.
///
/// Lowercases, replaces non-alphanumeric runs with hyphens, strips
/// leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true; // suppress leading hyphen
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn find_url_start(s: &str) -> Option<usize> {
    [s.find("https://"), s.find("http://")]
        .into_iter()
        .flatten()
        .min()
}

/// Split text around bare `http(s)://` URLs. `None` when there are none.
fn linkify<'a>(text: &str) -> Option<Vec<Event<'a>>> {
    let mut events: Vec<Event<'a>> = Vec::new();
    let mut rest = text;
    let mut found = false;

    while let Some(start) = find_url_start(rest) {
        let candidate = &rest[start..];
        let end = candidate
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(candidate.len());
        let url = candidate[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);
        let scheme_len = if url.starts_with("https://") { 8 } else { 7 };

        if url.len() <= scheme_len {
            events.push(Event::Text(rest[..start + end].to_string().into()));
            rest = &rest[start + end..];
            continue;
        }

        if start > 0 {
            events.push(Event::Text(rest[..start].to_string().into()));
        }
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        events.push(Event::Text(url.to_string().into()));
        events.push(Event::End(TagEnd::Link));
        found = true;
        rest = &rest[start + url.len()..];
    }

    if !found {
        return None;
    }
    if !rest.is_empty() {
        events.push(Event::Text(rest.to_string().into()));
    }
    Some(events)
}
