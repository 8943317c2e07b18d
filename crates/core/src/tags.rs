//! Site-wide tag list and the reserved-label denylist.
//!
//! The tag list is what navigation and the tag index render. Reserved labels
//! (`all`, `nav`, `post`, `posts`) group content into collections but are
//! never listed as user-facing tags.

use crate::types::{ContentItem, TagSet};
use std::collections::HashSet;
use tracing::debug;

/// Labels that never appear in a tag listing
pub const DENYLIST: [&str; 4] = ["all", "nav", "post", "posts"];

pub fn is_denylisted(tag: &str) -> bool {
    DENYLIST.contains(&tag)
}

/// Remove denylisted labels, keeping everything else in input order.
///
/// Duplicates of allowed labels are preserved; use [`collect_tags`] for a
/// deduplicated list.
pub fn filter_denylist<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter(|tag| !is_denylisted(tag.as_ref()))
        .map(|tag| tag.as_ref().to_string())
        .collect()
}

/// Union the tags of every item, drop denylisted labels.
///
/// Order is first-seen across `items` in iteration order.
pub fn collect_tags<'a, I>(items: I) -> TagSet
where
    I: IntoIterator<Item = &'a ContentItem>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<&str> = Vec::new();
    let mut item_count = 0usize;

    for item in items {
        item_count += 1;
        for tag in &item.tags {
            if seen.insert(tag.as_str()) {
                ordered.push(tag.as_str());
            }
        }
    }

    let tags = filter_denylist(ordered);
    debug!(items = item_count, tags = tags.len(), "collected tag list");
    TagSet(tags)
}

/// Items carrying `tag`, in the order given
pub fn collection<'a>(items: &'a [ContentItem], tag: &str) -> Vec<&'a ContentItem> {
    items.iter().filter(|item| item.has_tag(tag)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateValue, TemplateFormat};
    use std::path::PathBuf;

    fn item(name: &str, tags: &[&str]) -> ContentItem {
        ContentItem {
            input_path: PathBuf::from(format!("posts/{}.md", name)),
            url: format!("/posts/{}/", name),
            output_path: PathBuf::from(format!("posts/{}/index.html", name)),
            format: TemplateFormat::Markdown,
            title: Some(name.to_string()),
            date: DateValue::parse("2024-01-05").unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            body: String::new(),
        }
    }

    fn sample_collections() -> Vec<Vec<ContentItem>> {
        vec![
            vec![],
            vec![item("empty", &[])],
            vec![item("a", &["post", "rust"]), item("b", &["posts", "rust", "go"])],
            vec![
                item("a", &["all", "nav", "post", "posts"]),
                item("b", &["nav"]),
            ],
            vec![
                item("a", &["rust", "rust", "rust"]),
                item("b", &["go", "rust", "web"]),
                item("c", &["web", "post"]),
            ],
        ]
    }

    #[test]
    fn test_collect_tags_never_contains_denylisted() {
        for items in sample_collections() {
            let tags = collect_tags(&items);
            for reserved in DENYLIST {
                assert!(!tags.contains(reserved), "{} leaked into {:?}", reserved, tags);
            }
        }
    }

    #[test]
    fn test_collect_tags_has_no_duplicates() {
        for items in sample_collections() {
            let tags = collect_tags(&items);
            let unique: HashSet<&String> = tags.iter().collect();
            assert_eq!(unique.len(), tags.len());
        }
    }

    #[test]
    fn test_collect_tags_empty_input() {
        let items: Vec<ContentItem> = Vec::new();
        assert!(collect_tags(&items).is_empty());
    }

    #[test]
    fn test_collect_tags_untagged_items_contribute_nothing() {
        let items = vec![item("a", &[]), item("b", &[]), item("c", &["rust"])];
        assert_eq!(collect_tags(&items).into_vec(), vec!["rust"]);
    }

    #[test]
    fn test_collect_tags_first_seen_order() {
        let items = vec![
            item("a", &["web", "post"]),
            item("b", &["rust", "web"]),
            item("c", &["go", "rust"]),
        ];
        assert_eq!(collect_tags(&items).into_vec(), vec!["web", "rust", "go"]);
    }

    #[test]
    fn test_filter_denylist_preserves_order() {
        assert_eq!(
            filter_denylist(["post", "rust", "all", "go"]),
            vec!["rust", "go"]
        );
    }

    #[test]
    fn test_filter_denylist_keeps_duplicates_and_case() {
        assert_eq!(
            filter_denylist(vec!["rust".to_string(), "Post".to_string(), "rust".to_string()]),
            vec!["rust", "Post", "rust"]
        );
        assert!(filter_denylist(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_is_denylisted() {
        assert!(is_denylisted("all"));
        assert!(is_denylisted("posts"));
        assert!(!is_denylisted("postscript"));
        assert!(!is_denylisted(""));
    }

    #[test]
    fn test_collection_selects_tagged_items() {
        let items = vec![
            item("a", &["posts", "rust"]),
            item("b", &["nav"]),
            item("c", &["posts"]),
        ];
        let posts: Vec<&str> = collection(&items, "posts")
            .iter()
            .map(|i| i.url.as_str())
            .collect();
        assert_eq!(posts, vec!["/posts/a/", "/posts/c/"]);
        assert!(collection(&items, "missing").is_empty());
    }
}
