use sitekit_core::{Filter, FilterRegistry};

/// Print every registered filter name
pub fn run() {
    let registry = FilterRegistry::builtin();
    println!("{} filters registered:", registry.len());
    for name in registry.names() {
        let filter: Option<Filter> = name.parse().ok();
        let usage = match filter {
            Some(Filter::ReadableDate) => "date → \"05 Jan 2024\"",
            Some(Filter::HtmlDateString) => "date → \"2024-01-05\"",
            Some(Filter::Head) => "list, n → first n items (last |n| if negative)",
            Some(Filter::Min) => "numbers... → smallest",
            Some(Filter::FilterDenylist) => "tags → tags without all/nav/post/posts",
            None => "",
        };
        println!("  {:<16} {}", name, usage);
    }
}
