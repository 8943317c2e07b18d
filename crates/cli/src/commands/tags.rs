use anyhow::{Context, Result};
use sitekit_core::{collect_tags, load_site_config, tags};
use sitekit_generator::load_content;
use std::path::PathBuf;

/// Print the site tag list with the number of items per tag
pub async fn run(path: PathBuf, json: bool) -> Result<()> {
    let config = load_site_config(&path).context("Failed to load site.toml")?;
    let items = load_content(&path, &config).context("Failed to load content")?;
    let tag_list = collect_tags(&items);

    if json {
        println!("{}", serde_json::to_string_pretty(&tag_list)?);
        return Ok(());
    }

    if tag_list.is_empty() {
        println!("No tags found in {} content file(s)", items.len());
        return Ok(());
    }

    for tag in &tag_list {
        let count = tags::collection(&items, tag).len();
        println!("{} ({})", tag, count);
    }

    Ok(())
}
