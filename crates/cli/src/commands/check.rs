use anyhow::{Context, Result};
use sitekit_core::config::CONFIG_FILE_NAME;
use sitekit_core::{ContentItem, FilterRegistry, collect_tags, load_site_config};
use sitekit_generator::content::{discover, load_item};
use sitekit_generator::layout::LAYOUT_FILTERS;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Validate site.toml, the filter registry and every content file
pub async fn run(path: PathBuf) -> Result<()> {
    println!("Checking site at: {}", path.display());

    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let config = load_site_config(&path).context("Failed to load site.toml")?;
    if path.join(CONFIG_FILE_NAME).exists() {
        println!("✓ {} valid", CONFIG_FILE_NAME);
    } else {
        println!("⚠ No {} found, using defaults", CONFIG_FILE_NAME);
    }
    println!("  Title: {}", config.site.title);

    let registry = FilterRegistry::builtin();
    registry
        .require(LAYOUT_FILTERS)
        .context("Layout uses a filter that is not registered")?;
    println!("✓ {} filters registered", registry.len());

    let input_dir = config.input_dir(&path);
    let files = discover(&path, &config);
    let mut items = Vec::with_capacity(files.len());
    let mut failures = 0;
    for (rel, format) in &files {
        match load_item(&input_dir, rel, *format) {
            Ok(item) => items.push(item),
            Err(e) => {
                eprintln!("  ✗ {}", e);
                failures += 1;
            }
        }
    }

    let conflicts = output_conflicts(&items);
    for (output, sources) in &conflicts {
        let sources: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
        eprintln!(
            "  ✗ {} is produced by more than one file: {}",
            output.display(),
            sources.join(", ")
        );
    }

    if failures > 0 || !conflicts.is_empty() {
        anyhow::bail!(
            "{} of {} content file(s) failed to load, {} output conflict(s)",
            failures,
            files.len(),
            conflicts.len()
        );
    }

    println!("✓ {} content file(s) valid", items.len());
    let tags = collect_tags(&items);
    println!("  Tags: {}", tags.len());

    Ok(())
}

/// Output paths claimed by more than one content item, sorted by path
fn output_conflicts(items: &[ContentItem]) -> Vec<(&Path, Vec<&Path>)> {
    let mut by_output: HashMap<&Path, Vec<&Path>> = HashMap::new();
    for item in items {
        by_output
            .entry(item.output_path.as_path())
            .or_default()
            .push(item.input_path.as_path());
    }

    let mut conflicts: Vec<_> = by_output
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect();
    conflicts.sort();
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_check_valid_site() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/a.md", "+++\ntags = [\"posts\", \"rust\"]\n+++\nA");
        write(dir.path(), "site.toml", "[site]\ntitle = \"Checked\"\n");

        run(dir.path().to_path_buf()).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_reports_bad_front_matter() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/good.md", "+++\ntitle = \"Good\"\n+++\n");
        write(dir.path(), "posts/bad.md", "+++\ntitle = \n+++\n");

        let err = run(dir.path().to_path_buf()).await.unwrap_err();
        assert!(err.to_string().contains("1 of 2 content file(s) failed"));
    }

    #[tokio::test]
    async fn test_check_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "site.toml", "[dirs]\noutput = \"../out\"\n");

        assert!(run(dir.path().to_path_buf()).await.is_err());
    }

    #[tokio::test]
    async fn test_check_reports_output_conflicts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "+++\npermalink = \"same.html\"\n+++\n");
        write(dir.path(), "b.md", "+++\npermalink = \"same.html\"\n+++\n");

        let err = run(dir.path().to_path_buf()).await.unwrap_err();
        assert!(err.to_string().contains("1 output conflict(s)"));
    }
}
