use anyhow::{Context, Result};
use sitekit_core::load_site_config;
use sitekit_generator::{BuildOptions, build_site};
use std::path::PathBuf;

/// Build the static site
pub async fn run(path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    println!("🔨 Building static site...");
    println!("   Source: {}", path.display());

    // Validate site directory exists
    if !path.exists() {
        anyhow::bail!("Site directory does not exist: {}", path.display());
    }

    let mut config = load_site_config(&path).context("Failed to load site.toml")?;
    if let Some(output) = output {
        config.dirs.output = output;
    }
    println!("   Output: {}", config.output_dir(&path).display());
    println!();

    let report =
        build_site(&path, &config, BuildOptions::default()).context("Failed to build site")?;

    println!("📄 Wrote {} pages", report.pages);
    println!("🏷  Wrote {} tag pages", report.tag_pages);
    if report.tags.is_empty() {
        println!("   No tags found");
    } else {
        let tags: Vec<&str> = report.tags.iter().map(String::as_str).collect();
        println!("   Tags: {}", tags.join(", "));
    }
    println!("📁 Copied {} passthrough files", report.passthrough_files);

    println!();
    println!("✅ Build complete!");
    println!("   Output: {}", report.output.display());
    println!();
    println!("To preview locally:");
    println!("   sitekit serve {}", path.display());
    println!();

    Ok(())
}
