use sitekit_core::{Result, SiteConfig};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Copy every passthrough path (relative to the site root) into the output
/// directory, preserving layout. Returns the number of files copied.
pub fn copy_passthrough(root: &Path, output: &Path, config: &SiteConfig) -> Result<usize> {
    let mut copied = 0;

    for rel in &config.passthrough {
        let src = root.join(rel);
        if !src.exists() {
            debug!(path = %src.display(), "passthrough path missing, skipping");
            continue;
        }

        if src.is_file() {
            let dst = output.join(rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
            copied += 1;
            continue;
        }

        for entry in WalkDir::new(&src) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable passthrough entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(inner) = entry.path().strip_prefix(&src) else {
                continue;
            };
            let dst = output.join(rel).join(inner);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dst)?;
            copied += 1;
        }
    }

    debug!(files = copied, "passthrough copy complete");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_copy_passthrough_dirs_and_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("img/icons")).unwrap();
        fs::write(root.join("img/logo.png"), b"png").unwrap();
        fs::write(root.join("img/icons/rss.svg"), b"svg").unwrap();
        fs::write(root.join("robots.txt"), b"User-agent: *").unwrap();

        let mut config = SiteConfig::default();
        config.passthrough = vec![
            PathBuf::from("img"),
            PathBuf::from("css"),
            PathBuf::from("robots.txt"),
        ];
        let output = root.join("_site");

        let copied = copy_passthrough(root, &output, &config).unwrap();
        assert_eq!(copied, 3);
        assert_eq!(fs::read(output.join("img/logo.png")).unwrap(), b"png");
        assert!(output.join("img/icons/rss.svg").exists());
        assert!(output.join("robots.txt").exists());
        assert!(!output.join("css").exists());
    }
}
