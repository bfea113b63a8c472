//! Static asset copying.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Assets copied when none are configured.
pub const DEFAULT_ASSETS: &[&str] = &["index.js", "user-index.js", "style.css"];

/// Errors that can occur while copying assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read asset directory {path}: {message}")]
    Walk { path: String, message: String },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: String,
        to: String,
        source: std::io::Error,
    },
}

/// Copy each asset from `project_dir` into `output_dir` unmodified.
///
/// Directories are copied recursively. Missing assets are skipped with a
/// warning. Returns the number of files copied.
pub async fn copy_assets(
    project_dir: &Path,
    output_dir: &Path,
    assets: &[PathBuf],
) -> Result<usize, AssetError> {
    let mut copied = 0;

    for asset in assets {
        let source = project_dir.join(asset);
        let target = output_dir.join(output_name(asset));

        if source.is_dir() {
            for (from, to) in directory_files(&source, &target)? {
                copy_file(&from, &to).await?;
                copied += 1;
            }
        } else if source.is_file() {
            copy_file(&source, &target).await?;
            copied += 1;
        } else {
            tracing::warn!("Asset not found: {}", source.display());
        }
    }

    Ok(copied)
}

/// Where an asset lands relative to the output root.
fn output_name(asset: &Path) -> PathBuf {
    if asset.is_absolute() {
        asset
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| asset.to_path_buf())
    } else {
        asset.to_path_buf()
    }
}

fn directory_files(source: &Path, target: &Path) -> Result<Vec<(PathBuf, PathBuf)>, AssetError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| AssetError::Walk {
            path: source.display().to_string(),
            message: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        files.push((entry.path().to_path_buf(), target.join(relative)));
    }

    Ok(files)
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), AssetError> {
    let copy_error = |source: std::io::Error| AssetError::Copy {
        from: from.display().to_string(),
        to: to.display().to_string(),
        source,
    };

    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(copy_error)?;
    }
    tokio::fs::copy(from, to).await.map_err(copy_error)?;

    tracing::debug!("Copied {}", to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_files_unmodified() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(project.path().join("style.css"), "body { margin: 0 }").unwrap();
        fs::write(project.path().join("index.js"), "export {}").unwrap();

        let assets: Vec<PathBuf> = DEFAULT_ASSETS.iter().map(PathBuf::from).collect();
        let copied = copy_assets(project.path(), out.path(), &assets).await.unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(out.path().join("style.css")).unwrap(),
            "body { margin: 0 }"
        );
        assert!(!out.path().join("user-index.js").exists());
    }

    #[tokio::test]
    async fn copies_directories_recursively() {
        let project = tempdir().unwrap();
        let out = tempdir().unwrap();
        let images = project.path().join("assets/images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("logo.svg"), "<svg/>").unwrap();
        fs::write(project.path().join("assets/app.webmanifest"), "{}").unwrap();

        let copied = copy_assets(project.path(), out.path(), &[PathBuf::from("assets")])
            .await
            .unwrap();

        assert_eq!(copied, 2);
        assert!(out.path().join("assets/images/logo.svg").exists());
        assert!(out.path().join("assets/app.webmanifest").exists());
    }
}
