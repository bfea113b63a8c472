//! Writes pages, generated files and the manifest under the output root.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use pagekiln_engine::{GeneratedFile, PageDescriptor};

use crate::document::{DocumentError, DocumentRenderer};
use crate::manifest::{generate_manifest, ManifestError};
use crate::route::{output_route, validate_output_route, RouteError};

/// Errors that can occur while writing output.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("Generated file path must be relative and inside the output directory: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Companion data file written next to each page.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentJson<'a> {
    body: &'a str,
    static_data: &'a Value,
}

/// Writes build output below a fixed root directory.
pub struct OutputWriter {
    root: PathBuf,
    renderer: DocumentRenderer,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, renderer: DocumentRenderer) -> Self {
        Self {
            root: root.into(),
            renderer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `index.html` and `content.json` for a page.
    ///
    /// Both files are attempted even if one of them fails; nothing is rolled
    /// back. Returns the directory the page was written to.
    pub async fn write_page(&self, page: &PageDescriptor) -> Result<PathBuf, WriteError> {
        let route = output_route(&page.route);
        validate_output_route(route)?;

        let html = self.renderer.wrap_html(page)?;
        let content = serde_json::to_string(&ContentJson {
            body: &page.rendered_body,
            static_data: &page.static_data,
        })
        .map_err(|e| WriteError::Serialize {
            what: format!("content.json for /{}", route),
            message: e.to_string(),
        })?;

        let dir = if route.is_empty() {
            self.root.clone()
        } else {
            self.root.join(route)
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WriteError::Io {
                path: dir.clone(),
                source,
            })?;

        let html_path = dir.join("index.html");
        let content_path = dir.join("content.json");
        let (html_result, content_result) = tokio::join!(
            write_file(&html_path, html),
            write_file(&content_path, content)
        );

        match (html_result, content_result) {
            (Ok(()), Ok(())) => Ok(dir),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(first), Err(second)) => {
                tracing::error!("{}", second);
                Err(first)
            }
        }
    }

    /// Write each generated file verbatim, creating parent directories.
    ///
    /// Files are independent: one result per input, in input order.
    pub async fn write_generated_files(
        &self,
        files: &[GeneratedFile],
    ) -> Vec<Result<PathBuf, WriteError>> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.write_generated_file(file).await);
        }
        results
    }

    async fn write_generated_file(&self, file: &GeneratedFile) -> Result<PathBuf, WriteError> {
        let relative = safe_relative_path(&file.path)?;
        let path = self.root.join(relative);

        ensure_parent(&path).await?;
        write_file(&path, file.content.clone()).await?;

        tracing::debug!("Generated {}", path.display());
        Ok(path)
    }

    /// Transform the manifest source and write `manifest.json`.
    pub async fn write_manifest(&self, source: &Value) -> Result<PathBuf, WriteError> {
        let manifest = generate_manifest(source)?;
        let json = serde_json::to_string(&manifest).map_err(|e| WriteError::Serialize {
            what: "manifest.json".to_string(),
            message: e.to_string(),
        })?;

        let path = self.root.join("manifest.json");
        ensure_parent(&path).await?;
        write_file(&path, json).await?;

        Ok(path)
    }
}

/// Accept only plain relative paths (no root, prefix or `..`).
fn safe_relative_path(raw: &str) -> Result<PathBuf, WriteError> {
    let path = Path::new(raw);
    let mut clean = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(WriteError::InvalidPath(raw.to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(WriteError::InvalidPath(raw.to_string()));
    }

    Ok(clean)
}

async fn ensure_parent(path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| WriteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

async fn write_file(path: &Path, contents: String) -> Result<(), WriteError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn page(route: &str, html: &str, data: Value) -> PageDescriptor {
        PageDescriptor {
            route: route.to_string(),
            rendered_body: html.to_string(),
            head_tags: vec![],
            html: html.to_string(),
            static_data: data,
        }
    }

    fn writer(root: &Path) -> OutputWriter {
        OutputWriter::new(root, DocumentRenderer::default())
    }

    #[tokio::test]
    async fn writes_nested_page() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());

        let dir = writer
            .write_page(&page("blog/post-1", "<p>hi</p>", json!({"title": "Post 1"})))
            .await
            .unwrap();

        assert_eq!(dir, temp.path().join("blog/post-1"));

        let html = fs::read_to_string(dir.join("index.html")).unwrap();
        assert!(html.contains(r#"<base href="../../">"#));
        assert!(html.contains("<p>hi</p>"));

        let content = fs::read_to_string(dir.join("content.json")).unwrap();
        assert_eq!(content, r#"{"body":"<p>hi</p>","staticData":{"title":"Post 1"}}"#);
    }

    #[tokio::test]
    async fn writes_root_page_at_output_root() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());

        writer
            .write_page(&page("", "<p>home</p>", json!(null)))
            .await
            .unwrap();

        let html = fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(html.contains(r#"<base href="./">"#));
        assert!(temp.path().join("content.json").exists());
    }

    #[tokio::test]
    async fn index_route_collapses_into_parent() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());

        let a = writer
            .write_page(&page("about/index", "<p>a</p>", json!({})))
            .await
            .unwrap();
        let b = writer
            .write_page(&page("/about/", "<p>b</p>", json!({})))
            .await
            .unwrap();

        assert_eq!(a, b);
        let names: Vec<_> = fs::read_dir(&a)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(!temp.path().join("about/index").exists());
    }

    #[tokio::test]
    async fn rejects_route_escaping_root() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path().join("dist").as_path());

        let err = writer
            .write_page(&page("../outside", "", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, WriteError::InvalidRoute(_)));
        assert!(!temp.path().join("outside").exists());
    }

    #[tokio::test]
    async fn failed_content_write_still_writes_html() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());
        fs::create_dir_all(temp.path().join("docs/content.json")).unwrap();

        let err = writer
            .write_page(&page("docs", "<p>docs</p>", json!({})))
            .await
            .unwrap_err();

        match err {
            WriteError::Io { path, .. } => assert_eq!(path, temp.path().join("docs/content.json")),
            other => panic!("expected an I/O error, got {:?}", other),
        }
        let html = fs::read_to_string(temp.path().join("docs/index.html")).unwrap();
        assert!(html.contains("<p>docs</p>"));
    }

    #[tokio::test]
    async fn writes_generated_files_with_parents() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());

        let results = writer
            .write_generated_files(&[
                GeneratedFile {
                    path: "robots.txt".to_string(),
                    content: "User-agent: *".to_string(),
                },
                GeneratedFile {
                    path: "feeds/blog/rss.xml".to_string(),
                    content: "<rss/>".to_string(),
                },
                GeneratedFile {
                    path: "/etc/passwd".to_string(),
                    content: String::new(),
                },
            ])
            .await;

        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(WriteError::InvalidPath(_))));

        assert_eq!(
            fs::read_to_string(temp.path().join("robots.txt")).unwrap(),
            "User-agent: *"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("feeds/blog/rss.xml")).unwrap(),
            "<rss/>"
        );
    }

    #[tokio::test]
    async fn writes_transformed_manifest() {
        let temp = tempdir().unwrap();
        let writer = writer(temp.path());

        writer.write_manifest(&json!({"name": "x"})).await.unwrap();

        let manifest: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("manifest.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["name"], "x");
        assert_eq!(manifest["display"], "standalone");
    }

    #[test]
    fn normalizes_safe_paths() {
        assert_eq!(
            safe_relative_path("./a/b.txt").unwrap(),
            PathBuf::from("a/b.txt")
        );
        assert!(safe_relative_path("a/../../b").is_err());
        assert!(safe_relative_path("").is_err());
    }
}
