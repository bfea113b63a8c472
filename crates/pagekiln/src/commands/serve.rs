//! Local preview of a built output tree.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

/// Serve `dir` on localhost until interrupted.
pub async fn run(port: u16, dir: PathBuf, open_browser: bool) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!(
            "No built site at {}; run 'pagekiln build' first",
            dir.display()
        );
    }

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let url = format!("http://{}", addr);
    tracing::info!("Previewing {} at {}", dir.display(), url);

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let app = Router::new().fallback_service(ServeDir::new(dir));
    axum::serve(listener, app)
        .await
        .context("Preview server stopped")
}
