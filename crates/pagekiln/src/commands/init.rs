//! Write a starter pagekiln.toml.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());
    tracing::info!("Run 'pagekiln build' to pre-render the site.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r##"# pagekiln configuration

[site]
# Output directory for the built site
output = "dist"

lang = "en"
app_name = "My Site"
app_title = "My Site"
theme_color = "#ffffff"
service_worker = "service-worker.js"
icons = [
  { rel = "icon", type = "image/png", sizes = "32x32", href = "assets/favicon-32x32.png" },
]
apple_touch_icon_sizes = [57, 60, 72, 76, 114, 120, 144, 152, 167, 180, 1024]

[engine]
# The engine prints one JSON event per line on stdout
command = "node"
args = ["elm-stuff/pagekiln/engine.js"]
mode = "prerender"
# Compiled engine file; JSON-stringify placeholders are inlined after compiling
bundle = "elm-stuff/pagekiln/engine.js"

[build]
compile_engine = "elm-optimize-level-2 src/Main.elm --output {output}"
compile_bundle = "elm-optimize-level-2 src/Main.elm --output {output}"
bundle_export = "Elm"
# minify = "npx terser {output} --module --compress --mangle --output={output}"
assets = ["index.js", "user-index.js", "style.css"]
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build::{load_config, ConfigFile};

    #[test]
    fn default_config_parses() {
        let parsed: Result<ConfigFile, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(parsed.is_ok(), "{:?}", parsed.err());
    }

    #[tokio::test]
    async fn writes_config_once() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("pagekiln.toml");

        run(&path, false).await.unwrap();
        assert!(load_config(&path).is_ok());

        fs::write(&path, "# edited").unwrap();
        run(&path, false).await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# edited");

        run(&path, true).await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
