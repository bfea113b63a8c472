//! Static site build command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagekiln_engine::{EngineConfig, RenderMode};
use pagekiln_static::assets::DEFAULT_ASSETS;
use pagekiln_static::{BuildConfig, DocumentConfig, StaticBuilder};
use serde::Deserialize;

/// Configuration file structure (pagekiln.toml).
#[derive(Debug, Deserialize, Default)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    site: SiteConfig,
    #[serde(default)]
    engine: EngineSettings,
    #[serde(default)]
    build: BuildSettings,
}

#[derive(Debug, Deserialize)]
struct SiteConfig {
    #[serde(default = "default_output")]
    output: String,
    #[serde(flatten)]
    document: DocumentConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            document: DocumentConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EngineSettings {
    #[serde(default = "default_engine_command")]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    mode: RenderMode,
    /// Compiled engine file patched after `compile_engine`
    bundle: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: Vec::new(),
            mode: RenderMode::default(),
            bundle: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BuildSettings {
    codegen: Option<String>,
    compile_engine: Option<String>,
    compile_bundle: Option<String>,
    #[serde(default = "default_bundle_export")]
    bundle_export: Option<String>,
    minify: Option<String>,
    #[serde(default = "default_assets")]
    assets: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            codegen: None,
            compile_engine: None,
            compile_bundle: None,
            bundle_export: default_bundle_export(),
            minify: None,
            assets: default_assets(),
        }
    }
}

fn default_output() -> String {
    "dist".to_string()
}
fn default_engine_command() -> String {
    "node".to_string()
}
fn default_bundle_export() -> Option<String> {
    Some("Elm".to_string())
}
fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub(crate) fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}

/// Turn the config file and CLI overrides into a build configuration.
fn build_config(
    file: ConfigFile,
    project_dir: PathBuf,
    output: Option<PathBuf>,
    mode: Option<RenderMode>,
) -> BuildConfig {
    BuildConfig {
        output_dir: output.unwrap_or_else(|| PathBuf::from(&file.site.output)),
        document: file.site.document,
        engine: EngineConfig {
            command: file.engine.command,
            args: file.engine.args,
            working_dir: project_dir.clone(),
            mode: mode.unwrap_or(file.engine.mode),
        },
        codegen: file.build.codegen,
        compile_engine: file.build.compile_engine,
        engine_bundle: file.engine.bundle.map(PathBuf::from),
        compile_bundle: file.build.compile_bundle,
        bundle_export: file.build.bundle_export,
        minify: file.build.minify,
        assets: file.build.assets.into_iter().map(PathBuf::from).collect(),
        project_dir,
    }
}

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>, mode: Option<RenderMode>) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = load_config(config_path)?;
    let project_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = build_config(file_config, project_dir, output, mode);
    let result = StaticBuilder::new(config).build().await?;

    tracing::info!(
        "Built {} pages, {} generated files and {} assets in {}ms",
        result.pages,
        result.generated_files,
        result.assets,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    if !result.failures.is_empty() {
        for failure in &result.failures {
            tracing::error!("{}: {}", failure.target, failure.message);
        }
        anyhow::bail!("{} pages or files failed to build", result.failures.len());
    }

    Ok(())
}
