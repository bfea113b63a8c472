//! Static site builder.

use std::path::PathBuf;
use std::time::Instant;

use pagekiln_engine::{
    expand_output, inline_json_stringify, rewrite_in_place, run_shell, to_esm_module,
    BundleError, EngineConfig, EngineSession, SessionError, ToolchainError,
};

use crate::assets::{copy_assets, AssetError, DEFAULT_ASSETS};
use crate::document::{DocumentConfig, DocumentRenderer};
use crate::pipeline::{BuildReport, Failure, Pipeline, PipelineError};
use crate::writer::OutputWriter;

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; commands and the engine run here
    pub project_dir: PathBuf,

    /// Output directory, relative to the project root
    pub output_dir: PathBuf,

    /// Values baked into every page document
    pub document: DocumentConfig,

    /// How to start the rendering engine
    pub engine: EngineConfig,

    /// Command that generates sources before compiling
    pub codegen: Option<String>,

    /// Command that compiles the engine
    pub compile_engine: Option<String>,

    /// Compiled engine file whose JSON-stringify placeholders are inlined
    pub engine_bundle: Option<PathBuf>,

    /// Command that compiles the client bundle to `{output}`
    pub compile_bundle: Option<String>,

    /// Export name when converting the client bundle to an ES module
    pub bundle_export: Option<String>,

    /// Command run on the client bundle after conversion
    pub minify: Option<String>,

    /// Files and directories copied into the output unmodified
    pub assets: Vec<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            output_dir: PathBuf::from("dist"),
            document: DocumentConfig::default(),
            engine: EngineConfig::default(),
            codegen: None,
            compile_engine: None,
            engine_bundle: None,
            compile_bundle: None,
            bundle_export: Some("Elm".to_string()),
            minify: None,
            assets: DEFAULT_ASSETS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages written
    pub pages: usize,

    /// Number of engine-generated files written
    pub generated_files: usize,

    /// Number of static assets copied
    pub assets: usize,

    /// Pages and files that could not be written
    pub failures: Vec<Failure>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error(transparent)]
    Engine(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] PipelineError),
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    fn output_dir(&self) -> PathBuf {
        self.config.project_dir.join(&self.config.output_dir)
    }

    /// Build the static site.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let output_dir = self.output_dir();

        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| BuildError::OutputDir {
                path: output_dir.display().to_string(),
                source,
            })?;

        if let Some(codegen) = &self.config.codegen {
            run_shell(codegen, &self.config.project_dir).await?;
        }

        self.compile_engine().await?;

        // The client bundle and the pages are independent outputs.
        let (client, pages) = tokio::join!(self.build_client(), self.render_pages());
        let assets = client?;
        let report = pages?;

        Ok(BuildResult {
            pages: report.pages,
            generated_files: report.generated_files,
            assets,
            failures: report.failures,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir,
        })
    }

    /// Compile the engine and patch its placeholder encoder calls.
    async fn compile_engine(&self) -> Result<(), BuildError> {
        let bundle = self
            .config
            .engine_bundle
            .as_ref()
            .map(|b| self.config.project_dir.join(b));

        if let Some(command) = &self.config.compile_engine {
            let command = match &bundle {
                Some(path) => expand_output(command, path),
                None => command.clone(),
            };
            run_shell(&command, &self.config.project_dir).await?;
        }

        if let Some(path) = &bundle {
            rewrite_in_place(path, |src| Ok(inline_json_stringify(src))).await?;
        }

        Ok(())
    }

    /// Copy assets and produce `main.js`.
    async fn build_client(&self) -> Result<usize, BuildError> {
        let output_dir = self.output_dir();
        let copied = copy_assets(&self.config.project_dir, &output_dir, &self.config.assets).await?;

        let Some(compile) = &self.config.compile_bundle else {
            return Ok(copied);
        };

        let main_js = output_dir.join("main.js");
        run_shell(&expand_output(compile, &main_js), &self.config.project_dir).await?;

        if let Some(export) = &self.config.bundle_export {
            rewrite_in_place(&main_js, |src| to_esm_module(src, export)).await?;
        }

        if let Some(minify) = &self.config.minify {
            run_shell(&expand_output(minify, &main_js), &self.config.project_dir).await?;
        }

        Ok(copied)
    }

    /// Run the engine and write everything it emits.
    async fn render_pages(&self) -> Result<BuildReport, BuildError> {
        let (session, events) = EngineSession::spawn(&self.config.engine).await?;

        let writer = OutputWriter::new(
            self.output_dir(),
            DocumentRenderer::new(self.config.document.clone()),
        );
        let mut pipeline = Pipeline::new(writer);

        match pipeline.run(events).await {
            Ok(report) => {
                session.wait().await?;
                Ok(report)
            }
            Err(e) => {
                if let Err(kill_error) = session.kill().await {
                    tracing::warn!("{}", kill_error);
                }
                Err(e.into())
            }
        }
    }
}
