//! Engine event coordinator.
//!
//! Consumes the engine's event stream and turns it into output. The stream
//! must start with exactly one bootstrap event; pages may follow in any
//! order and are written concurrently.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use pagekiln_engine::{Bootstrap, EngineEvent, EventReceiver, ProtocolError};

use crate::writer::{OutputWriter, WriteError};

/// Where the coordinator is in the engine protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingBootstrap,
    ProcessingRoutes,
    /// The event stream has closed
    Done,
}

/// Violations of the engine protocol. These stop the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Engine sent a second bootstrap event")]
    DuplicateBootstrap,

    #[error("Engine sent page /{route} before the bootstrap event")]
    RouteBeforeBootstrap { route: String },

    #[error("Engine finished without sending a bootstrap event")]
    MissingBootstrap,
}

/// Something that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Route (`/blog/post-1`) or file path the failure belongs to
    pub target: String,
    pub message: String,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages written (both files present)
    pub pages: usize,

    /// Generated files written
    pub generated_files: usize,

    /// Whether `manifest.json` was written
    pub manifest_written: bool,

    /// Log lines received from the engine
    pub logs: usize,

    /// Routes, files and events that failed
    pub failures: Vec<Failure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, target: impl Into<String>, message: impl ToString) {
        let failure = Failure {
            target: target.into(),
            message: message.to_string(),
        };
        tracing::error!("{}: {}", failure.target, failure.message);
        self.failures.push(failure);
    }
}

type PageWrite = (String, Result<PathBuf, WriteError>);

/// Drives an [`OutputWriter`] from engine events.
pub struct Pipeline {
    writer: Arc<OutputWriter>,
    state: PipelineState,
    written: HashMap<PathBuf, String>,
}

impl Pipeline {
    pub fn new(writer: OutputWriter) -> Self {
        Self {
            writer: Arc::new(writer),
            state: PipelineState::AwaitingBootstrap,
            written: HashMap::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Process events until the stream closes.
    ///
    /// Write failures and malformed events are recorded in the report and do
    /// not stop the run. Protocol violations do, after in-flight writes have
    /// finished.
    pub async fn run(&mut self, mut events: EventReceiver) -> Result<BuildReport, PipelineError> {
        let mut report = BuildReport::default();
        let mut writes: JoinSet<PageWrite> = JoinSet::new();

        let outcome = loop {
            while let Some(done) = writes.try_join_next() {
                self.record_page(done, &mut report);
            }

            let Some(event) = events.recv().await else {
                break Ok(());
            };

            if let Err(e) = self.handle(event, &mut writes, &mut report).await {
                break Err(e);
            }
        };

        while let Some(done) = writes.join_next().await {
            self.record_page(done, &mut report);
        }

        let awaiting = self.state == PipelineState::AwaitingBootstrap;
        self.state = PipelineState::Done;

        outcome?;
        if awaiting {
            return Err(PipelineError::MissingBootstrap);
        }

        tracing::info!(
            "Wrote {} pages and {} generated files ({} failures)",
            report.pages,
            report.generated_files,
            report.failures.len()
        );

        Ok(report)
    }

    async fn handle(
        &mut self,
        event: Result<EngineEvent, ProtocolError>,
        writes: &mut JoinSet<PageWrite>,
        report: &mut BuildReport,
    ) -> Result<(), PipelineError> {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                let target = match &e {
                    ProtocolError::MalformedPage {
                        route: Some(route), ..
                    } => format!("/{}", route.trim_start_matches('/')),
                    _ => "engine output".to_string(),
                };
                report.fail(target, e);
                return Ok(());
            }
        };

        match event {
            EngineEvent::Log(message) => {
                tracing::info!("{}", message);
                report.logs += 1;
            }
            EngineEvent::Bootstrap(bootstrap) => {
                if self.state != PipelineState::AwaitingBootstrap {
                    return Err(PipelineError::DuplicateBootstrap);
                }
                self.bootstrap(&bootstrap, report).await;
                self.state = PipelineState::ProcessingRoutes;
            }
            EngineEvent::Render(page) => {
                if self.state == PipelineState::AwaitingBootstrap {
                    return Err(PipelineError::RouteBeforeBootstrap { route: page.route });
                }
                let writer = Arc::clone(&self.writer);
                writes.spawn(async move {
                    let result = writer.write_page(&page).await;
                    (page.route, result)
                });
            }
        }

        Ok(())
    }

    async fn bootstrap(&self, bootstrap: &Bootstrap, report: &mut BuildReport) {
        match self.writer.write_manifest(&bootstrap.manifest).await {
            Ok(path) => {
                tracing::debug!("Wrote {}", path.display());
                report.manifest_written = true;
            }
            Err(e) => report.fail("manifest.json", e),
        }

        let results = self
            .writer
            .write_generated_files(&bootstrap.files_to_generate)
            .await;
        for (file, result) in bootstrap.files_to_generate.iter().zip(results) {
            match result {
                Ok(_) => report.generated_files += 1,
                Err(e) => report.fail(&file.path, e),
            }
        }
    }

    fn record_page(&mut self, done: Result<PageWrite, JoinError>, report: &mut BuildReport) {
        match done {
            Ok((route, Ok(dir))) => {
                let route = format!("/{}", route.trim_start_matches('/'));
                tracing::info!("Pre-rendered {}", route);
                if let Some(previous) = self.written.insert(dir.clone(), route.clone()) {
                    tracing::debug!(
                        "{} and {} share {}; last write wins",
                        previous,
                        route,
                        dir.display()
                    );
                }
                report.pages += 1;
            }
            Ok((route, Err(e))) => {
                report.fail(format!("/{}", route.trim_start_matches('/')), e);
            }
            Err(e) => report.fail("page write", e),
        }
    }
}
