//! Rendering-engine child process.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{EngineEvent, ProtocolError};

/// Channel of decoded engine events, closed when the engine stops writing.
pub type EventReceiver = mpsc::Receiver<Result<EngineEvent, ProtocolError>>;

/// How the engine should render pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Emit one page descriptor per route for static output
    #[default]
    Prerender,
    Dev,
    Prod,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Prerender => "prerender",
            RenderMode::Dev => "dev",
            RenderMode::Prod => "prod",
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prerender" => Ok(RenderMode::Prerender),
            "dev" => Ok(RenderMode::Dev),
            "prod" => Ok(RenderMode::Prod),
            other => Err(format!(
                "unknown render mode '{}' (expected prerender, dev or prod)",
                other
            )),
        }
    }
}

/// How to start the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Program to run
    pub command: String,

    /// Program arguments
    pub args: Vec<String>,

    /// Working directory for the engine process
    pub working_dir: PathBuf,

    /// Render mode passed in the startup flags
    pub mode: RenderMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["engine.js".to_string()],
            working_dir: PathBuf::from("."),
            mode: RenderMode::default(),
        }
    }
}

/// Startup flags written as the first line of the engine's stdin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineFlags {
    mode: RenderMode,
    static_http_cache: serde_json::Map<String, serde_json::Value>,
}

/// Errors from the engine process.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to start engine '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Engine {0} was not captured")]
    MissingPipe(&'static str),

    #[error("Failed to send engine flags: {0}")]
    Flags(String),

    #[error("Failed to wait for engine: {0}")]
    Wait(std::io::Error),

    #[error("Engine exited with {0}")]
    Exited(ExitStatus),
}

/// A running engine process.
pub struct EngineSession {
    child: Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl EngineSession {
    /// Start the engine and return a receiver for its events.
    pub async fn spawn(config: &EngineConfig) -> Result<(Self, EventReceiver), SessionError> {
        tracing::info!(
            "Starting engine: {} {} ({} mode)",
            config.command,
            config.args.join(" "),
            config.mode.as_str()
        );

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(SessionError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(SessionError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(SessionError::MissingPipe("stderr"))?;

        let flags = EngineFlags {
            mode: config.mode,
            static_http_cache: serde_json::Map::new(),
        };
        let mut line =
            serde_json::to_string(&flags).map_err(|e| SessionError::Flags(e.to_string()))?;
        line.push('\n');

        // An engine that ignores its flags may already have exited.
        match stdin.write_all(line.as_bytes()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("Engine closed stdin before reading flags");
            }
            Err(e) => return Err(SessionError::Flags(e.to_string())),
        }
        drop(stdin);

        let (tx, rx) = mpsc::channel(100);
        let stdout_task = tokio::spawn(forward_events(BufReader::new(stdout), tx));

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!("engine: {}", line);
            }
        });

        Ok((
            Self {
                child,
                stdout_task,
                stderr_task,
            },
            rx,
        ))
    }

    /// Wait for the engine to exit.
    pub async fn wait(mut self) -> Result<(), SessionError> {
        let status = self.child.wait().await.map_err(SessionError::Wait)?;
        if let Err(e) = self.stdout_task.await {
            tracing::warn!("Engine output reader stopped abnormally: {}", e);
        }
        if let Err(e) = self.stderr_task.await {
            tracing::warn!("Engine stderr reader stopped abnormally: {}", e);
        }

        if status.success() {
            Ok(())
        } else {
            Err(SessionError::Exited(status))
        }
    }

    /// Stop the engine without waiting for it to finish.
    pub async fn kill(mut self) -> Result<(), SessionError> {
        self.stdout_task.abort();
        self.stderr_task.abort();
        self.child.kill().await.map_err(SessionError::Wait)
    }
}

/// Decode newline-delimited events from `reader` until EOF.
///
/// Blank lines are skipped. A line that is not UTF-8 is reported as invalid
/// JSON and reading continues. A read error is forwarded and ends the
/// stream. Stops early if the receiving side is dropped.
pub async fn forward_events<R>(mut reader: R, tx: mpsc::Sender<Result<EngineEvent, ProtocolError>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let event = match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => match std::str::from_utf8(trim_line_ending(&buf)) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => EngineEvent::decode(line),
                Err(e) => Err(ProtocolError::InvalidJson(format!("line is not UTF-8: {}", e))),
            },
            Err(e) => {
                let _ = tx.send(Err(ProtocolError::Read(e.to_string()))).await;
                break;
            }
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
