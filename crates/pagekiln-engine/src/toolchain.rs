//! External build commands (code generation, compilers, minifiers).

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// Errors from running an external command.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' failed with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Substitute the `{output}` placeholder in a command template.
pub fn expand_output(template: &str, output: &Path) -> String {
    template.replace("{output}", &output.display().to_string())
}

/// Run a command line through the platform shell and return its stdout.
///
/// Anything written to stderr is logged; only a non-zero exit fails the step.
pub async fn run_shell(command: &str, cwd: &Path) -> Result<String, ToolchainError> {
    tracing::info!("Running: {}", command);

    let mut cmd = shell(command);
    let output = cmd
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ToolchainError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(ToolchainError::Failed {
            command: command.to_string(),
            status: output.status,
            stderr,
        });
    }

    for line in stderr.lines() {
        tracing::warn!("{}", line);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
