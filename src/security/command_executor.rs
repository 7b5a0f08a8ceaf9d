//! SafeCommandExecutor: allow-listed execution of the build and signing tools
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only `mvn` and `gpg` can execute
//! - **Injection prevention**: Uses `tokio::process::Command`, arguments are never
//!   interpolated into shell strings
//! - **Secret handling**: Environment values are exposed only when the child is spawned
//! - **Timeout control**: Hung processes are killed after the configured duration
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_publisher::core::{ToolInvocation, ToolRunner};
//! use bundle_publisher::SafeCommandExecutor;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut executor = SafeCommandExecutor::new(std::env::temp_dir())?;
//! executor.set_timeout(Duration::from_secs(30));
//!
//! let output = executor.run(&ToolInvocation::new("gpg").arg("--version")).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::core::traits::{ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Allowed commands whitelist for security.
///
/// Only these commands can be executed via SafeCommandExecutor.
const ALLOWED_COMMANDS: &[&str] = &["mvn", "gpg"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

fn ensure_allowed(command: &str) -> Result<(), CommandError> {
    if ALLOWED_COMMANDS.contains(&command) {
        Ok(())
    } else {
        Err(CommandError::CommandNotAllowed(command.to_string()))
    }
}

/// Safe command executor with security controls
#[derive(Debug)]
pub struct SafeCommandExecutor {
    /// Default working directory for commands without their own
    working_dir: PathBuf,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.exists() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            timeout: None,
        })
    }

    /// Set command execution timeout.
    ///
    /// Commands exceeding this duration are killed.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Execute a command with whitelist validation.
    ///
    /// stdout and stderr are captured whatever the exit status.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Command not in whitelist
    /// - `CommandError::InvalidWorkingDirectory` - `cwd` does not exist
    /// - `CommandError::ExecutionFailed` - Binary not found or execution error
    /// - `CommandError::Timeout` - Command ran longer than the timeout
    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, CommandError> {
        ensure_allowed(&invocation.program)?;

        // Windows-specific: mvn is a .cmd script, not an .exe
        #[cfg(target_os = "windows")]
        let command_name = if invocation.program == "mvn" {
            "mvn.cmd".to_string()
        } else {
            invocation.program.clone()
        };

        #[cfg(not(target_os = "windows"))]
        let command_name = invocation.program.clone();

        let cwd = invocation.cwd.as_deref().unwrap_or(&self.working_dir);
        if !cwd.exists() {
            return Err(CommandError::InvalidWorkingDirectory(cwd.to_path_buf()));
        }

        let mut cmd = Command::new(&command_name);
        cmd.args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &invocation.env {
            cmd.env(key, value.expose_secret());
        }

        tracing::debug!("Running {}", invocation.command_line());

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| CommandError::Timeout(limit))?,
            None => cmd.output().await,
        }
        .map_err(|e| CommandError::ExecutionFailed(format!("{}: {}", invocation.program, e)))?;

        let output = ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!("{} finished with {}", invocation.program, output.status_text());

        Ok(output)
    }
}

#[async_trait]
impl ToolRunner for SafeCommandExecutor {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, CommandError> {
        self.execute(invocation).await
    }
}

/// Runner that prints commands instead of executing them
///
/// Every call succeeds and echoes its command line as stdout.
#[derive(Debug, Default)]
pub struct DryRunRunner;

#[async_trait]
impl ToolRunner for DryRunRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, CommandError> {
        ensure_allowed(&invocation.program)?;

        let command_line = invocation.command_line();
        println!("  🧪 [dry-run] {}", command_line);

        Ok(ToolOutput {
            status: Some(0),
            stdout: format!("{}\n", command_line),
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper function to get cross-platform temp directory
    fn get_test_dir() -> PathBuf {
        std::env::temp_dir()
    }

    #[tokio::test]
    async fn test_rejected_command_rm() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor
            .execute(&ToolInvocation::new("rm").args(["-rf", "/"]))
            .await;
        assert!(
            matches!(result, Err(CommandError::CommandNotAllowed(_))),
            "rm should be rejected as not in whitelist"
        );
    }

    #[tokio::test]
    async fn test_rejected_command_sh() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor
            .execute(&ToolInvocation::new("sh").args(["-c", "mvn deploy"]))
            .await;
        assert!(
            matches!(result, Err(CommandError::CommandNotAllowed(_))),
            "shells should be rejected"
        );
    }

    #[test]
    fn test_invalid_working_directory() {
        let result = SafeCommandExecutor::new("/nonexistent/directory/that/does/not/exist");
        assert!(
            matches!(result, Err(CommandError::InvalidWorkingDirectory(_))),
            "Should reject non-existent working directory"
        );
    }

    #[tokio::test]
    async fn test_invalid_invocation_cwd() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor
            .execute(&ToolInvocation::new("gpg").cwd("/nonexistent/directory/that/does/not/exist"))
            .await;
        assert!(matches!(
            result,
            Err(CommandError::InvalidWorkingDirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_dry_run_runner_echoes_command() {
        let runner = DryRunRunner;
        let output = runner
            .run(&ToolInvocation::new("mvn").args(["--batch-mode", "deploy:deploy-file"]))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout, "mvn --batch-mode deploy:deploy-file\n");
    }

    #[tokio::test]
    async fn test_dry_run_runner_keeps_whitelist() {
        let runner = DryRunRunner;
        let result = runner.run(&ToolInvocation::new("curl")).await;
        assert!(matches!(result, Err(CommandError::CommandNotAllowed(_))));
    }
}
