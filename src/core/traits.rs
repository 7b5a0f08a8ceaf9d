//! Core traits and types for bundle publishing
//!
//! This module defines the seams of the publishing workflow: running an
//! external tool, and deploying bundles to a target repository.

use crate::core::bundle::ArtifactBundle;
use crate::core::context::PublishContext;
use crate::core::error::PublishError;
use crate::core::state_machine::ReleaseState;
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Tool Invocation
// ============================================================================

/// A single external tool call
///
/// Arguments are kept as a vector and never joined into a shell string.
/// Environment values are secrets and only exposed when the process is spawned.
#[derive(Debug)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, SecretString)>,
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a `-Dname=value` Maven property.
    pub fn property(self, name: &str, value: impl AsRef<str>) -> Self {
        self.arg(format!("-D{}={}", name, value.as_ref()))
    }

    /// Set a secret environment variable for the child process.
    pub fn secret_env(mut self, key: impl Into<String>, value: &SecretString) -> Self {
        self.env
            .push((key.into(), SecretString::new(value.expose_secret().into())));
        self
    }

    /// Set a plain environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        self.env.push((key.into(), SecretString::from(value)));
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Printable command line (environment values are never included)
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value of a `-Dname=value` property, if present
    pub fn property_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("-D{}=", name);
        self.args.iter().find_map(|a| a.strip_prefix(&prefix))
    }
}

/// Captured result of a tool call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code (`None` if the process was killed by a signal)
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr, as written to captured logs
    ///
    /// The streams never share a line.
    pub fn combined(&self) -> String {
        if self.stdout.is_empty() || self.stdout.ends_with('\n') {
            format!("{}{}", self.stdout, self.stderr)
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Short description of the exit status for error messages
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external tools
///
/// The production implementation is `SafeCommandExecutor`; dry runs wrap it in
/// `DryRunRunner`.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, CommandError>;
}

// ============================================================================
// Deploy Targets
// ============================================================================

/// Result of a deploy or release step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "camelCase")]
pub enum ReleaseOutcome {
    Success,
    /// The remote already holds this version; treated as success
    AlreadyPublished,
    Fatal(String),
}

/// Outcome recorded for one bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleOutcome {
    pub bundle: String,
    pub outcome: ReleaseOutcome,
}

/// Result of publishing to a target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub bundles: Vec<BundleOutcome>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_repository_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<ReleaseState>,
    /// Time from the first to the last release transition, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_duration: Option<u64>,
}

/// A repository the bundles can be published to
#[async_trait]
pub trait DeployTarget: Send + Sync {
    /// Target name (e.g., "central", "direct")
    fn name(&self) -> &str;

    /// Publish every bundle
    ///
    /// Returns `Err` for fatal outcomes. Idempotent skips are reported as
    /// `ReleaseOutcome::AlreadyPublished` with a warning.
    async fn publish(
        &self,
        ctx: &PublishContext,
        bundles: &[ArtifactBundle],
    ) -> Result<TargetReport, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = ToolInvocation::new("mvn")
            .arg("--batch-mode")
            .args(["deploy:deploy-file"])
            .property("url", "https://repo.example.com")
            .cwd("/tmp");

        assert_eq!(
            invocation.command_line(),
            "mvn --batch-mode deploy:deploy-file -Durl=https://repo.example.com"
        );
        assert_eq!(
            invocation.property_value("url"),
            Some("https://repo.example.com")
        );
        assert_eq!(invocation.property_value("file"), None);
        assert_eq!(invocation.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_command_line_excludes_secret_env() {
        let secret = SecretString::new("very-secret-value".into());
        let invocation = ToolInvocation::new("mvn").secret_env("PASSWORD", &secret);

        assert!(!invocation.command_line().contains("very-secret-value"));
        assert!(!format!("{:?}", invocation).contains("very-secret-value"));
        assert_eq!(invocation.env[0].1.expose_secret(), "very-secret-value");
    }

    #[test]
    fn test_tool_output_helpers() {
        let output = ToolOutput {
            status: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err\n".to_string(),
        };

        assert!(!output.success());
        assert_eq!(output.combined(), "out\nerr\n");
        assert_eq!(output.status_text(), "exit code 1");

        let killed = ToolOutput::default();
        assert_eq!(killed.status_text(), "terminated by signal");
    }

    #[test]
    fn test_combined_keeps_streams_on_separate_lines() {
        let output = ToolOutput {
            status: Some(1),
            stdout: "[ERROR] last stdout line".to_string(),
            stderr: "first stderr line\n".to_string(),
        };
        assert_eq!(
            output.combined(),
            "[ERROR] last stdout line\nfirst stderr line\n"
        );

        let stderr_only = ToolOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(stderr_only.combined(), "err\n");
    }

    #[test]
    fn test_release_outcome_serialization() {
        let json = serde_json::to_string(&ReleaseOutcome::AlreadyPublished).unwrap();
        assert_eq!(json, r#"{"outcome":"alreadyPublished"}"#);

        let json = serde_json::to_string(&ReleaseOutcome::Fatal("boom".to_string())).unwrap();
        assert_eq!(json, r#"{"outcome":"fatal","reason":"boom"}"#);
    }
}
