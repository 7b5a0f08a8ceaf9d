//! Shared, read-only state of one publish run

use crate::core::config::ResolvedConfig;
use crate::core::error::PublishError;
use crate::core::traits::{ToolInvocation, ToolOutput, ToolRunner};
use crate::core::workspace::Workspace;
use crate::security::credential_store::CredentialStore;
use crate::security::key_importer::SigningSession;
use std::path::PathBuf;
use std::sync::Arc;

/// Mode, credentials and directories of one invocation
///
/// Built once after configuration is resolved and passed by reference to
/// every signing and deploy component.
pub struct PublishContext {
    pub config: ResolvedConfig,
    pub workspace: Workspace,
    pub credentials: CredentialStore,
    pub signing: Option<SigningSession>,
    /// Runner for Maven calls (echoes instead of executing in dry-run mode)
    pub maven: Arc<dyn ToolRunner>,
}

impl PublishContext {
    /// Start a Maven invocation bound to this run's settings and credentials
    pub fn maven_invocation(&self, goal: &str) -> ToolInvocation {
        let invocation = ToolInvocation::new("mvn")
            .args(["--batch-mode", "--no-transfer-progress", "--settings"])
            .arg(self.credentials.settings_path().display().to_string())
            .arg(goal)
            .cwd(self.workspace.work_dir());

        self.credentials.bind(invocation)
    }

    /// Mask every configured secret in `text`
    pub fn mask(&self, text: &str) -> String {
        self.credentials.mask(text)
    }

    /// Append a call and its masked output to a log in the work directory
    pub async fn capture(
        &self,
        log: &str,
        invocation: &ToolInvocation,
        output: &ToolOutput,
    ) -> Result<PathBuf, PublishError> {
        let entry = format!(
            "$ {}\n{}\n[{}]\n",
            invocation.command_line(),
            self.mask(&output.combined()),
            output.status_text()
        );
        let path = self.workspace.append_log(log, &entry).await?;
        tracing::debug!("Captured {} output in {}", invocation.program, path.display());
        Ok(path)
    }
}

impl std::fmt::Debug for PublishContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishContext")
            .field("config", &self.config)
            .field("workspace", &self.workspace)
            .field("credentials", &self.credentials)
            .field("signing", &self.signing)
            .finish_non_exhaustive()
    }
}
