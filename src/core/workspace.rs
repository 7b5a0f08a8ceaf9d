//! Ephemeral directories of one publish run
//!
//! The staging area holds signed artifacts waiting for upload. The work
//! directory holds the settings file, captured subprocess logs, the release
//! state history and the run report. Both are fresh per invocation and are
//! removed on drop unless the work directory is explicitly kept.

use crate::core::error::PublishError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Maven settings file name
pub const SETTINGS_FILE: &str = "settings.xml";

/// Captured output of signing calls
pub const SIGN_LOG: &str = "sign.log";

/// Captured output of deploy calls
pub const DEPLOY_LOG: &str = "deploy.log";

/// Captured output of the release call
pub const RELEASE_LOG: &str = "release.log";

/// Run report file name
pub const REPORT_FILE: &str = "publish-report.json";

/// Staging area and work directory of one run
#[derive(Debug)]
pub struct Workspace {
    staging: TempDir,
    work: TempDir,
}

impl Workspace {
    /// Create fresh staging and work directories
    pub fn create() -> Result<Self, PublishError> {
        let staging = tempfile::Builder::new()
            .prefix("bundle-publisher-staging-")
            .tempdir()?;
        let work = tempfile::Builder::new()
            .prefix("bundle-publisher-work-")
            .tempdir()?;

        tracing::debug!(
            "Staging area {}, work directory {}",
            staging.path().display(),
            work.path().display()
        );

        Ok(Self { staging, work })
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub fn work_dir(&self) -> &Path {
        self.work.path()
    }

    /// `file://` URL of the staging area
    pub fn staging_url(&self) -> String {
        format!("file://{}", self.staging.path().display())
    }

    /// Path of a file in the work directory
    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work.path().join(name)
    }

    /// Append to a captured log
    pub async fn append_log(&self, name: &str, content: &str) -> Result<PathBuf, PublishError> {
        let path = self.work_file(name);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }

    /// Tear down the workspace
    ///
    /// The staging area is always removed. The work directory is kept and its
    /// path returned when `keep_work_dir` is set.
    pub fn finish(self, keep_work_dir: bool) -> Option<PathBuf> {
        drop(self.staging);
        if keep_work_dir {
            Some(self.work.keep())
        } else {
            None
        }
    }
}
