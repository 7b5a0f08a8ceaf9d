//! Run report written to the work directory
//!
//! The report is a post-mortem aid, not a stable machine-readable contract.

use crate::core::error::PublishError;
use crate::core::state_machine::ReleaseState;
use crate::core::traits::{BundleOutcome, TargetReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Summary of one publish run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub run_id: String,
    pub success: bool,
    pub mode: String,
    pub target: String,
    pub server_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub bundles: Vec<BundleOutcome>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_repository_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<ReleaseState>,
    /// Release protocol duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration: u64,
}

impl PublishReport {
    /// Start a report for a new run
    pub fn start(mode: String, target: &str, server_id: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id: format!("{}-{}", now.timestamp_millis(), uuid::Uuid::new_v4()),
            success: false,
            mode,
            target: target.to_string(),
            server_id: server_id.to_string(),
            key_id: None,
            bundles: Vec::new(),
            warnings: Vec::new(),
            staging_repository_id: None,
            final_state: None,
            release_duration: None,
            error: None,
            started_at: now,
            finished_at: now,
            duration: 0,
        }
    }

    /// Record the target's result and stop the clock
    pub fn finish(&mut self, result: Result<&TargetReport, String>) {
        match result {
            Ok(target) => {
                self.success = true;
                self.bundles = target.bundles.clone();
                self.warnings = target.warnings.clone();
                self.staging_repository_id = target.staging_repository_id.clone();
                self.final_state = target.final_state;
                self.release_duration = target.release_duration;
            }
            Err(error) => {
                self.success = false;
                self.error = Some(error);
            }
        }

        self.finished_at = Utc::now();
        self.duration = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
    }

    /// Write the report as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<(), PublishError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json).await?;
        Ok(())
    }
}
