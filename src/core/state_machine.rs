//! State machine for the central release protocol
//!
//! Tracks `Idle → Deploying → Closed → Releasing → {Done, AlreadyPublished, Failed}`
//! and records every transition in the work directory with atomic writes.

use crate::core::error::PublishError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// State file name
pub const STATE_FILE: &str = "release-state.json";

/// Release protocol state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseState {
    Idle,
    Deploying,
    Closed,
    Releasing,
    Done,
    AlreadyPublished,
    Failed,
}

impl ReleaseState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReleaseState::Done | ReleaseState::AlreadyPublished | ReleaseState::Failed
        )
    }

    /// Check whether `next` may follow this state
    pub fn can_transition_to(&self, next: ReleaseState) -> bool {
        use ReleaseState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Deploying)
            | (Deploying, Closed)
            | (Closed, Releasing)
            | (Releasing, Done)
            | (Releasing, AlreadyPublished) => true,
            _ => false,
        }
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: ReleaseState,

    /// To state
    pub to: ReleaseState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Release state data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseStateData {
    /// Current state
    #[serde(rename = "currentState")]
    pub current_state: ReleaseState,

    /// Staging repository id, once extracted
    #[serde(
        rename = "stagingRepositoryId",
        skip_serializing_if = "Option::is_none"
    )]
    pub staging_repository_id: Option<String>,

    /// State transition history
    pub transitions: Vec<StateTransition>,

    /// Last error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// State machine for the central release protocol
pub struct ReleaseStateMachine {
    current_state: ReleaseState,
    transitions: Vec<StateTransition>,
    state_file_path: PathBuf,
    staging_repository_id: Option<String>,
    error: Option<String>,
}

impl ReleaseStateMachine {
    /// Create a new state machine persisting into `work_dir`
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Self {
        Self {
            current_state: ReleaseState::Idle,
            transitions: Vec::new(),
            state_file_path: work_dir.as_ref().join(STATE_FILE),
            staging_repository_id: None,
            error: None,
        }
    }

    /// Transition to a new state
    ///
    /// Recognised metadata keys: `stagingRepositoryId`, `error`.
    pub async fn transition(
        &mut self,
        to: ReleaseState,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<(), PublishError> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::InvalidTransition {
                from: format!("{:?}", self.current_state),
                to: format!("{:?}", to),
            });
        }

        tracing::debug!("Release state {:?} -> {:?}", self.current_state, to);

        if let Some(meta) = &metadata {
            if let Some(serde_json::Value::String(id)) = meta.get("stagingRepositoryId") {
                self.staging_repository_id = Some(id.clone());
            }
            if let Some(serde_json::Value::String(error)) = meta.get("error") {
                self.error = Some(error.clone());
            }
        }

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            metadata,
        });
        self.current_state = to;

        self.save().await
    }

    /// Transition to `Failed`, recording the reason
    pub async fn fail(&mut self, reason: &str) -> Result<(), PublishError> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "error".to_string(),
            serde_json::Value::String(reason.to_string()),
        );
        self.transition(ReleaseState::Failed, Some(metadata)).await
    }

    /// Get current state
    pub fn get_state(&self) -> ReleaseState {
        self.current_state
    }

    /// Get state data
    pub fn get_state_data(&self) -> ReleaseStateData {
        ReleaseStateData {
            current_state: self.current_state,
            staging_repository_id: self.staging_repository_id.clone(),
            transitions: self.transitions.clone(),
            error: self.error.clone(),
        }
    }

    /// Save state to file (atomic operation)
    async fn save(&self) -> Result<(), PublishError> {
        let data = self.get_state_data();

        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        // Atomic write: write to temp file, then rename
        let temp_file = self.state_file_path.with_extension("json.tmp");
        fs::write(&temp_file, json).await?;
        fs::rename(&temp_file, &self.state_file_path).await?;

        Ok(())
    }

    /// Get elapsed time since the first transition, in milliseconds
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let meta = if let Some(metadata) = &t.metadata {
                    format!(" ({})", serde_json::to_string(metadata).unwrap_or_default())
                } else {
                    String::new()
                };
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, meta)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
