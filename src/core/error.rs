//! Error handling for bundle publishing
//!
//! This module provides the error taxonomy of a publish run with recovery
//! guidance, using the thiserror crate for ergonomic error handling.

use crate::security::command_executor::CommandError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("{setting} is required {reason}")]
    MissingSetting { setting: String, reason: String },

    #[error("Conflicting settings: {message}")]
    ConflictingSettings { message: String },

    #[error("Signing is only supported for the central repository (server id: {server_id})")]
    SigningNotSupported { server_id: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Bundle root does not exist: {}", path.display())]
    BundleRootMissing { path: PathBuf },

    #[error("No bundles found under {}", root.display())]
    NoBundles { root: PathBuf },

    #[error("Incomplete bundle {}: missing {missing}", descriptor.display())]
    IncompleteBundle { descriptor: PathBuf, missing: String },

    // Key import errors
    #[error("Failed to import signing key: {message}")]
    ImportFailed { message: String },

    // Signing errors
    #[error("Failed to sign bundle {bundle}: {message}")]
    SigningFailed { bundle: String, message: String },

    // Protocol errors
    #[error("Could not find {marker} in {}", log.display())]
    ProtocolExtraction { marker: String, log: PathBuf },

    #[error("Invalid release state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // Remote errors
    #[error("{step} failed: {message}")]
    RemoteFatal { step: String, message: String },

    // Command execution errors
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Check if this error belongs to the configuration family
    ///
    /// Configuration errors are always raised before any subprocess runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingSetting { .. }
                | Self::ConflictingSettings { .. }
                | Self::SigningNotSupported { .. }
                | Self::InvalidConfig { .. }
                | Self::BundleRootMissing { .. }
                | Self::NoBundles { .. }
                | Self::IncompleteBundle { .. }
        )
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::MissingSetting { .. } => vec![
                "Set the missing PUBLISH_* environment variable",
                "Or add the value to .publish-config.yaml",
            ],
            Self::ConflictingSettings { .. } => {
                vec!["Provide either PUBLISH_SIGNING_KEY or PUBLISH_SIGNING_KEY_FILE, not both"]
            }
            Self::SigningNotSupported { .. } => vec![
                "Unset PUBLISH_SIGNING_KEY and PUBLISH_SIGNING_KEY_FILE",
                "Or publish to the central repository instead",
            ],
            Self::InvalidConfig { .. } => vec!["Check the configuration file syntax"],
            Self::BundleRootMissing { .. } | Self::NoBundles { .. } => vec![
                "Check the bundle root argument",
                "Build the distribution before publishing",
            ],
            Self::IncompleteBundle { .. } => vec![
                "Every .pom needs a .jar, -sources.jar and -javadoc.jar next to it",
            ],
            Self::ImportFailed { .. } => vec![
                "Check that the key is an ASCII-armored private key",
                "Check that gpg is installed",
            ],
            Self::SigningFailed { .. } => vec![
                "Check the signing passphrase",
                "Inspect the Maven output above",
            ],
            Self::ProtocolExtraction { .. } => vec![
                "Inspect the captured log file",
                "The staging repository may need to be dropped manually in Nexus",
            ],
            Self::InvalidTransition { .. } => vec!["This is a bug, please report it"],
            Self::RemoteFatal { .. } => vec![
                "Inspect the captured log file",
                "Check the repository credentials",
                "Check the repository status",
            ],
            Self::Command(_) => vec![
                "Check that mvn and gpg are installed and on PATH",
                "Increase PUBLISH_COMMAND_TIMEOUT_SECS if the command timed out",
            ],
            Self::Io(_) => vec!["Check file permissions and free disk space"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSetting { .. } => "MISSING_SETTING",
            Self::ConflictingSettings { .. } => "CONFLICTING_SETTINGS",
            Self::SigningNotSupported { .. } => "SIGNING_NOT_SUPPORTED",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::BundleRootMissing { .. } => "BUNDLE_ROOT_MISSING",
            Self::NoBundles { .. } => "NO_BUNDLES",
            Self::IncompleteBundle { .. } => "INCOMPLETE_BUNDLE",
            Self::ImportFailed { .. } => "IMPORT_FAILED",
            Self::SigningFailed { .. } => "SIGNING_FAILED",
            Self::ProtocolExtraction { .. } => "PROTOCOL_EXTRACTION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::RemoteFatal { .. } => "REMOTE_FATAL",
            Self::Command(_) => "COMMAND_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            return 2;
        }
        match self {
            Self::ImportFailed { .. } => 3,
            Self::SigningFailed { .. } => 4,
            Self::ProtocolExtraction { .. } => 5,
            Self::RemoteFatal { .. } => 6,
            _ => 1,
        }
    }
}
