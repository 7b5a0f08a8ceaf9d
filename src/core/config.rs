//! Configuration structures and types for bundle-publisher
//!
//! `PublishSettings` is the raw, layered input (YAML file, environment, CLI).
//! `ResolvedConfig` is the validated, immutable result that every component
//! receives by reference.

use crate::core::error::PublishError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Server identifier of the central moderated repository
pub const CENTRAL_SERVER_ID: &str = "ossrh";

/// Default Nexus base URL for the central repository
pub const DEFAULT_NEXUS_URL: &str = "https://s01.oss.sonatype.org/";

/// Default bundle root, relative to the working directory
pub const DEFAULT_BUNDLE_ROOT: &str = "java-dist";

/// Raw publish settings, before validation
///
/// Every field is optional here; `ConfigLoader::resolve` decides which ones
/// the selected mode needs.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishSettings {
    /// Server identifier (default: central)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Repository username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Repository password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Nexus staging profile (central only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_profile_id: Option<String>,

    /// Target repository URL (direct only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,

    /// Inline ASCII-armored private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,

    /// Path to a private key file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key_file: Option<PathBuf>,

    /// Passphrase of the signing key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_passphrase: Option<String>,

    /// Dry-run mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    /// Nexus base URL (central only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nexus_url: Option<String>,

    /// Force or disable loopback pinentry instead of probing gpg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpg_loopback: Option<bool>,

    /// Timeout applied to every subprocess
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

impl fmt::Debug for PublishSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redacted(value: &Option<String>) -> Option<&'static str> {
            value.as_ref().map(|_| "[REDACTED]")
        }

        f.debug_struct("PublishSettings")
            .field("server_id", &self.server_id)
            .field("username", &redacted(&self.username))
            .field("password", &redacted(&self.password))
            .field("staging_profile_id", &self.staging_profile_id)
            .field("repository_url", &self.repository_url)
            .field("signing_key", &redacted(&self.signing_key))
            .field("signing_key_file", &self.signing_key_file)
            .field("signing_passphrase", &redacted(&self.signing_passphrase))
            .field("dry_run", &self.dry_run)
            .field("nexus_url", &self.nexus_url)
            .field("gpg_loopback", &self.gpg_loopback)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish()
    }
}

/// Deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Central moderated repository (deploy, close, release)
    Central,
    /// Arbitrary repository (single deploy per bundle)
    Direct,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Central => "central",
            Target::Direct => "direct",
        }
    }
}

/// Operating mode of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishMode {
    target: Target,
    signed: bool,
    dry_run: bool,
}

impl PublishMode {
    /// Create a mode, rejecting signed direct deployments
    pub fn new(target: Target, signed: bool, dry_run: bool) -> Result<Self, PublishError> {
        if signed && target == Target::Direct {
            return Err(PublishError::SigningNotSupported {
                server_id: "non-central target".to_string(),
            });
        }

        Ok(Self {
            target,
            signed,
            dry_run,
        })
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn is_central(&self) -> bool {
        self.target == Target::Central
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.target.as_str(),
            if self.signed { "signed" } else { "unsigned" },
            if self.dry_run { "dry-run" } else { "live" }
        )
    }
}

/// Where the signing key comes from
#[derive(Debug)]
pub enum KeySource {
    /// ASCII-armored key text
    Inline(SecretString),
    /// Path to an existing key file
    File(PathBuf),
}

/// Signing material for signed runs
#[derive(Debug)]
pub struct SigningCredentials {
    pub key: KeySource,
    pub passphrase: SecretString,
}

/// Target-specific coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCredentials {
    Central {
        staging_profile_id: String,
        nexus_url: String,
    },
    Direct {
        repository_url: String,
    },
}

/// Credentials of one invocation, read-only after resolution
#[derive(Debug)]
pub struct Credentials {
    pub username: SecretString,
    pub password: SecretString,
    pub target: TargetCredentials,
    pub signing: Option<SigningCredentials>,
}

/// Validated configuration shared by all components
#[derive(Debug)]
pub struct ResolvedConfig {
    pub mode: PublishMode,
    pub server_id: String,
    pub credentials: Credentials,
    pub bundle_root: PathBuf,
    pub gpg_loopback: Option<bool>,
    pub command_timeout: Option<Duration>,
    pub keep_work_dir: bool,
}
