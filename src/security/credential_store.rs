//! Short-lived Maven credentials with secret masking
//!
//! The settings file written here only references environment placeholders.
//! Real values are attached to each Maven invocation's environment and are
//! never written to disk.

use crate::core::config::{KeySource, ResolvedConfig};
use crate::core::error::PublishError;
use crate::core::traits::ToolInvocation;
use crate::core::workspace::SETTINGS_FILE;
use aho_corasick::{AhoCorasick, MatchKind};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

/// Server id the GPG plugin reads the passphrase from
pub const PASSPHRASE_SERVER_ID: &str = "gpg.passphrase";

/// Child environment variable holding the repository username
pub const USERNAME_VAR: &str = "BUNDLE_PUBLISHER_USERNAME";

/// Child environment variable holding the repository password
pub const PASSWORD_VAR: &str = "BUNDLE_PUBLISHER_PASSWORD";

/// Child environment variable holding the signing passphrase
pub const PASSPHRASE_VAR: &str = "BUNDLE_PUBLISHER_GPG_PASSPHRASE";

/// Replacement for masked secret values
pub const MASK: &str = "****";

/// Credentials bound to Maven invocations of one run
pub struct CredentialStore {
    settings_path: PathBuf,
    bindings: Vec<(&'static str, SecretString)>,
    masker: Option<AhoCorasick>,
}

impl CredentialStore {
    /// Write `settings.xml` into `work_dir` and collect the env bindings
    pub async fn create(config: &ResolvedConfig, work_dir: &Path) -> Result<Self, PublishError> {
        let credentials = &config.credentials;
        let passphrase = credentials.signing.as_ref().map(|s| &s.passphrase);

        let settings_path = work_dir.join(SETTINGS_FILE);
        tokio::fs::write(
            &settings_path,
            render_settings(&config.server_id, passphrase.is_some()),
        )
        .await?;
        tracing::debug!("Wrote Maven settings to {}", settings_path.display());

        let mut bindings = vec![
            (USERNAME_VAR, copy(&credentials.username)),
            (PASSWORD_VAR, copy(&credentials.password)),
        ];
        if let Some(passphrase) = passphrase {
            bindings.push((PASSPHRASE_VAR, copy(passphrase)));
        }

        // The username is an identifier, not a secret
        let mut secrets: Vec<&str> = bindings
            .iter()
            .filter(|(key, _)| *key != USERNAME_VAR)
            .map(|(_, v)| v.expose_secret())
            .collect();
        if let Some(KeySource::Inline(key)) = credentials.signing.as_ref().map(|s| &s.key) {
            secrets.push(key.expose_secret());
        }
        let masker = build_masker(&secrets)?;

        Ok(Self {
            settings_path,
            bindings,
            masker,
        })
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Attach the credential environment to an invocation
    pub fn bind(&self, invocation: ToolInvocation) -> ToolInvocation {
        self.bindings
            .iter()
            .fold(invocation, |inv, (key, value)| inv.secret_env(*key, value))
    }

    /// Replace every known secret value in `text`
    pub fn mask(&self, text: &str) -> String {
        match &self.masker {
            Some(masker) => {
                let replacements = vec![MASK; masker.patterns_len()];
                masker.replace_all(text, &replacements)
            }
            None => text.to_string(),
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("settings_path", &self.settings_path)
            .field(
                "bindings",
                &self.bindings.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn copy(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().into())
}

fn build_masker(secrets: &[&str]) -> Result<Option<AhoCorasick>, PublishError> {
    let patterns: Vec<&str> = secrets.iter().copied().filter(|s| !s.is_empty()).collect();
    if patterns.is_empty() {
        return Ok(None);
    }

    let masker = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
        .map_err(|e| PublishError::InvalidConfig {
            message: format!("cannot build secret masker: {}", e),
        })?;
    Ok(Some(masker))
}

/// Render the Maven settings file
///
/// Values are `${env.*}` placeholders resolved by Maven at run time.
pub fn render_settings(server_id: &str, with_passphrase: bool) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0"
          xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
          xsi:schemaLocation="http://maven.apache.org/SETTINGS/1.0.0 https://maven.apache.org/xsd/settings-1.0.0.xsd">
  <servers>
"#,
    );

    xml.push_str(&format!(
        "    <server>\n      <id>{}</id>\n      <username>${{env.{}}}</username>\n      <password>${{env.{}}}</password>\n    </server>\n",
        escape_xml(server_id),
        USERNAME_VAR,
        PASSWORD_VAR
    ));

    if with_passphrase {
        xml.push_str(&format!(
            "    <server>\n      <id>{}</id>\n      <passphrase>${{env.{}}}</passphrase>\n    </server>\n",
            PASSPHRASE_SERVER_ID, PASSPHRASE_VAR
        ));
    }

    xml.push_str("  </servers>\n</settings>\n");
    xml
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
