//! Ephemeral GnuPG keyring for one publish run
//!
//! The private key is imported exactly once into a fresh keyring directory.
//! The keyring and its derived key id are then shared read-only with the
//! signer, and the directory is removed when the session is dropped.

use crate::core::config::{KeySource, SigningCredentials};
use crate::core::error::PublishError;
use crate::core::traits::{ToolInvocation, ToolRunner};
use lazy_static::lazy_static;
use regex::Regex;
use secrecy::ExposeSecret;
use semver::Version;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;

/// File name of an inline key written for import
pub const INLINE_KEY_FILE: &str = "signing-key.asc";

lazy_static! {
    static ref GPG_VERSION: Regex =
        Regex::new(r"(?m)^gpg \(GnuPG[^)]*\) (\d+)\.(\d+)(?:\.(\d+))?").unwrap();
}

/// Parse the GnuPG version from `gpg --version` output
pub fn parse_gpg_version(output: &str) -> Option<Version> {
    let caps = GPG_VERSION.captures(output)?;
    let part = |i: usize| -> Option<u64> {
        caps.get(i)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(0))
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// What the installed signing backend needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningCapabilities {
    /// Passphrases can only be supplied through loopback pinentry
    pub loopback_pinentry: bool,
}

impl SigningCapabilities {
    /// Resolve capabilities once per run
    ///
    /// An explicit override wins. Otherwise `gpg --version` is probed;
    /// GnuPG 2.1 and later require loopback pinentry for batch signing.
    pub async fn resolve(
        override_loopback: Option<bool>,
        runner: &dyn ToolRunner,
    ) -> SigningCapabilities {
        if let Some(loopback_pinentry) = override_loopback {
            return SigningCapabilities { loopback_pinentry };
        }

        let probe = runner
            .run(&ToolInvocation::new("gpg").arg("--version"))
            .await;
        let version = match probe {
            Ok(output) if output.success() => parse_gpg_version(&output.stdout),
            Ok(output) => {
                tracing::warn!("gpg --version failed with {}", output.status_text());
                None
            }
            Err(e) => {
                tracing::warn!("Could not probe gpg version: {}", e);
                None
            }
        };

        let loopback_pinentry = version
            .as_ref()
            .map(|v| *v >= Version::new(2, 1, 0))
            .unwrap_or(false);
        tracing::debug!(
            "gpg version {:?}, loopback pinentry: {}",
            version.map(|v| v.to_string()),
            loopback_pinentry
        );

        SigningCapabilities { loopback_pinentry }
    }
}

/// Fingerprint of the imported primary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyId(String);

impl KeyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the fingerprint of the single primary key from `--with-colons` output
///
/// Only the `fpr` record that directly follows a `pub` record counts;
/// subkey fingerprints are ignored.
pub fn parse_primary_fingerprint(colons: &str) -> Result<KeyId, PublishError> {
    let mut primaries = 0usize;
    let mut fingerprint = None;
    let mut after_primary = false;

    for line in colons.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields[0] {
            "pub" => {
                primaries += 1;
                after_primary = true;
            }
            "fpr" if after_primary => {
                if let Some(fpr) = fields.get(9).filter(|f| !f.is_empty()) {
                    fingerprint = Some(fpr.to_string());
                }
                after_primary = false;
            }
            _ => after_primary = false,
        }
    }

    match (primaries, fingerprint) {
        (0, _) => Err(PublishError::ImportFailed {
            message: "no primary key found in the keyring".to_string(),
        }),
        (1, Some(fpr)) => Ok(KeyId(fpr)),
        (1, None) => Err(PublishError::ImportFailed {
            message: "primary key has no fingerprint".to_string(),
        }),
        (n, _) => Err(PublishError::ImportFailed {
            message: format!("expected exactly one primary key, found {}", n),
        }),
    }
}

/// Keyring directory holding exactly one imported key
#[derive(Debug)]
pub struct Keyring {
    dir: TempDir,
    key_id: KeyId,
}

impl Keyring {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }
}

/// Keyring plus the capabilities it was prepared for
#[derive(Debug)]
pub struct SigningSession {
    pub keyring: Keyring,
    pub capabilities: SigningCapabilities,
}

/// Imports the signing key into an ephemeral keyring
pub struct KeyImporter<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> KeyImporter<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    /// Import the key and derive its id
    ///
    /// Inline key text is written to a `0600` file in `work_dir` and removed
    /// after the import, whatever its result.
    pub async fn import(
        &self,
        signing: &SigningCredentials,
        capabilities: SigningCapabilities,
        work_dir: &Path,
    ) -> Result<SigningSession, PublishError> {
        let dir = tempfile::Builder::new()
            .prefix("bundle-publisher-keyring-")
            .tempdir()?;
        restrict(dir.path(), 0o700)?;

        if capabilities.loopback_pinentry {
            tokio::fs::write(dir.path().join("gpg.conf"), "pinentry-mode loopback\n").await?;
            tokio::fs::write(
                dir.path().join("gpg-agent.conf"),
                "allow-loopback-pinentry\n",
            )
            .await?;
        }

        let (key_file, temporary) = match &signing.key {
            KeySource::Inline(key) => {
                let path = work_dir.join(INLINE_KEY_FILE);
                write_private(&path, key.expose_secret())?;
                (path, true)
            }
            KeySource::File(path) => {
                let path = std::path::absolute(path)?;
                if !path.is_file() {
                    return Err(PublishError::ImportFailed {
                        message: format!("key file not found: {}", path.display()),
                    });
                }
                (path, false)
            }
        };

        let imported = self
            .run_import(dir.path(), &key_file, capabilities, work_dir)
            .await;
        if temporary {
            if let Err(e) = std::fs::remove_file(&key_file) {
                tracing::warn!("Could not remove {}: {}", key_file.display(), e);
            }
        }
        imported?;

        let listing = self
            .runner
            .run(
                &ToolInvocation::new("gpg")
                    .args(["--batch", "--homedir"])
                    .arg(dir.path().display().to_string())
                    .args(["--with-colons", "--list-keys"])
                    .cwd(work_dir),
            )
            .await?;
        if !listing.success() {
            return Err(PublishError::ImportFailed {
                message: format!("listing the keyring failed with {}", listing.status_text()),
            });
        }

        let key_id = parse_primary_fingerprint(&listing.stdout)?;
        tracing::debug!("Imported key {} into {}", key_id, dir.path().display());

        Ok(SigningSession {
            keyring: Keyring { dir, key_id },
            capabilities,
        })
    }

    async fn run_import(
        &self,
        homedir: &Path,
        key_file: &Path,
        capabilities: SigningCapabilities,
        work_dir: &Path,
    ) -> Result<(), PublishError> {
        let mut invocation = ToolInvocation::new("gpg").arg("--batch");
        if capabilities.loopback_pinentry {
            invocation = invocation.args(["--pinentry-mode", "loopback"]);
        }
        let invocation = invocation
            .arg("--homedir")
            .arg(homedir.display().to_string())
            .arg("--import")
            .arg(key_file.display().to_string())
            .cwd(work_dir);

        let output = self.runner.run(&invocation).await?;
        if output.success() {
            Ok(())
        } else {
            Err(PublishError::ImportFailed {
                message: format!(
                    "gpg --import failed with {}: {}",
                    output.status_text(),
                    output.stderr.trim()
                ),
            })
        }
    }
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}
