//! Configuration loader and resolver for bundle-publisher
//!
//! Loading merges the configuration sources into one `PublishSettings`.
//! Resolving validates the settings for the selected mode and produces the
//! immutable `ResolvedConfig`.

use super::config::*;
use crate::core::error::PublishError;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".publish-config.yaml";

pub const ENV_SERVER_ID: &str = "PUBLISH_SERVER_ID";
pub const ENV_USERNAME: &str = "PUBLISH_USERNAME";
pub const ENV_PASSWORD: &str = "PUBLISH_PASSWORD";
pub const ENV_STAGING_PROFILE_ID: &str = "PUBLISH_STAGING_PROFILE_ID";
pub const ENV_REPOSITORY_URL: &str = "PUBLISH_REPOSITORY_URL";
pub const ENV_SIGNING_KEY: &str = "PUBLISH_SIGNING_KEY";
pub const ENV_SIGNING_KEY_FILE: &str = "PUBLISH_SIGNING_KEY_FILE";
pub const ENV_SIGNING_PASSPHRASE: &str = "PUBLISH_SIGNING_PASSPHRASE";
pub const ENV_DRY_RUN: &str = "PUBLISH_DRY_RUN";
pub const ENV_NEXUS_URL: &str = "PUBLISH_NEXUS_URL";
pub const ENV_GPG_LOOPBACK: &str = "PUBLISH_GPG_LOOPBACK";
pub const ENV_COMMAND_TIMEOUT: &str = "PUBLISH_COMMAND_TIMEOUT_SECS";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Directory searched for `.publish-config.yaml`
    pub project_path: PathBuf,

    /// Explicit configuration file (overrides the project file)
    pub config_file: Option<PathBuf>,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// CLI overrides (highest priority)
    pub cli_args: Option<PublishSettings>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Configuration file (--config or ./.publish-config.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishSettings, PublishError> {
        let mut settings = PublishSettings::default();

        let file_settings = match &options.config_file {
            Some(path) => {
                let loaded = Self::load_config_file(path).await?;
                if loaded.is_none() {
                    return Err(PublishError::InvalidConfig {
                        message: format!("configuration file not found: {}", path.display()),
                    });
                }
                loaded
            }
            None => Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?,
        };

        if let Some(file_settings) = file_settings {
            Self::merge_into(&mut settings, file_settings);
        }

        if let Some(env_settings) = Self::load_env_config(&options.env)? {
            Self::merge_into(&mut settings, env_settings);
        }

        if let Some(cli_settings) = options.cli_args {
            Self::merge_into(&mut settings, cli_settings);
        }

        Ok(settings)
    }

    /// Load settings from a YAML file, if it exists
    async fn load_config_file(file_path: &Path) -> Result<Option<PublishSettings>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PublishError::InvalidConfig {
                message: format!("failed to read {}: {}", file_path.display(), e),
            }
        })?;

        let settings: PublishSettings =
            serde_yaml::from_str(&content).map_err(|e| PublishError::InvalidConfig {
                message: format!("failed to parse {}: {}", file_path.display(), e),
            })?;

        tracing::debug!("Loaded settings from {}", file_path.display());
        Ok(Some(settings))
    }

    /// Load settings from environment variables
    ///
    /// Empty values are treated as unset.
    fn load_env_config(
        env: &HashMap<String, String>,
    ) -> Result<Option<PublishSettings>, PublishError> {
        let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        let dry_run = get(ENV_DRY_RUN)
            .map(|v| parse_flag(ENV_DRY_RUN, &v))
            .transpose()?;
        let gpg_loopback = get(ENV_GPG_LOOPBACK)
            .map(|v| parse_flag(ENV_GPG_LOOPBACK, &v))
            .transpose()?;
        let command_timeout_secs = get(ENV_COMMAND_TIMEOUT)
            .map(|v| {
                v.trim().parse::<u64>().map_err(|_| PublishError::InvalidConfig {
                    message: format!("{} must be a number of seconds, got '{}'", ENV_COMMAND_TIMEOUT, v),
                })
            })
            .transpose()?;

        let settings = PublishSettings {
            server_id: get(ENV_SERVER_ID),
            username: get(ENV_USERNAME),
            password: get(ENV_PASSWORD),
            staging_profile_id: get(ENV_STAGING_PROFILE_ID),
            repository_url: get(ENV_REPOSITORY_URL),
            signing_key: get(ENV_SIGNING_KEY),
            signing_key_file: get(ENV_SIGNING_KEY_FILE).map(PathBuf::from),
            signing_passphrase: get(ENV_SIGNING_PASSPHRASE),
            dry_run,
            nexus_url: get(ENV_NEXUS_URL),
            gpg_loopback,
            command_timeout_secs,
        };

        if settings == PublishSettings::default() {
            Ok(None)
        } else {
            Ok(Some(settings))
        }
    }

    /// Merge source settings into target (source wins)
    fn merge_into(target: &mut PublishSettings, source: PublishSettings) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(
                    if source.$field.is_some() {
                        target.$field = source.$field;
                    }
                )*
            };
        }

        take!(
            server_id,
            username,
            password,
            staging_profile_id,
            repository_url,
            signing_key,
            signing_key_file,
            signing_passphrase,
            dry_run,
            nexus_url,
            gpg_loopback,
            command_timeout_secs
        );
    }

    /// Resolve the publish mode and validate required credentials
    ///
    /// Checks run in a fixed order and stop at the first unmet requirement:
    /// 1. username and password
    /// 2. staging profile (central) or server id and repository URL (direct)
    /// 3. signing on a non-central target
    /// 4. passphrase and exactly one key source (signed or central)
    pub fn resolve(
        settings: &PublishSettings,
        bundle_root: PathBuf,
        keep_work_dir: bool,
    ) -> Result<ResolvedConfig, PublishError> {
        let server_id = present(&settings.server_id)
            .unwrap_or(CENTRAL_SERVER_ID)
            .to_string();
        let is_central = server_id == CENTRAL_SERVER_ID;

        let inline_key = present(&settings.signing_key);
        let key_file = settings
            .signing_key_file
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());
        let is_signed = inline_key.is_some() || key_file.is_some();

        let username = require(&settings.username, ENV_USERNAME, "for every target")?;
        let password = require(&settings.password, ENV_PASSWORD, "for every target")?;

        let target = if is_central {
            let staging_profile_id = require(
                &settings.staging_profile_id,
                ENV_STAGING_PROFILE_ID,
                "for the central repository",
            )?;
            TargetCredentials::Central {
                staging_profile_id: staging_profile_id.to_string(),
                nexus_url: present(&settings.nexus_url)
                    .unwrap_or(DEFAULT_NEXUS_URL)
                    .to_string(),
            }
        } else {
            require(
                &settings.server_id,
                ENV_SERVER_ID,
                "for a non-central repository",
            )?;
            let repository_url = require(
                &settings.repository_url,
                ENV_REPOSITORY_URL,
                "for a non-central repository",
            )?;
            TargetCredentials::Direct {
                repository_url: repository_url.to_string(),
            }
        };

        if is_signed && !is_central {
            return Err(PublishError::SigningNotSupported { server_id });
        }

        let signing = if is_signed || is_central {
            let passphrase = require(
                &settings.signing_passphrase,
                ENV_SIGNING_PASSPHRASE,
                "when signing",
            )?;
            let key = match (inline_key, key_file) {
                (Some(_), Some(_)) => {
                    return Err(PublishError::ConflictingSettings {
                        message: format!(
                            "{} and {} are mutually exclusive",
                            ENV_SIGNING_KEY, ENV_SIGNING_KEY_FILE
                        ),
                    });
                }
                (Some(inline), None) => KeySource::Inline(secret(inline)),
                (None, Some(path)) => {
                    KeySource::File(absolute_path(path, ENV_SIGNING_KEY_FILE)?)
                }
                (None, None) => {
                    return Err(PublishError::MissingSetting {
                        setting: format!("{} or {}", ENV_SIGNING_KEY, ENV_SIGNING_KEY_FILE),
                        reason: "when signing".to_string(),
                    });
                }
            };
            Some(SigningCredentials {
                key,
                passphrase: secret(passphrase),
            })
        } else {
            None
        };

        let target_kind = if is_central {
            Target::Central
        } else {
            Target::Direct
        };
        let mode = PublishMode::new(
            target_kind,
            signing.is_some(),
            settings.dry_run.unwrap_or(false),
        )?;

        Ok(ResolvedConfig {
            mode,
            server_id,
            credentials: Credentials {
                username: secret(username),
                password: secret(password),
                target,
                signing,
            },
            bundle_root: absolute_path(&bundle_root, "bundle root")?,
            gpg_loopback: settings.gpg_loopback,
            command_timeout: settings
                .command_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            keep_work_dir,
        })
    }
}

/// Parse a boolean flag value
pub fn parse_flag(key: &str, value: &str) -> Result<bool, PublishError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(PublishError::InvalidConfig {
            message: format!("{} must be true or false, got '{}'", key, value),
        }),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn require<'a>(
    value: &'a Option<String>,
    setting: &str,
    reason: &str,
) -> Result<&'a str, PublishError> {
    present(value).ok_or_else(|| PublishError::MissingSetting {
        setting: setting.to_string(),
        reason: reason.to_string(),
    })
}

/// Anchor a path at the current directory; tools run elsewhere
fn absolute_path(path: &Path, setting: &str) -> Result<PathBuf, PublishError> {
    std::path::absolute(path).map_err(|e| PublishError::InvalidConfig {
        message: format!("cannot resolve {} '{}': {}", setting, path.display(), e),
    })
}

fn secret(value: &str) -> SecretString {
    SecretString::new(value.into())
}
