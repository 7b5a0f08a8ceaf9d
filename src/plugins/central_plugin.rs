//! Central Plugin - staged deploy, close and release against Nexus
//!
//! The deploy tool reports the staging repository id only as log text, so
//! every phase's output gates the next one:
//!
//! 1. `deploy-staged-repository` uploads the staging area and closes the
//!    repository (auto-release is requested off and never relied upon)
//! 2. the id is extracted from the `Closing staging repository` line
//! 3. `rc-release` releases that repository
//!
//! A release rejected because the POM version already exists ends in
//! `AlreadyPublished`, which is reported as a warning. Nothing is retried.

use crate::core::bundle::ArtifactBundle;
use crate::core::config::TargetCredentials;
use crate::core::context::PublishContext;
use crate::core::error::PublishError;
use crate::core::output_contract::{
    CLOSING_MARKER, DRY_RUN_REPOSITORY_ID, classify_release, closing_line,
    extract_staging_repository_id,
};
use crate::core::state_machine::{ReleaseState, ReleaseStateMachine};
use crate::core::traits::{
    BundleOutcome, DeployTarget, ReleaseOutcome, TargetReport, ToolInvocation, ToolOutput,
};
use crate::core::workspace::{DEPLOY_LOG, RELEASE_LOG};
use async_trait::async_trait;
use std::collections::HashMap;

const NEXUS_STAGING_PLUGIN: &str = "org.sonatype.plugins:nexus-staging-maven-plugin:1.6.13";

/// Central release coordinator
#[derive(Debug, Default)]
pub struct CentralReleaseCoordinator {
    _private: (),
}

impl CentralReleaseCoordinator {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn deploy_invocation(
        ctx: &PublishContext,
        nexus_url: &str,
        staging_profile_id: &str,
    ) -> ToolInvocation {
        ctx.maven_invocation(&format!("{}:deploy-staged-repository", NEXUS_STAGING_PLUGIN))
            .property("nexusUrl", nexus_url)
            .property("serverId", &ctx.config.server_id)
            .property("stagingProfileId", staging_profile_id)
            .property(
                "repositoryDirectory",
                ctx.workspace.staging_dir().display().to_string(),
            )
            .property("autoReleaseAfterClose", "false")
    }

    fn release_invocation(
        ctx: &PublishContext,
        nexus_url: &str,
        staging_repository_id: &str,
    ) -> ToolInvocation {
        ctx.maven_invocation(&format!("{}:rc-release", NEXUS_STAGING_PLUGIN))
            .property("nexusUrl", nexus_url)
            .property("serverId", &ctx.config.server_id)
            .property("stagingRepositoryId", staging_repository_id)
    }

    async fn run_protocol(
        &self,
        ctx: &PublishContext,
        machine: &mut ReleaseStateMachine,
        bundles: &[ArtifactBundle],
    ) -> Result<TargetReport, PublishError> {
        let TargetCredentials::Central {
            staging_profile_id,
            nexus_url,
        } = &ctx.config.credentials.target
        else {
            return Err(PublishError::InvalidConfig {
                message: "central release requires a staging profile".to_string(),
            });
        };

        // Deploying
        machine.transition(ReleaseState::Deploying, None).await?;
        println!("📤 Deploying staged repository to {}...", nexus_url);

        let invocation = Self::deploy_invocation(ctx, nexus_url, staging_profile_id);
        let output = if ctx.config.mode.is_dry_run() {
            println!("  🧪 [dry-run] {}", invocation.command_line());
            ToolOutput {
                status: Some(0),
                stdout: closing_line(DRY_RUN_REPOSITORY_ID),
                stderr: String::new(),
            }
        } else {
            ctx.maven
                .run(&invocation)
                .await
                .map_err(|e| PublishError::RemoteFatal {
                    step: "Staged deploy".to_string(),
                    message: e.to_string(),
                })?
        };
        let deploy_log = ctx.capture(DEPLOY_LOG, &invocation, &output).await?;

        if !output.success() {
            return Err(PublishError::RemoteFatal {
                step: "Staged deploy".to_string(),
                message: format!("{} (see {})", output.status_text(), deploy_log.display()),
            });
        }

        // Closed
        let staging_repository_id = extract_staging_repository_id(&output.stdout)
            .or_else(|| extract_staging_repository_id(&output.stderr))
            .ok_or_else(|| PublishError::ProtocolExtraction {
                marker: format!("'{}<id>\"'", CLOSING_MARKER),
                log: deploy_log.clone(),
            })?;

        let mut metadata = HashMap::new();
        metadata.insert(
            "stagingRepositoryId".to_string(),
            serde_json::Value::String(staging_repository_id.clone()),
        );
        machine
            .transition(ReleaseState::Closed, Some(metadata))
            .await?;
        println!("  ✅ Closed staging repository {}", staging_repository_id);

        // Releasing
        machine.transition(ReleaseState::Releasing, None).await?;
        println!("🚀 Releasing {}...", staging_repository_id);

        let invocation = Self::release_invocation(ctx, nexus_url, &staging_repository_id);
        let output = ctx
            .maven
            .run(&invocation)
            .await
            .map_err(|e| PublishError::RemoteFatal {
                step: "Release".to_string(),
                message: e.to_string(),
            })?;
        let release_log = ctx.capture(RELEASE_LOG, &invocation, &output).await?;

        let mut warnings = Vec::new();
        let outcome = classify_release(&output);
        match &outcome {
            ReleaseOutcome::Success => {
                machine.transition(ReleaseState::Done, None).await?;
                println!("  ✅ Released {}\n", staging_repository_id);
            }
            ReleaseOutcome::AlreadyPublished => {
                machine
                    .transition(ReleaseState::AlreadyPublished, None)
                    .await?;
                let warning = format!(
                    "Staging repository {} was not released: this version is already published",
                    staging_repository_id
                );
                println!("  ⚠️  {}\n", warning);
                warnings.push(warning);
            }
            ReleaseOutcome::Fatal(reason) => {
                return Err(PublishError::RemoteFatal {
                    step: "Release".to_string(),
                    message: format!("{} (see {})", reason, release_log.display()),
                });
            }
        }

        Ok(TargetReport {
            bundles: bundles
                .iter()
                .map(|b| BundleOutcome {
                    bundle: b.base_name.clone(),
                    outcome: outcome.clone(),
                })
                .collect(),
            warnings,
            staging_repository_id: Some(staging_repository_id),
            final_state: Some(machine.get_state()),
            release_duration: Some(machine.get_elapsed_time().max(0) as u64),
        })
    }
}

#[async_trait]
impl DeployTarget for CentralReleaseCoordinator {
    fn name(&self) -> &str {
        "central"
    }

    async fn publish(
        &self,
        ctx: &PublishContext,
        bundles: &[ArtifactBundle],
    ) -> Result<TargetReport, PublishError> {
        let mut machine = ReleaseStateMachine::new(ctx.workspace.work_dir());

        let result = self.run_protocol(ctx, &mut machine, bundles).await;
        if let Err(e) = &result
            && !machine.get_state().is_terminal()
        {
            if let Err(save_error) = machine.fail(&ctx.mask(&e.to_string())).await {
                tracing::warn!("Could not record failed release state: {}", save_error);
            }
        }
        tracing::debug!("Release history:\n{}", machine.get_history());

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::discover_bundles;
    use crate::core::state_machine::{ReleaseStateData, STATE_FILE};
    use crate::test_support::{
        STAGING_ID, ScriptedRunner, Step, central_config, context_for, failed, ok, write_bundle,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn run(runner: Arc<ScriptedRunner>) -> (Result<TargetReport, PublishError>, PublishContext) {
        let root = TempDir::new().unwrap();
        write_bundle(root.path(), "lib-1.0.0");
        let bundles = discover_bundles(root.path()).unwrap();
        let ctx = context_for(central_config(root.path(), false), runner).await;

        let result = CentralReleaseCoordinator::new().publish(&ctx, &bundles).await;
        (result, ctx)
    }

    fn saved_state(ctx: &PublishContext) -> ReleaseStateData {
        let content = std::fs::read_to_string(ctx.workspace.work_file(STATE_FILE)).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_close_release() {
        let runner = Arc::new(ScriptedRunner::default());
        let (result, ctx) = run(runner.clone()).await;

        let report = result.unwrap();
        assert_eq!(report.staging_repository_id.as_deref(), Some(STAGING_ID));
        assert_eq!(report.final_state, Some(ReleaseState::Done));
        assert!(report.warnings.is_empty());
        assert_eq!(report.bundles[0].outcome, ReleaseOutcome::Success);
        assert!(report.release_duration.is_some());

        let calls = runner.calls();
        let deploy = calls.iter().find(|c| c.step == Step::DeployStaged).unwrap();
        assert_eq!(deploy.property("autoReleaseAfterClose"), Some("false"));
        assert_eq!(deploy.property("stagingProfileId"), Some("9a1b2c3d4e5f"));
        let release = calls.iter().find(|c| c.step == Step::Release).unwrap();
        assert_eq!(release.property("stagingRepositoryId"), Some(STAGING_ID));

        assert!(ctx.workspace.work_file(DEPLOY_LOG).exists());
        assert!(ctx.workspace.work_file(RELEASE_LOG).exists());
        let state = saved_state(&ctx);
        assert_eq!(state.current_state, ReleaseState::Done);
        assert_eq!(state.staging_repository_id.as_deref(), Some(STAGING_ID));
    }

    #[tokio::test]
    async fn test_missing_closing_line_never_releases() {
        let runner = Arc::new(ScriptedRunner {
            deploy_staged: ok("[INFO] Remote staging finished\n[INFO] BUILD SUCCESS\n"),
            ..Default::default()
        });
        let (result, ctx) = run(runner.clone()).await;

        assert!(matches!(
            result,
            Err(PublishError::ProtocolExtraction { .. })
        ));
        assert_eq!(runner.count(Step::Release), 0);
        assert_eq!(saved_state(&ctx).current_state, ReleaseState::Failed);
    }

    #[tokio::test]
    async fn test_deploy_failure_is_remote_fatal() {
        let runner = Arc::new(ScriptedRunner {
            deploy_staged: failed("[ERROR] 401 Unauthorized\n"),
            ..Default::default()
        });
        let (result, _ctx) = run(runner.clone()).await;

        assert!(matches!(result, Err(PublishError::RemoteFatal { .. })));
        assert_eq!(runner.count(Step::Release), 0);
    }

    #[tokio::test]
    async fn test_already_released_is_a_warning() {
        let runner = Arc::new(ScriptedRunner {
            release: failed(
                "[ERROR] Repository with ID='releases' does not allow updating artifact='/com/example/lib/1.0.0/lib-1.0.0.pom'\n",
            ),
            ..Default::default()
        });
        let (result, ctx) = run(runner.clone()).await;

        let report = result.unwrap();
        assert_eq!(report.final_state, Some(ReleaseState::AlreadyPublished));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.bundles[0].outcome, ReleaseOutcome::AlreadyPublished);
        assert_eq!(runner.count(Step::Release), 1);
        assert_eq!(saved_state(&ctx).current_state, ReleaseState::AlreadyPublished);
    }

    #[tokio::test]
    async fn test_release_failure_is_fatal() {
        let runner = Arc::new(ScriptedRunner {
            release: failed("[ERROR] Staging repository is not closed\n"),
            ..Default::default()
        });
        let (result, ctx) = run(runner.clone()).await;

        match result {
            Err(PublishError::RemoteFatal { step, .. }) => assert_eq!(step, "Release"),
            other => panic!("expected RemoteFatal, got {:?}", other),
        }
        let state = saved_state(&ctx);
        assert_eq!(state.current_state, ReleaseState::Failed);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_release_timeout_is_remote_fatal() {
        let runner = Arc::new(ScriptedRunner {
            timeout_at: Some(Step::Release),
            ..Default::default()
        });
        let (result, ctx) = run(runner.clone()).await;

        let error = result.unwrap_err();
        assert!(matches!(&error, PublishError::RemoteFatal { step, .. } if step == "Release"));
        assert_eq!(error.exit_code(), 6);
        assert_eq!(saved_state(&ctx).current_state, ReleaseState::Failed);
    }

    #[tokio::test]
    async fn test_deploy_timeout_is_remote_fatal() {
        let runner = Arc::new(ScriptedRunner {
            timeout_at: Some(Step::DeployStaged),
            ..Default::default()
        });
        let (result, _ctx) = run(runner.clone()).await;

        let error = result.unwrap_err();
        assert!(matches!(&error, PublishError::RemoteFatal { step, .. } if step == "Staged deploy"));
        assert_eq!(error.exit_code(), 6);
        assert_eq!(runner.count(Step::Release), 0);
    }
}
