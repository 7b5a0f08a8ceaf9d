//! Direct Plugin - one `deploy-file` call per bundle
//!
//! Bundles are deployed one at a time. A conflict response means the version
//! already exists and the next bundle is tried; any other failure stops the
//! run without touching the remaining bundles.

use crate::core::bundle::ArtifactBundle;
use crate::core::config::TargetCredentials;
use crate::core::context::PublishContext;
use crate::core::error::PublishError;
use crate::core::output_contract::classify_direct_deploy;
use crate::core::traits::{BundleOutcome, DeployTarget, ReleaseOutcome, TargetReport};
use crate::core::workspace::DEPLOY_LOG;
use async_trait::async_trait;

/// Maven goal that deploys a single file set
pub const DEPLOY_FILE_GOAL: &str = "org.apache.maven.plugins:maven-deploy-plugin:3.1.1:deploy-file";

/// Direct repository deployer
#[derive(Debug, Default)]
pub struct DirectDeployer {
    _private: (),
}

impl DirectDeployer {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

#[async_trait]
impl DeployTarget for DirectDeployer {
    fn name(&self) -> &str {
        "direct"
    }

    async fn publish(
        &self,
        ctx: &PublishContext,
        bundles: &[ArtifactBundle],
    ) -> Result<TargetReport, PublishError> {
        let TargetCredentials::Direct { repository_url } = &ctx.config.credentials.target else {
            return Err(PublishError::InvalidConfig {
                message: "direct deploy requires a repository URL".to_string(),
            });
        };

        println!("📤 Deploying {} bundle(s) to {}...", bundles.len(), repository_url);

        let mut report = TargetReport::default();
        for bundle in bundles {
            let invocation = ctx
                .maven_invocation(DEPLOY_FILE_GOAL)
                .property("url", repository_url)
                .property("repositoryId", &ctx.config.server_id)
                .property("pomFile", bundle.descriptor.display().to_string())
                .property("file", bundle.binary.display().to_string())
                .property("sources", bundle.sources.display().to_string())
                .property("javadoc", bundle.javadoc.display().to_string());

            let output = ctx.maven.run(&invocation).await.map_err(|e| {
                PublishError::RemoteFatal {
                    step: format!("Deploy of {}", bundle.base_name),
                    message: e.to_string(),
                }
            })?;
            let log = ctx.capture(DEPLOY_LOG, &invocation, &output).await?;

            let outcome = classify_direct_deploy(&output);
            match &outcome {
                ReleaseOutcome::Success => println!("  ✅ {}", bundle.base_name),
                ReleaseOutcome::AlreadyPublished => {
                    let warning = format!(
                        "{} is already published in {}, skipped",
                        bundle.base_name, repository_url
                    );
                    println!("  ⚠️  {}", warning);
                    report.warnings.push(warning);
                }
                ReleaseOutcome::Fatal(reason) => {
                    return Err(PublishError::RemoteFatal {
                        step: format!("Deploy of {}", bundle.base_name),
                        message: format!("{} (see {})", reason, log.display()),
                    });
                }
            }

            report.bundles.push(BundleOutcome {
                bundle: bundle.base_name.clone(),
                outcome,
            });
        }
        println!();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::discover_bundles;
    use crate::test_support::{
        ScriptedRunner, Step, context_for, direct_config, failed, ok, write_bundle,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    fn three_bundles(root: &std::path::Path) -> Vec<ArtifactBundle> {
        write_bundle(&root.join("a"), "api-1.0.0");
        write_bundle(&root.join("b"), "core-1.0.0");
        write_bundle(&root.join("c"), "util-1.0.0");
        discover_bundles(root).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_every_bundle() {
        let root = TempDir::new().unwrap();
        let bundles = three_bundles(root.path());
        let runner = Arc::new(ScriptedRunner::default());
        let ctx = context_for(direct_config(root.path()), runner.clone()).await;

        let report = DirectDeployer::new().publish(&ctx, &bundles).await.unwrap();

        assert_eq!(report.bundles.len(), 3);
        assert!(report.warnings.is_empty());
        assert_eq!(runner.count(Step::DirectDeploy), 3);

        let call = &runner.calls()[0];
        assert_eq!(call.property("url"), Some("https://repo.example.com/releases"));
        assert_eq!(call.property("repositoryId"), Some("internal"));
        assert!(call.property("javadoc").unwrap().ends_with("api-1.0.0-javadoc.jar"));
    }

    #[tokio::test]
    async fn test_conflict_warns_and_continues() {
        let root = TempDir::new().unwrap();
        let bundles = three_bundles(root.path());
        let runner = Arc::new(ScriptedRunner::with_direct_results(vec![
            ok("[INFO] BUILD SUCCESS\n"),
            failed("[ERROR] status code: 409, reason phrase: Conflict (409)\n"),
            ok("[INFO] BUILD SUCCESS\n"),
        ]));
        let ctx = context_for(direct_config(root.path()), runner.clone()).await;

        let report = DirectDeployer::new().publish(&ctx, &bundles).await.unwrap();

        assert_eq!(runner.count(Step::DirectDeploy), 3);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("core-1.0.0"));
        assert_eq!(report.bundles[1].outcome, ReleaseOutcome::AlreadyPublished);
        assert_eq!(report.bundles[2].outcome, ReleaseOutcome::Success);
    }

    #[tokio::test]
    async fn test_other_failure_aborts_remaining_bundles() {
        let root = TempDir::new().unwrap();
        let bundles = three_bundles(root.path());
        let runner = Arc::new(ScriptedRunner::with_direct_results(vec![
            ok("[INFO] BUILD SUCCESS\n"),
            failed("[ERROR] status code: 401, reason phrase: Unauthorized\n"),
        ]));
        let ctx = context_for(direct_config(root.path()), runner.clone()).await;

        let result = DirectDeployer::new().publish(&ctx, &bundles).await;

        match result {
            Err(PublishError::RemoteFatal { step, .. }) => assert!(step.contains("core-1.0.0")),
            other => panic!("expected RemoteFatal, got {:?}", other),
        }
        assert_eq!(runner.count(Step::DirectDeploy), 2);

        let log = std::fs::read_to_string(ctx.workspace.work_file(DEPLOY_LOG)).unwrap();
        assert!(log.contains("401"));
        assert!(!log.contains("hunter2-password"));
    }

    #[tokio::test]
    async fn test_timeout_is_remote_fatal() {
        let root = TempDir::new().unwrap();
        let bundles = three_bundles(root.path());
        let runner = Arc::new(ScriptedRunner {
            timeout_at: Some(Step::DirectDeploy),
            ..Default::default()
        });
        let ctx = context_for(direct_config(root.path()), runner.clone()).await;

        let error = DirectDeployer::new()
            .publish(&ctx, &bundles)
            .await
            .unwrap_err();

        assert!(matches!(&error, PublishError::RemoteFatal { step, .. } if step.contains("api-1.0.0")));
        assert_eq!(error.exit_code(), 6);
        assert_eq!(runner.count(Step::DirectDeploy), 1);
    }
}
