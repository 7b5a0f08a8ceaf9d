//! Package Publisher - Main orchestrator for bundle publishing
//!
//! Manages the complete publishing workflow:
//! - Bundle discovery (before any subprocess runs)
//! - Ephemeral workspace and Maven settings
//! - Signing key import and artifact signing
//! - Target selection and deployment
//! - Run report and work directory teardown

use crate::core::bundle::{ArtifactBundle, discover_bundles};
use crate::core::config::ResolvedConfig;
use crate::core::context::PublishContext;
use crate::core::error::PublishError;
use crate::core::traits::{TargetReport, ToolRunner};
use crate::core::workspace::{REPORT_FILE, Workspace};
use crate::orchestration::artifact_signer::ArtifactSigner;
use crate::orchestration::report::PublishReport;
use crate::plugins::plugin_loader::PluginLoader;
use crate::security::command_executor::{DryRunRunner, SafeCommandExecutor};
use crate::security::credential_store::CredentialStore;
use crate::security::key_importer::{KeyImporter, SigningCapabilities};
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a successful run
#[derive(Debug)]
pub struct PublishOutcome {
    pub report: PublishReport,
    /// Work directory, when kept for inspection
    pub work_dir: Option<PathBuf>,
}

/// Main bundle publisher orchestrator
pub struct PackagePublisher {
    runner: Option<Arc<dyn ToolRunner>>,
}

impl Default for PackagePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl PackagePublisher {
    /// Create a publisher that runs the installed `mvn` and `gpg`
    pub fn new() -> Self {
        Self { runner: None }
    }

    /// Create a publisher that sends every tool call to `runner`
    pub fn with_runner(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner: Some(runner),
        }
    }

    fn tool_runner(&self, config: &ResolvedConfig) -> Result<Arc<dyn ToolRunner>, PublishError> {
        if let Some(runner) = &self.runner {
            return Ok(runner.clone());
        }

        let mut executor = SafeCommandExecutor::new(std::env::temp_dir())?;
        if let Some(timeout) = config.command_timeout {
            executor.set_timeout(timeout);
        }
        Ok(Arc::new(executor))
    }

    /// Publish every bundle under the configured root
    ///
    /// Bundles are discovered before any directory is created or any tool
    /// runs. In dry-run mode Maven calls are echoed instead of executed; the
    /// key import still runs for real.
    pub async fn publish(&self, config: ResolvedConfig) -> Result<PublishOutcome, PublishError> {
        println!(
            "📦 Publishing bundles from {} ({})\n",
            config.bundle_root.display(),
            config.mode
        );

        let bundles = discover_bundles(&config.bundle_root)?;
        for bundle in &bundles {
            println!("  - {}", bundle.base_name);
        }
        println!();

        let tools = self.tool_runner(&config)?;
        let maven: Arc<dyn ToolRunner> = if config.mode.is_dry_run() {
            Arc::new(DryRunRunner)
        } else {
            tools.clone()
        };

        let workspace = Workspace::create()?;
        let credentials = CredentialStore::create(&config, workspace.work_dir()).await?;
        let mut ctx = PublishContext {
            config,
            workspace,
            credentials,
            signing: None,
            maven,
        };

        let mut report = PublishReport::start(
            ctx.config.mode.to_string(),
            ctx.config.mode.target().as_str(),
            &ctx.config.server_id,
        );

        let result = Self::execute(&mut ctx, tools.as_ref(), &bundles).await;

        report.key_id = ctx
            .signing
            .as_ref()
            .map(|s| s.keyring.key_id().to_string());
        report.finish(
            result
                .as_ref()
                .map_err(|e| ctx.mask(&e.to_string())),
        );
        if let Err(e) = report.save(&ctx.workspace.work_file(REPORT_FILE)).await {
            tracing::warn!("Could not write run report: {}", e);
        }

        let PublishContext {
            config,
            workspace,
            signing,
            ..
        } = ctx;
        // Keyring goes first; it must not outlive the run
        drop(signing);
        let work_dir = workspace.finish(config.keep_work_dir);
        if let Some(dir) = &work_dir {
            println!("📁 Work directory kept at {}", dir.display());
        }

        result.map(|_| PublishOutcome { report, work_dir })
    }

    async fn execute(
        ctx: &mut PublishContext,
        tools: &dyn ToolRunner,
        bundles: &[ArtifactBundle],
    ) -> Result<TargetReport, PublishError> {
        if let Some(signing) = &ctx.config.credentials.signing {
            println!("🔑 Importing signing key...");
            let capabilities = SigningCapabilities::resolve(ctx.config.gpg_loopback, tools).await;
            let session = KeyImporter::new(tools)
                .import(signing, capabilities, ctx.workspace.work_dir())
                .await?;
            println!("  ✅ Imported key {}\n", session.keyring.key_id());
            ctx.signing = Some(session);

            ArtifactSigner::new(ctx).sign_all(bundles).await?;
        }

        let plugin = PluginLoader::new().load_plugin(&ctx.config.mode);
        plugin.publish(ctx, bundles).await
    }
}
