//! Bundle Publisher CLI
//!
//! Signs Maven artifact bundles and publishes them to the central repository
//! or to any other Maven repository.

use anyhow::Result;
use bundle_publisher::PublishError;
use bundle_publisher::core::config::{DEFAULT_BUNDLE_ROOT, PublishSettings};
use bundle_publisher::core::config_loader::{ConfigLoadOptions, ConfigLoader};
use bundle_publisher::orchestration::PackagePublisher;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process;

/// Sign and publish Maven artifact bundles
#[derive(Parser)]
#[command(name = "bundle-publisher")]
#[command(version)]
#[command(about = "Sign and publish Maven artifact bundles", long_about = None)]
struct Cli {
    /// Root directory of the bundles to publish
    #[arg(value_name = "BUNDLE_ROOT")]
    bundle_root: Option<PathBuf>,

    /// Settings file (defaults to ./.publish-config.yaml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Echo Maven calls instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Keep the work directory (settings, logs, state, report)
    #[arg(long)]
    keep_work_dir: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        let exit_code = match e.downcast_ref::<PublishError>() {
            Some(error) => {
                eprintln!("\n❌ Error [{}]: {}", error.code(), error);
                for action in error.suggested_actions() {
                    eprintln!("   💡 {}", action);
                }
                error.exit_code()
            }
            None => {
                eprintln!("\n❌ Error: {:#}", e);
                1
            }
        };
        process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    println!("\n📦 bundle-publisher\n");

    let env: HashMap<String, String> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();

    let settings = ConfigLoader::load(ConfigLoadOptions {
        project_path: std::env::current_dir()?,
        config_file: cli.config,
        env,
        cli_args: Some(PublishSettings {
            dry_run: cli.dry_run.then_some(true),
            ..Default::default()
        }),
    })
    .await?;
    tracing::debug!("Effective settings: {:?}", settings);

    let bundle_root = cli
        .bundle_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUNDLE_ROOT));
    let config = ConfigLoader::resolve(&settings, bundle_root, cli.keep_work_dir)?;
    let dry_run = config.mode.is_dry_run();

    let outcome = PackagePublisher::new().publish(config).await?;
    let report = &outcome.report;

    if !report.warnings.is_empty() {
        println!("⚠️  Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    if dry_run {
        println!(
            "✅ Dry run completed for {} bundle(s), nothing was uploaded",
            report.bundles.len()
        );
    } else {
        println!("✅ Published {} bundle(s)", report.bundles.len());
    }
    if let Some(id) = &report.staging_repository_id {
        println!("   Staging repository: {}", id);
    }

    Ok(())
}
