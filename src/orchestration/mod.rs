//! Orchestration layer for bundle publishing
//!
//! This module provides the high-level components that sign bundles and
//! drive a publish run from discovery to report.

pub mod artifact_signer;
pub mod package_publisher;
pub mod report;

// Re-export main types for convenience
pub use artifact_signer::ArtifactSigner;
pub use package_publisher::{PackagePublisher, PublishOutcome};
pub use report::PublishReport;
