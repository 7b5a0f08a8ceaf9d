//! Parsing contract for Maven output
//!
//! The staging repository id and the "already published" outcomes are only
//! reported as text in the deploy tool's log. Each marker has exactly one
//! function here, and each function matches literal phrases only. A change in
//! the remote tool's wording must show up as a failing test, not as a silently
//! different classification.

use crate::core::traits::{ReleaseOutcome, ToolOutput};

/// Phrase that precedes the staging repository id
pub const CLOSING_MARKER: &str = "Closing staging repository with ID \"";

/// Phrase reported when a released POM version is uploaded again
pub const ALREADY_RELEASED_MARKER: &str = "does not allow updating artifact";

/// Descriptor reference that must accompany `ALREADY_RELEASED_MARKER`
pub const DESCRIPTOR_SUFFIX: &str = ".pom";

/// HTTP conflict status reported by repositories that reject re-uploads
pub const CONFLICT_MARKER: &str = "409";

/// Repository id used when the deploy step is skipped in dry-run mode
pub const DRY_RUN_REPOSITORY_ID: &str = "dry-run-staging-repository";

/// Extract the staging repository id from captured deploy output
///
/// Returns the id of the first `Closing staging repository with ID "<id>"`
/// line. Lines with an empty or unterminated id are ignored.
pub fn extract_staging_repository_id(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let start = line.find(CLOSING_MARKER)? + CLOSING_MARKER.len();
        let rest = &line[start..];
        let end = rest.find('"')?;
        let id = &rest[..end];
        (!id.is_empty()).then(|| id.to_string())
    })
}

/// Build the deploy output line that announces a closing repository
///
/// Used in dry-run mode so the extraction runs on the same text shape as a
/// live run.
pub fn closing_line(repository_id: &str) -> String {
    format!(
        "[INFO]  * {}{}\".\n",
        CLOSING_MARKER, repository_id
    )
}

/// Check whether a release failed because the POM version already exists
pub fn is_already_released(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.contains(ALREADY_RELEASED_MARKER) && line.contains(DESCRIPTOR_SUFFIX))
}

/// Check whether a direct deploy was rejected with a conflict
pub fn is_conflict(output: &str) -> bool {
    output.lines().any(|line| line.contains(CONFLICT_MARKER))
}

/// Classify the result of a release call
pub fn classify_release(output: &ToolOutput) -> ReleaseOutcome {
    if output.success() {
        ReleaseOutcome::Success
    } else if is_already_released(&output.combined()) {
        ReleaseOutcome::AlreadyPublished
    } else {
        ReleaseOutcome::Fatal(output.status_text())
    }
}

/// Classify the result of a direct deploy call
pub fn classify_direct_deploy(output: &ToolOutput) -> ReleaseOutcome {
    if output.success() {
        ReleaseOutcome::Success
    } else if is_conflict(&output.combined()) {
        ReleaseOutcome::AlreadyPublished
    } else {
        ReleaseOutcome::Fatal(output.status_text())
    }
}
