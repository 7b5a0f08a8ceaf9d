pub mod core;
pub mod orchestration;
pub mod plugins;
pub mod security;

#[cfg(test)]
pub(crate) mod test_support;

pub use core::*;
pub use orchestration::{PackagePublisher, PublishOutcome, PublishReport};
pub use security::{CommandError, CredentialStore, DryRunRunner, SafeCommandExecutor};
