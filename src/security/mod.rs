pub mod command_executor;
pub mod credential_store;
pub mod key_importer;

pub use command_executor::{CommandError, DryRunRunner, SafeCommandExecutor};
pub use credential_store::CredentialStore;
pub use key_importer::{KeyId, KeyImporter, Keyring, SigningCapabilities, SigningSession};
