pub mod bundle;
pub mod config;
pub mod config_loader;
pub mod context;
pub mod error;
pub mod output_contract;
pub mod state_machine;
pub mod traits;
pub mod workspace;

pub use bundle::*;
pub use context::PublishContext;
pub use error::*;
pub use traits::*;
pub use workspace::Workspace;
