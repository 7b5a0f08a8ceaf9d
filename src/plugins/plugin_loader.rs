//! Plugin Loader - selects the deployment target for a run
//!
//! # Example
//!
//! ```
//! use bundle_publisher::core::config::{PublishMode, Target};
//! use bundle_publisher::plugins::PluginLoader;
//!
//! let mode = PublishMode::new(Target::Direct, false, false).unwrap();
//! let plugin = PluginLoader::new().load_plugin(&mode);
//! assert_eq!(plugin.name(), "direct");
//! ```

use crate::core::config::{PublishMode, Target};
use crate::core::traits::DeployTarget;
use crate::plugins::central_plugin::CentralReleaseCoordinator;
use crate::plugins::direct_plugin::DirectDeployer;

/// Plugin loader for deployment targets
#[derive(Debug, Default)]
pub struct PluginLoader {
    _private: (),
}

impl PluginLoader {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Load the plugin for the resolved mode
    pub fn load_plugin(&self, mode: &PublishMode) -> Box<dyn DeployTarget> {
        let plugin: Box<dyn DeployTarget> = match mode.target() {
            Target::Central => Box::new(CentralReleaseCoordinator::new()),
            Target::Direct => Box::new(DirectDeployer::new()),
        };
        tracing::debug!("Loaded {} plugin for {}", plugin.name(), mode);
        plugin
    }
}
