pub mod central_plugin;
pub mod direct_plugin;
pub mod plugin_loader;

pub use central_plugin::CentralReleaseCoordinator;
pub use direct_plugin::DirectDeployer;
pub use plugin_loader::PluginLoader;
