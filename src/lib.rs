pub mod api;
pub mod config;
pub mod http_client;
pub mod jaqc_device_client;
pub mod services;

// Re-exports for the common entry points
pub use api::Api;
pub use jaqc_device_client::{DeviceClient, JaqcDeviceClient};
pub use services::{FileSettingsStore, SettingsPanel, SettingsStore};
