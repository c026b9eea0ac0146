//! Business logic services
//!
//! This module contains the settings panel logic separated from HTTP
//! concerns, so transitions can be tested without a server or a browser.

pub mod panel;
pub mod store;

pub use panel::SettingsPanel;
pub use store::{FileSettingsStore, SettingsStore};
