//! Configuration module for Quarry.
//!
//! Handles the backend location, endpoint paths, search and export
//! settings, and where saved reports are stored.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, EndpointSettings, ExportSettings, ServerSettings, Settings,
    SettingsError, StorageMode, StorageSettings,
};
