//! Settings Management
//!
//! Persistent defaults for the command line, stored as JSON next to the log
//! file. Command line flags win over saved settings, which win over the
//! built-in defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serialization of the compiled output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Saved command line defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Output format used when `--format` is not given
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Provider-level log retention applied when logging sets none
    #[serde(default)]
    pub log_retention_in_days: Option<u32>,
    /// Service directory used when `--service-path` is not given
    #[serde(default)]
    pub service_path: Option<PathBuf>,
}

impl Settings {
    /// Directory holding settings and logs
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("appsync-compiler"))
    }

    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the user config directory
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid settings file {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the user config directory
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::settings_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective format (CLI > settings > json)
    pub fn effective_format(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.format).unwrap_or_default()
    }

    /// Get effective log retention (CLI > settings > none)
    pub fn effective_log_retention(&self, cli: Option<u32>) -> Option<u32> {
        cli.or(self.log_retention_in_days)
    }

    /// Get effective service path (CLI > settings > directory of the config file)
    pub fn effective_service_path(&self, cli: Option<&Path>, config_file: &Path) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.service_path.clone())
            .unwrap_or_else(|| {
                config_file
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
            })
    }
}
