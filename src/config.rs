//! Configuration handling for the TUI

use crate::session::Theme;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default storefront API address
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";

/// Environment override for the API address
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

const DEFAULT_PAGE_SIZE: usize = 20;

/// User configuration for the TUI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the storefront REST API
    pub api_base_url: String,
    /// Rows per inventory page
    pub inventory_page_size: usize,
    /// Where CSV exports are written (current directory when unset)
    pub export_dir: Option<PathBuf>,
    pub default_theme: Theme,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            inventory_page_size: DEFAULT_PAGE_SIZE,
            export_dir: None,
            default_theme: Theme::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "storefront", "storefront-tui")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load from the platform config dir, then apply the environment override
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;
        if config.inventory_page_size == 0 {
            config.inventory_page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(config)
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!(%url, "API base URL overridden from environment");
            self.api_base_url = url;
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Directory CSV exports land in
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
