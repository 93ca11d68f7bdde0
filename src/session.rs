//! Persisted client session: signed-in user, theme and favourites

use crate::api::AuthUser;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub user: Option<AuthUser>,
    pub theme: Theme,
    /// Product ids
    pub favourites: BTreeSet<String>,
}

impl Session {
    pub fn with_theme(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_favourite(&self, product_id: &str) -> bool {
        self.favourites.contains(product_id)
    }

    /// Returns whether the product is a favourite afterwards
    pub fn toggle_favourite(&mut self, product_id: &str) -> bool {
        if self.favourites.remove(product_id) {
            false
        } else {
            self.favourites.insert(product_id.to_string());
            true
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
    }
}

/// Where the session lives between runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session>;
    fn save(&self, session: &Session) -> Result<()>;
}

/// JSON file under the platform data dir
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Option<Self> {
        ProjectDirs::from("io", "storefront", "storefront-tui")
            .map(|dirs| Self::new(dirs.data_dir().join("session.json")))
    }
}

impl SessionStore for FileSessionStore {
    /// A missing file is an empty session
    fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(session)
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        tracing::debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

/// In-process store, used when no data dir is available and in tests
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session> {
        let guard = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }
}
