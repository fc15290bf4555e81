//! Saved session token
//!
//! Stored in $XDG_STATE_HOME/fixit/session, one line holding the bearer
//! token returned by `login` or `register`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// $XDG_STATE_HOME/fixit/session, or ~/.local/state/fixit/session
    pub fn default_location() -> Result<Self> {
        let base = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
            .context("Could not determine state directory")?;
        Ok(Self::new(base.join("fixit").join("session")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let token = content.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{}\n", token))
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Forget the saved token; returns whether there was one
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }
}
