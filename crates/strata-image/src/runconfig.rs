//! Persisted run configuration for a built image.
//!
//! Of everything the builder touches, only two entities outlive the build:
//! the execution identity and the entry command. Both live here and are
//! serialized as the image's `config.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::error::{Result, StrataError};

/// Default run configuration baked into an image at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Name of the restricted execution account.
    pub user: String,
    /// Numeric identity of the account (never 0).
    pub uid: u32,
    /// Group identity; mirrors `uid`.
    pub gid: u32,
    /// Working directory the entry command starts in.
    pub workdir: String,
    /// Entry command argv, exec form, with no argument injection.
    pub cmd: Vec<String>,
    /// Extra environment for the entry command (sorted for stable JSON).
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl RunConfig {
    /// Loads a run configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it
    /// declares a privileged identity.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.check_unprivileged()?;
        Ok(config)
    }

    /// Persists the run configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is privileged or cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.check_unprivileged()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| StrataError::io(path, e))?;
        tracing::debug!(path = %path.display(), user = %self.user, uid = self.uid, "run config saved");
        Ok(())
    }

    /// Rejects a configuration whose identity is root.
    ///
    /// The validator already forbids uid 0 at recipe level; this check
    /// guards the persisted artifact against hand-edited configs.
    ///
    /// # Errors
    ///
    /// Returns an identity error if `uid` or `gid` is 0.
    pub fn check_unprivileged(&self) -> Result<()> {
        if self.uid == 0 || self.gid == 0 {
            return Err(StrataError::Identity {
                message: format!(
                    "run config declares privileged identity {}:{} for user {}",
                    self.uid, self.gid, self.user
                ),
            });
        }
        Ok(())
    }
}
