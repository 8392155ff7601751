//! Typed, validated build plan.
//!
//! A [`BuildPlan`] is the output of [`crate::validator::validate`]: the
//! instruction stream normalized into the fixed step order the executor
//! runs. Holding a `BuildPlan` means ordering and cardinality have already
//! been checked; the executor never re-validates.

use serde::{Deserialize, Serialize};

/// The restricted execution account an image runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionUser {
    /// Account name.
    pub name: String,
    /// Fixed numeric identity (never 0).
    pub uid: u32,
    /// Home directory inside the image.
    pub home: String,
}

/// A validated, ordered build plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Base image source URI.
    pub base: String,
    /// Working directory inside the image.
    pub workdir: String,
    /// System toolchain packages to install (may be empty).
    pub toolchain: Vec<String>,
    /// Dependency manifest path relative to the build context, if any.
    pub manifest: Option<String>,
    /// Source path to copy relative to the build context, if any.
    pub copy: Option<String>,
    /// Restricted execution account.
    pub user: ExecutionUser,
    /// Entry command argv (exec form, non-empty).
    pub cmd: Vec<String>,
}

impl BuildPlan {
    /// Returns a human-readable step listing in execution order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        let mut steps = vec![
            format!("base      {}", self.base),
            format!("workdir   {}", self.workdir),
        ];
        if !self.toolchain.is_empty() {
            steps.push(format!(
                "toolchain {} (+ package-index purge)",
                self.toolchain.join(", ")
            ));
        }
        if let Some(manifest) = &self.manifest {
            steps.push(format!("install   {manifest} (cache disabled)"));
        }
        if let Some(copy) = &self.copy {
            steps.push(format!("copy      {copy}"));
        }
        steps.push(format!(
            "account   {} (uid {}, home {})",
            self.user.name, self.user.uid, self.user.home
        ));
        steps.push(format!("cmd       {:?}", self.cmd));
        steps
    }
}
