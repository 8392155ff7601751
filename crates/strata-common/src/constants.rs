//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Strata data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/strata";

/// Returns the data directory, preferring `$HOME/.strata` for non-root
/// or non-Linux environments, falling back to `/var/lib/strata`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".strata");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default layer store path.
pub fn default_layer_store() -> PathBuf {
    data_dir().join("layers")
}

/// Returns the default image catalog directory.
pub fn default_catalog_dir() -> PathBuf {
    data_dir().join("images")
}

/// Returns the default directory for materialized container rootfs trees.
pub fn default_rootfs_dir() -> PathBuf {
    data_dir().join("rootfs")
}

/// File extension for Strata recipe files.
pub const RECIPE_EXTENSION: &str = ".strata";

/// Default recipe file name looked up in the build context.
pub const DEFAULT_RECIPE_FILE: &str = "build.strata";

/// Default name of the restricted execution account.
pub const DEFAULT_USER: &str = "amvera";

/// Default numeric identity of the restricted execution account.
pub const DEFAULT_UID: u32 = 1000;

/// Image config file name stored alongside the layers.
pub const RUN_CONFIG_FILE: &str = "config.json";

/// Package-index cache directories that must be absent or empty in a
/// finalized image, relative to the rootfs.
pub const PACKAGE_CACHE_DIRS: &[&str] =
    &["var/cache/apk", "var/lib/apt/lists", "var/cache/apt"];

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "strata";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "strata";
