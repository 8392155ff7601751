//! Unprivileged account creation inside the staging rootfs.
//!
//! Accounts are written straight into the image's `etc/passwd` and
//! `etc/group` rather than shelled through the base's user tooling, so
//! the step works identically across base distributions.

use std::path::Path;

use strata_common::error::{Result, StrataError};
use strata_recipe::plan::ExecutionUser;

#[derive(Debug, PartialEq, Eq)]
struct PasswdEntry {
    name: String,
    uid: u32,
}

fn parse_passwd(contents: &str) -> Vec<PasswdEntry> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?.to_string();
            let _password = fields.next()?;
            let uid = fields.next()?.parse().ok()?;
            Some(PasswdEntry { name, uid })
        })
        .collect()
}

/// Registers the execution user in the rootfs account databases.
///
/// Re-running against a rootfs that already carries the exact same
/// name/uid pair is a no-op. A matching name with a different uid, or a
/// matching uid under a different name, is a conflict with the base image
/// and fails the build.
///
/// # Errors
///
/// Returns an identity error on account conflicts, or an I/O error if the
/// account databases cannot be updated.
pub fn create_account(rootfs: &Path, user: &ExecutionUser) -> Result<()> {
    let etc = rootfs.join("etc");
    std::fs::create_dir_all(&etc).map_err(|e| StrataError::io(&etc, e))?;
    let passwd_path = etc.join("passwd");
    let group_path = etc.join("group");

    let passwd = match std::fs::read_to_string(&passwd_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(StrataError::io(&passwd_path, e)),
    };

    for entry in parse_passwd(&passwd) {
        if entry.name == user.name && entry.uid == user.uid {
            tracing::debug!(user = %user.name, uid = user.uid, "account already present");
            return Ok(());
        }
        if entry.name == user.name {
            return Err(StrataError::Identity {
                message: format!(
                    "user '{}' already exists with uid {} (wanted {})",
                    user.name, entry.uid, user.uid
                ),
            });
        }
        if entry.uid == user.uid {
            return Err(StrataError::Identity {
                message: format!(
                    "uid {} is already taken by user '{}'",
                    user.uid, entry.name
                ),
            });
        }
    }

    let mut passwd = passwd;
    if !passwd.is_empty() && !passwd.ends_with('\n') {
        passwd.push('\n');
    }
    passwd.push_str(&format!(
        "{}:x:{}:{}::{}:/bin/sh\n",
        user.name, user.uid, user.uid, user.home
    ));
    std::fs::write(&passwd_path, passwd).map_err(|e| StrataError::io(&passwd_path, e))?;

    let mut group = match std::fs::read_to_string(&group_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(StrataError::io(&group_path, e)),
    };
    if !group.is_empty() && !group.ends_with('\n') {
        group.push('\n');
    }
    group.push_str(&format!("{}:x:{}:\n", user.name, user.uid));
    std::fs::write(&group_path, group).map_err(|e| StrataError::io(&group_path, e))?;

    let home = rootfs.join(user.home.trim_start_matches('/'));
    std::fs::create_dir_all(&home).map_err(|e| StrataError::io(&home, e))?;
    chown_home(&home, user.uid);

    tracing::info!(user = %user.name, uid = user.uid, "account created");
    Ok(())
}

#[cfg(target_os = "linux")]
fn chown_home(home: &Path, uid: u32) {
    // Only meaningful when the build runs as root; otherwise the copied
    // tree stays owned by the builder and extraction fixes it up.
    if nix::unistd::geteuid().is_root() {
        let _ = nix::unistd::chown(
            home,
            Some(nix::unistd::Uid::from_raw(uid)),
            Some(nix::unistd::Gid::from_raw(uid)),
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn chown_home(_home: &Path, _uid: u32) {}
