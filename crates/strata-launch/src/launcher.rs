//! Two-phase launcher with a type-encoded privilege drop.
//!
//! `Launcher<Privileged>` owns the rootfs setup; `drop_privileges`
//! consumes it and yields `Launcher<Unprivileged>`, whose only capability
//! is running the entry command. There is no path back: the transition
//! chroots into the image and sheds root identity at the process level,
//! and the type system removes the privileged API from scope.

use std::marker::PhantomData;
use std::path::PathBuf;

use strata_common::error::{Result, StrataError};
use strata_image::runconfig::RunConfig;

use crate::preflight;

/// Marker for the phase that still holds host privileges.
#[derive(Debug)]
pub struct Privileged;

/// Marker for the phase after the irreversible drop.
#[derive(Debug)]
pub struct Unprivileged;

/// Process launcher for a materialized image rootfs.
#[derive(Debug)]
pub struct Launcher<State> {
    rootfs: PathBuf,
    config: RunConfig,
    _state: PhantomData<State>,
}

impl Launcher<Privileged> {
    /// Creates a privileged launcher after running preflight checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the run configuration is privileged or the
    /// rootfs is missing the interpreter, entry file, or working
    /// directory.
    pub fn new(rootfs: impl Into<PathBuf>, config: RunConfig) -> Result<Self> {
        let rootfs = rootfs.into();
        preflight::check(&rootfs, &config)?;
        Ok(Self {
            rootfs,
            config,
            _state: PhantomData,
        })
    }

    /// Enters the rootfs and drops to the restricted identity.
    ///
    /// Order matters: the root change must happen while still privileged,
    /// supplementary groups and the gid must be shed before the uid, and
    /// once `setuid` succeeds the process can never regain root. Consuming
    /// `self` makes the transition one-way at the type level as well.
    ///
    /// # Errors
    ///
    /// Returns a launch error if any step of the transition fails; the
    /// process state is then unfit for execution and the caller must exit.
    #[cfg(target_os = "linux")]
    pub fn drop_privileges(self) -> Result<Launcher<Unprivileged>> {
        use nix::unistd::{Gid, Uid, chdir, chroot, setgid, setgroups, setuid};

        let step = |name: &str, e: nix::errno::Errno| StrataError::Launch {
            message: format!("{name} failed: {e}"),
        };

        chroot(&self.rootfs).map_err(|e| step("chroot", e))?;
        chdir(std::path::Path::new(&self.config.workdir)).map_err(|e| step("chdir", e))?;

        let gid = Gid::from_raw(self.config.gid);
        setgroups(&[gid]).map_err(|e| step("setgroups", e))?;
        setgid(gid).map_err(|e| step("setgid", e))?;
        setuid(Uid::from_raw(self.config.uid)).map_err(|e| step("setuid", e))?;

        tracing::info!(
            user = %self.config.user,
            uid = self.config.uid,
            "privileges dropped"
        );
        Ok(Launcher {
            rootfs: self.rootfs,
            config: self.config,
            _state: PhantomData,
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — the privilege drop requires Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn drop_privileges(self) -> Result<Launcher<Unprivileged>> {
        Err(StrataError::Launch {
            message: "privilege drop requires Linux".into(),
        })
    }
}

impl Launcher<Unprivileged> {
    /// Runs the entry command and waits for it to finish.
    ///
    /// The command runs exactly as baked into the image, with no argument
    /// injection. Returns the child's exit code; a signal-terminated child
    /// reports `128 + signal` in the Unix convention.
    ///
    /// # Errors
    ///
    /// Returns a launch error if the entry command cannot be spawned.
    pub fn exec(self) -> Result<i32> {
        let (program, args) =
            self.config
                .cmd
                .split_first()
                .ok_or_else(|| StrataError::Launch {
                    message: "entry command is empty".into(),
                })?;
        tracing::info!(cmd = ?self.config.cmd, workdir = %self.config.workdir, "executing entry command");

        let status = std::process::Command::new(program)
            .args(args)
            .current_dir(&self.config.workdir)
            .env("PATH", "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin")
            .env("HOME", format!("/home/{}", self.config.user))
            .env("USER", &self.config.user)
            .envs(&self.config.env)
            .status()
            .map_err(|e| StrataError::Launch {
                message: format!("failed to spawn '{program}': {e}"),
            })?;

        Ok(exit_code(&status))
    }

    #[cfg(test)]
    fn for_tests(config: RunConfig) -> Self {
        Self {
            rootfs: PathBuf::new(),
            config,
            _state: PhantomData,
        }
    }
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
