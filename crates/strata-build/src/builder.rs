//! Build orchestration: runs the plan steps in order and registers the
//! resulting image.
//!
//! Failure at any stage aborts the build; because catalog registration is
//! the final action, an aborted build leaves no image behind. Layer
//! archives that already made it into the store are harmless — the store
//! is content-addressed and unreferenced layers are just cache.

use std::ffi::OsString;
use std::path::Path;

use strata_common::config::StrataConfig;
use strata_common::constants::{RECIPE_EXTENSION, RUN_CONFIG_FILE};
use strata_common::error::{Result, StrataError};
use strata_common::types::{BuildStage, ImageId};
use strata_image::base::{materialize_base, resolve_base};
use strata_image::catalog::{ImageCatalog, ImageEntry};
use strata_image::layer::archive_dir;
use strata_image::runconfig::RunConfig;
use strata_image::store::LayerStore;
use strata_recipe::plan::BuildPlan;

use crate::runner::CommandRunner;
use crate::{account, deps, source, toolchain};

/// Executes build plans against a build context.
pub struct ImageBuilder {
    config: StrataConfig,
    runner: Box<dyn CommandRunner>,
}

impl ImageBuilder {
    /// Creates a builder using the given storage layout and runner.
    #[must_use]
    pub fn new(config: StrataConfig, runner: Box<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Builds an image from a validated plan and registers it under `tag`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage. No catalog entry is
    /// written unless every stage succeeds.
    pub fn build(&self, plan: &BuildPlan, context: &Path, tag: &str) -> Result<ImageEntry> {
        let id = ImageId::generate();
        let scratch = self.config.data_dir.join("tmp").join(id.as_str());
        std::fs::create_dir_all(&scratch).map_err(|e| StrataError::io(&scratch, e))?;
        tracing::info!(id = %id, tag, context = %context.display(), "starting build");

        let result = self.execute(plan, context, tag, id, &scratch);
        if let Err(e) = std::fs::remove_dir_all(&scratch) {
            tracing::warn!(scratch = %scratch.display(), error = %e, "scratch cleanup failed");
        }
        result
    }

    fn execute(
        &self,
        plan: &BuildPlan,
        context: &Path,
        tag: &str,
        id: ImageId,
        scratch: &Path,
    ) -> Result<ImageEntry> {
        let store = LayerStore::open(&self.config.layer_store)?;
        let catalog = ImageCatalog::open(&self.config.catalog_dir)?;
        let rootfs = scratch.join("rootfs");

        tracing::info!(stage = %BuildStage::Base, base = %plan.base);
        let base_source = resolve_base(&plan.base)?;
        let staged_base = scratch.join("base.tar.gz");
        let base_layer = materialize_base(&base_source, &rootfs, &staged_base)?;
        let _ = store.put(&staged_base, &base_layer.digest)?;

        tracing::info!(stage = %BuildStage::Workdir, workdir = %plan.workdir);
        let workdir = source::prepare_workdir(&rootfs, &plan.workdir)?;

        if plan.toolchain.is_empty() {
            tracing::debug!(stage = %BuildStage::Toolchain, "no toolchain packages requested");
        } else {
            tracing::info!(stage = %BuildStage::Toolchain, packages = ?plan.toolchain);
            toolchain::install_toolchain(self.runner.as_ref(), &rootfs, &plan.toolchain)?;
        }

        if let Some(manifest) = &plan.manifest {
            tracing::info!(stage = %BuildStage::Dependencies, manifest = %manifest);
            let _ = deps::install_dependencies(
                self.runner.as_ref(),
                &rootfs,
                &plan.workdir,
                context,
                manifest,
            )?;
        }

        if let Some(copy) = &plan.copy {
            tracing::info!(stage = %BuildStage::Source, source = %copy);
            source::copy_context(context, copy, &workdir, &recipe_files(context)?)?;
        }

        tracing::info!(stage = %BuildStage::Account, user = %plan.user.name, uid = plan.user.uid);
        account::create_account(&rootfs, &plan.user)?;

        tracing::info!(stage = %BuildStage::Finalize);
        // Bases can ship a dirty package cache even when no toolchain step
        // ran; the final image is clean either way.
        toolchain::purge_package_cache(&rootfs)?;
        toolchain::verify_cache_clean(&rootfs)?;
        let staged_build = scratch.join("build.tar.gz");
        let build_layer = archive_dir(&rootfs, &staged_build)?;
        let _ = store.put(&staged_build, &build_layer.digest)?;

        let run_config = RunConfig {
            user: plan.user.name.clone(),
            uid: plan.user.uid,
            gid: plan.user.uid,
            workdir: plan.workdir.clone(),
            cmd: plan.cmd.clone(),
            env: std::collections::BTreeMap::new(),
        };
        let image_dir = self.config.catalog_dir.join(id.as_str());
        std::fs::create_dir_all(&image_dir).map_err(|e| StrataError::io(&image_dir, e))?;
        run_config.save(&image_dir.join(RUN_CONFIG_FILE))?;

        let entry = ImageEntry {
            id,
            tag: tag.to_string(),
            layers: vec![
                base_layer.digest.as_hex().to_string(),
                build_layer.digest.as_hex().to_string(),
            ],
            config: run_config,
            size_bytes: base_layer.size_bytes + build_layer.size_bytes,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        catalog.register(entry.clone())?;

        tracing::info!(id = %entry.id, tag = %entry.tag, size = entry.size_bytes, "build complete");
        Ok(entry)
    }
}

/// Top-level recipe files in the context; never copied into the image.
fn recipe_files(context: &Path) -> Result<Vec<OsString>> {
    let mut names = Vec::new();
    let read_dir = std::fs::read_dir(context).map_err(|e| StrataError::io(context, e))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| StrataError::io(context, e))?;
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(RECIPE_EXTENSION)
        {
            names.push(entry.file_name());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use strata_recipe::plan::ExecutionUser;

    use super::*;
    use crate::runner::ExecOutput;

    struct ScriptedRunner {
        exit_code: i32,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn succeeding() -> Self {
            Self {
                exit_code: 0,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, _rootfs: &Path, argv: &[String]) -> Result<ExecOutput> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(argv.to_vec());
            Ok(ExecOutput {
                stdout: String::new(),
                stderr: "scripted failure".to_string(),
                exit_code: self.exit_code,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn fixture(dir: &Path) -> (BuildPlan, std::path::PathBuf) {
        let base = dir.join("base");
        std::fs::create_dir_all(base.join("etc")).expect("mkdir base");
        std::fs::write(base.join("etc/alpine-release"), b"3.20\n").expect("release");

        let context = dir.join("context");
        std::fs::create_dir_all(&context).expect("mkdir context");
        std::fs::write(context.join("main.py"), b"print('up')\n").expect("main");
        std::fs::write(context.join("requirements.txt"), b"flask>=3.0\n").expect("manifest");
        std::fs::write(context.join("build.strata"), b"# not app code\n").expect("recipe");

        let plan = BuildPlan {
            base: format!("file://{}", base.display()),
            workdir: "/app".to_string(),
            toolchain: vec!["gcc".to_string(), "g++".to_string()],
            manifest: Some("requirements.txt".to_string()),
            copy: Some(".".to_string()),
            user: ExecutionUser {
                name: "amvera".to_string(),
                uid: 1000,
                home: "/home/amvera".to_string(),
            },
            cmd: vec!["python".to_string(), "main.py".to_string()],
        };
        (plan, context)
    }

    #[test]
    fn successful_build_registers_one_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StrataConfig::rooted_at(dir.path().join("data"));
        let (plan, context) = fixture(dir.path());

        let builder = ImageBuilder::new(config.clone(), Box::new(ScriptedRunner::succeeding()));
        let entry = builder.build(&plan, &context, "app:latest").expect("build");

        assert_eq!(entry.tag, "app:latest");
        assert_eq!(entry.layers.len(), 2);
        assert_eq!(entry.config.uid, 1000);
        assert_eq!(entry.config.cmd, ["python", "main.py"]);

        let catalog = ImageCatalog::open(&config.catalog_dir).expect("catalog");
        assert_eq!(catalog.list().expect("list").len(), 1);
        assert!(config
            .catalog_dir
            .join(entry.id.as_str())
            .join(RUN_CONFIG_FILE)
            .is_file());

        let store = LayerStore::open(&config.layer_store).expect("store");
        for hex in &entry.layers {
            let digest = strata_common::types::Digest::from_hex(hex.clone()).expect("digest");
            assert!(store.has_layer(&digest));
        }
    }

    #[test]
    fn failed_toolchain_install_registers_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StrataConfig::rooted_at(dir.path().join("data"));
        let (plan, context) = fixture(dir.path());

        let runner = ScriptedRunner {
            exit_code: 1,
            calls: Mutex::new(Vec::new()),
        };
        let builder = ImageBuilder::new(config.clone(), Box::new(runner));
        assert!(builder.build(&plan, &context, "app:latest").is_err());

        let catalog = ImageCatalog::open(&config.catalog_dir).expect("catalog");
        assert!(catalog.list().expect("list").is_empty());
    }

    #[test]
    fn scratch_directory_is_removed_after_build() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StrataConfig::rooted_at(dir.path().join("data"));
        let (plan, context) = fixture(dir.path());

        let builder = ImageBuilder::new(config.clone(), Box::new(ScriptedRunner::succeeding()));
        let _ = builder.build(&plan, &context, "app:latest").expect("build");

        let tmp = config.data_dir.join("tmp");
        let leftover: Vec<_> = std::fs::read_dir(&tmp)
            .map(|rd| rd.flatten().collect())
            .unwrap_or_default();
        assert!(leftover.is_empty(), "scratch left behind: {leftover:?}");
    }
}
