//! Semantic validation of the parsed instruction stream.
//!
//! Enforces the order-sensitivity of the build sequence and the
//! privilege-drop ordering invariant: every identity-sensitive step
//! (toolchain install, dependency install, source copy) must appear before
//! the `USER` declaration, and the entry command must be the terminal
//! instruction.

use strata_common::error::{Result, StrataError};

use crate::ast::{Instruction, UserDecl};
use crate::plan::{BuildPlan, ExecutionUser};

/// Validates an instruction stream and normalizes it into a [`BuildPlan`].
///
/// # Checks performed
///
/// 1. Exactly one `FROM`, and it is the first instruction.
/// 2. At most one `WORKDIR`, appearing before `INSTALL` and `COPY`.
/// 3. At most one each of `TOOLCHAIN`, `INSTALL`, `COPY`.
/// 4. Exactly one `USER`, after all of `TOOLCHAIN`/`INSTALL`/`COPY`.
/// 5. Exactly one `CMD`, last, with a non-empty argv.
/// 6. The `USER` uid is non-zero and the name non-empty.
///
/// # Errors
///
/// Returns an error if any semantic check fails.
pub fn validate(instructions: &[Instruction]) -> Result<BuildPlan> {
    tracing::debug!(count = instructions.len(), "validating recipe");

    check_from_first(instructions)?;
    check_singletons(instructions)?;
    check_ordering(instructions)?;
    normalize(instructions)
}

const fn semantic_err(message: String) -> StrataError {
    StrataError::Recipe { message }
}

fn check_from_first(instructions: &[Instruction]) -> Result<()> {
    match instructions.first() {
        Some(Instruction::From { .. }) => Ok(()),
        Some(other) => Err(semantic_err(format!(
            "FROM must be the first instruction, found {}",
            other.keyword()
        ))),
        None => Err(semantic_err("recipe is empty: a FROM base is required".into())),
    }
}

fn check_singletons(instructions: &[Instruction]) -> Result<()> {
    for keyword in ["FROM", "WORKDIR", "TOOLCHAIN", "INSTALL", "COPY", "USER", "CMD"] {
        let count = instructions
            .iter()
            .filter(|i| i.keyword() == keyword)
            .count();
        if count > 1 {
            return Err(semantic_err(format!(
                "instruction {keyword} may appear at most once, found {count}"
            )));
        }
    }
    Ok(())
}

/// Position of an instruction keyword in the stream, if present.
fn position(instructions: &[Instruction], keyword: &str) -> Option<usize> {
    instructions.iter().position(|i| i.keyword() == keyword)
}

fn check_ordering(instructions: &[Instruction]) -> Result<()> {
    let user_pos = position(instructions, "USER")
        .ok_or_else(|| semantic_err("a USER declaration is required".into()))?;
    let cmd_pos = position(instructions, "CMD")
        .ok_or_else(|| semantic_err("a CMD entry command is required".into()))?;

    // Identity-sensitive setup completes while still privileged.
    for keyword in ["TOOLCHAIN", "INSTALL", "COPY"] {
        if let Some(pos) = position(instructions, keyword) {
            if pos > user_pos {
                return Err(semantic_err(format!(
                    "{keyword} must precede USER: privileged setup cannot follow the identity switch"
                )));
            }
        }
    }

    if let (Some(workdir_pos), Some(install_pos)) =
        (position(instructions, "WORKDIR"), position(instructions, "INSTALL"))
    {
        if workdir_pos > install_pos {
            return Err(semantic_err("WORKDIR must precede INSTALL".into()));
        }
    }
    if let (Some(workdir_pos), Some(copy_pos)) =
        (position(instructions, "WORKDIR"), position(instructions, "COPY"))
    {
        if workdir_pos > copy_pos {
            return Err(semantic_err("WORKDIR must precede COPY".into()));
        }
    }

    if cmd_pos != instructions.len() - 1 {
        return Err(semantic_err(
            "CMD must be the last instruction in the recipe".into(),
        ));
    }
    if user_pos > cmd_pos {
        return Err(semantic_err("USER must precede CMD".into()));
    }

    Ok(())
}

fn normalize(instructions: &[Instruction]) -> Result<BuildPlan> {
    let mut base = None;
    let mut workdir = None;
    let mut toolchain = Vec::new();
    let mut manifest = None;
    let mut copy = None;
    let mut user = None;
    let mut cmd = None;

    for instruction in instructions {
        match instruction {
            Instruction::From { source } => base = Some(source.clone()),
            Instruction::Workdir { path } => workdir = Some(path.clone()),
            Instruction::Toolchain { packages } => toolchain = packages.clone(),
            Instruction::Install { manifest: m } => manifest = Some(m.clone()),
            Instruction::Copy { source } => copy = Some(source.clone()),
            Instruction::User(decl) => user = Some(normalize_user(decl)?),
            Instruction::Cmd { argv } => cmd = Some(argv.clone()),
        }
    }

    let base = base.ok_or_else(|| semantic_err("a FROM base is required".into()))?;
    let user = user.ok_or_else(|| semantic_err("a USER declaration is required".into()))?;
    let cmd = cmd.ok_or_else(|| semantic_err("a CMD entry command is required".into()))?;

    if cmd.is_empty() {
        return Err(semantic_err("CMD argv must not be empty".into()));
    }

    let workdir = workdir.unwrap_or_else(|| "/app".into());
    if !workdir.starts_with('/') {
        return Err(semantic_err(format!(
            "WORKDIR must be an absolute path, got \"{workdir}\""
        )));
    }

    Ok(BuildPlan {
        base,
        workdir,
        toolchain,
        manifest,
        copy,
        user,
        cmd,
    })
}

fn normalize_user(decl: &UserDecl) -> Result<ExecutionUser> {
    if decl.name.is_empty() {
        return Err(semantic_err("USER name must not be empty".into()));
    }
    let uid = decl.uid.unwrap_or(strata_common::constants::DEFAULT_UID);
    if uid == 0 {
        return Err(semantic_err(
            "USER uid 0 is forbidden: the execution identity must be unprivileged".into(),
        ));
    }
    if decl.name == "root" {
        return Err(semantic_err(
            "USER root is forbidden: the execution identity must be unprivileged".into(),
        ));
    }
    let home = decl
        .home
        .clone()
        .unwrap_or_else(|| format!("/home/{}", decl.name));
    Ok(ExecutionUser {
        name: decl.name.clone(),
        uid,
        home,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const FULL_RECIPE: &str = r#"
FROM "tar:///opt/bases/python312.tar.gz"
WORKDIR "/app"
TOOLCHAIN [gcc, g++]
INSTALL "requirements.txt"
COPY "."
USER amvera { uid = 1000 }
CMD ["python", "main.py"]
"#;

    fn plan_of(input: &str) -> Result<BuildPlan> {
        validate(&parse(input).expect("parse"))
    }

    #[test]
    fn validate_full_recipe_produces_plan() {
        let plan = plan_of(FULL_RECIPE).expect("should validate");
        assert_eq!(plan.base, "tar:///opt/bases/python312.tar.gz");
        assert_eq!(plan.workdir, "/app");
        assert_eq!(plan.toolchain, vec!["gcc", "g++"]);
        assert_eq!(plan.manifest.as_deref(), Some("requirements.txt"));
        assert_eq!(plan.copy.as_deref(), Some("."));
        assert_eq!(plan.user.name, "amvera");
        assert_eq!(plan.user.uid, 1000);
        assert_eq!(plan.user.home, "/home/amvera");
        assert_eq!(plan.cmd, vec!["python", "main.py"]);
    }

    #[test]
    fn validate_minimal_recipe_defaults_workdir_and_uid() {
        let input = r#"
FROM "file:///opt/rootfs"
USER amvera
CMD ["python", "main.py"]
"#;
        let plan = plan_of(input).expect("should validate");
        assert_eq!(plan.workdir, "/app");
        assert_eq!(plan.user.uid, 1000);
        assert!(plan.toolchain.is_empty());
        assert!(plan.manifest.is_none());
    }

    #[test]
    fn validate_empty_recipe_fails() {
        let err = plan_of("").unwrap_err();
        assert!(err.to_string().contains("FROM"), "got: {err}");
    }

    #[test]
    fn validate_from_not_first_fails() {
        let input = r#"
WORKDIR "/app"
FROM "file:///opt/rootfs"
USER amvera
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("first instruction"), "got: {err}");
    }

    #[test]
    fn validate_duplicate_from_fails() {
        let input = r#"
FROM "file:///a"
FROM "file:///b"
USER amvera
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("at most once"), "got: {err}");
    }

    #[test]
    fn validate_copy_after_user_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
USER amvera
COPY "."
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(
            err.to_string().contains("must precede USER"),
            "got: {err}"
        );
    }

    #[test]
    fn validate_cmd_not_last_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
CMD ["python", "main.py"]
USER amvera
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("last instruction"), "got: {err}");
    }

    #[test]
    fn validate_missing_user_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("USER"), "got: {err}");
    }

    #[test]
    fn validate_missing_cmd_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
USER amvera
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("CMD"), "got: {err}");
    }

    #[test]
    fn validate_uid_zero_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
USER amvera { uid = 0 }
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("uid 0"), "got: {err}");
    }

    #[test]
    fn validate_user_root_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
USER root { uid = 1000 }
CMD ["python", "main.py"]
"#;
        assert!(plan_of(input).is_err());
    }

    #[test]
    fn validate_empty_cmd_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
USER amvera
CMD []
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("argv"), "got: {err}");
    }

    #[test]
    fn validate_relative_workdir_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
WORKDIR "app"
USER amvera
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("absolute"), "got: {err}");
    }

    #[test]
    fn validate_workdir_after_copy_fails() {
        let input = r#"
FROM "file:///opt/rootfs"
COPY "."
WORKDIR "/app"
USER amvera
CMD ["python", "main.py"]
"#;
        let err = plan_of(input).unwrap_err();
        assert!(err.to_string().contains("WORKDIR"), "got: {err}");
    }
}
