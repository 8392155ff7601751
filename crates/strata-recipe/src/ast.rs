//! Abstract syntax tree for `.strata` recipe files.

/// A single parsed recipe instruction, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `FROM "<uri>"` — base environment selection.
    From {
        /// Base image source URI (`file://` or `tar://`).
        source: String,
    },
    /// `WORKDIR "<path>"` — working directory inside the image.
    Workdir {
        /// Absolute path inside the image rootfs.
        path: String,
    },
    /// `TOOLCHAIN [pkg, ...]` — system package installation.
    Toolchain {
        /// System packages to install (compiler/linker toolchain).
        packages: Vec<String>,
    },
    /// `INSTALL "<manifest>"` — dependency-manifest installation.
    Install {
        /// Manifest path relative to the build context.
        manifest: String,
    },
    /// `COPY "<path>"` — source tree materialization.
    Copy {
        /// Source path relative to the build context (`"."` for the whole
        /// context).
        source: String,
    },
    /// `USER <name> { ... }` — restricted execution account.
    User(UserDecl),
    /// `CMD ["<argv0>", ...]` — entry command, exec form.
    Cmd {
        /// Entry command argv; never subject to argument injection.
        argv: Vec<String>,
    },
}

impl Instruction {
    /// Returns the recipe keyword for this instruction.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::From { .. } => "FROM",
            Self::Workdir { .. } => "WORKDIR",
            Self::Toolchain { .. } => "TOOLCHAIN",
            Self::Install { .. } => "INSTALL",
            Self::Copy { .. } => "COPY",
            Self::User(_) => "USER",
            Self::Cmd { .. } => "CMD",
        }
    }
}

/// A `USER` declaration: the account the image runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecl {
    /// Account name.
    pub name: String,
    /// Numeric identity; defaults to 1000 when the block omits it.
    pub uid: Option<u32>,
    /// Home directory; defaults to `/home/<name>`.
    pub home: Option<String>,
}
