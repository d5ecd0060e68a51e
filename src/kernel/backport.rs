//! Backport selection and backported tree generation.
//!
//! Older kernels are searched after the backports project has regenerated
//! newer driver code on top of them. This module decides which backport
//! generation applies to a version, prepares the (Python 2 era) tooling when
//! needed, runs the generator, and merges its output into the target tree.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::BackportError;
use crate::kernel::version::KernelVersion;
use crate::system::run_checked;

/// File the backport generator leaves at the root of a processed tree
pub const SENTINEL_FILE: &str = "versions";

/// Versions below this need the backport tool converted to Python 3 first
pub const LEGACY_TOOL_CEILING: &str = "3.0.0";

/// One backport generation: regenerate `target_mainline` with tag
/// `backport_tag`, usable for kernels at or above `minimum_supported`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackportRule {
    pub target_mainline: &'static str,
    pub backport_tag: &'static str,
    pub minimum_supported: &'static str,
}

/// Known backport generations, newest first. Order is significant: the first
/// rule whose minimum is satisfied wins.
pub const BACKPORT_RULES: &[BackportRule] = &[
    BackportRule {
        target_mainline: "5.15.162",
        backport_tag: "v5.15.162-1",
        minimum_supported: "4.4",
    },
    BackportRule {
        target_mainline: "5.10.168",
        backport_tag: "v5.10.168-1",
        minimum_supported: "3.10",
    },
    BackportRule {
        target_mainline: "4.14-rc2",
        backport_tag: "v4.14-rc2-1",
        minimum_supported: "3.0",
    },
    BackportRule {
        target_mainline: "3.14",
        backport_tag: "v3.14-1",
        minimum_supported: "2.6.25",
    },
];

/// Outcome of backport resolution for one kernel version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackportPlan {
    pub rule: BackportRule,
    /// Newer mainline release the generator reads from
    pub target_mainline: KernelVersion,
    /// The backport tool tree must be converted before use
    pub needs_legacy_tool_fixup: bool,
}

impl BackportPlan {
    pub fn backport_tag(&self) -> &str {
        self.rule.backport_tag
    }
}

/// Select the backport generation for `version` from [`BACKPORT_RULES`]
pub fn resolve_backport(version: &KernelVersion) -> Result<BackportPlan, BackportError> {
    resolve_backport_with(BACKPORT_RULES, version)
}

/// Select the first rule in `rules` whose minimum is at or below `version`.
///
/// # Errors
/// `BackportError::NoBackportAvailable` when `version` predates every rule,
/// `BackportError::InvalidRule` when a rule holds an unparsable version.
pub fn resolve_backport_with(
    rules: &[BackportRule],
    version: &KernelVersion,
) -> Result<BackportPlan, BackportError> {
    let parse = |text: &str| {
        KernelVersion::parse(text)
            .map_err(|e| BackportError::InvalidRule(format!("'{}': {}", text, e)))
    };

    for rule in rules {
        if parse(rule.minimum_supported)? <= *version {
            let plan = BackportPlan {
                rule: *rule,
                target_mainline: parse(rule.target_mainline)?,
                needs_legacy_tool_fixup: *version < parse(LEGACY_TOOL_CEILING)?,
            };
            log::info!(
                "[Backport] Linux {} -> backport {} (from mainline {})",
                version,
                rule.backport_tag,
                rule.target_mainline
            );
            return Ok(plan);
        }
    }

    Err(BackportError::NoBackportAvailable {
        version: version.to_string(),
    })
}

/// Whether `tree` has already been through backport generation
pub fn is_backported(tree: &Path) -> bool {
    tree.join(SENTINEL_FILE).is_file()
}

/// Scratch output directory used while generating for `target`
pub fn scratch_dir_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push("-backport");
    PathBuf::from(name)
}

/// External backport code generator
#[allow(async_fn_in_trait)]
pub trait BackportGenerator {
    /// Generate backported sources from `future_tree` into `output`, running
    /// inside `tool_tree`. A non-zero exit must be reported as an error.
    async fn generate(
        &self,
        tool_tree: &Path,
        future_tree: &Path,
        output: &Path,
    ) -> Result<(), BackportError>;
}

/// Runs the backports project's `gentree.py`
#[derive(Debug, Clone)]
pub struct GentreeGenerator {
    interpreter: String,
    script: String,
    timeout: Duration,
}

impl GentreeGenerator {
    pub fn new(interpreter: impl Into<String>, script: impl Into<String>, timeout: Duration) -> Self {
        GentreeGenerator {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        GentreeGenerator::new(
            settings.python.clone(),
            settings.generator_script.clone(),
            settings.generate_timeout(),
        )
    }
}

fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

impl BackportGenerator for GentreeGenerator {
    async fn generate(
        &self,
        tool_tree: &Path,
        future_tree: &Path,
        output: &Path,
    ) -> Result<(), BackportError> {
        // The generator runs with the tool tree as cwd, so hand it absolute paths
        let future_tree = absolutize(future_tree)?;
        let output = absolutize(output)?;

        log::info!(
            "[Backport] [GENTREE] {} {} {} {}",
            self.interpreter,
            self.script,
            future_tree.display(),
            output.display()
        );

        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .arg(&future_tree)
            .arg(&output)
            .current_dir(tool_tree);

        let result = run_checked(command, self.timeout).await?;
        log::debug!(
            "[Backport] [GENTREE] generator wrote {} bytes of output",
            result.stdout.len()
        );
        Ok(())
    }
}

/// What [`materialize_backported_tree`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Sentinel present; nothing to do
    AlreadyBackported,
    /// Generator output merged; number of files copied
    Merged { files: usize },
}

/// Generate backported sources from `future_mainline` and merge them into `target`.
///
/// Skipped entirely when `target` already carries the sentinel file. The
/// generator's output only reaches `target` if the generator succeeded.
pub async fn materialize_backported_tree<G: BackportGenerator>(
    generator: &G,
    target: &Path,
    future_mainline: &Path,
    backport_tool: &Path,
) -> Result<MaterializeOutcome, BackportError> {
    if is_backported(target) {
        log::info!(
            "[Backport] {} already backported ({} present), skipping",
            target.display(),
            SENTINEL_FILE
        );
        return Ok(MaterializeOutcome::AlreadyBackported);
    }

    let scratch = scratch_dir_for(target);
    if scratch.exists() {
        log::warn!("[Backport] Removing stale scratch tree {}", scratch.display());
        fs::remove_dir_all(&scratch)?;
    }

    log::info!("[Backport] Generating and merging backports tree");
    if let Err(e) = generator
        .generate(backport_tool, future_mainline, &scratch)
        .await
    {
        log::error!("[Backport] Generator failed, target left untouched: {}", e);
        if scratch.exists() {
            let _ = fs::remove_dir_all(&scratch);
        }
        return Err(e);
    }

    let files = match merge_tree(&scratch, target) {
        Ok(files) => files,
        Err(source) => {
            log::error!(
                "[Backport] Merge into {} failed, sentinel not written: {}",
                target.display(),
                source
            );
            let _ = fs::remove_dir_all(&scratch);
            return Err(BackportError::Merge {
                scratch,
                target: target.to_path_buf(),
                source,
            });
        }
    };
    fs::remove_dir_all(&scratch)?;

    log::info!(
        "[Backport] ✓ Merged {} generated files into {}",
        files,
        target.display()
    );
    Ok(MaterializeOutcome::Merged { files })
}

/// Recursively copy `source` over `target`; files from `source` replace
/// files at the same relative path. Returns the number of files copied.
///
/// A top-level [`SENTINEL_FILE`] is copied only after everything else made it
/// across, so a failed merge never marks `target` as backported.
pub fn merge_tree(source: &Path, target: &Path) -> io::Result<usize> {
    let mut copied = 0usize;
    let sentinel = source.join(SENTINEL_FILE);

    for entry in WalkDir::new(source)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if entry.path() == sentinel {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination)?;
            copied += 1;
        }
    }

    if sentinel.is_file() {
        fs::copy(&sentinel, target.join(SENTINEL_FILE))?;
        copied += 1;
    }

    Ok(copied)
}

/// Converts an old (Python 2) backports checkout so it runs under Python 3
#[derive(Debug, Clone)]
pub struct LegacyToolFixup {
    two_to_three: String,
    reindent: String,
    timeout: Duration,
}

impl LegacyToolFixup {
    pub fn new(two_to_three: impl Into<String>, reindent: impl Into<String>, timeout: Duration) -> Self {
        LegacyToolFixup {
            two_to_three: two_to_three.into(),
            reindent: reindent.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        LegacyToolFixup::new(
            settings.two_to_three.clone(),
            settings.reindent.clone(),
            settings.generate_timeout(),
        )
    }

    /// Apply the conversion inside `tool_tree`
    pub async fn apply(&self, tool_tree: &Path) -> Result<(), BackportError> {
        log::info!("[Backport] [FIXUP] Applying python 2->3 fixes to {}", tool_tree.display());

        let steps: [(&str, &[&str]); 3] = [
            (self.two_to_three.as_str(), &["-w", "gentree.py"]),
            (self.reindent.as_str(), &["gentree.py"]),
            (self.two_to_three.as_str(), &["-w", "lib"]),
        ];
        for (program, args) in steps {
            let mut command = Command::new(program);
            command.args(args).current_dir(tool_tree);
            run_checked(command, self.timeout).await?;
        }

        // Newer coccinelle renamed --backup-suffix
        rewrite_file(&tool_tree.join("lib").join("bpcoccinelle.py"), |text| {
            text.replace("--backup-suffix", "--suffix")
        })?;
        // 2to3 leaves a self-referencing alias behind
        rewrite_file(&tool_tree.join("lib").join("patch.py"), |text| {
            text.replace("__next__ = next", "")
        })?;

        Ok(())
    }
}

fn rewrite_file(path: &Path, edit: impl FnOnce(&str) -> String) -> io::Result<()> {
    let original = fs::read_to_string(path)?;
    let updated = edit(&original);
    if updated != original {
        fs::write(path, updated)?;
    }
    Ok(())
}
