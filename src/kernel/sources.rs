//! Kernel Source Tree Layout
//!
//! Maps source tree identities to remote URLs, git references and on-disk
//! locations. Mainline trees live under `kernels_root/<version>`; backport tool
//! trees live under `backports_root/backports-<tag>`.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::kernel::version::KernelVersion;

/// Stable mainline kernel repository
pub const MAINLINE_REMOTE: &str =
    "https://git.kernel.org/pub/scm/linux/kernel/git/stable/linux.git";

/// Backports tooling repository (gentree.py and friends)
pub const BACKPORTS_REMOTE: &str =
    "https://git.kernel.org/pub/scm/linux/kernel/git/backports/backports.git";

/// Kind of source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Mainline,
    Backport,
}

/// Identity of a source tree: `(kind, version or backport tag)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceTreeId {
    kind: TreeKind,
    key: String,
}

impl SourceTreeId {
    /// Mainline tree for a kernel release
    pub fn mainline(version: &KernelVersion) -> Self {
        SourceTreeId {
            kind: TreeKind::Mainline,
            key: version.as_str().to_string(),
        }
    }

    /// Backport tool tree for a backport tag (e.g. "v3.14-1")
    pub fn backport(tag: &str) -> Self {
        SourceTreeId {
            kind: TreeKind::Backport,
            key: tag.to_string(),
        }
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// Git tag or branch to fetch
    pub fn reference(&self) -> String {
        match self.kind {
            TreeKind::Mainline => format!("v{}", self.key),
            TreeKind::Backport => self.key.clone(),
        }
    }

    /// Directory name below the kind's root
    pub fn dir_name(&self) -> String {
        match self.kind {
            TreeKind::Mainline => self.key.clone(),
            TreeKind::Backport => format!("backports-{}", self.key),
        }
    }
}

impl fmt::Display for SourceTreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TreeKind::Mainline => write!(f, "linux {}", self.key),
            TreeKind::Backport => write!(f, "backports {}", self.key),
        }
    }
}

/// Remote URLs and local roots for every tree kind
#[derive(Debug, Clone)]
pub struct KernelSources {
    kernels_root: PathBuf,
    backports_root: PathBuf,
    mainline_url: String,
    backports_url: String,
}

impl KernelSources {
    pub fn new(
        kernels_root: impl Into<PathBuf>,
        backports_root: impl Into<PathBuf>,
        mainline_url: impl Into<String>,
        backports_url: impl Into<String>,
    ) -> Self {
        KernelSources {
            kernels_root: kernels_root.into(),
            backports_root: backports_root.into(),
            mainline_url: mainline_url.into(),
            backports_url: backports_url.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        KernelSources::new(
            settings.kernels_root.clone(),
            settings.backports_root.clone(),
            settings.mainline_url.clone(),
            settings.backports_url.clone(),
        )
    }

    /// Remote to clone a tree kind from
    pub fn remote_url(&self, kind: TreeKind) -> &str {
        match kind {
            TreeKind::Mainline => &self.mainline_url,
            TreeKind::Backport => &self.backports_url,
        }
    }

    /// Root directory for a tree kind
    pub fn root(&self, kind: TreeKind) -> &Path {
        match kind {
            TreeKind::Mainline => &self.kernels_root,
            TreeKind::Backport => &self.backports_root,
        }
    }

    /// Local checkout location for a tree identity
    pub fn tree_path(&self, id: &SourceTreeId) -> PathBuf {
        self.root(id.kind()).join(id.dir_name())
    }
}

impl Default for KernelSources {
    fn default() -> Self {
        KernelSources::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainline_identity() {
        let version = KernelVersion::parse("4.14-rc2").unwrap();
        let id = SourceTreeId::mainline(&version);
        assert_eq!(id.reference(), "v4.14-rc2");
        assert_eq!(id.dir_name(), "4.14-rc2");
    }

    #[test]
    fn test_backport_identity() {
        let id = SourceTreeId::backport("v3.14-1");
        assert_eq!(id.reference(), "v3.14-1");
        assert_eq!(id.dir_name(), "backports-v3.14-1");
    }

    #[test]
    fn test_default_layout() {
        let sources = KernelSources::default();
        let version = KernelVersion::parse("2.6.32.68").unwrap();
        assert_eq!(
            sources.tree_path(&SourceTreeId::mainline(&version)),
            PathBuf::from("/kernels/2.6.32.68")
        );
        assert_eq!(
            sources.tree_path(&SourceTreeId::backport("v3.14-1")),
            PathBuf::from("/backports/backports-v3.14-1")
        );
        assert_eq!(sources.remote_url(TreeKind::Mainline), MAINLINE_REMOTE);
        assert_eq!(sources.remote_url(TreeKind::Backport), BACKPORTS_REMOTE);
    }
}
