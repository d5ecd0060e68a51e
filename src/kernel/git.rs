//! Native git management using the `git2` crate.
//!
//! Source trees are fetched once, shallowly, at a single tag or branch. A
//! fetch lands in a sibling staging directory first and is renamed into place
//! only when complete, so an interrupted run never leaves a directory that a
//! later run would mistake for a finished checkout.

use git2::build::CheckoutBuilder;
use git2::{AutotagOption, Commit, FetchOptions, Remote, RemoteCallbacks, Repository};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Clone error: {0}")]
    Clone(String),

    #[error("Checkout error: {0}")]
    Checkout(String),

    #[error("Reference not found: {0}")]
    RefNotFound(String),

    #[error("Invalid reference: {0}")]
    InvalidRef(String),

    #[error("Clone of {url} did not finish within {timeout:?}")]
    TimedOut { url: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type for git operations
pub type GitResult<T> = Result<T, GitError>;

/// Fetches one reference of a remote repository into an empty directory
pub trait SourceFetcher: Send + Sync {
    /// Populate `destination` with a checkout of `reference` from `url`.
    ///
    /// `destination` does not exist yet when this is called.
    fn fetch(&self, url: &str, reference: &str, destination: &Path) -> GitResult<()>;
}

/// [`SourceFetcher`] backed by libgit2
#[derive(Debug, Default, Clone)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        GitFetcher
    }

    fn refspecs(reference: &str) -> [String; 2] {
        [
            format!("+refs/tags/{0}:refs/tags/{0}", reference),
            format!("+refs/heads/{0}:refs/remotes/origin/{0}", reference),
        ]
    }

    /// Fetch the refspecs, optionally truncated to `depth` commits
    fn fetch_refspecs(
        remote: &mut Remote<'_>,
        refspecs: &[String],
        depth: Option<i32>,
    ) -> Result<(), git2::Error> {
        let mut callbacks = RemoteCallbacks::new();
        let mut last_reported = 0u32;
        callbacks.transfer_progress(move |progress| {
            let total = progress.total_objects();
            if total > 0 {
                let percent = (progress.received_objects() as f64 / total as f64 * 100.0) as u32;
                if percent >= last_reported + 10 || (percent == 100 && last_reported != 100) {
                    last_reported = percent;
                    log::debug!(
                        "[Git] [FETCH] [PROGRESS] {}/{} objects ({} indexed) - {}%",
                        progress.received_objects(),
                        total,
                        progress.indexed_objects(),
                        percent
                    );
                }
            }
            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options.download_tags(AutotagOption::None);
        if let Some(depth) = depth {
            fetch_options.depth(depth);
        }

        remote.fetch(refspecs, Some(&mut fetch_options), None)
    }

    /// Resolve the fetched reference, tags first, to a commit
    fn resolve_reference<'r>(repo: &'r Repository, reference: &str) -> GitResult<Commit<'r>> {
        let candidates = [
            format!("refs/tags/{}", reference),
            format!("refs/remotes/origin/{}", reference),
        ];

        for candidate in &candidates {
            if let Ok(object) = repo.revparse_single(candidate) {
                return object.peel_to_commit().map_err(|e| {
                    GitError::InvalidRef(format!(
                        "'{}' does not point to a commit: {}",
                        reference, e
                    ))
                });
            }
        }

        Err(GitError::RefNotFound(reference.to_string()))
    }
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, url: &str, reference: &str, destination: &Path) -> GitResult<()> {
        log::info!("[Git] [FETCH] {} @ {} -> {}", url, reference, destination.display());

        let repo = Repository::init(destination).map_err(|e| {
            GitError::Repository(format!(
                "Failed to initialise repository at {}: {}",
                destination.display(),
                e
            ))
        })?;

        {
            let mut remote = repo.remote("origin", url).map_err(|e| {
                GitError::Repository(format!("Failed to add remote {}: {}", url, e))
            })?;
            let refspecs = Self::refspecs(reference);

            // Shallow first; some transports (local paths, dumb http) refuse depth
            if let Err(shallow_err) = Self::fetch_refspecs(&mut remote, &refspecs, Some(1)) {
                log::warn!(
                    "[Git] [FETCH] Shallow fetch failed ({}), falling back to full fetch",
                    shallow_err
                );
                Self::fetch_refspecs(&mut remote, &refspecs, None).map_err(|e| {
                    GitError::Clone(format!("Fetch of {} from {} failed: {}", reference, url, e))
                })?;
            }
        }

        let commit = Self::resolve_reference(&repo, reference)?;

        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .map_err(|e| GitError::Checkout(format!("Failed to check out {}: {}", reference, e)))?;
        repo.set_head_detached(commit.id())
            .map_err(|e| GitError::Checkout(format!("Failed to set HEAD: {}", e)))?;

        log::info!("[Git] [FETCH] ✓ {} checked out at {}", reference, commit.id());
        Ok(())
    }
}

/// A checkout that is either already in place or waiting to be committed.
///
/// Dropping an uncommitted fresh staging removes the staging directory.
#[derive(Debug)]
pub enum Staging {
    /// The destination already existed; nothing was fetched
    Present(PathBuf),
    /// A fresh fetch sits in `staging`, to be renamed to `destination`
    Fresh {
        staging: PathBuf,
        destination: PathBuf,
        committed: bool,
    },
}

impl Staging {
    /// True when this call performed a fetch
    pub fn is_fresh(&self) -> bool {
        matches!(self, Staging::Fresh { .. })
    }

    /// Directory holding the tree contents right now
    pub fn path(&self) -> &Path {
        match self {
            Staging::Present(path) => path,
            Staging::Fresh { staging, .. } => staging,
        }
    }

    /// Move a fresh checkout into its final location
    pub fn commit(mut self) -> GitResult<PathBuf> {
        match &mut self {
            Staging::Present(path) => Ok(path.clone()),
            Staging::Fresh {
                staging,
                destination,
                committed,
            } => {
                fs::rename(&*staging, &*destination)?;
                *committed = true;
                log::info!("[Git] [PROVISION] ✓ Tree ready at {}", destination.display());
                Ok(destination.clone())
            }
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if let Staging::Fresh {
            staging,
            committed: false,
            ..
        } = self
        {
            if staging.exists() {
                log::warn!(
                    "[Git] [PROVISION] Discarding unfinished checkout {}",
                    staging.display()
                );
                let _ = fs::remove_dir_all(&*staging);
            }
        }
    }
}

/// Ensures source trees exist locally, fetching each identity at most once
pub struct TreeProvisioner<F: SourceFetcher + 'static> {
    fetcher: Arc<F>,
    clone_timeout: Duration,
}

impl<F: SourceFetcher + 'static> TreeProvisioner<F> {
    pub fn new(fetcher: F, clone_timeout: Duration) -> Self {
        TreeProvisioner {
            fetcher: Arc::new(fetcher),
            clone_timeout,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Whether a tree already exists at `destination`. Existence is the only check.
    pub fn is_present(destination: &Path) -> bool {
        destination.is_dir()
    }

    /// Staging directory used while `destination` is being fetched
    pub fn staging_path(destination: &Path) -> PathBuf {
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tree".to_string());
        destination.with_file_name(format!(".{}.partial", name))
    }

    /// Return `destination`, fetching `reference` from `url` if it is missing.
    ///
    /// # Errors
    /// `GitError::RefNotFound` for an unknown tag/branch, `GitError::Clone` for
    /// transport failures, `GitError::TimedOut` when the clone timeout elapses.
    pub async fn ensure_tree(
        &self,
        url: &str,
        reference: &str,
        destination: &Path,
    ) -> GitResult<PathBuf> {
        self.stage(url, reference, destination).await?.commit()
    }

    /// Fetch into the staging directory without publishing the result.
    ///
    /// Lets the caller prepare a fresh tree before [`Staging::commit`] makes it
    /// visible to later runs.
    pub async fn stage(&self, url: &str, reference: &str, destination: &Path) -> GitResult<Staging> {
        if Self::is_present(destination) {
            log::info!(
                "[Git] [PROVISION] Using existing tree {}",
                destination.display()
            );
            return Ok(Staging::Present(destination.to_path_buf()));
        }

        let staging = Self::staging_path(destination);
        if staging.exists() {
            log::warn!(
                "[Git] [PROVISION] Removing stale staging directory {}",
                staging.display()
            );
            fs::remove_dir_all(&staging)?;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("[Git] [PROVISION] Downloading {} ({})", reference, url);

        let fetcher = Arc::clone(&self.fetcher);
        let (task_url, task_reference, task_staging) =
            (url.to_string(), reference.to_string(), staging.clone());
        let task = tokio::task::spawn_blocking(move || {
            fetcher.fetch(&task_url, &task_reference, &task_staging)
        });

        // From here on the staging directory is owned by the guard
        let guard = Staging::Fresh {
            staging,
            destination: destination.to_path_buf(),
            committed: false,
        };

        match tokio::time::timeout(self.clone_timeout, task).await {
            Ok(Ok(Ok(()))) => Ok(guard),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(join_err)) => Err(GitError::Clone(format!(
                "Fetch task for {} failed: {}",
                reference, join_err
            ))),
            Err(_) => Err(GitError::TimedOut {
                url: url.to_string(),
                timeout: self.clone_timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_error_display() {
        let err = GitError::RefNotFound("v9.99".to_string());
        assert_eq!(err.to_string(), "Reference not found: v9.99");
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let staging = TreeProvisioner::<GitFetcher>::staging_path(Path::new("/kernels/4.4"));
        assert_eq!(staging, PathBuf::from("/kernels/.4.4.partial"));
    }

    #[test]
    fn test_uncommitted_staging_is_removed_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let staging = temp.path().join(".tree.partial");
        fs::create_dir_all(staging.join("sub")).unwrap();

        drop(Staging::Fresh {
            staging: staging.clone(),
            destination: temp.path().join("tree"),
            committed: false,
        });

        assert!(!staging.exists());
        assert!(!temp.path().join("tree").exists());
    }

    #[test]
    fn test_commit_renames_into_place() {
        let temp = tempfile::tempdir().unwrap();
        let staging = temp.path().join(".tree.partial");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("Makefile"), "VERSION = 4\n").unwrap();

        let destination = temp.path().join("tree");
        let committed = Staging::Fresh {
            staging: staging.clone(),
            destination: destination.clone(),
            committed: false,
        }
        .commit()
        .unwrap();

        assert_eq!(committed, destination);
        assert!(destination.join("Makefile").is_file());
        assert!(!staging.exists());
    }
}
