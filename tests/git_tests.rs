use ksym_locator::kernel::git::{GitError, GitFetcher, GitResult, SourceFetcher, TreeProvisioner};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

/// Create a repository with one commit holding `Makefile`, tagged `tag`
fn init_tagged_repo(path: &Path, tag: &str) {
    let repo = git2::Repository::init(path).expect("Failed to init source repo");
    fs::write(path.join("Makefile"), "VERSION = 2\nPATCHLEVEL = 6\n")
        .expect("Failed to write Makefile");

    let mut index = repo.index().expect("Failed to get index");
    index
        .add_path(Path::new("Makefile"))
        .expect("Failed to add file");
    index.write().expect("Failed to write index");
    let tree_id = index.write_tree().expect("Failed to write tree");
    let tree = repo.find_tree(tree_id).expect("Failed to find tree");
    let sig = git2::Signature::now("Test User", "test@example.com")
        .expect("Failed to create signature");
    let commit_id = repo
        .commit(Some("HEAD"), &sig, &sig, "Linux 2.6.32", &tree, &[])
        .expect("Failed to commit");
    let commit = repo.find_object(commit_id, None).expect("Failed to find commit");
    repo.tag_lightweight(tag, &commit, false)
        .expect("Failed to tag");
}

#[tokio::test]
async fn test_provisioner_fetches_tag_from_local_remote() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let source = temp_dir.path().join("source");
    init_tagged_repo(&source, "v2.6.32");

    let destination = temp_dir.path().join("kernels").join("2.6.32");
    let provisioner = TreeProvisioner::new(GitFetcher::new(), Duration::from_secs(60));
    let tree = provisioner
        .ensure_tree(source.to_str().unwrap(), "v2.6.32", &destination)
        .await
        .expect("Failed to provision tree");

    assert_eq!(tree, destination);
    assert!(destination.join("Makefile").is_file());
    assert!(destination.join(".git").exists());
    assert!(!TreeProvisioner::<GitFetcher>::staging_path(&destination).exists());
}

#[tokio::test]
async fn test_unknown_reference_leaves_nothing_behind() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let source = temp_dir.path().join("source");
    init_tagged_repo(&source, "v2.6.32");

    let destination = temp_dir.path().join("kernels").join("9.9");
    let provisioner = TreeProvisioner::new(GitFetcher::new(), Duration::from_secs(60));
    let result = provisioner
        .ensure_tree(source.to_str().unwrap(), "v9.9", &destination)
        .await;

    assert!(matches!(result, Err(GitError::RefNotFound(_))));
    assert!(!destination.exists());
    assert!(!TreeProvisioner::<GitFetcher>::staging_path(&destination).exists());
}

/// Counts fetches and writes a marker file instead of talking to a remote
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

impl SourceFetcher for CountingFetcher {
    fn fetch(&self, _url: &str, reference: &str, destination: &Path) -> GitResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        fs::create_dir_all(destination)?;
        fs::write(destination.join("REF"), reference)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_second_provision_does_not_fetch() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let destination = temp_dir.path().join("backports-v3.14-1");
    let provisioner = TreeProvisioner::new(CountingFetcher::default(), Duration::from_secs(5));

    for _ in 0..2 {
        provisioner
            .ensure_tree("unused", "v3.14-1", &destination)
            .await
            .expect("Failed to provision tree");
    }

    assert_eq!(provisioner.fetcher().calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        fs::read_to_string(destination.join("REF")).unwrap(),
        "v3.14-1"
    );
}

#[tokio::test]
async fn test_stale_staging_is_replaced() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let destination = temp_dir.path().join("4.4");
    let staging = TreeProvisioner::<CountingFetcher>::staging_path(&destination);
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("half-written"), "").unwrap();

    let provisioner = TreeProvisioner::new(CountingFetcher::default(), Duration::from_secs(5));
    provisioner
        .ensure_tree("unused", "v4.4", &destination)
        .await
        .expect("Failed to provision tree");

    assert!(destination.join("REF").is_file());
    assert!(!destination.join("half-written").exists());
}

/// Never returns within the test's clone timeout
struct StalledFetcher;

impl SourceFetcher for StalledFetcher {
    fn fetch(&self, _url: &str, _reference: &str, destination: &Path) -> GitResult<()> {
        fs::create_dir_all(destination)?;
        std::thread::sleep(Duration::from_millis(500));
        Ok(())
    }
}

#[tokio::test]
async fn test_clone_timeout() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let destination = temp_dir.path().join("5.10.168");
    let provisioner = TreeProvisioner::new(StalledFetcher, Duration::from_millis(50));

    let result = provisioner.ensure_tree("unused", "v5.10.168", &destination).await;

    assert!(matches!(result, Err(GitError::TimedOut { .. })));
    assert!(!destination.exists());
}
