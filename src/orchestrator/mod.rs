//! Run Orchestration: Inspection -> Provisioning -> Backporting -> Searching.
//!
//! Every step is awaited before the next one starts. Source preparation
//! happens once, before the first symbol search.

pub mod state;

use std::fs;
use std::path::{Path, PathBuf};

pub use state::{RunPhase, RunState};

use crate::config::Settings;
use crate::error::{BackportError, ImageError, Result};
use crate::kernel::backport::{
    is_backported, materialize_backported_tree, resolve_backport, BackportGenerator,
    GentreeGenerator, LegacyToolFixup, MaterializeOutcome,
};
use crate::kernel::git::{GitFetcher, SourceFetcher, TreeProvisioner};
use crate::kernel::image::{locate_version, ElfConversionExtractor, SymbolTableExtractor};
use crate::kernel::sources::{KernelSources, SourceTreeId, TreeKind};
use crate::kernel::version::KernelVersion;
use crate::models::SymbolMatches;
use crate::report::RunReport;
use crate::search::{SearchBackend, SearchProgress, SymbolSearchEngine, TextSearcher};

/// Provisions the mainline tree for a version and backports it when possible
pub struct SourcePreparer<F: SourceFetcher + 'static, G: BackportGenerator> {
    sources: KernelSources,
    provisioner: TreeProvisioner<F>,
    generator: G,
    fixup: LegacyToolFixup,
}

impl<F: SourceFetcher + 'static, G: BackportGenerator> SourcePreparer<F, G> {
    pub fn new(
        sources: KernelSources,
        provisioner: TreeProvisioner<F>,
        generator: G,
        fixup: LegacyToolFixup,
    ) -> Self {
        SourcePreparer {
            sources,
            provisioner,
            generator,
            fixup,
        }
    }

    pub fn sources(&self) -> &KernelSources {
        &self.sources
    }

    pub fn provisioner(&self) -> &TreeProvisioner<F> {
        &self.provisioner
    }

    /// Mainline tree for `version`, fetched if it is not on disk yet
    pub async fn provision_mainline(&self, version: &KernelVersion) -> Result<PathBuf> {
        let id = SourceTreeId::mainline(version);
        let path = self
            .provisioner
            .ensure_tree(
                self.sources.remote_url(TreeKind::Mainline),
                &id.reference(),
                &self.sources.tree_path(&id),
            )
            .await?;
        Ok(path)
    }

    /// Merge backported sources into `target`.
    ///
    /// Returns `false` when no backport generation covers `version`; the
    /// caller then searches the plain mainline tree.
    pub async fn backport(&self, version: &KernelVersion, target: &Path) -> Result<bool> {
        let plan = match resolve_backport(version) {
            Ok(plan) => plan,
            Err(BackportError::NoBackportAvailable { version }) => {
                log::warn!(
                    "[Orchestrator] [BACKPORT] No backport available for Linux {}, searching mainline only",
                    version
                );
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let tool_id = SourceTreeId::backport(plan.backport_tag());
        let staging = self
            .provisioner
            .stage(
                self.sources.remote_url(TreeKind::Backport),
                &tool_id.reference(),
                &self.sources.tree_path(&tool_id),
            )
            .await?;
        if staging.is_fresh() && plan.needs_legacy_tool_fixup {
            self.fixup.apply(staging.path()).await?;
        }
        let tool_tree = staging.commit()?;

        let future_id = SourceTreeId::mainline(&plan.target_mainline);
        let future_tree = self
            .provisioner
            .ensure_tree(
                self.sources.remote_url(TreeKind::Mainline),
                &future_id.reference(),
                &self.sources.tree_path(&future_id),
            )
            .await?;

        let outcome =
            materialize_backported_tree(&self.generator, target, &future_tree, &tool_tree).await?;
        if let MaterializeOutcome::Merged { files } = outcome {
            log::info!(
                "[Orchestrator] [BACKPORT] {} backported from {} ({} files)",
                target.display(),
                plan.target_mainline,
                files
            );
        }
        Ok(true)
    }
}

impl SourcePreparer<GitFetcher, GentreeGenerator> {
    pub fn from_settings(settings: &Settings) -> Self {
        SourcePreparer::new(
            KernelSources::from_settings(settings),
            TreeProvisioner::new(GitFetcher::new(), settings.clone_timeout()),
            GentreeGenerator::from_settings(settings),
            LegacyToolFixup::from_settings(settings),
        )
    }
}

/// Full kernel-image-to-source-files run
pub struct Pipeline<E, F, G, S>
where
    E: SymbolTableExtractor,
    F: SourceFetcher + 'static,
    G: BackportGenerator,
    S: TextSearcher,
{
    extractor: E,
    preparer: SourcePreparer<F, G>,
    searcher: S,
}

impl Pipeline<ElfConversionExtractor, GitFetcher, GentreeGenerator, SearchBackend> {
    pub fn from_settings(settings: &Settings) -> Self {
        Pipeline::new(
            ElfConversionExtractor::from_settings(settings),
            SourcePreparer::from_settings(settings),
            SearchBackend::from_settings(settings),
        )
    }
}

impl<E, F, G, S> Pipeline<E, F, G, S>
where
    E: SymbolTableExtractor,
    F: SourceFetcher + 'static,
    G: BackportGenerator,
    S: TextSearcher,
{
    pub fn new(extractor: E, preparer: SourcePreparer<F, G>, searcher: S) -> Self {
        Pipeline {
            extractor,
            preparer,
            searcher,
        }
    }

    /// Locate the sources of every symbol in `image`.
    ///
    /// `on_step` is called after each symbol with its matches and the running
    /// counters.
    ///
    /// # Errors
    /// Any failure aborts the run, except a missing backport generation which
    /// falls back to the mainline tree.
    pub async fn run<P>(self, image: &Path, on_step: P) -> Result<RunReport>
    where
        P: FnMut(&SymbolMatches, &SearchProgress),
    {
        let mut state = RunState::new();
        let outcome = self.execute(image, &mut state, on_step).await;
        match &outcome {
            Ok(_) => {
                state.transition(RunPhase::Completed);
            }
            Err(e) => {
                log::error!("[Orchestrator] Run failed during {}: {}", state.phase(), e);
                state.transition(RunPhase::Failed);
            }
        }
        log::info!("[Orchestrator] Phases: {}", state.path());
        outcome
    }

    async fn execute<P>(self, image: &Path, state: &mut RunState, on_step: P) -> Result<RunReport>
    where
        P: FnMut(&SymbolMatches, &SearchProgress),
    {
        log::info!("[Orchestrator] [INSPECT] Reading {}", image.display());
        let raw = fs::read(image).map_err(|source| ImageError::Unreadable {
            path: image.to_path_buf(),
            source,
        })?;
        let extracted = self.extractor.extract(image).await?;
        let version = locate_version(&raw, &extracted.unpacked)?;
        let arch_dir = extracted.architecture.arch_dir();
        let symbols = extracted.symbols();
        log::info!(
            "[Orchestrator] [INSPECT] Linux {} ({}, arch/{}) with {} symbols",
            version,
            extracted.architecture,
            arch_dir,
            symbols.len()
        );

        state.transition(RunPhase::Provisioning);
        let tree = self.preparer.provision_mainline(&version).await?;

        let backported = if is_backported(&tree) {
            log::info!(
                "[Orchestrator] [BACKPORT] {} already backported",
                tree.display()
            );
            true
        } else {
            state.transition(RunPhase::Backporting);
            self.preparer.backport(&version, &tree).await?
        };

        state.transition(RunPhase::Searching);
        let engine = SymbolSearchEngine::new(self.searcher, tree.clone(), arch_dir);
        let search = engine.search_all(&symbols, on_step).await?;

        Ok(RunReport {
            kernel_version: version.to_string(),
            architecture: extracted.architecture,
            arch_dir,
            source_tree: tree,
            backported,
            symbols: search.matches,
            progress: search.progress,
        })
    }
}
