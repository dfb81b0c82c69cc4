//! Scan orchestration
//!
//! **State machine:** `Idle → Running → {Completed | Stopped | Failed}`
//!
//! A run:
//! 1. Probes the library root and diffs platform folders against the catalog
//! 2. Fans out across platforms (`platform_concurrency`)
//! 3. Per platform, diffs entries and processes selected ones
//!    (`entry_concurrency`): hash → lookup → reconcile → upsert → event
//! 4. Regroups siblings once every entry of the platform is committed
//! 5. Emits the final summary
//!
//! Cancellation is cooperative and checked before each platform and each
//! entry; in-flight entries finish and stay committed.

mod controller;
mod entry;
pub mod policy;

pub use controller::ScanController;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use romvault_common::events::{EventSink, ScanEvent};
use romvault_common::models::{
    PlatformFolder, ProviderId, RomEntry, ScanRun, ScanState, ScanStats, ScanSummary, ScanType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::ScanSettings;
use crate::discovery::{diff_entries, diff_platforms, Discoverer, PlatformInfo};
use crate::error::{Result, ScanError};
use crate::hashing::HashEngine;
use crate::providers::ProviderRegistry;
use crate::reconciler::Reconciler;
use crate::siblings::{apply_groups, SiblingGrouper};

use entry::{EntryOutcome, EntryWork};
use policy::plan_entry;

/// Parameters of a scan start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// Platform folder names, canonical slugs or platform ids; empty = whole library
    pub platforms: Vec<String>,
    /// Providers to query; empty = every enabled provider
    pub providers: Vec<ProviderId>,
}

impl ScanRequest {
    pub fn new(scan_type: ScanType) -> Self {
        Self {
            scan_type,
            platforms: Vec::new(),
            providers: Vec::new(),
        }
    }

    pub fn platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.providers = providers;
        self
    }

    fn selects(&self, folder: &PlatformFolder, info: Option<&PlatformInfo>) -> bool {
        self.platforms.is_empty()
            || self.platforms.iter().any(|p| {
                *p == folder.fs_slug
                    || *p == folder.id.to_string()
                    || info.map(|i| i.slug == *p).unwrap_or(false)
            })
    }
}

/// Run-wide counters, shared by concurrent platform and entry workers
#[derive(Debug, Default)]
struct RunTotals {
    platforms_scanned: AtomicUsize,
    platforms_added: AtomicUsize,
    roms_scanned: AtomicUsize,
    roms_added: AtomicUsize,
    roms_identified: AtomicUsize,
    roms_failed: AtomicUsize,
    roms_missing: AtomicUsize,
}

impl RunTotals {
    fn record(&self, outcome: &EntryOutcome) {
        self.roms_scanned.fetch_add(1, Ordering::Relaxed);
        if outcome.added {
            self.roms_added.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.identified {
            self.roms_identified.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.failed {
            self.roms_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> ScanStats {
        ScanStats {
            platforms_scanned: self.platforms_scanned.load(Ordering::Relaxed),
            platforms_added: self.platforms_added.load(Ordering::Relaxed),
            roms_scanned: self.roms_scanned.load(Ordering::Relaxed),
            roms_added: self.roms_added.load(Ordering::Relaxed),
            roms_identified: self.roms_identified.load(Ordering::Relaxed),
            roms_failed: self.roms_failed.load(Ordering::Relaxed),
            roms_missing: self.roms_missing.load(Ordering::Relaxed),
        }
    }
}

/// Per-run collaborators, borrowed by every worker future
struct RunContext<'a> {
    run_id: uuid::Uuid,
    scan_type: ScanType,
    settings: &'a ScanSettings,
    catalog: &'a dyn Catalog,
    sink: &'a dyn EventSink,
    discoverer: Discoverer,
    providers: ProviderRegistry,
    hasher: HashEngine,
    reconciler: Reconciler,
    grouper: SiblingGrouper,
    totals: RunTotals,
    cancel: CancellationToken,
}

/// A platform selected for this run
struct PlatformJob {
    folder: PlatformFolder,
    info: Option<PlatformInfo>,
}

/// Executes scan runs against one library root and catalog
pub struct ScanOrchestrator {
    settings: ScanSettings,
    catalog: Arc<dyn Catalog>,
    providers: ProviderRegistry,
    sink: Arc<dyn EventSink>,
}

impl ScanOrchestrator {
    pub fn new(
        settings: ScanSettings,
        catalog: Arc<dyn Catalog>,
        providers: ProviderRegistry,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            settings,
            catalog,
            providers,
            sink,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    async fn persist_run(&self, run: &ScanRun) {
        if let Err(e) = self.catalog.save_scan_run(run).await {
            warn!(run_id = %run.id, error = %e, "Failed to persist scan run");
        }
    }

    fn finish(&self, run: &ScanRun) -> ScanSummary {
        let summary = run.summary();
        self.sink.publish(ScanEvent::ScanDone {
            summary: summary.clone(),
        });
        summary
    }

    /// End a run whose preconditions failed
    async fn abort(&self, mut run: ScanRun, e: ScanError) -> ScanSummary {
        error!(run_id = %run.id, error = %e, "Scan precondition failed");
        self.sink.publish(ScanEvent::ScanStarted {
            run_id: run.id,
            scan_type: run.scan_type,
            platforms: Vec::new(),
            timestamp: Utc::now(),
        });
        run.fail(e.to_string());
        self.persist_run(&run).await;
        self.finish(&run)
    }

    /// Drive a run to a terminal state. Never returns an error: whole-run
    /// precondition failures end in `Failed`, everything else is counted.
    pub async fn run(&self, mut run: ScanRun, request: ScanRequest, cancel: CancellationToken) -> ScanSummary {
        run.transition_to(ScanState::Running);
        self.persist_run(&run).await;

        info!(
            run_id = %run.id,
            scan_type = %request.scan_type,
            root = %self.settings.library_root.display(),
            "Scan started"
        );

        let registry = self.providers.restricted_to(&request.providers);
        for requested in &request.providers {
            if !registry.is_enabled(*requested) {
                warn!(provider = %requested, "Requested provider is not enabled, ignoring");
            }
        }
        debug!(providers = ?registry.enabled(), "Providers for this run");

        let discoverer = match Discoverer::new(&self.settings) {
            Ok(discoverer) => discoverer,
            Err(e) => return self.abort(run, e).await,
        };
        let (jobs, added) = match self.select_platforms(&discoverer, &request).await {
            Ok(selected) => selected,
            Err(e) => return self.abort(run, e).await,
        };

        self.sink.publish(ScanEvent::ScanStarted {
            run_id: run.id,
            scan_type: run.scan_type,
            platforms: jobs.iter().map(|j| j.folder.fs_slug.clone()).collect(),
            timestamp: Utc::now(),
        });

        let ctx = RunContext {
            run_id: run.id,
            scan_type: request.scan_type,
            settings: &self.settings,
            catalog: self.catalog.as_ref(),
            sink: self.sink.as_ref(),
            hasher: HashEngine::new(&self.settings, registry.is_enabled(ProviderId::Ra)),
            providers: registry,
            reconciler: Reconciler::from_settings(&self.settings),
            grouper: SiblingGrouper::new(self.settings.region_priority.clone()),
            discoverer,
            totals: RunTotals::default(),
            cancel: cancel.clone(),
        };
        ctx.totals.platforms_added.store(added, Ordering::Relaxed);

        stream::iter(jobs)
            .map(|job| self.scan_platform(&ctx, job))
            .buffer_unordered(self.settings.platform_concurrency.max(1))
            .collect::<Vec<()>>()
            .await;

        run.stats = ctx.totals.snapshot();
        if cancel.is_cancelled() {
            run.cancelled = true;
            run.transition_to(ScanState::Stopped);
            info!(run_id = %run.id, scanned = run.stats.roms_scanned, "Scan stopped");
        } else {
            run.transition_to(ScanState::Completed);
            info!(
                run_id = %run.id,
                platforms = run.stats.platforms_scanned,
                roms_scanned = run.stats.roms_scanned,
                roms_added = run.stats.roms_added,
                roms_identified = run.stats.roms_identified,
                "Scan completed"
            );
        }
        self.persist_run(&run).await;
        self.finish(&run)
    }

    /// Record platform folders in the catalog and pick the ones to scan.
    ///
    /// Returns the jobs and the number of folders newly added to the catalog.
    async fn select_platforms(
        &self,
        discoverer: &Discoverer,
        request: &ScanRequest,
    ) -> Result<(Vec<PlatformJob>, usize)> {
        let on_disk = discoverer.platform_folders()?;
        let diff = diff_platforms(&on_disk, self.catalog.platforms().await?);
        let whole_library = request.platforms.is_empty();
        let mut jobs = Vec::new();
        let mut added = 0;

        for fs_slug in &diff.new {
            let info = discoverer.resolve(fs_slug);
            let folder = PlatformFolder::new(
                fs_slug.clone(),
                info.as_ref().map(|i| i.slug.clone()),
                info.as_ref().map(|i| i.name.clone()),
            );
            if !request.selects(&folder, info.as_ref()) {
                continue;
            }
            self.catalog.upsert_platform(&folder).await?;
            added += 1;
            info!(platform = %fs_slug, resolved = info.is_some(), "Platform folder added");

            if info.is_none() && request.scan_type != ScanType::NewPlatforms {
                warn!(platform = %fs_slug, "Unrecognized platform folder, recorded but not scanned");
                continue;
            }
            jobs.push(PlatformJob { folder, info });
        }

        for mut folder in diff.existing {
            let info = discoverer.resolve(&folder.fs_slug);
            if !request.selects(&folder, info.as_ref()) {
                continue;
            }
            let slug = info.as_ref().map(|i| i.slug.clone());
            let name = info.as_ref().map(|i| i.name.clone());
            if folder.missing_from_fs || folder.slug != slug || folder.name != name {
                folder.missing_from_fs = false;
                folder.slug = slug;
                folder.name = name;
                self.catalog.upsert_platform(&folder).await?;
            }
            if request.scan_type == ScanType::NewPlatforms {
                continue;
            }
            if info.is_none() {
                debug!(platform = %folder.fs_slug, "Skipping unresolved platform folder");
                continue;
            }
            jobs.push(PlatformJob { folder, info });
        }

        if whole_library {
            for mut folder in diff.missing {
                if !folder.missing_from_fs {
                    warn!(platform = %folder.fs_slug, "Platform folder missing from filesystem");
                    folder.missing_from_fs = true;
                    self.catalog.upsert_platform(&folder).await?;
                }
            }
        }

        Ok((jobs, added))
    }

    async fn scan_platform(&self, ctx: &RunContext<'_>, job: PlatformJob) {
        if ctx.cancel.is_cancelled() {
            return;
        }
        let fs_slug = job.folder.fs_slug.clone();
        match self.scan_platform_entries(ctx, &job).await {
            Ok(stats) => {
                if ctx.cancel.is_cancelled() {
                    info!(platform = %fs_slug, "Platform interrupted by stop request");
                    return;
                }
                ctx.totals.platforms_scanned.fetch_add(1, Ordering::Relaxed);
                ctx.sink.publish(ScanEvent::PlatformCompleted {
                    run_id: ctx.run_id,
                    platform: fs_slug.clone(),
                    platform_id: job.folder.id,
                    stats,
                    timestamp: Utc::now(),
                });
                info!(platform = %fs_slug, "Platform scan completed");
            }
            Err(e) => {
                // Platform-level failures never fail the run
                warn!(platform = %fs_slug, error = %e, "Platform scan failed");
            }
        }
    }

    async fn scan_platform_entries(&self, ctx: &RunContext<'_>, job: &PlatformJob) -> Result<ScanStats> {
        let fs_slug = &job.folder.fs_slug;
        let discovered = ctx.discoverer.scan_entries(fs_slug)?;
        let previous = ctx.catalog.roms_for_platform(job.folder.id).await?;
        let diff = diff_entries(discovered, previous);

        debug!(
            platform = %fs_slug,
            entries = diff.entries.len(),
            missing = diff.newly_missing.len(),
            "Diffed platform entries"
        );

        let mut stats = ScanStats {
            platforms_scanned: 1,
            ..Default::default()
        };

        for mut gone in diff.newly_missing.iter().cloned() {
            gone.missing_from_fs = true;
            ctx.catalog.upsert_rom(&gone).await?;
            stats.roms_missing += 1;
            ctx.totals.roms_missing.fetch_add(1, Ordering::Relaxed);
            info!(platform = %fs_slug, entry = %gone.fs_name, "Entry missing from filesystem");
        }

        // Missing entries a renamed file may take over
        let rename_pool: Mutex<Vec<RomEntry>> = Mutex::new(
            diff.newly_missing
                .into_iter()
                .chain(diff.still_missing)
                .map(|mut e| {
                    e.missing_from_fs = true;
                    e
                })
                .collect(),
        );

        let work: Vec<EntryWork> = diff
            .entries
            .into_iter()
            .filter_map(|diffed| {
                plan_entry(ctx.scan_type, &diffed).map(|plan| EntryWork { diffed, plan })
            })
            .collect();

        let outcomes: Vec<Option<EntryOutcome>> = stream::iter(work)
            .map(|work| async {
                if ctx.cancel.is_cancelled() {
                    return None;
                }
                match entry::process_entry(ctx, job, &rename_pool, work).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        error!(platform = %fs_slug, error = %e, "Failed to commit entry");
                        ctx.totals.roms_failed.fetch_add(1, Ordering::Relaxed);
                        None
                    }
                }
            })
            .buffer_unordered(ctx.settings.entry_concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes.iter().flatten() {
            stats.roms_scanned += 1;
            stats.roms_added += outcome.added as usize;
            stats.roms_identified += outcome.identified as usize;
            stats.roms_failed += outcome.failed as usize;
        }

        self.regroup(ctx, job).await?;
        Ok(stats)
    }

    /// Recompute sibling groups over every committed entry of a platform
    async fn regroup(&self, ctx: &RunContext<'_>, job: &PlatformJob) -> Result<()> {
        let mut entries = ctx.catalog.roms_for_platform(job.folder.id).await?;
        let groups = ctx.grouper.group(&entries);
        let changed = apply_groups(&groups, &mut entries);
        for index in &changed {
            ctx.catalog.upsert_rom(&entries[*index]).await?;
        }
        debug!(
            platform = %job.folder.fs_slug,
            groups = groups.len(),
            updated = changed.len(),
            "Sibling groups recomputed"
        );
        Ok(())
    }
}

impl From<&ScanRequest> for ScanRun {
    fn from(request: &ScanRequest) -> Self {
        ScanRun::new(request.scan_type, request.platforms.clone(), request.providers.clone())
    }
}

/// Fail a request early when the library root is unusable
pub(crate) fn check_preconditions(settings: &ScanSettings) -> Result<()> {
    settings.validate()?;
    crate::discovery::validate_library_root(&settings.library_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::providers::mock::{candidate, MockProvider};
    use crate::providers::{MatchKind, MetadataProvider};
    use romvault_common::models::GameMetadata;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    type Events = Arc<std::sync::Mutex<Vec<ScanEvent>>>;

    fn library() -> TempDir {
        let temp = TempDir::new().unwrap();
        let gba = temp.path().join("roms/gba");
        fs::create_dir_all(&gba).unwrap();
        fs::write(gba.join("game.gba"), b"first dump").unwrap();
        fs::write(gba.join("game_2.gba"), b"second dump").unwrap();
        temp
    }

    fn details(name: &str) -> GameMetadata {
        GameMetadata {
            name: Some(name.to_string()),
            summary: Some("A game".to_string()),
            cover_url: Some("https://img/cover.jpg".to_string()),
            ..Default::default()
        }
    }

    fn igdb_mock() -> MockProvider {
        let mut igdb = MockProvider::new(ProviderId::Igdb);
        igdb.by_term.insert(
            "game".to_string(),
            vec![candidate(ProviderId::Igdb, "42", 0.9, MatchKind::ExactTitle)],
        );
        igdb.by_term.insert(
            "game_2".to_string(),
            vec![candidate(ProviderId::Igdb, "42", 0.85, MatchKind::Fuzzy)],
        );
        igdb.details.insert("42".to_string(), details("Game"));
        igdb
    }

    fn build(
        root: &std::path::Path,
        providers: Vec<Arc<dyn MetadataProvider>>,
    ) -> (ScanOrchestrator, Arc<MemoryCatalog>, Events) {
        let catalog = Arc::new(MemoryCatalog::new());
        let events: Events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        let sink = move |event: ScanEvent| seen.lock().unwrap().push(event);
        let orchestrator = ScanOrchestrator::new(
            ScanSettings::new(root),
            catalog.clone(),
            ProviderRegistry::new(providers, Duration::from_secs(5)),
            Arc::new(sink),
        );
        (orchestrator, catalog, events)
    }

    async fn run(orchestrator: &ScanOrchestrator, scan_type: ScanType) -> ScanSummary {
        let request = ScanRequest::new(scan_type);
        orchestrator
            .run(ScanRun::from(&request), request, CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_versions_of_same_game_grouped() {
        let temp = library();
        let (orchestrator, catalog, events) = build(temp.path(), vec![Arc::new(igdb_mock()) as Arc<dyn MetadataProvider>]);

        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.state, ScanState::Completed);
        assert_eq!(summary.stats.platforms_added, 1);
        assert_eq!(summary.stats.roms_added, 2);
        assert_eq!(summary.stats.roms_identified, 2);

        let roms = catalog.all_roms().await;
        assert_eq!(roms.len(), 2);
        assert!(roms.iter().all(|r| r.external_ids.get(&ProviderId::Igdb).map(String::as_str) == Some("42")));
        assert!(roms.iter().all(|r| !r.is_unidentified && !r.is_partial));
        assert!(roms.iter().all(|r| r.hashes.sha1.is_some()));

        let group = roms[0].sibling_group;
        assert!(group.is_some());
        assert_eq!(roms[1].sibling_group, group);
        let main: Vec<&str> = roms
            .iter()
            .filter(|r| r.is_main_sibling)
            .map(|r| r.fs_name.as_str())
            .collect();
        assert_eq!(main, vec!["game.gba"]);

        let kinds: Vec<&str> = events.lock().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.first(), Some(&"scan_started"));
        assert_eq!(kinds.last(), Some(&"scan_done"));
        assert_eq!(kinds.iter().filter(|k| **k == "entry_scanned").count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == "platform_completed").count(), 1);
    }

    #[tokio::test]
    async fn test_quick_rescan_touches_nothing() {
        let temp = library();
        let igdb = Arc::new(igdb_mock());
        let (orchestrator, catalog, _) = build(temp.path(), vec![igdb.clone() as Arc<dyn MetadataProvider>]);

        run(&orchestrator, ScanType::Complete).await;
        let before = catalog.all_roms().await;
        let lookups = igdb.calls();

        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.state, ScanState::Completed);
        assert_eq!(summary.stats.roms_added, 0);
        assert_eq!(summary.stats.roms_scanned, 0);
        assert_eq!(igdb.calls(), lookups);

        let after = catalog.all_roms().await;
        let ids = |roms: &[RomEntry]| roms.iter().map(|r| (r.id, r.external_ids.clone())).collect::<Vec<_>>();
        assert_eq!(ids(&before), ids(&after));
    }

    #[tokio::test]
    async fn test_failing_provider_is_isolated() {
        let temp = library();
        let mut moby = MockProvider::new(ProviderId::Moby);
        moby.fail = true;
        let (orchestrator, catalog, _) =
            build(temp.path(), vec![Arc::new(igdb_mock()) as Arc<dyn MetadataProvider>, Arc::new(moby)]);

        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.state, ScanState::Completed);
        assert_eq!(summary.stats.roms_identified, 2);
        assert_eq!(summary.stats.roms_failed, 2);

        for rom in catalog.all_roms().await {
            assert!(!rom.is_unidentified);
            assert_eq!(rom.failure.provider_errors.len(), 1);
            assert_eq!(rom.failure.provider_errors[0].provider, ProviderId::Moby);
        }
    }

    #[tokio::test]
    async fn test_renamed_file_keeps_identity() {
        let temp = library();
        let (orchestrator, catalog, _) = build(temp.path(), vec![Arc::new(igdb_mock()) as Arc<dyn MetadataProvider>]);
        run(&orchestrator, ScanType::Quick).await;

        let original = catalog
            .all_roms()
            .await
            .into_iter()
            .find(|r| r.fs_name == "game.gba")
            .unwrap();
        fs::rename(
            temp.path().join("roms/gba/game.gba"),
            temp.path().join("roms/gba/Game (USA).gba"),
        )
        .unwrap();

        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.stats.roms_added, 0);

        let moved = catalog.get_rom(original.id).await.unwrap().unwrap();
        assert_eq!(moved.fs_name, "Game (USA).gba");
        assert!(!moved.missing_from_fs);
        assert_eq!(moved.tags.regions, vec!["USA"]);
        assert_eq!(moved.external_ids, original.external_ids);
        assert_eq!(catalog.all_roms().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_entries_flagged_and_restored() {
        let temp = library();
        let (orchestrator, catalog, _) = build(temp.path(), vec![]);
        run(&orchestrator, ScanType::Quick).await;

        let stash = temp.path().join("stash.gba");
        fs::rename(temp.path().join("roms/gba/game_2.gba"), &stash).unwrap();
        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.stats.roms_missing, 1);
        let gone = catalog.all_roms().await.into_iter().find(|r| r.fs_name == "game_2.gba").unwrap();
        assert!(gone.missing_from_fs);

        fs::rename(&stash, temp.path().join("roms/gba/game_2.gba")).unwrap();
        run(&orchestrator, ScanType::Quick).await;
        let back = catalog.get_rom(gone.id).await.unwrap().unwrap();
        assert!(!back.missing_from_fs);
    }

    #[tokio::test]
    async fn test_unreachable_root_fails_run() {
        let temp = library();
        let root = temp.path().join("gone");
        let (orchestrator, _, events) = build(&root, vec![]);

        let summary = run(&orchestrator, ScanType::Quick).await;
        assert_eq!(summary.state, ScanState::Failed);
        assert!(summary.failure.is_some());

        let kinds: Vec<&str> = events.lock().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["scan_started", "scan_done"]);
    }

    #[tokio::test]
    async fn test_new_platforms_scan_only_new_folders() {
        let temp = library();
        fs::create_dir_all(temp.path().join("roms/mystery")).unwrap();
        fs::write(temp.path().join("roms/mystery/thing.bin"), b"x").unwrap();
        let (orchestrator, catalog, _) = build(temp.path(), vec![]);

        let summary = run(&orchestrator, ScanType::Quick).await;
        // Unrecognized folder is recorded, not scanned
        assert_eq!(summary.stats.platforms_added, 2);
        assert_eq!(summary.stats.platforms_scanned, 1);
        assert_eq!(catalog.all_roms().await.len(), 2);

        fs::create_dir_all(temp.path().join("roms/snes")).unwrap();
        fs::write(temp.path().join("roms/snes/mario.sfc"), b"snes").unwrap();
        fs::write(temp.path().join("roms/gba/other.gba"), b"other").unwrap();

        let summary = run(&orchestrator, ScanType::NewPlatforms).await;
        assert_eq!(summary.stats.platforms_added, 1);
        assert_eq!(summary.stats.roms_added, 1);
        let names: Vec<String> = catalog.all_roms().await.into_iter().map(|r| r.fs_name).collect();
        assert!(names.contains(&"mario.sfc".to_string()));
        assert!(!names.contains(&"other.gba".to_string()));
    }

    #[tokio::test]
    async fn test_controller_stop_and_already_running() {
        let temp = TempDir::new().unwrap();
        let gba = temp.path().join("roms/gba");
        fs::create_dir_all(&gba).unwrap();
        for i in 0..6 {
            fs::write(gba.join(format!("game {}.gba", i)), format!("dump {}", i)).unwrap();
        }
        let mut slow = MockProvider::new(ProviderId::Igdb);
        slow.delay = Some(Duration::from_millis(200));

        let catalog = Arc::new(MemoryCatalog::new());
        let mut settings = ScanSettings::new(temp.path());
        settings.entry_concurrency = 1;
        let orchestrator = ScanOrchestrator::new(
            settings,
            catalog.clone(),
            ProviderRegistry::new(vec![Arc::new(slow) as Arc<dyn MetadataProvider>], Duration::from_secs(5)),
            Arc::new(|_: ScanEvent| {}),
        );
        let controller = ScanController::new(orchestrator);
        assert_eq!(controller.state(), ScanState::Idle);

        let run_id = controller.start(ScanRequest::new(ScanType::Quick)).await.unwrap();
        let second = controller.start(ScanRequest::new(ScanType::Complete)).await;
        assert!(matches!(second, Err(ScanError::AlreadyRunning(id)) if id == run_id));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(controller.stop().await);

        let summary = controller.wait().await.unwrap().unwrap();
        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.state, ScanState::Stopped);
        assert!(summary.stats.roms_scanned < 6);
        assert_eq!(catalog.all_roms().await.len(), summary.stats.roms_scanned);
        assert!(!controller.is_running().await);
        assert_eq!(controller.state(), ScanState::Stopped);
        assert!(!controller.stop().await);
    }

    #[tokio::test]
    async fn test_controller_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let orchestrator = ScanOrchestrator::new(
            ScanSettings::new(temp.path().join("nope")),
            Arc::new(MemoryCatalog::new()),
            ProviderRegistry::empty(),
            Arc::new(|_: ScanEvent| {}),
        );
        let controller = ScanController::new(orchestrator);
        let result = controller.start(ScanRequest::new(ScanType::Quick)).await;
        assert!(matches!(result, Err(ScanError::Config(_))));
        assert!(controller.active_run().await.is_none());
    }

    /// Catalog whose `get_rom` parks until released once armed
    struct GatedCatalog {
        inner: MemoryCatalog,
        armed: std::sync::atomic::AtomicBool,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl Catalog for GatedCatalog {
        async fn platforms(&self) -> Result<Vec<PlatformFolder>> {
            self.inner.platforms().await
        }
        async fn upsert_platform(&self, platform: &PlatformFolder) -> Result<()> {
            self.inner.upsert_platform(platform).await
        }
        async fn roms_for_platform(&self, platform_id: Uuid) -> Result<Vec<RomEntry>> {
            self.inner.roms_for_platform(platform_id).await
        }
        async fn get_rom(&self, id: Uuid) -> Result<Option<RomEntry>> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.get_rom(id).await
        }
        async fn upsert_rom(&self, rom: &RomEntry) -> Result<()> {
            self.inner.upsert_rom(rom).await
        }
        async fn save_scan_run(&self, run: &ScanRun) -> Result<()> {
            self.inner.save_scan_run(run).await
        }
        async fn get_scan_run(&self, id: Uuid) -> Result<Option<ScanRun>> {
            self.inner.get_scan_run(id).await
        }
    }

    #[tokio::test]
    async fn test_scan_waits_for_rename_in_progress() {
        let temp = library();
        let catalog = Arc::new(GatedCatalog {
            inner: MemoryCatalog::new(),
            armed: std::sync::atomic::AtomicBool::new(false),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let orchestrator = ScanOrchestrator::new(
            ScanSettings::new(temp.path()),
            catalog.clone(),
            ProviderRegistry::empty(),
            Arc::new(|_: ScanEvent| {}),
        );
        let controller = Arc::new(ScanController::new(orchestrator));

        controller.start(ScanRequest::new(ScanType::Quick)).await.unwrap();
        let first = controller.wait().await.unwrap().unwrap();
        assert_eq!(first.stats.roms_added, 2);
        let rom_id = catalog
            .inner
            .all_roms()
            .await
            .into_iter()
            .find(|r| r.fs_name == "game_2.gba")
            .map(|r| r.id)
            .unwrap();

        catalog.armed.store(true, Ordering::SeqCst);
        let renamer = Arc::clone(&controller);
        let rename = tokio::spawn(async move { renamer.rename_rom(rom_id, "renamed.gba").await });
        catalog.entered.notified().await;

        let starter = Arc::clone(&controller);
        let mut start =
            tokio::spawn(async move { starter.start(ScanRequest::new(ScanType::Quick)).await });
        assert!(tokio::time::timeout(Duration::from_millis(100), &mut start)
            .await
            .is_err());

        catalog.release.notify_one();
        let renamed = rename.await.unwrap().unwrap();
        assert_eq!(renamed.fs_name, "renamed.gba");
        start.await.unwrap().unwrap();

        let second = controller.wait().await.unwrap().unwrap();
        assert_eq!(second.state, ScanState::Completed);
        assert_eq!(second.stats.roms_added, 0);
        assert_eq!(second.stats.roms_missing, 0);
        let stored = catalog.inner.get_rom(rom_id).await.unwrap().unwrap();
        assert_eq!(stored.fs_name, "renamed.gba");
        assert!(!stored.missing_from_fs);
    }
}
