//! Per-entry pipeline: hash → rename detection → identify → commit → event

use chrono::Utc;
use romvault_common::events::{EntryInfo, ScanEvent};
use romvault_common::models::{ProviderFailure, ProviderId, RomEntry, ScanType};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::policy::{EntryPlan, Identify};
use super::{PlatformJob, RunContext};
use crate::discovery::{DiffedEntry, DiscoveredEntry};
use crate::error::{Result, ScanError};
use crate::providers::LookupQuery;
use crate::reconciler::AcceptedMatch;
use crate::tags::{file_extension, file_stem, parse_tags, strip_tags};

pub(super) struct EntryWork {
    pub diffed: DiffedEntry,
    pub plan: EntryPlan,
}

/// What one committed entry contributes to the run totals
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct EntryOutcome {
    pub added: bool,
    pub identified: bool,
    pub failed: bool,
}

/// Copy the on-disk view of an entry onto its catalog row
fn apply_discovered(entry: &mut RomEntry, found: &DiscoveredEntry, keep_files: bool) {
    entry.fs_name = found.fs_name.clone();
    entry.is_directory = found.is_directory;
    entry.multi = found.multi;
    entry.size = found.size;
    entry.mtime = found.mtime;
    entry.tags = parse_tags(&found.fs_name);
    if found.is_directory {
        entry.fs_extension = String::new();
        entry.fs_name_no_tags = strip_tags(&found.fs_name);
    } else {
        entry.fs_extension = file_extension(&found.fs_name);
        entry.fs_name_no_tags = strip_tags(file_stem(&found.fs_name));
    }
    entry.missing_from_fs = false;
    if let Some(reason) = &found.read_error {
        entry.failure.read_error = Some(reason.clone());
    }

    let same_layout = entry.files.len() == found.files.len()
        && entry
            .files
            .iter()
            .zip(&found.files)
            .all(|(a, b)| a.rel_path == b.rel_path);
    if !(keep_files && same_layout) {
        entry.files = found.files.clone();
    }
}

/// Take over the identity of a missing entry with the same content.
///
/// Matches on sha1, or on crc32 plus size when no sha1 is known. Returns
/// the name the entry was previously recorded under.
async fn adopt_renamed(entry: &mut RomEntry, pool: &Mutex<Vec<RomEntry>>) -> Option<String> {
    if !entry.hashes.has_content_hash() {
        return None;
    }
    let mut pool = pool.lock().await;
    let position = pool.iter().position(|old| match (&old.hashes.sha1, &entry.hashes.sha1) {
        (Some(a), Some(b)) => a == b,
        _ => {
            old.size == entry.size
                && old.hashes.crc32.is_some()
                && old.hashes.crc32 == entry.hashes.crc32
        }
    })?;
    let old = pool.remove(position);

    entry.id = old.id;
    entry.external_ids = old.external_ids;
    entry.metadata = old.metadata;
    entry.is_unidentified = old.is_unidentified;
    entry.is_partial = old.is_partial;
    entry.user_main_sibling = old.user_main_sibling;
    entry.sibling_group = old.sibling_group;
    entry.is_main_sibling = old.is_main_sibling;
    Some(old.fs_name)
}

/// Query providers and reconcile, updating identification fields in place
async fn identify(ctx: &RunContext<'_>, job: &PlatformJob, entry: &mut RomEntry, mode: Identify) {
    let enabled = ctx.providers.enabled();
    let full = mode == Identify::Full;

    let mut accepted: BTreeMap<ProviderId, AcceptedMatch> = BTreeMap::new();
    if !full {
        for (provider, external_id) in &entry.external_ids {
            accepted.insert(
                *provider,
                AcceptedMatch {
                    external_id: external_id.clone(),
                    details: None,
                },
            );
        }
    }

    let to_query: Vec<ProviderId> = enabled
        .iter()
        .copied()
        .filter(|p| !accepted.contains_key(p))
        .collect();

    let mut failures: Vec<ProviderFailure> = Vec::new();
    let mut fresh: Vec<ProviderId> = Vec::new();
    let mut retained = !full;

    if !to_query.is_empty() {
        let query = LookupQuery {
            platform_slug: job.folder.effective_slug().to_string(),
            platform_ids: job.info.as_ref().map(|i| i.ids).unwrap_or_default(),
            fs_name: entry.fs_name.clone(),
            search_term: entry.fs_name_no_tags.clone(),
            tags: entry.tags.clone(),
            hashes: entry.hashes.clone(),
            size: entry.size,
        };
        let outcome = ctx.providers.lookup_all(&query, Some(&to_query)).await;

        // A failing provider never erases the id it accepted before
        if full {
            for failure in &outcome.failures {
                if let Some(previous) = entry.external_ids.get(&failure.provider) {
                    retained = true;
                    accepted.insert(
                        failure.provider,
                        AcceptedMatch {
                            external_id: previous.clone(),
                            details: None,
                        },
                    );
                }
            }
        }
        failures.extend(outcome.failures);

        for (provider, candidate) in ctx.reconciler.select(&outcome.candidates) {
            fresh.push(provider);
            debug!(
                entry = %entry.fs_name,
                provider = %provider,
                external_id = %candidate.external_id,
                confidence = candidate.confidence,
                "Candidate accepted"
            );
            accepted.insert(provider, AcceptedMatch::from(candidate));
        }
    }

    for (provider, accepted_match) in accepted.iter_mut() {
        let refresh = mode == Identify::Refresh && enabled.contains(provider);
        if accepted_match.details.is_some() || !(fresh.contains(provider) || refresh) {
            continue;
        }
        match ctx
            .providers
            .fetch_details(*provider, &accepted_match.external_id)
            .await
        {
            Ok(details) => accepted_match.details = Some(details),
            Err(e) => {
                let err = ScanError::provider(*provider, &e);
                warn!(entry = %entry.fs_name, error = %err, "Fetching details failed");
                failures.push(ProviderFailure {
                    provider: *provider,
                    message: e.to_string(),
                });
            }
        }
    }

    let fallback = retained.then(|| entry.metadata.clone());
    let result = ctx.reconciler.finalize(&accepted, fallback.as_ref());

    entry.is_unidentified = result.is_unidentified();
    entry.is_partial = result.is_partial();
    entry.external_ids = result.external_ids;
    entry.metadata = result.metadata;
    entry.failure.provider_errors = failures;
}

/// Run one entry through the pipeline and commit it
pub(super) async fn process_entry(
    ctx: &RunContext<'_>,
    job: &PlatformJob,
    rename_pool: &Mutex<Vec<RomEntry>>,
    work: EntryWork,
) -> Result<EntryOutcome> {
    let EntryWork { diffed, plan } = work;
    let DiffedEntry {
        discovered,
        previous,
        ..
    } = diffed;
    let is_new = previous.is_none();

    let mut entry = previous.unwrap_or_else(|| RomEntry::new(job.folder.id, discovered.fs_name.clone()));
    let rehash = matches!(plan, EntryPlan::Process { rehash: true, .. });
    apply_discovered(&mut entry, &discovered, !rehash);

    let mut mode = plan.identify();
    let mut renamed_from = None;

    if rehash {
        entry.failure.read_error = discovered.read_error.clone();
        if ctx.hasher.should_hash(job.folder.effective_slug()) {
            let ra_console = job.info.as_ref().and_then(|i| i.ids.ra);
            let outcome = ctx
                .hasher
                .hash_entry(
                    ctx.discoverer.roms_dir(&job.folder.fs_slug),
                    entry.files.clone(),
                    ra_console,
                )
                .await?;
            entry.files = outcome.files;
            entry.hashes = outcome.hashes;
            if let Some(reason) = outcome.read_error {
                warn!(platform = %job.folder.fs_slug, entry = %entry.fs_name, error = %reason, "Entry could not be read");
                entry.failure.read_error.get_or_insert(reason);
            }
        } else {
            entry.hashes = Default::default();
        }

        if is_new {
            renamed_from = adopt_renamed(&mut entry, rename_pool).await;
            if let Some(old_name) = &renamed_from {
                info!(
                    platform = %job.folder.fs_slug,
                    from = %old_name,
                    to = %entry.fs_name,
                    "Entry renamed on disk, identity carried over"
                );
                if mode == Identify::Full && ctx.scan_type != ScanType::Complete {
                    mode = Identify::Missing;
                }
            }
        }
    }

    if mode != Identify::Skip {
        identify(ctx, job, &mut entry, mode).await;
    }

    entry.last_scanned_at = Some(Utc::now());
    ctx.catalog.upsert_rom(&entry).await?;

    let outcome = EntryOutcome {
        added: is_new && renamed_from.is_none(),
        identified: !entry.is_unidentified,
        failed: !entry.failure.is_empty(),
    };
    ctx.totals.record(&outcome);

    debug!(
        platform = %job.folder.fs_slug,
        entry = %entry.fs_name,
        status = ?entry.status(),
        "Entry committed"
    );
    ctx.sink.publish(ScanEvent::EntryScanned {
        run_id: ctx.run_id,
        platform: job.folder.fs_slug.clone(),
        entry: EntryInfo::from(&entry),
        identified: outcome.identified,
        totals: ctx.totals.snapshot(),
        timestamp: Utc::now(),
    });

    Ok(outcome)
}
