//! Match reconciliation
//!
//! Turns the candidates every provider returned for one entry into an
//! identification result: at most one accepted external id per provider,
//! merged enrichment fields, and the unidentified / partial status.
//!
//! Reconciliation runs in two passes so that the orchestrator can fetch
//! details for accepted candidates that arrived without them:
//! [`Reconciler::select`] then [`Reconciler::finalize`].

use romvault_common::models::{GameMetadata, IdentStatus, ProviderId};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::ScanSettings;
use crate::providers::MatchCandidate;

/// An accepted external id and whatever enrichment is known for it
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedMatch {
    pub external_id: String,
    pub details: Option<GameMetadata>,
}

impl From<MatchCandidate> for AcceptedMatch {
    fn from(candidate: MatchCandidate) -> Self {
        Self {
            external_id: candidate.external_id,
            details: candidate.details,
        }
    }
}

/// Per-entry outcome of reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationResult {
    pub external_ids: BTreeMap<ProviderId, String>,
    pub metadata: GameMetadata,
    pub status: IdentStatus,
}

impl IdentificationResult {
    pub fn is_unidentified(&self) -> bool {
        self.status == IdentStatus::Unidentified
    }

    pub fn is_partial(&self) -> bool {
        self.status == IdentStatus::Partial
    }
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    threshold: f64,
    priority: Vec<ProviderId>,
}

/// Numeric ids compare numerically, anything else lexically
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Total order over candidates of one provider, best first
fn rank(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.kind.rank().cmp(&a.kind.rank()))
        .then_with(|| b.similarity.total_cmp(&a.similarity))
        .then_with(|| compare_ids(&a.external_id, &b.external_id))
}

fn first_some<T: Clone>(sources: &[&GameMetadata], field: impl Fn(&GameMetadata) -> Option<&T>) -> Option<T> {
    sources.iter().find_map(|m| field(m)).cloned()
}

fn first_non_empty(sources: &[&GameMetadata], field: impl Fn(&GameMetadata) -> &Vec<String>) -> Vec<String> {
    sources
        .iter()
        .map(|m| field(m))
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default()
}

impl Reconciler {
    pub fn new(threshold: f64, priority: Vec<ProviderId>) -> Self {
        Self { threshold, priority }
    }

    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self::new(settings.match_threshold, settings.metadata_priority.clone())
    }

    fn priority_of(&self, provider: ProviderId) -> usize {
        self.priority
            .iter()
            .position(|p| *p == provider)
            .unwrap_or(self.priority.len())
    }

    /// Best candidate per provider at or above the threshold
    pub fn select(&self, candidates: &[MatchCandidate]) -> BTreeMap<ProviderId, MatchCandidate> {
        let mut best: BTreeMap<ProviderId, &MatchCandidate> = BTreeMap::new();
        for candidate in candidates {
            if candidate.external_id.is_empty()
                || candidate.confidence.is_nan()
                || candidate.confidence < self.threshold
            {
                continue;
            }
            match best.get(&candidate.provider) {
                Some(current) if rank(candidate, current) != Ordering::Less => {}
                _ => {
                    best.insert(candidate.provider, candidate);
                }
            }
        }
        best.into_iter().map(|(p, c)| (p, c.clone())).collect()
    }

    /// Merge accepted matches into an identification result.
    ///
    /// Each metadata field is taken from the first accepted provider, in
    /// priority order, that has it; `fallback` (the entry's previously merged
    /// metadata) fills whatever is still empty.
    pub fn finalize(
        &self,
        accepted: &BTreeMap<ProviderId, AcceptedMatch>,
        fallback: Option<&GameMetadata>,
    ) -> IdentificationResult {
        if accepted.is_empty() {
            return IdentificationResult {
                external_ids: BTreeMap::new(),
                metadata: GameMetadata::default(),
                status: IdentStatus::Unidentified,
            };
        }

        let mut ordered: Vec<(&ProviderId, &AcceptedMatch)> = accepted.iter().collect();
        ordered.sort_by_key(|(provider, _)| (self.priority_of(**provider), **provider));

        let mut sources: Vec<&GameMetadata> = ordered
            .iter()
            .filter_map(|(_, m)| m.details.as_ref())
            .collect();
        if let Some(previous) = fallback {
            sources.push(previous);
        }

        let metadata = GameMetadata {
            name: first_some(&sources, |m| m.name.as_ref()),
            slug: first_some(&sources, |m| m.slug.as_ref()),
            summary: first_some(&sources, |m| m.summary.as_ref()),
            cover_url: first_some(&sources, |m| m.cover_url.as_ref()),
            screenshots: first_non_empty(&sources, |m| &m.screenshots),
            manual_url: first_some(&sources, |m| m.manual_url.as_ref()),
            release_year: first_some(&sources, |m| m.release_year.as_ref()),
            alternative_names: first_non_empty(&sources, |m| &m.alternative_names),
        };

        let status = if metadata.is_complete() {
            IdentStatus::Identified
        } else {
            IdentStatus::Partial
        };

        IdentificationResult {
            external_ids: accepted
                .iter()
                .map(|(p, m)| (*p, m.external_id.clone()))
                .collect(),
            metadata,
            status,
        }
    }

    /// `select` then `finalize`, using only details carried by the candidates
    pub fn reconcile(&self, candidates: &[MatchCandidate]) -> IdentificationResult {
        let accepted = self
            .select(candidates)
            .into_iter()
            .map(|(p, c)| (p, AcceptedMatch::from(c)))
            .collect();
        self.finalize(&accepted, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::candidate;
    use crate::providers::MatchKind;

    fn reconciler() -> Reconciler {
        Reconciler::new(
            0.75,
            vec![ProviderId::Igdb, ProviderId::Ss, ProviderId::Moby, ProviderId::Ra, ProviderId::Hasheous],
        )
    }

    fn full(name: &str) -> GameMetadata {
        GameMetadata {
            name: Some(name.to_string()),
            summary: Some(format!("About {}", name)),
            cover_url: Some(format!("https://covers/{}.png", name)),
            ..Default::default()
        }
    }

    fn with_details(mut c: MatchCandidate, details: GameMetadata) -> MatchCandidate {
        c.details = Some(details);
        c
    }

    #[test]
    fn test_one_accepted_per_provider() {
        let candidates = vec![
            candidate(ProviderId::Igdb, "1", 0.80, MatchKind::Fuzzy),
            candidate(ProviderId::Igdb, "2", 0.95, MatchKind::ExactTitle),
            candidate(ProviderId::Moby, "7", 0.90, MatchKind::Fuzzy),
        ];
        let selected = reconciler().select(&candidates);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[&ProviderId::Igdb].external_id, "2");
        assert_eq!(selected[&ProviderId::Moby].external_id, "7");
    }

    #[test]
    fn test_below_threshold_rejected() {
        let result = reconciler().reconcile(&[candidate(ProviderId::Igdb, "1", 0.5, MatchKind::Fuzzy)]);
        assert!(result.is_unidentified());
        assert!(result.external_ids.is_empty());
    }

    #[test]
    fn test_tie_breaks() {
        // Equal confidence: hash beats exact title
        let hash = candidate(ProviderId::Ss, "10", 0.95, MatchKind::Hash);
        let title = candidate(ProviderId::Ss, "11", 0.95, MatchKind::ExactTitle);
        let selected = reconciler().select(&[title.clone(), hash.clone()]);
        assert_eq!(selected[&ProviderId::Ss].external_id, "10");

        // Equal confidence and kind: higher similarity wins
        let mut close = candidate(ProviderId::Ss, "20", 0.8, MatchKind::Fuzzy);
        close.similarity = 0.9;
        let mut far = candidate(ProviderId::Ss, "21", 0.8, MatchKind::Fuzzy);
        far.similarity = 0.7;
        let selected = reconciler().select(&[far, close]);
        assert_eq!(selected[&ProviderId::Ss].external_id, "20");

        // Fully tied: smallest id, numerically
        let a = candidate(ProviderId::Ss, "100", 0.8, MatchKind::Fuzzy);
        let b = candidate(ProviderId::Ss, "99", 0.8, MatchKind::Fuzzy);
        let selected = reconciler().select(&[a, b]);
        assert_eq!(selected[&ProviderId::Ss].external_id, "99");
    }

    #[test]
    fn test_reconcile_is_idempotent_and_order_independent() {
        let candidates = vec![
            with_details(candidate(ProviderId::Igdb, "5", 0.9, MatchKind::Fuzzy), full("A")),
            with_details(candidate(ProviderId::Igdb, "4", 0.9, MatchKind::Fuzzy), full("B")),
            with_details(candidate(ProviderId::Moby, "9", 1.0, MatchKind::Hash), full("C")),
        ];
        let r = reconciler();
        let first = r.reconcile(&candidates);
        let second = r.reconcile(&candidates);
        let mut reversed = candidates.clone();
        reversed.reverse();
        let third = r.reconcile(&reversed);

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(first.external_ids[&ProviderId::Igdb], "4");
    }

    #[test]
    fn test_partial_when_enrichment_missing() {
        let bare = GameMetadata {
            name: Some("Game".to_string()),
            ..Default::default()
        };
        let result = reconciler().reconcile(&[with_details(
            candidate(ProviderId::Ra, "3", 1.0, MatchKind::Hash),
            bare,
        )]);
        assert!(result.is_partial());
        assert!(!result.is_unidentified());
    }

    #[test]
    fn test_metadata_merged_by_priority() {
        let igdb = GameMetadata {
            name: Some("IGDB Name".to_string()),
            ..Default::default()
        };
        let ss = GameMetadata {
            name: Some("SS Name".to_string()),
            summary: Some("SS summary".to_string()),
            cover_url: Some("https://ss/cover.png".to_string()),
            manual_url: Some("https://ss/manual.pdf".to_string()),
            ..Default::default()
        };
        let result = reconciler().reconcile(&[
            with_details(candidate(ProviderId::Ss, "1", 1.0, MatchKind::Hash), ss),
            with_details(candidate(ProviderId::Igdb, "2", 0.95, MatchKind::ExactTitle), igdb),
        ]);

        assert_eq!(result.status, IdentStatus::Identified);
        assert_eq!(result.metadata.name.as_deref(), Some("IGDB Name"));
        assert_eq!(result.metadata.summary.as_deref(), Some("SS summary"));
        assert_eq!(result.metadata.manual_url.as_deref(), Some("https://ss/manual.pdf"));
    }

    #[test]
    fn test_fallback_fills_gaps() {
        let mut accepted = BTreeMap::new();
        accepted.insert(
            ProviderId::Moby,
            AcceptedMatch {
                external_id: "8".to_string(),
                details: None,
            },
        );
        let previous = full("Earlier");
        let result = reconciler().finalize(&accepted, Some(&previous));
        assert_eq!(result.status, IdentStatus::Identified);
        assert_eq!(result.metadata.name.as_deref(), Some("Earlier"));

        let result = reconciler().finalize(&BTreeMap::new(), Some(&previous));
        assert!(result.is_unidentified());
        assert_eq!(result.metadata, GameMetadata::default());
    }
}
