//! Candidate scoring shared by all adapters
//!
//! - hash match: confidence 1.0
//! - exact normalized title (or alternative name): 0.95
//! - otherwise: Jaro-Winkler similarity of normalized titles x 0.9

use romvault_common::models::{GameMetadata, ProviderId};
use serde::{Deserialize, Serialize};

use super::MatchCandidate;
use crate::tags::normalize_search_term;

pub const HASH_CONFIDENCE: f64 = 1.0;
pub const EXACT_TITLE_CONFIDENCE: f64 = 0.95;
pub const FUZZY_WEIGHT: f64 = 0.9;

/// How a candidate was matched, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Hash,
    ExactTitle,
    Fuzzy,
}

impl MatchKind {
    /// Higher is stronger
    pub fn rank(&self) -> u8 {
        match self {
            MatchKind::Hash => 2,
            MatchKind::ExactTitle => 1,
            MatchKind::Fuzzy => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleScore {
    pub kind: MatchKind,
    pub confidence: f64,
    pub similarity: f64,
}

pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&normalize_search_term(a), &normalize_search_term(b))
}

/// Score a provider title (and its alternative names) against the query
pub fn score_title(search_term: &str, name: &str, alternatives: &[String]) -> TitleScore {
    let term = normalize_search_term(search_term);
    let names = std::iter::once(name).chain(alternatives.iter().map(String::as_str));

    let mut best = 0.0f64;
    for candidate in names {
        let normalized = normalize_search_term(candidate);
        if !term.is_empty() && normalized == term {
            return TitleScore {
                kind: MatchKind::ExactTitle,
                confidence: EXACT_TITLE_CONFIDENCE,
                similarity: 1.0,
            };
        }
        best = best.max(strsim::jaro_winkler(&term, &normalized));
    }

    TitleScore {
        kind: MatchKind::Fuzzy,
        confidence: best * FUZZY_WEIGHT,
        similarity: best,
    }
}

/// Candidate found by title search
pub fn title_candidate(
    provider: ProviderId,
    external_id: impl Into<String>,
    search_term: &str,
    details: GameMetadata,
) -> MatchCandidate {
    let title = details.name.clone().unwrap_or_default();
    let score = score_title(search_term, &title, &details.alternative_names);
    MatchCandidate {
        provider,
        external_id: external_id.into(),
        confidence: score.confidence,
        kind: score.kind,
        similarity: score.similarity,
        title,
        matched_fields: vec!["title".to_string()],
        details: Some(details),
    }
}

/// Candidate found by content or achievement hash
pub fn hash_candidate(
    provider: ProviderId,
    external_id: impl Into<String>,
    search_term: &str,
    matched_field: &str,
    details: Option<GameMetadata>,
) -> MatchCandidate {
    let title = details
        .as_ref()
        .and_then(|d| d.name.clone())
        .unwrap_or_default();
    MatchCandidate {
        provider,
        external_id: external_id.into(),
        confidence: HASH_CONFIDENCE,
        kind: MatchKind::Hash,
        similarity: title_similarity(search_term, &title),
        title,
        matched_fields: vec![matched_field.to_string()],
        details,
    }
}
