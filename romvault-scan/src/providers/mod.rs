//! Metadata provider adapters
//!
//! Every external catalog implements [`MetadataProvider`]. The
//! [`ProviderRegistry`] holds the enabled adapters and fans a lookup out to
//! all of them concurrently. A provider that errors or times out yields zero
//! candidates for that entry; the failure is logged and recorded, never
//! propagated.
//!
//! # Providers
//! 1. **igdb** - IGDB, title search per platform
//! 2. **moby** - MobyGames, title search per platform
//! 3. **ss** - ScreenScraper, hash lookup with title fallback
//! 4. **ra** - RetroAchievements, achievement-hash lookup per console
//! 5. **hasheous** - Hasheous, content-hash lookup

pub mod hasheous;
mod http;
pub mod igdb;
pub mod moby;
pub mod retroachievements;
pub mod scoring;
pub mod screenscraper;

use async_trait::async_trait;
use futures::future::join_all;
use romvault_common::config::TomlConfig;
use romvault_common::models::{GameMetadata, ProviderFailure, ProviderId, RomHashes, RomTags};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{resolve_provider_settings, ScanSettings};
use crate::discovery::ProviderPlatformIds;

pub use scoring::MatchKind;

/// Provider-scoped failure
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// What is known about an entry when querying providers
#[derive(Debug, Clone, Default)]
pub struct LookupQuery {
    /// Canonical platform slug
    pub platform_slug: String,
    pub platform_ids: ProviderPlatformIds,
    pub fs_name: String,
    /// Title with tags and extension removed
    pub search_term: String,
    pub tags: RomTags,
    pub hashes: RomHashes,
    pub size: u64,
}

/// One possible match returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub provider: ProviderId,
    pub external_id: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub kind: MatchKind,
    /// Normalized title similarity, 0.0 - 1.0
    pub similarity: f64,
    pub title: String,
    /// Query fields that matched (`sha1`, `title`, ...)
    pub matched_fields: Vec<String>,
    /// Enrichment returned with the lookup, if any
    pub details: Option<GameMetadata>,
}

/// Capability interface of one external catalog
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Resolve an entry to zero or more candidates
    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError>;

    /// Enrichment fields of an external id
    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError>;
}

/// Result of querying several providers for one entry
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    pub candidates: Vec<MatchCandidate>,
    pub failures: Vec<ProviderFailure>,
    /// Providers that answered, with or without candidates
    pub queried: Vec<ProviderId>,
}

/// Configuration-driven list of enabled providers
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MetadataProvider>>,
    timeout: Duration,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Duration::from_secs(30))
    }

    /// Build adapters for every enabled provider, in metadata priority order.
    ///
    /// Enabled providers lacking credentials are skipped with a warning.
    pub fn from_config(config: &TomlConfig, settings: &ScanSettings) -> Self {
        let mut order = settings.metadata_priority.clone();
        for id in ProviderId::ALL {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let mut providers: Vec<Arc<dyn MetadataProvider>> = Vec::new();
        for id in order {
            let provider_settings = resolve_provider_settings(id, config);
            if !provider_settings.enabled {
                debug!(provider = %id, "Provider disabled");
                continue;
            }

            let built: Result<Arc<dyn MetadataProvider>, ProviderError> = match id {
                ProviderId::Igdb => {
                    igdb::IgdbProvider::from_settings(&provider_settings).map(|p| Arc::new(p) as _)
                }
                ProviderId::Moby => {
                    moby::MobyProvider::from_settings(&provider_settings).map(|p| Arc::new(p) as _)
                }
                ProviderId::Ss => screenscraper::ScreenScraperProvider::from_settings(&provider_settings)
                    .map(|p| Arc::new(p) as _),
                ProviderId::Ra => retroachievements::RetroAchievementsProvider::from_settings(
                    &provider_settings,
                )
                .map(|p| Arc::new(p) as _),
                ProviderId::Hasheous => hasheous::HasheousProvider::from_settings(&provider_settings)
                    .map(|p| Arc::new(p) as _),
            };

            match built {
                Ok(provider) => {
                    info!(provider = %id, "Provider enabled");
                    providers.push(provider);
                }
                Err(e) => warn!(provider = %id, error = %e, "Provider enabled but unusable, skipping"),
            }
        }

        Self::new(providers, settings.provider_timeout)
    }

    /// Enabled provider ids, in priority order
    pub fn enabled(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn is_enabled(&self, id: ProviderId) -> bool {
        self.providers.iter().any(|p| p.id() == id)
    }

    /// Registry limited to the requested providers; empty request keeps all
    pub fn restricted_to(&self, ids: &[ProviderId]) -> Self {
        if ids.is_empty() {
            return self.clone();
        }
        Self {
            providers: self
                .providers
                .iter()
                .filter(|p| ids.contains(&p.id()))
                .cloned()
                .collect(),
            timeout: self.timeout,
        }
    }

    fn get(&self, id: ProviderId) -> Option<&Arc<dyn MetadataProvider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// Query `only` (or every provider when `None`) concurrently.
    ///
    /// Per-provider error isolation: failures become `ProviderFailure`
    /// records and zero candidates.
    pub async fn lookup_all(&self, query: &LookupQuery, only: Option<&[ProviderId]>) -> LookupOutcome {
        let selected: Vec<&Arc<dyn MetadataProvider>> = self
            .providers
            .iter()
            .filter(|p| only.map(|ids| ids.contains(&p.id())).unwrap_or(true))
            .collect();

        let futures = selected.iter().map(|provider| {
            let provider = Arc::clone(*provider);
            let timeout = self.timeout;
            async move {
                let id = provider.id();
                let result = match tokio::time::timeout(timeout, provider.lookup(query)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(timeout)),
                };
                (id, result)
            }
        });

        let mut outcome = LookupOutcome::default();
        for (id, result) in join_all(futures).await {
            match result {
                Ok(mut candidates) => {
                    debug!(provider = %id, entry = %query.fs_name, count = candidates.len(), "Provider lookup complete");
                    // Adapters never vouch for another provider's ids
                    candidates.retain(|c| c.provider == id);
                    outcome.candidates.extend(candidates);
                    outcome.queried.push(id);
                }
                Err(e) => {
                    warn!(provider = %id, entry = %query.fs_name, error = %e, "Provider lookup failed");
                    outcome.failures.push(ProviderFailure {
                        provider: id,
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Fetch enrichment from one provider with the registry timeout
    pub async fn fetch_details(
        &self,
        provider: ProviderId,
        external_id: &str,
    ) -> Result<GameMetadata, ProviderError> {
        let adapter = self
            .get(provider)
            .ok_or_else(|| ProviderError::NotConfigured(provider.to_string()))?;
        match tokio::time::timeout(self.timeout, adapter.fetch_details(external_id)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{candidate, MockProvider};
    use super::*;

    fn query(term: &str) -> LookupQuery {
        LookupQuery {
            platform_slug: "gba".to_string(),
            fs_name: format!("{}.gba", term),
            search_term: term.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_provider_isolated() {
        let mut good = MockProvider::new(ProviderId::Igdb);
        good.by_term.insert(
            "game".to_string(),
            vec![candidate(ProviderId::Igdb, "42", 0.95, MatchKind::ExactTitle)],
        );
        let mut bad = MockProvider::new(ProviderId::Moby);
        bad.fail = true;

        let registry = ProviderRegistry::new(
            vec![Arc::new(good), Arc::new(bad)],
            Duration::from_secs(5),
        );
        let outcome = registry.lookup_all(&query("game"), None).await;

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, ProviderId::Moby);
        assert_eq!(outcome.queried, vec![ProviderId::Igdb]);
    }

    #[tokio::test]
    async fn test_timeout_yields_zero_candidates() {
        let mut slow = MockProvider::new(ProviderId::Ss);
        slow.delay = Some(Duration::from_millis(500));
        slow.by_term.insert(
            "game".to_string(),
            vec![candidate(ProviderId::Ss, "1", 1.0, MatchKind::Hash)],
        );

        let registry = ProviderRegistry::new(vec![Arc::new(slow)], Duration::from_millis(20));
        let outcome = registry.lookup_all(&query("game"), None).await;

        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("Timed out"));
    }

    #[tokio::test]
    async fn test_only_selected_providers_queried() {
        let igdb = Arc::new(MockProvider::new(ProviderId::Igdb));
        let moby = Arc::new(MockProvider::new(ProviderId::Moby));
        let registry = ProviderRegistry::new(
            vec![
                igdb.clone() as Arc<dyn MetadataProvider>,
                moby.clone() as Arc<dyn MetadataProvider>,
            ],
            Duration::from_secs(5),
        );

        registry
            .lookup_all(&query("game"), Some(&[ProviderId::Moby]))
            .await;
        assert_eq!(igdb.calls(), 0);
        assert_eq!(moby.calls(), 1);
    }

    #[test]
    fn test_restricted_registry() {
        let registry = ProviderRegistry::new(
            vec![
                Arc::new(MockProvider::new(ProviderId::Igdb)),
                Arc::new(MockProvider::new(ProviderId::Ra)),
            ],
            Duration::from_secs(5),
        );
        assert_eq!(registry.restricted_to(&[]).enabled().len(), 2);
        assert_eq!(registry.restricted_to(&[ProviderId::Ra]).enabled(), vec![ProviderId::Ra]);
        assert!(!registry.restricted_to(&[ProviderId::Ra]).is_enabled(ProviderId::Igdb));
    }

    #[test]
    fn test_disabled_providers_not_built() {
        let config = TomlConfig::default();
        let settings = ScanSettings::new("/lib");
        let registry = ProviderRegistry::from_config(&config, &settings);
        assert!(registry.enabled().is_empty());
    }

    #[test]
    fn test_hasheous_enabled_without_credentials() {
        let mut config = TomlConfig::default();
        config.providers.hasheous.enabled = true;
        let settings = ScanSettings::new("/lib");
        let registry = ProviderRegistry::from_config(&config, &settings);
        assert_eq!(registry.enabled(), vec![ProviderId::Hasheous]);
    }
}
