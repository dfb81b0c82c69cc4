//! Hasheous adapter
//!
//! Content-hash lookup against the public Hasheous signature database. No
//! credentials are needed. Hasheous has no per-id detail endpoint, so
//! details are served from the games seen in earlier lookups.

use async_trait::async_trait;
use romvault_common::models::{GameMetadata, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use super::http::{base_url, build_client, check_status, rate_limiter, DirectRateLimiter};
use super::scoring::hash_candidate;
use super::{LookupQuery, MatchCandidate, MetadataProvider, ProviderError};
use crate::config::ProviderSettings;

const HASHEOUS_API_URL: &str = "https://hasheous.org/api/v1";

#[derive(Debug, Serialize)]
struct HashLookupRequest<'a> {
    #[serde(rename = "mD5", skip_serializing_if = "Option::is_none")]
    md5: Option<&'a str>,
    #[serde(rename = "shA1", skip_serializing_if = "Option::is_none")]
    sha1: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct HasheousPlatform {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HasheousMatch {
    id: u64,
    name: String,
    platform: Option<HasheousPlatform>,
    /// Year as a string, when known
    year: Option<String>,
}

impl HasheousMatch {
    fn into_metadata(self) -> GameMetadata {
        GameMetadata {
            name: Some(self.name),
            release_year: self.year.as_deref().and_then(|y| y.trim().parse().ok()),
            ..Default::default()
        }
    }
}

pub struct HasheousProvider {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
    seen: RwLock<HashMap<String, GameMetadata>>,
}

impl HasheousProvider {
    pub fn new(base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            rate_limiter: rate_limiter(2),
            base_url,
            seen: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let mut provider = Self::new(base_url(settings.base_url.as_deref(), HASHEOUS_API_URL))?;
        if let Some(rps) = settings.requests_per_second {
            provider.rate_limiter = rate_limiter(rps);
        }
        Ok(provider)
    }

    fn remember(&self, id: &str, metadata: &GameMetadata) {
        if let Ok(mut seen) = self.seen.write() {
            seen.insert(id.to_string(), metadata.clone());
        }
    }
}

#[async_trait]
impl MetadataProvider for HasheousProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Hasheous
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError> {
        if !query.hashes.has_content_hash() {
            return Ok(Vec::new());
        }

        let request = HashLookupRequest {
            md5: query.hashes.md5.as_deref(),
            sha1: query.hashes.sha1.as_deref(),
            crc: query.hashes.crc32.as_deref(),
        };
        let matched_field = if request.sha1.is_some() {
            "sha1"
        } else if request.md5.is_some() {
            "md5"
        } else {
            "crc32"
        };

        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .post(format!("{}/Lookup/ByHash", self.base_url))
            .json(&request)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let found: HasheousMatch = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(platform) = found.platform.as_ref().and_then(|p| p.name.as_deref()) {
            tracing::debug!(entry = %query.fs_name, platform, "Hasheous signature matched");
        }

        let id = found.id.to_string();
        let metadata = found.into_metadata();
        self.remember(&id, &metadata);
        Ok(vec![hash_candidate(
            ProviderId::Hasheous,
            id,
            &query.search_term,
            matched_field,
            Some(metadata),
        )])
    }

    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError> {
        self.seen
            .read()
            .ok()
            .and_then(|seen| seen.get(external_id).cloned())
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MatchKind;
    use romvault_common::models::RomHashes;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(sha1: Option<&str>) -> LookupQuery {
        LookupQuery {
            search_term: "Advance Wars".to_string(),
            hashes: RomHashes {
                sha1: sha1.map(str::to_string),
                crc32: Some("1a2b3c4d".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_by_hash_and_cached_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Lookup/ByHash"))
            .and(body_partial_json(serde_json::json!({"shA1": "abc123", "crc": "1a2b3c4d"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 8812,
                "name": "Advance Wars",
                "platform": {"name": "Nintendo Game Boy Advance"},
                "year": "2001"
            })))
            .mount(&server)
            .await;

        let provider = HasheousProvider::new(server.uri()).unwrap();
        let candidates = provider.lookup(&query(Some("abc123"))).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, MatchKind::Hash);
        assert_eq!(candidates[0].matched_fields, vec!["sha1"]);

        let details = provider.fetch_details("8812").await.unwrap();
        assert_eq!(details.release_year, Some(2001));
        assert!(provider.fetch_details("1").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_signature_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = HasheousProvider::new(server.uri()).unwrap();
        assert!(provider.lookup(&query(None)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_content_hash_no_request() {
        let server = MockServer::start().await;
        let provider = HasheousProvider::new(server.uri()).unwrap();
        let q = LookupQuery::default();
        assert!(provider.lookup(&q).await.unwrap().is_empty());
    }

    #[test]
    fn test_needs_no_credentials() {
        assert!(HasheousProvider::from_settings(&ProviderSettings::default()).is_ok());
    }
}
