//! MobyGames adapter

use async_trait::async_trait;
use romvault_common::models::{GameMetadata, ProviderId};
use serde::Deserialize;

use super::http::{base_url, build_client, check_status, rate_limiter, DirectRateLimiter};
use super::scoring::title_candidate;
use super::{LookupQuery, MatchCandidate, MetadataProvider, ProviderError};
use crate::config::ProviderSettings;

const MOBY_API_URL: &str = "https://api.mobygames.com/v1";

#[derive(Debug, Deserialize)]
struct MobyGamesResponse {
    #[serde(default)]
    games: Vec<MobyGame>,
}

#[derive(Debug, Deserialize)]
struct MobyImage {
    image: String,
}

#[derive(Debug, Deserialize)]
struct MobyAltTitle {
    title: String,
}

#[derive(Debug, Deserialize)]
struct MobyGame {
    game_id: u64,
    title: String,
    moby_url: Option<String>,
    description: Option<String>,
    sample_cover: Option<MobyImage>,
    #[serde(default)]
    sample_screenshots: Vec<MobyImage>,
    #[serde(default)]
    alternate_titles: Vec<MobyAltTitle>,
}

impl MobyGame {
    fn into_metadata(self) -> GameMetadata {
        GameMetadata {
            name: Some(self.title),
            slug: self
                .moby_url
                .as_deref()
                .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            summary: self.description.filter(|s| !s.trim().is_empty()),
            cover_url: self.sample_cover.map(|c| c.image),
            screenshots: self.sample_screenshots.into_iter().map(|s| s.image).collect(),
            manual_url: None,
            release_year: None,
            alternative_names: self.alternate_titles.into_iter().map(|a| a.title).collect(),
        }
    }
}

pub struct MobyProvider {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
    api_key: String,
}

impl MobyProvider {
    pub fn new(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            // MobyGames free tier: 1 request per second
            rate_limiter: rate_limiter(1),
            base_url,
            api_key,
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("MobyGames api_key missing".to_string()))?;
        let mut provider = Self::new(api_key, base_url(settings.base_url.as_deref(), MOBY_API_URL))?;
        if let Some(rps) = settings.requests_per_second {
            provider.rate_limiter = rate_limiter(rps);
        }
        Ok(provider)
    }

    async fn games(&self, params: &[(&str, String)]) -> Result<Vec<MobyGame>, ProviderError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{}/games", self.base_url))
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("format", "normal")])
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: MobyGamesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(body.games)
    }

    async fn search(&self, term: &str, platform_id: u32) -> Result<Vec<MobyGame>, ProviderError> {
        self.games(&[
            ("title", term.to_string()),
            ("platform", platform_id.to_string()),
        ])
        .await
    }
}

#[async_trait]
impl MetadataProvider for MobyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Moby
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError> {
        let Some(platform_id) = query.platform_ids.moby else {
            return Ok(Vec::new());
        };
        let term = query.search_term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut games = self.search(term, platform_id).await?;

        // "Title A / Title B" compilations are listed under either half
        if games.is_empty() && term.contains('/') {
            for part in term.split('/').map(str::trim).filter(|p| !p.is_empty()) {
                games = self.search(part, platform_id).await?;
                if !games.is_empty() {
                    break;
                }
            }
        }

        Ok(games
            .into_iter()
            .map(|game| {
                let id = game.game_id.to_string();
                title_candidate(ProviderId::Moby, id, &query.search_term, game.into_metadata())
            })
            .collect())
    }

    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError> {
        self.games(&[("id", external_id.to_string())])
            .await?
            .into_iter()
            .next()
            .map(MobyGame::into_metadata)
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProviderPlatformIds;
    use crate::providers::MatchKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gba_query(term: &str) -> LookupQuery {
        LookupQuery {
            platform_ids: ProviderPlatformIds {
                moby: Some(12),
                ..Default::default()
            },
            search_term: term.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_parses_games() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .and(query_param("title", "Golden Sun"))
            .and(query_param("platform", "12"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "games": [{
                    "game_id": 7083,
                    "title": "Golden Sun",
                    "moby_url": "https://www.mobygames.com/game/7083/golden-sun/",
                    "description": "An RPG.",
                    "sample_cover": {"image": "https://cdn.mobygames.com/covers/gs.jpg"},
                    "sample_screenshots": [{"image": "https://cdn.mobygames.com/s/1.jpg"}]
                }]
            })))
            .mount(&server)
            .await;

        let provider = MobyProvider::new("key".to_string(), server.uri()).unwrap();
        let candidates = provider.lookup(&gba_query("Golden Sun")).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "7083");
        assert_eq!(candidates[0].kind, MatchKind::ExactTitle);
        let details = candidates[0].details.as_ref().unwrap();
        assert_eq!(details.slug.as_deref(), Some("golden-sun"));
        assert!(details.is_complete());
        assert_eq!(details.screenshots.len(), 1);
    }

    #[tokio::test]
    async fn test_split_title_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .and(query_param("title", "Tetris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "games": [{"game_id": 1, "title": "Tetris"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"games": []})))
            .mount(&server)
            .await;

        let provider = MobyProvider::new("key".to_string(), server.uri()).unwrap();
        let candidates = provider
            .lookup(&gba_query("Dr. Mario / Tetris"))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Tetris");
    }

    #[tokio::test]
    async fn test_unknown_id_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"games": []})))
            .mount(&server)
            .await;

        let provider = MobyProvider::new("key".to_string(), server.uri()).unwrap();
        let err = provider.fetch_details("404").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_requires_api_key() {
        assert!(MobyProvider::from_settings(&ProviderSettings::default()).is_err());
    }
}
