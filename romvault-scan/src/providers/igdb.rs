//! IGDB adapter
//!
//! Authenticates with Twitch client credentials and searches games with
//! Apicalypse queries filtered by the IGDB platform id.

use async_trait::async_trait;
use romvault_common::models::{GameMetadata, ProviderId};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::http::{base_url, build_client, check_status, rate_limiter, DirectRateLimiter};
use super::scoring::title_candidate;
use super::{LookupQuery, MatchCandidate, MetadataProvider, ProviderError};
use crate::config::ProviderSettings;

const IGDB_API_URL: &str = "https://api.igdb.com/v4";
const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const GAME_FIELDS: &str = "id,name,slug,summary,cover.url,screenshots.url,alternative_names.name,first_release_date";
const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct IgdbImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct IgdbAltName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: u64,
    name: String,
    slug: Option<String>,
    summary: Option<String>,
    cover: Option<IgdbImage>,
    #[serde(default)]
    screenshots: Vec<IgdbImage>,
    #[serde(default)]
    alternative_names: Vec<IgdbAltName>,
    /// Unix timestamp
    first_release_date: Option<i64>,
}

/// IGDB image URLs are protocol-relative thumbnails
fn image_url(url: &str, size: &str) -> String {
    let url = if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    };
    url.replace("t_thumb", size)
}

impl IgdbGame {
    fn into_metadata(self) -> GameMetadata {
        GameMetadata {
            name: Some(self.name),
            slug: self.slug,
            summary: self.summary.filter(|s| !s.trim().is_empty()),
            cover_url: self.cover.map(|c| image_url(&c.url, "t_cover_big")),
            screenshots: self
                .screenshots
                .iter()
                .map(|s| image_url(&s.url, "t_screenshot_huge"))
                .collect(),
            manual_url: None,
            release_year: self
                .first_release_date
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .map(|dt| chrono::Datelike::year(&dt)),
            alternative_names: self.alternative_names.into_iter().map(|a| a.name).collect(),
        }
    }
}

fn escape(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

pub struct IgdbProvider {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<String>>,
}

impl IgdbProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        base_url: String,
        token_url: String,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            // IGDB allows 4 requests per second
            rate_limiter: rate_limiter(4),
            base_url,
            token_url,
            client_id,
            client_secret,
            token: RwLock::new(None),
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let client_id = settings
            .client_id
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("IGDB client_id missing".to_string()))?;
        let client_secret = settings
            .client_secret
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("IGDB client_secret missing".to_string()))?;
        let mut provider = Self::new(
            client_id,
            client_secret,
            base_url(settings.base_url.as_deref(), IGDB_API_URL),
            TWITCH_TOKEN_URL.to_string(),
        )?;
        if let Some(rps) = settings.requests_per_second {
            provider.rate_limiter = rate_limiter(rps);
        }
        Ok(provider)
    }

    async fn token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        debug!("Requesting IGDB access token");
        let response = self
            .client
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Auth(format!(
                "token request returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        *guard = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    /// POST an Apicalypse body to `/games`, refreshing the token once on 401
    async fn query_games(&self, body: String) -> Result<Vec<IgdbGame>, ProviderError> {
        for attempt in 0..2 {
            let token = self.token().await?;
            self.rate_limiter.until_ready().await;

            let response = self
                .client
                .post(format!("{}/games", self.base_url))
                .header("Client-ID", &self.client_id)
                .bearer_auth(&token)
                .body(body.clone())
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED && attempt == 0 {
                debug!("IGDB token rejected, refreshing");
                *self.token.write().await = None;
                continue;
            }

            let response = check_status(response).await?;
            return response
                .json()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string()));
        }
        Err(ProviderError::Auth("IGDB rejected a fresh token".to_string()))
    }
}

#[async_trait]
impl MetadataProvider for IgdbProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Igdb
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError> {
        let Some(platform_id) = query.platform_ids.igdb else {
            return Ok(Vec::new());
        };
        if query.search_term.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body = format!(
            "search \"{}\"; fields {}; where platforms = [{}]; limit {};",
            escape(&query.search_term),
            GAME_FIELDS,
            platform_id,
            SEARCH_LIMIT
        );
        let games = self.query_games(body).await?;

        Ok(games
            .into_iter()
            .map(|game| {
                let id = game.id.to_string();
                title_candidate(ProviderId::Igdb, id, &query.search_term, game.into_metadata())
            })
            .collect())
    }

    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError> {
        let id: u64 = external_id
            .parse()
            .map_err(|_| ProviderError::Parse(format!("invalid IGDB id {:?}", external_id)))?;
        let body = format!("fields {}; where id = {};", GAME_FIELDS, id);
        self.query_games(body)
            .await?
            .into_iter()
            .next()
            .map(IgdbGame::into_metadata)
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProviderPlatformIds;
    use crate::providers::MatchKind;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider(server: &MockServer) -> IgdbProvider {
        IgdbProvider::new(
            "client".to_string(),
            "secret".to_string(),
            server.uri(),
            format!("{}/oauth2/token", server.uri()),
        )
        .unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "tok",
                    "expires_in": 5000,
                    "token_type": "bearer"
                })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_lookup_scores_exact_title() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/games"))
            .and(header("Client-ID", "client"))
            .and(body_string_contains("where platforms = [24]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1234,
                    "name": "Pokemon Ruby Version",
                    "slug": "pokemon-ruby-version",
                    "summary": "Catch them all.",
                    "cover": {"url": "//images.igdb.com/igdb/image/upload/t_thumb/abc.jpg"},
                    "alternative_names": [{"name": "Pokemon Ruby"}],
                    "first_release_date": 1037232000
                },
                {"id": 99, "name": "Pokemon Sapphire Version"}
            ])))
            .mount(&server)
            .await;

        let query = LookupQuery {
            platform_ids: ProviderPlatformIds {
                igdb: Some(24),
                ..Default::default()
            },
            search_term: "Pokemon Ruby".to_string(),
            ..Default::default()
        };
        let candidates = provider(&server).await.lookup(&query).await.unwrap();

        assert_eq!(candidates.len(), 2);
        let ruby = &candidates[0];
        assert_eq!(ruby.external_id, "1234");
        assert_eq!(ruby.kind, MatchKind::ExactTitle);
        let details = ruby.details.as_ref().unwrap();
        assert_eq!(
            details.cover_url.as_deref(),
            Some("https://images.igdb.com/igdb/image/upload/t_cover_big/abc.jpg")
        );
        assert_eq!(details.release_year, Some(2002));
        assert_eq!(candidates[1].kind, MatchKind::Fuzzy);
    }

    #[tokio::test]
    async fn test_lookup_without_platform_id_skips_request() {
        let server = MockServer::start().await;
        let candidates = provider(&server)
            .await
            .lookup(&LookupQuery {
                search_term: "Game".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/games"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = provider(&server).await.fetch_details("1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }

    #[test]
    fn test_missing_credentials_not_configured() {
        let err = IgdbProvider::from_settings(&ProviderSettings {
            enabled: true,
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
