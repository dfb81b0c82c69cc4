//! RetroAchievements adapter
//!
//! Matches entries by their RetroAchievements hash. The game list of a
//! console, with hashes, is downloaded once per adapter and kept in memory.

use async_trait::async_trait;
use romvault_common::models::{GameMetadata, ProviderId};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::http::{base_url, build_client, check_status, rate_limiter, DirectRateLimiter};
use super::scoring::hash_candidate;
use super::{LookupQuery, MatchCandidate, MetadataProvider, ProviderError};
use crate::config::ProviderSettings;

const RA_API_URL: &str = "https://retroachievements.org/API";
const RA_MEDIA_URL: &str = "https://media.retroachievements.org";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RaListedGame {
    #[serde(rename = "ID")]
    id: u64,
    title: String,
    image_icon: Option<String>,
    #[serde(default)]
    hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RaGame {
    title: String,
    image_box_art: Option<String>,
    image_title: Option<String>,
    image_ingame: Option<String>,
    released: Option<String>,
}

fn media_url(path: &Option<String>) -> Option<String> {
    path.as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", RA_MEDIA_URL, p))
}

/// First four-digit run in a free-form release date
fn parse_year(released: &str) -> Option<i32> {
    released
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 4)
        .and_then(|y| y.parse().ok())
}

impl RaListedGame {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: Some(self.title.clone()),
            cover_url: media_url(&self.image_icon),
            ..Default::default()
        }
    }
}

impl RaGame {
    fn into_metadata(self) -> GameMetadata {
        GameMetadata {
            name: Some(self.title),
            cover_url: media_url(&self.image_box_art),
            screenshots: [media_url(&self.image_title), media_url(&self.image_ingame)]
                .into_iter()
                .flatten()
                .collect(),
            release_year: self.released.as_deref().and_then(parse_year),
            ..Default::default()
        }
    }
}

/// Lowercase RA hash -> game, for one console
type HashIndex = HashMap<String, RaListedGame>;

pub struct RetroAchievementsProvider {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
    username: String,
    api_key: String,
    consoles: Mutex<HashMap<u32, Arc<HashIndex>>>,
}

impl RetroAchievementsProvider {
    pub fn new(username: String, api_key: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            rate_limiter: rate_limiter(1),
            base_url,
            username,
            api_key,
            consoles: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let (Some(username), Some(api_key)) = (settings.username.clone(), settings.api_key.clone())
        else {
            return Err(ProviderError::NotConfigured(
                "RetroAchievements username/api_key missing".to_string(),
            ));
        };
        let mut provider = Self::new(username, api_key, base_url(settings.base_url.as_deref(), RA_API_URL))?;
        if let Some(rps) = settings.requests_per_second {
            provider.rate_limiter = rate_limiter(rps);
        }
        Ok(provider)
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<reqwest::Response, ProviderError> {
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&[("z", self.username.as_str()), ("y", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Auth("RetroAchievements rejected the API key".to_string()));
        }
        check_status(response).await
    }

    /// Hash index of a console, downloading it on first use
    async fn console_index(&self, console_id: u32) -> Result<Arc<HashIndex>, ProviderError> {
        let mut consoles = self.consoles.lock().await;
        if let Some(index) = consoles.get(&console_id) {
            return Ok(Arc::clone(index));
        }

        debug!(console_id, "Downloading RetroAchievements game list");
        let games: Vec<RaListedGame> = self
            .get(
                "API_GetGameList.php",
                &[("i", console_id.to_string()), ("h", "1".to_string()), ("f", "1".to_string())],
            )
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let mut index = HashIndex::new();
        for game in games {
            for hash in &game.hashes {
                index.insert(hash.to_lowercase(), game.clone());
            }
        }
        let index = Arc::new(index);
        consoles.insert(console_id, Arc::clone(&index));
        Ok(index)
    }
}

#[async_trait]
impl MetadataProvider for RetroAchievementsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ra
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError> {
        let (Some(console_id), Some(ra_hash)) = (query.platform_ids.ra, query.hashes.ra.as_deref()) else {
            return Ok(Vec::new());
        };

        let index = self.console_index(console_id).await?;
        Ok(index
            .get(&ra_hash.to_lowercase())
            .map(|game| {
                hash_candidate(
                    ProviderId::Ra,
                    game.id.to_string(),
                    &query.search_term,
                    "ra",
                    Some(game.metadata()),
                )
            })
            .into_iter()
            .collect())
    }

    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError> {
        let response = self
            .get("API_GetGame.php", &[("i", external_id.to_string())])
            .await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        // Unknown ids come back as an object without a title
        if body.get("Title").map(|t| t.is_null()).unwrap_or(true) {
            return Err(ProviderError::NotFound(external_id.to_string()));
        }
        let game: RaGame = serde_json::from_value(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(game.into_metadata())
    }
}
