//! ScreenScraper adapter
//!
//! Looks a ROM up by its digests (`jeuInfos.php`). When the returned game
//! carries the same digest the candidate is a hash match; otherwise, or when
//! no hash is known, it falls back to a title search (`jeuRecherche.php`).

use async_trait::async_trait;
use romvault_common::models::{GameMetadata, ProviderId};
use serde::Deserialize;
use tracing::debug;

use super::http::{base_url, build_client, rate_limiter, DirectRateLimiter};
use super::scoring::{hash_candidate, title_candidate};
use super::{LookupQuery, MatchCandidate, MetadataProvider, ProviderError};
use crate::config::ProviderSettings;

const SS_API_URL: &str = "https://api.screenscraper.fr/api2";
const SOFTNAME: &str = "romvault";
const LOGIN_ERROR: &str = "Erreur de login";

#[derive(Debug, Default, Deserialize)]
struct SsText {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    langue: Option<String>,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct SsMedia {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    parent: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct SsRom {
    romsha1: Option<String>,
    romcrc: Option<String>,
    rommd5: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SsGame {
    /// Empty objects appear in place of "no result"
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    noms: Vec<SsText>,
    #[serde(default)]
    synopsis: Vec<SsText>,
    #[serde(default)]
    medias: Vec<SsMedia>,
    #[serde(default)]
    dates: Vec<SsText>,
    rom: Option<SsRom>,
}

#[derive(Debug, Deserialize)]
struct SsInfosBody {
    jeu: SsGame,
}

#[derive(Debug, Deserialize)]
struct SsInfosResponse {
    response: SsInfosBody,
}

#[derive(Debug, Deserialize)]
struct SsSearchBody {
    #[serde(default)]
    jeux: Vec<SsGame>,
}

#[derive(Debug, Deserialize)]
struct SsSearchResponse {
    response: SsSearchBody,
}

fn media_url(medias: &[SsMedia], kind: &str, regions: &[&str], format: Option<&str>) -> Option<String> {
    regions.iter().find_map(|region| {
        medias
            .iter()
            .find(|m| {
                m.kind == kind
                    && m.parent == "jeu"
                    && m.region.as_deref() == Some(*region)
                    && format.map(|f| m.format.as_deref() == Some(f)).unwrap_or(true)
                    && !m.url.is_empty()
            })
            .map(|m| m.url.clone())
    })
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

impl SsGame {
    fn external_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Name in the `ss` world region, else the first listed
    fn name(&self) -> Option<String> {
        self.noms
            .iter()
            .find(|n| n.region.as_deref() == Some("ss"))
            .or_else(|| self.noms.first())
            .map(|n| n.text.clone())
            .filter(|n| !n.is_empty())
    }

    fn into_metadata(self) -> GameMetadata {
        let name = self.name();
        let alternative_names = self
            .noms
            .iter()
            .map(|n| n.text.clone())
            .filter(|n| Some(n) != name.as_ref() && !n.is_empty())
            .collect();
        let release_year = self
            .dates
            .iter()
            .filter_map(|d| d.text.get(..4).and_then(|y| y.parse::<i32>().ok()))
            .min();

        GameMetadata {
            slug: name.as_deref().map(slugify),
            summary: self
                .synopsis
                .iter()
                .find(|s| s.langue.as_deref() == Some("en"))
                .map(|s| s.text.clone())
                .filter(|s| !s.trim().is_empty()),
            cover_url: media_url(&self.medias, "box-2D", &["us", "wor", "eu", "ss", "jp"], None),
            screenshots: media_url(&self.medias, "ss", &["us", "wor", "eu", "ss", "jp"], None)
                .into_iter()
                .collect(),
            manual_url: media_url(&self.medias, "manuel", &["us", "eu"], Some("pdf")),
            release_year,
            alternative_names,
            name,
        }
    }

    /// Which query digest the returned ROM confirms, strongest first
    fn confirmed_hash(&self, query: &LookupQuery) -> Option<&'static str> {
        let rom = self.rom.as_ref()?;
        let same = |ours: &Option<String>, theirs: &Option<String>| match (ours, theirs) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        if same(&query.hashes.sha1, &rom.romsha1) {
            Some("sha1")
        } else if same(&query.hashes.md5, &rom.rommd5) {
            Some("md5")
        } else if same(&query.hashes.crc32, &rom.romcrc) {
            Some("crc32")
        } else {
            None
        }
    }
}

pub struct ScreenScraperProvider {
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
    username: String,
    password: String,
}

impl ScreenScraperProvider {
    pub fn new(username: String, password: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client()?,
            rate_limiter: rate_limiter(2),
            base_url,
            username,
            password,
        })
    }

    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let (Some(username), Some(password)) = (settings.username.clone(), settings.password.clone())
        else {
            return Err(ProviderError::NotConfigured(
                "ScreenScraper username/password missing".to_string(),
            ));
        };
        let mut provider = Self::new(username, password, base_url(settings.base_url.as_deref(), SS_API_URL))?;
        if let Some(rps) = settings.requests_per_second {
            provider.rate_limiter = rate_limiter(rps);
        }
        Ok(provider)
    }

    /// GET an endpoint with credentials; `None` when the service reports no game
    async fn get_text(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Option<String>, ProviderError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(params)
            .query(&[
                ("ssid", self.username.as_str()),
                ("sspassword", self.password.as_str()),
                ("softname", SOFTNAME),
                ("output", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if body.contains(LOGIN_ERROR) {
            return Err(ProviderError::Auth("ScreenScraper rejected the credentials".to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(Some(body))
    }

    async fn game_infos(&self, params: &[(&str, String)]) -> Result<Option<SsGame>, ProviderError> {
        let Some(body) = self.get_text("jeuInfos.php", params).await? else {
            return Ok(None);
        };
        let parsed: SsInfosResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(Some(parsed.response.jeu).filter(|g| g.external_id().is_some()))
    }

    async fn search(&self, term: &str, system_id: u32) -> Result<Vec<SsGame>, ProviderError> {
        let params = [
            ("systemeid", system_id.to_string()),
            ("recherche", term.to_string()),
        ];
        let Some(body) = self.get_text("jeuRecherche.php", &params).await? else {
            return Ok(Vec::new());
        };
        let parsed: SsSearchResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(parsed
            .response
            .jeux
            .into_iter()
            .filter(|g| g.external_id().is_some())
            .collect())
    }
}

#[async_trait]
impl MetadataProvider for ScreenScraperProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ss
    }

    async fn lookup(&self, query: &LookupQuery) -> Result<Vec<MatchCandidate>, ProviderError> {
        let Some(system_id) = query.platform_ids.ss else {
            return Ok(Vec::new());
        };

        if query.hashes.has_content_hash() {
            let mut params = vec![
                ("systemeid", system_id.to_string()),
                ("romtype", "rom".to_string()),
                ("romnom", query.fs_name.clone()),
                ("romtaille", query.size.to_string()),
            ];
            if let Some(crc) = &query.hashes.crc32 {
                params.push(("crc", crc.clone()));
            }
            if let Some(md5) = &query.hashes.md5 {
                params.push(("md5", md5.clone()));
            }
            if let Some(sha1) = &query.hashes.sha1 {
                params.push(("sha1", sha1.clone()));
            }

            if let Some(game) = self.game_infos(&params).await? {
                let id = game.external_id().unwrap_or_default().to_string();
                let candidate = match game.confirmed_hash(query) {
                    Some(field) => {
                        hash_candidate(ProviderId::Ss, id, &query.search_term, field, Some(game.into_metadata()))
                    }
                    None => title_candidate(ProviderId::Ss, id, &query.search_term, game.into_metadata()),
                };
                return Ok(vec![candidate]);
            }
            debug!(entry = %query.fs_name, "ScreenScraper has no hash match, searching by title");
        }

        if query.search_term.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .search(&query.search_term, system_id)
            .await?
            .into_iter()
            .map(|game| {
                let id = game.external_id().unwrap_or_default().to_string();
                title_candidate(ProviderId::Ss, id, &query.search_term, game.into_metadata())
            })
            .collect())
    }

    async fn fetch_details(&self, external_id: &str) -> Result<GameMetadata, ProviderError> {
        self.game_infos(&[("gameid", external_id.to_string())])
            .await?
            .map(SsGame::into_metadata)
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }
}
