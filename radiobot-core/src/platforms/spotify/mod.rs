// File: radiobot-core/src/platforms/spotify/mod.rs
//
// Album art for "Now Playing" posts, looked up through the Spotify Web API
// with a client-credentials token.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use radiobot_common::models::config::SpotifySettings;
use radiobot_common::traits::media_traits::CoverArtLookup;
use crate::Error;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// No configured placeholder: the post goes out without a thumbnail.
pub const FALLBACK_COVER_URL: &str = "";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Deserialize)]
struct TrackPage {
    items: Vec<Track>,
}

#[derive(Deserialize)]
struct Track {
    album: Album,
}

#[derive(Deserialize)]
struct Album {
    images: Vec<Image>,
}

#[derive(Deserialize)]
struct Image {
    url: String,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct SpotifyCoverLookup {
    http: ReqwestClient,
    client_id: String,
    client_secret: String,
    placeholder: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyCoverLookup {
    pub fn new(settings: &SpotifySettings) -> Self {
        Self {
            http: ReqwestClient::new(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            placeholder: settings
                .default_cover_url
                .clone()
                .unwrap_or_else(|| FALLBACK_COVER_URL.to_string()),
            token: Mutex::new(None),
        }
    }

    /// Returns the cached token, fetching a new one when it is about to expire.
    async fn access_token(&self) -> Result<String, Error> {
        let mut cached = self.token.lock().await;
        if let Some(tok) = cached.as_ref() {
            if tok.expires_at > Utc::now() {
                return Ok(tok.access_token.clone());
            }
        }

        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let resp = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Lookup(format!("Spotify token endpoint error: {e}")))?
            .json::<TokenResponse>()
            .await?;

        // Refresh a minute early.
        let expires_at = Utc::now() + ChronoDuration::seconds((resp.expires_in - 60).max(0));
        debug!("Fetched Spotify token valid until {expires_at}");
        let token = resp.access_token.clone();
        *cached = Some(CachedToken {
            access_token: resp.access_token,
            expires_at,
        });
        Ok(token)
    }

    async fn search_cover(&self, title: &str) -> Result<Option<String>, Error> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[("q", title), ("type", "track"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Lookup(format!("Spotify search error: {e}")))?
            .json::<SearchResponse>()
            .await?;
        Ok(first_album_image(resp))
    }
}

fn first_album_image(resp: SearchResponse) -> Option<String> {
    resp.tracks
        .items
        .into_iter()
        .next()
        .and_then(|t| t.album.images.into_iter().next())
        .map(|i| i.url)
}

#[async_trait]
impl CoverArtLookup for SpotifyCoverLookup {
    async fn cover_for(&self, title: &str) -> String {
        match self.search_cover(title).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!("No cover art found for '{title}'");
                self.placeholder.clone()
            }
            Err(e) => {
                warn!("Cover art lookup for '{title}' failed: {e}");
                self.placeholder.clone()
            }
        }
    }
}

/// Cover lookup used when no `[spotify]` section is configured.
pub struct PlaceholderCoverLookup {
    url: String,
}

impl PlaceholderCoverLookup {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.unwrap_or(FALLBACK_COVER_URL).to_string(),
        }
    }
}

#[async_trait]
impl CoverArtLookup for PlaceholderCoverLookup {
    async fn cover_for(&self, _title: &str) -> String {
        self.url.clone()
    }
}
