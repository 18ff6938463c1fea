// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! HTTP adapter for Kraken v5 style directory endpoints.

use std::time::Duration;

use reqwest::{
    StatusCode,
    header::{ACCEPT, HeaderMap, HeaderName, HeaderValue},
};

use crate::{Directory, GameRecord, StreamRecord, UpstreamError, mapping};

const DEFAULT_BASE_URL: &str = "https://api.twitch.tv";
const STREAMS_PATH: &str = "/kraken/streams";
const TOP_GAMES_PATH: &str = "/kraken/games/top";
const ACCEPT_V5: &str = "application/vnd.twitchtv.v5+json";
const CLIENT_ID_HEADER: &str = "client-id";

/// Connection settings for [`KrakenDirectory`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use streamcache_directory::KrakenConfig;
///
/// let config = KrakenConfig::new("my-client-id")
///     .base_url("http://localhost:8080")
///     .read_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct KrakenConfig {
    base_url: String,
    client_id: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl KrakenConfig {
    /// Creates a configuration for the public endpoint with the given client id.
    ///
    /// Defaults: connect timeout 1 s, read timeout 3 s.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: client_id.into(),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(3),
        }
    }

    /// Overrides the endpoint root, e.g. for a proxy or a local fake.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-read timeout on the response.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// A [`Directory`] backed by the Kraken v5 HTTP API.
///
/// Stream records missing required display fields are logged at warning level and
/// returned anyway.
#[derive(Debug, Clone)]
pub struct KrakenDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl KrakenDirectory {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the client id is not a valid header value or the
    /// TLS backend cannot be initialized.
    pub fn new(config: KrakenConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V5));
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&config.client_id).map_err(UpstreamError::transport)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(UpstreamError::transport)?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<u8>, UpstreamError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(UpstreamError::transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::status(format!("GET {path} returned {status}")));
        }

        let body = response.bytes().await.map_err(UpstreamError::transport)?;
        Ok(body.to_vec())
    }
}

impl Directory for KrakenDirectory {
    async fn fetch_streams(&self, game: &str, offset: usize, limit: usize) -> Result<Vec<StreamRecord>, UpstreamError> {
        let query = [
            ("game", game.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let body = self.get(STREAMS_PATH, &query).await?;
        let streams = mapping::parse_streams(&body)?;

        for record in streams.iter().filter(|record| !record.is_valid()) {
            tracing::warn!(
                game,
                channel = %record.channel_name,
                missing = ?record.missing_fields(),
                "invalid stream record"
            );
        }

        Ok(streams)
    }

    async fn fetch_popular_games(&self, limit: usize) -> Result<Vec<GameRecord>, UpstreamError> {
        let body = self.get(TOP_GAMES_PATH, &[("limit", limit.to_string())]).await?;
        mapping::parse_games(&body)
    }
}
