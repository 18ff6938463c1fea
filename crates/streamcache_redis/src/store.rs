// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use streamcache_store::{CacheStore, StoreError};
use tokio::sync::OnceCell;

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisConfig {
    url: String,
    connection_timeout: Duration,
    response_timeout: Duration,
    reconnect_retries: usize,
}

impl RedisConfig {
    /// Creates settings for the server at `url`.
    ///
    /// Defaults: connection timeout 1 s, response timeout 1 s, two reconnect retries.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: Duration::from_secs(1),
            response_timeout: Duration::from_secs(1),
            reconnect_retries: 2,
        }
    }

    /// Sets how long establishing a connection may take.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets how long the server may take to answer a command.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets how many times a connection attempt is retried before giving up.
    #[must_use]
    pub fn reconnect_retries(mut self, retries: usize) -> Self {
        self.reconnect_retries = retries;
        self
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_connection_timeout(self.connection_timeout)
            .set_response_timeout(self.response_timeout)
            .set_number_of_retries(self.reconnect_retries)
    }
}

/// A [`CacheStore`] backed by a Redis server.
///
/// Values are written with `SET`, and with `EX` when a time-to-live is given. A
/// time-to-live below one second is rounded up to one second.
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Opens a client for `config` and makes a first connection attempt.
    ///
    /// A failed first attempt is logged and does not fail construction.
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the URL cannot be parsed.
    pub async fn connect(config: RedisConfig) -> Result<Self, StoreError> {
        let store = Self::lazy(config)?;
        if let Err(error) = store.connection().await {
            tracing::warn!(url = %store.config.url, %error, "cache store unavailable, will retry on first use");
        }
        Ok(store)
    }

    /// Opens a client for `config` without connecting.
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the URL cannot be parsed.
    pub fn lazy(config: RedisConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str()).map_err(StoreError::protocol)?;
        Ok(Self {
            client,
            config,
            connection: OnceCell::new(),
        })
    }

    /// Returns `true` once a connection has been established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.connection
            .get_or_try_init(|| async {
                let manager = self
                    .client
                    .get_connection_manager_with_config(self.config.manager_config())
                    .await
                    .map_err(classify)?;
                tracing::info!(url = %self.config.url, "cache store connected");
                Ok::<_, StoreError>(manager)
            })
            .await
            .cloned()
    }
}

impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut connection = self.connection().await?;
        connection.get::<_, Option<Vec<u8>>>(key).await.map_err(classify)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut connection = self.connection().await?;
        match ttl.map(expiry_seconds) {
            Some(seconds) => connection.set_ex::<_, _, ()>(key, value, seconds).await,
            None => connection.set::<_, _, ()>(key, value).await,
        }
        .map_err(classify)
    }
}

fn expiry_seconds(ttl: Duration) -> u64 {
    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    seconds.max(1)
}

fn classify(error: RedisError) -> StoreError {
    if error.is_timeout() {
        StoreError::timeout(error)
    } else if error.is_connection_refusal() || error.is_connection_dropped() || error.is_io_error() {
        StoreError::connection(error)
    } else {
        StoreError::protocol(error)
    }
}
