// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Stub directory implementation for testing.
//!
//! `StubDirectory` serves canned records, counts every call, and can be told to fail,
//! panic, or hang for chosen requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{Directory, GameRecord, StreamRecord, UpstreamError};

/// Recorded directory call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    /// Streams were requested for a game.
    Streams {
        /// The requested game.
        game: String,
        /// The requested offset.
        offset: usize,
        /// The requested limit.
        limit: usize,
    },
    /// Popular games were requested.
    PopularGames {
        /// The requested limit.
        limit: usize,
    },
}

type CallPredicate = Box<dyn Fn(&DirectoryCall) -> bool + Send + Sync>;

/// A directory serving canned records.
///
/// Streams are served per game, sliced by the requested offset and limit. Unknown games
/// have no streams.
///
/// # Examples
///
/// ```no_run
/// use streamcache_directory::{Directory, testing::{StubDirectory, sample_stream}};
///
/// # async fn example() {
/// let directory = StubDirectory::new().with_streams("Dota 2", vec![sample_stream("Dota 2", "dendi")]);
///
/// let streams = directory.fetch_streams("Dota 2", 0, 25).await.unwrap();
/// assert_eq!(streams.len(), 1);
/// assert_eq!(directory.stream_calls(), 1);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct StubDirectory {
    streams: Arc<Mutex<HashMap<String, Vec<StreamRecord>>>>,
    games: Arc<Mutex<Vec<GameRecord>>>,
    calls: Arc<Mutex<Vec<DirectoryCall>>>,
    fail_when: Arc<Mutex<Option<CallPredicate>>>,
    panic_when: Arc<Mutex<Option<CallPredicate>>>,
    hang: Arc<HangGate>,
    in_flight: Arc<Mutex<InFlight>>,
}

/// Holds back matching calls until released.
#[derive(Default)]
struct HangGate {
    predicate: Mutex<Option<CallPredicate>>,
    released: AtomicBool,
    notify: Notify,
}

impl HangGate {
    fn matches(&self, call: &DirectoryCall) -> bool {
        self.predicate.lock().as_ref().is_some_and(|predicate| predicate(call))
    }

    async fn wait(&self) {
        loop {
            // Registered before the flag is read so a concurrent release is not missed.
            let notified = self.notify.notified();
            if self.released.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    current: usize,
    peak: usize,
}

/// Counts a stream request as in flight until dropped.
struct InFlightGuard(Arc<Mutex<InFlight>>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<Mutex<InFlight>>) -> Self {
        let mut counts = in_flight.lock();
        counts.current += 1;
        counts.peak = counts.peak.max(counts.current);
        drop(counts);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.lock().current -= 1;
    }
}

impl std::fmt::Debug for StubDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubDirectory")
            .field("streams", &self.streams)
            .field("games", &self.games)
            .field("calls", &self.calls)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("panic_when", &self.panic_when.lock().is_some())
            .field("hang_when", &self.hang.predicate.lock().is_some())
            .field("in_flight", &self.in_flight.lock())
            .finish()
    }
}

impl StubDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `streams` for `game`.
    #[must_use]
    pub fn with_streams(self, game: impl Into<String>, streams: Vec<StreamRecord>) -> Self {
        self.set_streams(game, streams);
        self
    }

    /// Serves `games` as the popular games list.
    #[must_use]
    pub fn with_games(self, games: Vec<GameRecord>) -> Self {
        *self.games.lock() = games;
        self
    }

    /// Replaces the streams served for `game`.
    pub fn set_streams(&self, game: impl Into<String>, streams: Vec<StreamRecord>) {
        self.streams.lock().insert(game.into(), streams);
    }

    /// Makes calls matching `predicate` fail with a transport error.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&DirectoryCall) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Makes calls matching `predicate` panic.
    pub fn panic_when<F>(&self, predicate: F)
    where
        F: Fn(&DirectoryCall) -> bool + Send + Sync + 'static,
    {
        *self.panic_when.lock() = Some(Box::new(predicate));
    }

    /// Makes calls matching `predicate` wait until [`release_hung_calls`](Self::release_hung_calls).
    ///
    /// Calls that are still waiting when they are dropped simply never complete.
    pub fn hang_when<F>(&self, predicate: F)
    where
        F: Fn(&DirectoryCall) -> bool + Send + Sync + 'static,
    {
        self.hang.released.store(false, Ordering::Release);
        *self.hang.predicate.lock() = Some(Box::new(predicate));
    }

    /// Lets every held call complete, including calls made afterwards.
    pub fn release_hung_calls(&self) {
        self.hang.released.store(true, Ordering::Release);
        self.hang.notify.notify_waiters();
    }

    /// Returns the number of stream requests currently in progress.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().current
    }

    /// Returns the largest number of stream requests that were in progress at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.lock().peak
    }

    /// Clears failure and panic rules.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
        *self.panic_when.lock() = None;
    }

    /// Returns a clone of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of stream requests served or failed.
    #[must_use]
    pub fn stream_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DirectoryCall::Streams { .. }))
            .count()
    }

    /// Returns the number of stream requests for one game.
    #[must_use]
    pub fn stream_calls_for(&self, game: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, DirectoryCall::Streams { game: g, .. } if g == game))
            .count()
    }

    /// Clears all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    #[expect(clippy::panic, reason = "panicking on demand is the point of this test double")]
    fn check(&self, call: DirectoryCall) -> Result<(), UpstreamError> {
        let panics = self.panic_when.lock().as_ref().is_some_and(|predicate| predicate(&call));
        let fails = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&call));
        self.calls.lock().push(call.clone());
        if panics {
            panic!("stub: {call:?} panicked");
        }
        if fails {
            return Err(UpstreamError::transport(format!("stub: {call:?} failed")));
        }
        Ok(())
    }
}

impl Directory for StubDirectory {
    async fn fetch_streams(&self, game: &str, offset: usize, limit: usize) -> Result<Vec<StreamRecord>, UpstreamError> {
        let _in_flight = InFlightGuard::enter(&self.in_flight);
        let call = DirectoryCall::Streams {
            game: game.to_string(),
            offset,
            limit,
        };
        let hang = self.hang.matches(&call);
        self.check(call)?;
        if hang {
            self.hang.wait().await;
        }
        Ok(self
            .streams
            .lock()
            .get(game)
            .map(|streams| streams.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_popular_games(&self, limit: usize) -> Result<Vec<GameRecord>, UpstreamError> {
        self.check(DirectoryCall::PopularGames { limit })?;
        Ok(self.games.lock().iter().take(limit).cloned().collect())
    }
}

/// Builds a fully populated stream record.
#[must_use]
pub fn sample_stream(game: &str, channel: &str) -> StreamRecord {
    StreamRecord {
        channel_name: channel.to_string(),
        display_name: channel.to_uppercase(),
        game_name: game.to_string(),
        status: format!("{channel} playing {game}"),
        viewers: 100,
        channel_url: format!("https://www.twitch.tv/{channel}"),
        preview_url: format!("https://static-cdn.example/previews/{channel}.jpg"),
    }
}

/// Builds a popular game record.
#[must_use]
pub fn sample_game(name: &str, viewers: u64) -> GameRecord {
    GameRecord {
        name: name.to_string(),
        viewers,
        channels: viewers / 100,
        box_art_url: format!("https://static-cdn.example/boxart/{name}.jpg"),
    }
}
