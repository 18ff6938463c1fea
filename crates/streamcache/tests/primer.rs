// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the background primer.

use std::sync::Arc;
use std::time::Duration;

use streamcache::{Error, PrimeReport, Primer, StreamCache, StreamsRequest};
use streamcache_directory::testing::{DirectoryCall, StubDirectory, sample_game, sample_stream};
use streamcache_store::testing::MockStore;
use tick::{Clock, ClockControl};

type TestResult = Result<(), Error>;

type TestCache = Arc<StreamCache<MockStore, StubDirectory>>;

fn directory() -> StubDirectory {
    StubDirectory::new()
        .with_games(vec![sample_game("Dota 2", 3_000), sample_game("Chess", 2_000), sample_game("Minecraft", 1_000)])
        .with_streams("Dota 2", vec![sample_stream("Dota 2", "dendi")])
        .with_streams("Chess", vec![sample_stream("Chess", "hikaru")])
        .with_streams("Minecraft", vec![sample_stream("Minecraft", "dream")])
}

fn cache(store: &MockStore, directory: &StubDirectory, clock: Clock) -> TestCache {
    Arc::new(StreamCache::builder(store.clone(), directory.clone(), clock).build())
}

fn key(game: &str) -> String {
    format!("streamcache.v1:0:{game}")
}

fn streams_for(game: &'static str) -> impl Fn(&DirectoryCall) -> bool + Send + Sync + 'static {
    move |call| matches!(call, DirectoryCall::Streams { game: called, .. } if called == game)
}

fn popular_game_calls(directory: &StubDirectory) -> usize {
    directory
        .calls()
        .iter()
        .filter(|call| matches!(call, DirectoryCall::PopularGames { .. }))
        .count()
}

async fn warm(cache: &TestCache, games: &[&str]) -> TestResult {
    for game in games {
        cache.fetch_streams(&StreamsRequest::new(*game, 0, 25)).await?;
    }
    Ok(())
}

#[tokio::test]
async fn empty_store_counts_misses_and_fills_it() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, Clock::new_frozen());

    let report = Primer::builder(cache).build().run_once().await?;

    assert_eq!(
        report,
        PrimeReport {
            misses: 3,
            ..PrimeReport::default()
        }
    );
    for game in ["Dota 2", "Chess", "Minecraft"] {
        assert!(store.contains_key(&key(game)), "{game} should be cached");
    }
    Ok(())
}

#[tokio::test]
async fn fresh_keys_are_left_alone() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, Clock::new_frozen());
    warm(&cache, &["Dota 2", "Chess", "Minecraft"]).await?;
    store.clear_operations();
    directory.clear_calls();

    let report = Primer::builder(cache).build().run_once().await?;

    assert_eq!(report.hits, 3);
    assert_eq!(report.total(), 3);
    assert!(store.writes().is_empty());
    assert_eq!(directory.stream_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn keys_near_expiry_are_refreshed() -> TestResult {
    let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, control.to_clock());
    warm(&cache, &["Dota 2", "Chess", "Minecraft"]).await?;
    store.clear_operations();
    directory.clear_calls();
    control.advance(Duration::from_secs(100));

    let report = Primer::builder(cache.clone())
        .lead_time(Duration::from_secs(30))
        .build()
        .run_once()
        .await?;

    assert_eq!(report.expiring_soon, 3);
    assert_eq!(store.writes().len(), 3);
    assert_eq!(directory.stream_calls(), 3);

    let lookup = cache.lookup(&StreamsRequest::new("Dota 2", 0, 25)).await;
    let payload = lookup.payload().expect("refreshed entry should be cached");
    assert_eq!(payload.captured_at(), control.to_clock().system_time());
    Ok(())
}

#[tokio::test]
async fn keys_outside_lead_time_count_as_hits() -> TestResult {
    let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, control.to_clock());
    warm(&cache, &["Dota 2", "Chess", "Minecraft"]).await?;
    store.clear_operations();
    control.advance(Duration::from_secs(89));

    let report = Primer::builder(cache).build().run_once().await?;

    assert_eq!(report.hits, 3);
    assert!(store.writes().is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_failures_are_isolated_per_game() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    directory.fail_when(streams_for("Chess"));
    let cache = cache(&store, &directory, Clock::new_frozen());

    let report = Primer::builder(cache).build().run_once().await?;

    assert_eq!(report.misses, 2);
    assert_eq!(report.failures, 1);
    assert!(!store.contains_key(&key("Chess")));
    assert!(store.contains_key(&key("Dota 2")));
    Ok(())
}

#[tokio::test]
async fn stale_key_with_failing_upstream_is_a_failure() -> TestResult {
    let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, control.to_clock());
    warm(&cache, &["Dota 2"]).await?;
    let before = store.value(&key("Dota 2"));
    control.advance(Duration::from_secs(500));
    directory.fail_when(streams_for("Dota 2"));

    let report = Primer::builder(cache).build().run_once().await?;

    assert_eq!(report.failures, 1);
    assert_eq!(report.misses, 2);
    assert_eq!(store.value(&key("Dota 2")), before);
    Ok(())
}

#[tokio::test]
async fn panicking_task_counts_as_failure() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    directory.panic_when(streams_for("Minecraft"));
    let cache = cache(&store, &directory, Clock::new_frozen());

    let report = Primer::builder(cache).workers(2).build().run_once().await?;

    assert_eq!(report.failures, 1);
    assert_eq!(report.misses, 2);
    Ok(())
}

#[tokio::test]
async fn popular_games_failure_aborts_run() {
    let store = MockStore::new();
    let directory = directory();
    directory.fail_when(|call| matches!(call, DirectoryCall::PopularGames { .. }));
    let cache = cache(&store, &directory, Clock::new_frozen());

    Primer::builder(cache)
        .build()
        .run_once()
        .await
        .expect_err("run should abort");

    assert_eq!(directory.stream_calls(), 0);
    assert!(store.operations().is_empty());
}

#[tokio::test]
async fn game_count_bounds_the_run() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, Clock::new_frozen());

    let report = Primer::builder(cache).game_count(2).workers(1).build().run_once().await?;

    assert_eq!(report.total(), 2);
    assert!(directory.calls().contains(&DirectoryCall::PopularGames { limit: 2 }));
    assert!(!store.contains_key(&key("Minecraft")));
    Ok(())
}

#[tokio::test]
async fn worker_pool_bounds_concurrent_upstream_calls() -> TestResult {
    let names: Vec<String> = (0..40).map(|i| format!("game{i}")).collect();
    let mut directory = StubDirectory::new().with_games(names.iter().map(|name| sample_game(name, 1_000)).collect());
    for name in &names {
        directory = directory.with_streams(name.clone(), vec![sample_stream(name, "caster")]);
    }
    directory.hang_when(|call| matches!(call, DirectoryCall::Streams { .. }));
    let store = MockStore::new();
    let primer = Primer::builder(cache(&store, &directory, Clock::new_frozen())).workers(3).build();

    let run = tokio::spawn(async move { primer.run_once().await });
    settle(|| directory.in_flight() == 3).await;
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }

    assert_eq!(directory.stream_calls(), 3);
    assert_eq!(directory.peak_in_flight(), 3);

    directory.release_hung_calls();
    let report = run.await.expect("run should not panic")?;

    assert_eq!(report.misses, 40);
    assert_eq!(store.entry_count(), 40);
    assert_eq!(directory.peak_in_flight(), 3);
    Ok(())
}

#[tokio::test]
async fn slow_game_does_not_hold_up_the_others() -> TestResult {
    let store = MockStore::new();
    let directory = directory();
    directory.hang_when(streams_for("Dota 2"));
    let primer = Primer::builder(cache(&store, &directory, Clock::new_frozen())).workers(2).build();

    let run = tokio::spawn(async move { primer.run_once().await });
    settle(|| store.contains_key(&key("Chess")) && store.contains_key(&key("Minecraft"))).await;

    assert_eq!(directory.in_flight(), 1);
    assert!(!store.contains_key(&key("Dota 2")));
    assert!(!run.is_finished());

    directory.release_hung_calls();
    let report = run.await.expect("run should not panic")?;

    assert_eq!(report.misses, 3);
    assert!(store.contains_key(&key("Dota 2")));
    Ok(())
}

#[tokio::test]
async fn spawned_primer_runs_on_interval_until_stopped() {
    let control = ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000));
    let store = MockStore::new();
    let directory = directory();
    let cache = cache(&store, &directory, control.to_clock());

    let handle = Primer::builder(cache).interval(Duration::from_secs(5)).build().spawn();

    settle(|| popular_game_calls(&directory) == 1 && store.entry_count() == 3).await;
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(popular_game_calls(&directory), 1);

    control.advance(Duration::from_secs(5));
    settle(|| popular_game_calls(&directory) == 2).await;

    handle.stop();
    control.advance(Duration::from_secs(60));
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(popular_game_calls(&directory), 2);
}

async fn settle(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
