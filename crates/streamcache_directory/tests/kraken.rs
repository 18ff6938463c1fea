// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the Kraken HTTP adapter against a local one-shot server.

use std::time::Duration;

use streamcache_directory::{Directory, KrakenConfig, KrakenDirectory, UpstreamErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one connection, answers it with `status` and `body`, and returns the raw request head.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
    let address = listener.local_addr().expect("bound socket has an address");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept should succeed");
        let mut request = Vec::new();
        let mut chunk = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let read = socket.read(&mut chunk).await.expect("read should succeed");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write should succeed");
        socket.shutdown().await.expect("shutdown should succeed");

        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{address}"), handle)
}

fn directory(base_url: &str) -> KrakenDirectory {
    KrakenDirectory::new(
        KrakenConfig::new("test-client")
            .base_url(base_url)
            .read_timeout(Duration::from_secs(5)),
    )
    .expect("client should build")
}

#[tokio::test]
async fn fetch_streams_sends_query_and_headers() {
    let body = r#"{"streams": [{"game": "Dota 2", "viewers": 10, "preview": {"medium": "p.jpg"},
        "channel": {"name": "dendi", "display_name": "Dendi", "status": "hi", "url": "https://www.twitch.tv/dendi"}}]}"#;
    let (base_url, server) = serve_once("200 OK", body).await;

    let streams = directory(&base_url)
        .fetch_streams("Dota 2", 25, 25)
        .await
        .expect("fetch should succeed");

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].display_name, "Dendi");

    let request = server.await.expect("server task should finish").to_lowercase();
    assert!(request.starts_with("get /kraken/streams?"), "got: {request}");
    assert!(request.contains("game=dota+2"), "got: {request}");
    assert!(request.contains("limit=25"), "got: {request}");
    assert!(request.contains("offset=25"), "got: {request}");
    assert!(request.contains("accept: application/vnd.twitchtv.v5+json"), "got: {request}");
    assert!(request.contains("client-id: test-client"), "got: {request}");
}

#[tokio::test]
async fn invalid_records_are_kept() {
    let body = r#"{"streams": [{"game": "Dota 2", "channel": {"name": "ghost"}}]}"#;
    let (base_url, _server) = serve_once("200 OK", body).await;

    let streams = directory(&base_url)
        .fetch_streams("Dota 2", 0, 25)
        .await
        .expect("fetch should succeed");

    assert_eq!(streams.len(), 1);
    assert!(!streams[0].is_valid());
}

#[tokio::test]
async fn fetch_popular_games_parses_top_list() {
    let body = r#"{"_total": 1, "top": [{"game": {"name": "Dota 2", "box": {"medium": "b.jpg"}}, "viewers": 500, "channels": 7}]}"#;
    let (base_url, server) = serve_once("200 OK", body).await;

    let games = directory(&base_url).fetch_popular_games(50).await.expect("fetch should succeed");

    assert_eq!(games.len(), 1);
    assert_eq!(games[0].name, "Dota 2");
    assert_eq!(games[0].channels, 7);

    let request = server.await.expect("server task should finish").to_lowercase();
    assert!(request.starts_with("get /kraken/games/top?limit=50"), "got: {request}");
}

#[tokio::test]
async fn non_ok_status_is_a_status_error() {
    let (base_url, _server) = serve_once("503 Service Unavailable", "{}").await;

    let error = directory(&base_url)
        .fetch_streams("Dota 2", 0, 25)
        .await
        .expect_err("503 should fail");

    assert_eq!(error.kind(), UpstreamErrorKind::Status);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (base_url, _server) = serve_once("200 OK", "not json").await;

    let error = directory(&base_url)
        .fetch_popular_games(10)
        .await
        .expect_err("body is not json");

    assert_eq!(error.kind(), UpstreamErrorKind::Decode);
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
    let address = listener.local_addr().expect("bound socket has an address");
    drop(listener);

    let error = directory(&format!("http://{address}"))
        .fetch_streams("Dota 2", 0, 25)
        .await
        .expect_err("nothing listens");

    assert_eq!(error.kind(), UpstreamErrorKind::Transport);
}
