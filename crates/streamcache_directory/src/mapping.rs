// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JSON to record mapping.
//!
//! Each record field is read from a fixed path into the upstream JSON document. Absent
//! or mistyped leaves map to empty strings and zero counts; only a missing top-level
//! array is treated as a malformed response.

use serde_json::Value;

use crate::{GameRecord, StreamRecord, UpstreamError};

type Path = &'static [&'static str];

struct StreamPaths {
    channel_name: Path,
    display_name: Path,
    game_name: Path,
    status: Path,
    viewers: Path,
    channel_url: Path,
    preview_url: Path,
}

struct GamePaths {
    name: Path,
    viewers: Path,
    channels: Path,
    box_art_url: Path,
}

const STREAMS_ARRAY: &str = "streams";
const GAMES_ARRAY: &str = "top";

const STREAM_PATHS: StreamPaths = StreamPaths {
    channel_name: &["channel", "name"],
    display_name: &["channel", "display_name"],
    game_name: &["game"],
    status: &["channel", "status"],
    viewers: &["viewers"],
    channel_url: &["channel", "url"],
    preview_url: &["preview", "medium"],
};

const GAME_PATHS: GamePaths = GamePaths {
    name: &["game", "name"],
    viewers: &["viewers"],
    channels: &["channels"],
    box_art_url: &["game", "box", "medium"],
};

fn lookup<'a>(value: &'a Value, path: Path) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, segment| node.get(segment))
}

fn text(value: &Value, path: Path) -> String {
    lookup(value, path).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn count(value: &Value, path: Path) -> u64 {
    lookup(value, path).and_then(Value::as_u64).unwrap_or_default()
}

fn items<'a>(document: &'a Value, array: &str) -> Result<&'a Vec<Value>, UpstreamError> {
    document
        .get(array)
        .and_then(Value::as_array)
        .ok_or_else(|| UpstreamError::decode(format!("response has no `{array}` array")))
}

fn stream(value: &Value) -> StreamRecord {
    let p = &STREAM_PATHS;
    StreamRecord {
        channel_name: text(value, p.channel_name),
        display_name: text(value, p.display_name),
        game_name: text(value, p.game_name),
        status: text(value, p.status),
        viewers: count(value, p.viewers),
        channel_url: text(value, p.channel_url),
        preview_url: text(value, p.preview_url),
    }
}

fn game(value: &Value) -> GameRecord {
    let p = &GAME_PATHS;
    GameRecord {
        name: text(value, p.name),
        viewers: count(value, p.viewers),
        channels: count(value, p.channels),
        box_art_url: text(value, p.box_art_url),
    }
}

pub(crate) fn parse_streams(body: &[u8]) -> Result<Vec<StreamRecord>, UpstreamError> {
    let document: Value = serde_json::from_slice(body).map_err(UpstreamError::decode)?;
    Ok(items(&document, STREAMS_ARRAY)?.iter().map(stream).collect())
}

pub(crate) fn parse_games(body: &[u8]) -> Result<Vec<GameRecord>, UpstreamError> {
    let document: Value = serde_json::from_slice(body).map_err(UpstreamError::decode)?;
    Ok(items(&document, GAMES_ARRAY)?.iter().map(game).collect())
}
