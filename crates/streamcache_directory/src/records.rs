// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// One live stream as listed by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Login name of the broadcasting channel.
    pub channel_name: String,
    /// Human-readable channel name.
    pub display_name: String,
    /// Name of the game being played.
    pub game_name: String,
    /// Free-form status line set by the broadcaster.
    pub status: String,
    /// Current viewer count.
    pub viewers: u64,
    /// Link to the channel page.
    pub channel_url: String,
    /// Link to a preview image of the stream.
    pub preview_url: String,
}

impl StreamRecord {
    /// Returns the names of required display fields that are empty.
    ///
    /// A client cannot render a stream without its channel link, display name, game,
    /// channel name and preview image.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("channel_url", &self.channel_url),
            ("display_name", &self.display_name),
            ("game_name", &self.game_name),
            ("channel_name", &self.channel_name),
            ("preview_url", &self.preview_url),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Returns `true` when every required display field is present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// A game ranked by current viewership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameRecord {
    /// Name of the game, as used to query its streams.
    pub name: String,
    /// Viewers across all channels playing the game.
    pub viewers: u64,
    /// Number of channels playing the game.
    pub channels: u64,
    /// Link to the box art image.
    pub box_art_url: String,
}
