use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single episode inside a series record's `seasons` blob.
///
/// Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpisodeRecord {
    pub episode: u32,
    pub title: String,
    pub duration: String,
    pub description: String,
    pub thumbnail: String,
    pub servers: Value,
}

/// All episodes of one season of one series, in (season, episode) order.
///
/// Episode numbers are neither required to be contiguous nor unique;
/// duplicates stay in their original relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeasonGroup {
    pub season: u32,
    pub season_poster: String,
    pub episodes: Vec<EpisodeRecord>,
}
