//! Episode regrouping.
//!
//! Some catalogs file a TV series as one top-level entry per episode, titled
//! `"<series><delimiter><code>"` (e.g. `"Dune S01E02"`), with the season and
//! episode numbers in a small object stored where the season list would
//! normally be. This pass folds those entries back into one series record per
//! series title, with a proper season/episode hierarchy.
//!
//! The representative episode for series-level metadata (poster, country,
//! rating, ...) is the *first episode after sorting*, i.e. the lowest
//! `(season, episode)` pair, so the output does not depend on the order
//! episodes arrive in.

use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::error::{ErrorKind, Result};
use crate::models::{EMPTY_LIST, EpisodeRecord, Record, Scalar, SeasonGroup};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::instrument;

pub const DEFAULT_SERIES_CATEGORY: &str = "TV Series";
pub const DEFAULT_EPISODE_DELIMITER: &str = " S";
pub const DEFAULT_SERIES_DESCRIPTION_PREFIX: &str = "TV Series: ";

/// Knobs for recognising mis-filed episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegroupOptions {
    /// Only entries in this main-category are candidates.
    pub series_category: String,
    /// Literal separator between the series name and the season/episode code.
    pub episode_delimiter: String,
    /// Prepended to the series title to build the synthesized description.
    pub series_description_prefix: String,
}
impl Default for RegroupOptions {
    fn default() -> Self {
        Self {
            series_category: DEFAULT_SERIES_CATEGORY.to_string(),
            episode_delimiter: DEFAULT_EPISODE_DELIMITER.to_string(),
            series_description_prefix: DEFAULT_SERIES_DESCRIPTION_PREFIX.to_string(),
        }
    }
}

/// The structured sub-object attached to an episode entry. Keys are
/// lowercase in the wild; PascalCase is accepted too.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EpisodeMarker {
    #[serde(alias = "Season")]
    season: Scalar,
    #[serde(alias = "Episode")]
    episode: Scalar,
    #[serde(alias = "Title")]
    title: Scalar,
    #[serde(alias = "Description")]
    description: Scalar,
    #[serde(alias = "Thumbnail")]
    thumbnail: Scalar,
    #[serde(alias = "Duration")]
    duration: Scalar,
    #[serde(alias = "Servers")]
    servers: Option<Value>,
}

struct Grouped {
    season: u32,
    episode: EpisodeRecord,
    source: Record,
}

struct Series {
    title: String,
    episodes: Vec<Grouped>,
}

/// Series identity of a record, if it is a mis-filed episode.
///
/// `None` means the record passes through untouched: wrong category, no
/// delimiter in the title, or nothing but whitespace before the delimiter.
pub fn series_title<'a>(record: &'a Record, options: &RegroupOptions) -> Option<&'a str> {
    if record.main_category != options.series_category {
        return None;
    }
    let (head, _) = record.title.split_once(options.episode_delimiter.as_str())?;
    let title = head.trim();
    (!title.is_empty()).then_some(title)
}

fn ordinal(value: &Scalar, field: &str) -> std::result::Result<u32, String> {
    let parsed = match value {
        Scalar::Absent => return Ok(1),
        Scalar::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Scalar::Text(text) => text.trim().parse::<u64>().ok(),
        Scalar::Other => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("{field} is not a non-negative integer: {value:?}"))
}

fn text_or(value: &Scalar, parent: &str) -> String {
    if value.is_absent() { parent.to_string() } else { value.to_text() }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Read the episode sub-object out of a record's `seasons` blob.
///
/// An absent sub-object (`null` or an empty list) means season 1, episode 1;
/// any field it omits falls back to the parent entry. Anything else that
/// isn't an object is rejected with a reason.
fn parse_episode(record: &Record) -> std::result::Result<(u32, EpisodeRecord), String> {
    let value: Value =
        serde_json::from_str(&record.seasons).map_err(|e| format!("seasons blob is not valid JSON: {e}"))?;
    let marker = match value {
        Value::Object(map) => serde_json::from_value::<EpisodeMarker>(Value::Object(map))
            .map_err(|e| format!("episode sub-object: {e}"))?,
        Value::Null => EpisodeMarker::default(),
        Value::Array(items) if items.is_empty() => EpisodeMarker::default(),
        other => return Err(format!("expected an episode object, found {}", describe(&other))),
    };
    let season = ordinal(&marker.season, "season")?;
    let number = ordinal(&marker.episode, "episode")?;
    let servers = match marker.servers {
        Some(servers) => servers,
        None => serde_json::from_str(&record.servers).map_err(|e| format!("servers blob is not valid JSON: {e}"))?,
    };
    Ok((
        season,
        EpisodeRecord {
            episode: number,
            title: text_or(&marker.title, &record.title),
            duration: text_or(&marker.duration, &record.duration),
            description: text_or(&marker.description, &record.description),
            thumbnail: text_or(&marker.thumbnail, &record.thumbnail),
            servers,
        },
    ))
}

fn synthesize(mut series: Series, options: &RegroupOptions) -> Result<Option<Record>> {
    // `sort_by_key` is stable, so duplicate (season, episode) pairs keep
    // their arrival order.
    series.episodes.sort_by_key(|grouped| (grouped.season, grouped.episode.episode));
    let Some(representative) = series.episodes.first().map(|grouped| grouped.source.clone()) else {
        return Ok(None);
    };
    let mut seasons: Vec<SeasonGroup> = Vec::new();
    for grouped in series.episodes {
        match seasons.last_mut() {
            Some(group) if group.season == grouped.season => group.episodes.push(grouped.episode),
            _ => seasons.push(SeasonGroup {
                season: grouped.season,
                season_poster: representative.poster.clone(),
                episodes: vec![grouped.episode],
            }),
        }
    }
    let seasons = serde_json::to_string(&seasons).or_raise(|| ErrorKind::Encode("seasons"))?;
    Ok(Some(Record {
        description: format!("{}{}", options.series_description_prefix, series.title),
        title: series.title,
        sub_category: representative.sub_category,
        country: representative.country,
        poster: representative.poster,
        thumbnail: representative.thumbnail,
        rating: representative.rating,
        duration: String::new(),
        year: representative.year,
        main_category: options.series_category.clone(),
        servers: EMPTY_LIST.to_string(),
        seasons,
        related: EMPTY_LIST.to_string(),
    }))
}

/// Fold mis-filed episode records into series records.
///
/// Records that aren't episodes come first, in their original order, followed
/// by one synthesized record per series in order of first appearance. No
/// individual episode is ever returned at the top level. Episodes whose
/// sub-object can't be used are dropped and recorded in `diagnostics`.
#[instrument(skip_all, fields(records = records.len()))]
pub fn regroup(records: Vec<Record>, options: &RegroupOptions, diagnostics: &mut Diagnostics) -> Result<Vec<Record>> {
    let mut output = Vec::with_capacity(records.len());
    let mut series: Vec<Series> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped = 0usize;

    for (position, record) in records.into_iter().enumerate() {
        let Some(title) = series_title(&record, options).map(str::to_string) else {
            output.push(record);
            continue;
        };
        match parse_episode(&record) {
            Ok((season, episode)) => {
                let slot = *index.entry(title.clone()).or_insert_with(|| {
                    series.push(Series { title, episodes: Vec::new() });
                    series.len() - 1
                });
                series[slot].episodes.push(Grouped { season, episode, source: record });
                grouped += 1;
            },
            Err(reason) => diagnostics.push(
                Diagnostic::new(Stage::Regroup, &record.main_category, position, reason)
                    .with_title(Some(record.title.clone())),
            ),
        }
    }

    let series_count = series.len();
    for series in series {
        if let Some(record) = synthesize(series, options)? {
            output.push(record);
        }
    }
    tracing::info!(episodes = grouped, series = series_count, "Regrouped episode entries into series");
    Ok(output)
}
