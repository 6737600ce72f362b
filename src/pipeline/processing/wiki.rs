use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

use super::cleaner::clean_record;
use super::values::{parse_amount, parse_budget, parse_release_date, parse_running_time};
use crate::constants::{
    BOX_OFFICE, BUDGET, DIRECTED_BY, DIRECTOR, EPISODE_COUNT, IMDB_LINK, RELEASE_DATE,
    RUNNING_TIME, SPARSE_COLUMN_RATIO,
};
use crate::types::{flatten_text, RawRecord, WikiMovie};

static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"tt\d{7}").expect("static pattern compiles"));

/// Keeps records that look like feature films: a director under either
/// spelling, an IMDb link, and no episode count.
pub fn is_feature_film(record: &RawRecord) -> bool {
    (record.contains_key(DIRECTOR) || record.contains_key(DIRECTED_BY))
        && record.contains_key(IMDB_LINK)
        && !record.contains_key(EPISODE_COUNT)
}

/// Pulls the `tt` + 7 digit identifier out of an IMDb link.
pub fn extract_imdb_id(link: &str) -> Option<String> {
    IMDB_ID.find(link).map(|m| m.as_str().to_string())
}

/// Removes every column that is missing (absent or null) in at least 90% of
/// rows. Needs the whole table, so it runs before any typed extraction.
/// Returns the dropped column names in first-seen order.
pub fn prune_sparse_columns(rows: &mut [RawRecord]) -> Vec<String> {
    let total = rows.len();
    if total == 0 {
        return Vec::new();
    }

    let mut columns: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for row in rows.iter() {
        for key in row.keys() {
            if seen.insert(key.to_string()) {
                columns.push(key.to_string());
            }
        }
    }

    let limit = total as f64 * SPARSE_COLUMN_RATIO;
    let dropped: Vec<String> = columns
        .into_iter()
        .filter(|column| {
            let nulls = rows.iter().filter(|r| !r.has_value(column)).count();
            nulls as f64 >= limit
        })
        .collect();

    if !dropped.is_empty() {
        let dropped_set: HashSet<&str> = dropped.iter().map(String::as_str).collect();
        for row in rows.iter_mut() {
            row.retain(|key| !dropped_set.contains(key));
        }
    }
    dropped
}

/// Normalizes the encyclopedia collection into typed movie rows, unique by
/// `imdb_id` (first occurrence wins).
#[instrument(skip(records), fields(input = records.len()))]
pub fn normalize_wiki_movies(records: &[RawRecord]) -> Vec<WikiMovie> {
    let films: Vec<&RawRecord> = records.iter().filter(|r| is_feature_film(r)).collect();
    debug!("{} of {} records look like feature films", films.len(), records.len());
    counter!("movie_etl_wiki_non_films_total").increment((records.len() - films.len()) as u64);

    let mut seen_ids = HashSet::new();
    let mut ids = Vec::new();
    let mut rows = Vec::new();
    for record in films {
        let cleaned = clean_record(record);
        let Some(imdb_id) = cleaned.get_str(IMDB_LINK).and_then(extract_imdb_id) else {
            continue;
        };
        if seen_ids.insert(imdb_id.clone()) {
            ids.push(imdb_id);
            rows.push(cleaned);
        }
    }

    let dropped = prune_sparse_columns(&mut rows);
    if !dropped.is_empty() {
        debug!("Pruned {} sparse columns: {:?}", dropped.len(), dropped);
    }

    let movies: Vec<WikiMovie> = ids
        .into_iter()
        .zip(rows)
        .map(|(imdb_id, row)| to_wiki_movie(imdb_id, row))
        .collect();

    info!(
        "Normalized {} encyclopedia movies ({} sparse columns pruned)",
        movies.len(),
        dropped.len()
    );
    counter!("movie_etl_wiki_movies_total").increment(movies.len() as u64);
    movies
}

fn to_wiki_movie(imdb_id: String, mut row: RawRecord) -> WikiMovie {
    let mut take_text = |key: &str| -> Option<String> {
        row.remove(key).and_then(|v| match v {
            Value::Null => None,
            other => flatten_text(&other, " "),
        })
    };

    let box_office = parse_amount(take_text(BOX_OFFICE).as_deref());
    let budget = parse_budget(take_text(BUDGET).as_deref());
    let release_date = parse_release_date(take_text(RELEASE_DATE).as_deref());
    let running_time = parse_running_time(take_text(RUNNING_TIME).as_deref());

    WikiMovie {
        imdb_id,
        box_office,
        budget,
        release_date,
        running_time,
        attributes: row,
    }
}
