//! Type coercion for the structured catalog export.
//!
//! Coercion is deliberately asymmetric. `budget` is lenient: a malformed value
//! becomes 0, which downstream treats as "unknown" and fills from the
//! encyclopedia source. `id` and `popularity` are strict: they are merge and
//! sort keys, so an unparsable value aborts the whole run. The asymmetry is
//! inherited behavior and is kept as-is.

use chrono::NaiveDate;
use metrics::counter;
use tracing::{debug, info, instrument};

use crate::error::{EtlError, Result};
use crate::types::{CatalogMovie, RawCatalogRow};

/// Filters out adult titles and coerces the remaining rows. Fails on the first
/// row whose `id` or `popularity` does not parse.
#[instrument(skip(rows), fields(input = rows.len()))]
pub fn normalize_catalog(rows: &[RawCatalogRow]) -> Result<Vec<CatalogMovie>> {
    let mut movies = Vec::with_capacity(rows.len());
    let mut skipped_adult = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        // literal, case-sensitive comparison; corrupt rows fail it too
        if row.adult != "False" {
            skipped_adult += 1;
            continue;
        }
        movies.push(coerce_row(idx, row)?);
    }

    info!(
        "Normalized {} catalog movies ({} non-\"False\" adult rows dropped)",
        movies.len(),
        skipped_adult
    );
    counter!("movie_etl_catalog_adult_dropped_total").increment(skipped_adult as u64);
    counter!("movie_etl_catalog_movies_total").increment(movies.len() as u64);
    Ok(movies)
}

fn coerce_row(idx: usize, row: &RawCatalogRow) -> Result<CatalogMovie> {
    Ok(CatalogMovie {
        id: strict_int("id", idx, &row.id)?,
        imdb_id: text(&row.imdb_id),
        title: text(&row.title),
        original_title: text(&row.original_title),
        tagline: text(&row.tagline),
        belongs_to_collection: text(&row.belongs_to_collection),
        genres: text(&row.genres),
        original_language: text(&row.original_language),
        overview: text(&row.overview),
        spoken_languages: text(&row.spoken_languages),
        production_companies: text(&row.production_companies),
        production_countries: text(&row.production_countries),
        budget: lenient_int(&row.budget),
        revenue: lenient_float(&row.revenue),
        runtime: lenient_float(&row.runtime),
        popularity: strict_float("popularity", idx, &row.popularity)?,
        vote_average: lenient_float(&row.vote_average),
        vote_count: lenient_float(&row.vote_count),
        release_date: parse_catalog_date(&row.release_date),
        video: row.video == "True",
    })
}

fn text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Integer identifiers must parse; whole-number floats ("862.0") are accepted.
fn strict_int(column: &'static str, row: usize, value: &str) -> Result<i64> {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .ok_or_else(|| EtlError::Coercion {
            column,
            row,
            value: value.to_string(),
        })
}

/// Empty means missing; anything else must parse.
fn strict_float(column: &'static str, row: usize, value: &str) -> Result<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| EtlError::Coercion {
            column,
            row,
            value: value.to_string(),
        })
}

fn lenient_int(value: &str) -> i64 {
    let trimmed = value.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        .unwrap_or_else(|| {
            if !trimmed.is_empty() {
                debug!("Unparsable catalog budget {:?}, using 0", value);
            }
            0
        })
}

fn lenient_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_catalog_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
