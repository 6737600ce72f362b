//! End-to-end run: extract, transform, then load both output tables.

pub mod processing;
pub mod tables;

use metrics::{counter, histogram};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Instant;
use tracing::{info, info_span, instrument};
use uuid::Uuid;

use crate::config::{Config, OutputConfig};
use crate::error::Result;
use crate::sources::{RatingsChunks, RawInputs};
use crate::storage::{load_chunked, load_table, Table, TableSink};
use crate::types::{RatingEvent, RawCatalogRow, RawRecord};
use processing::catalog::normalize_catalog;
use processing::ratings::{aggregate_ratings, attach_ratings, to_calendar_time};
use processing::reconcile::reconcile;
use processing::wiki::normalize_wiki_movies;
use tables::{movies_table, ratings_columns, ratings_table};

/// Row counts per stage plus a digest of the final movie table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    pub wiki_records: usize,
    pub wiki_movies: usize,
    pub catalog_rows: usize,
    pub catalog_movies: usize,
    pub reconciled_movies: usize,
    pub unmatched_wiki_movies: usize,
    pub era_mismatches: usize,
    pub rating_events: usize,
    pub rated_movies: usize,
    pub rating_columns: Vec<String>,
    /// Rows written to the ratings table; 0 until the load step runs.
    pub ratings_loaded: usize,
    /// Hex SHA-256 of the serialized movie table.
    pub movies_digest: String,
}

/// Output of the transform stages, ready to load.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub movies: Table,
    pub report: RunReport,
}

pub struct EtlPipeline;

impl EtlPipeline {
    /// Runs every transform stage over the raw inputs. Pure apart from logging
    /// and metrics: the same inputs always give the same table and digest.
    #[instrument(skip_all, fields(wiki = wiki.len(), catalog = catalog.len(), ratings = ratings.len()))]
    pub fn transform(
        wiki: &[RawRecord],
        catalog: &[RawCatalogRow],
        ratings: &[RatingEvent],
    ) -> Result<Transformed> {
        let started = Instant::now();

        let t = Instant::now();
        let wiki_movies = normalize_wiki_movies(wiki);
        histogram!("movie_etl_stage_duration_seconds", "stage" => "wiki").record(t.elapsed().as_secs_f64());

        let t = Instant::now();
        let catalog_movies = normalize_catalog(catalog)?;
        histogram!("movie_etl_stage_duration_seconds", "stage" => "catalog").record(t.elapsed().as_secs_f64());

        let t = Instant::now();
        let reconciled = reconcile(&wiki_movies, &catalog_movies);
        histogram!("movie_etl_stage_duration_seconds", "stage" => "reconcile").record(t.elapsed().as_secs_f64());

        let t = Instant::now();
        let histogram = aggregate_ratings(&to_calendar_time(ratings));
        let reconciled_movies = reconciled.movies.len();
        let rated = attach_ratings(reconciled.movies, &histogram);
        histogram!("movie_etl_stage_duration_seconds", "stage" => "ratings").record(t.elapsed().as_secs_f64());

        let movies = movies_table(&rated);
        let report = RunReport {
            run_id: None,
            wiki_records: wiki.len(),
            wiki_movies: wiki_movies.len(),
            catalog_rows: catalog.len(),
            catalog_movies: catalog_movies.len(),
            reconciled_movies,
            unmatched_wiki_movies: reconciled.unmatched,
            era_mismatches: reconciled.era_mismatches,
            rating_events: ratings.len(),
            rated_movies: histogram.movie_count(),
            rating_columns: rated.rating_columns,
            ratings_loaded: 0,
            movies_digest: table_digest(&movies)?,
        };

        info!(
            "Transform finished: {} movies, {} rating columns in {:.2}s",
            movies.len(),
            report.rating_columns.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(Transformed { movies, report })
    }

    /// Loads the movie table in one batch, then the ratings log chunk by chunk.
    #[instrument(skip_all, fields(movies_table = %output.movies_table, ratings_table = %output.ratings_table))]
    pub fn load<I>(
        sink: &dyn TableSink,
        output: &OutputConfig,
        transformed: &Transformed,
        rating_chunks: I,
    ) -> Result<RunReport>
    where
        I: IntoIterator<Item = Result<Vec<RatingEvent>>>,
    {
        load_table(sink, &output.movies_table, &transformed.movies)?;

        let mut chunks = rating_chunks
            .into_iter()
            .map(|chunk| chunk.map(|events| ratings_table(&to_calendar_time(&events))))
            .peekable();
        let ratings_loaded = if chunks.peek().is_none() {
            // An empty log still replaces whatever the previous run left behind.
            load_table(sink, &output.ratings_table, &Table::new(ratings_columns()))?;
            0
        } else {
            load_chunked(sink, &output.ratings_table, chunks)?
        };

        let mut report = transformed.report.clone();
        report.ratings_loaded = ratings_loaded;
        Ok(report)
    }

    /// Reads the configured inputs, transforms them and loads the result into
    /// `sink`. The ratings file is read a second time in chunks for the load.
    pub fn run(sink: &dyn TableSink, config: &Config) -> Result<RunReport> {
        config.validate()?;
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", run_id = %run_id);
        let _enter = span.enter();
        counter!("movie_etl_runs_total").increment(1);
        let started = Instant::now();

        let transformed = {
            let inputs = RawInputs::read(&config.inputs)?;
            Self::transform(&inputs.wiki, &inputs.catalog, &inputs.ratings)?
        };

        let chunks = RatingsChunks::open(&config.inputs.ratings, config.output.ratings_chunk_size)?;
        let mut report = Self::load(sink, &config.output, &transformed, chunks)?;
        report.run_id = Some(run_id);

        let total_secs = started.elapsed().as_secs_f64();
        histogram!("movie_etl_run_duration_seconds").record(total_secs);
        info!("Run finished in {:.2}s", total_secs);
        Ok(report)
    }
}

/// Hex SHA-256 over the JSON form of `table` (column layout and rows).
pub fn table_digest(table: &Table) -> Result<String> {
    let bytes = serde_json::to_vec(table)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
