use crate::constants::{CANONICAL_COLUMNS, RATINGS_COLUMNS};
use crate::pipeline::processing::ratings::{RatedMovies, TimedRating};
use crate::storage::{Cell, Column, ColumnKind, Table};
use crate::types::CanonicalMovie;

fn canonical_kind(name: &str) -> ColumnKind {
    match name {
        "kaggle_id" => ColumnKind::Integer,
        "runtime" | "budget" | "revenue" | "popularity" | "vote_average" | "vote_count" => {
            ColumnKind::Real
        }
        "release_date" => ColumnKind::Date,
        _ => ColumnKind::Text,
    }
}

/// Cells in `CANONICAL_COLUMNS` order.
pub fn canonical_cells(movie: &CanonicalMovie) -> Vec<Cell> {
    let m = movie.clone();
    vec![
        Cell::Text(m.imdb_id),
        Cell::Int(m.kaggle_id),
        m.title.into(),
        m.original_title.into(),
        m.tagline.into(),
        m.belongs_to_collection.into(),
        m.wikipedia_url.into(),
        m.imdb_link.into(),
        m.runtime.into(),
        m.budget.into(),
        m.revenue.into(),
        m.release_date.into(),
        m.popularity.into(),
        m.vote_average.into(),
        m.vote_count.into(),
        m.genres.into(),
        m.original_language.into(),
        m.overview.into(),
        m.spoken_languages.into(),
        m.country.into(),
        m.production_companies.into(),
        m.production_countries.into(),
        m.distributor.into(),
        m.producers.into(),
        m.director.into(),
        m.starring.into(),
        m.cinematography.into(),
        m.editors.into(),
        m.writers.into(),
        m.composers.into(),
        m.based_on.into(),
    ]
}

/// The final movie table: canonical columns followed by the histogram columns.
pub fn movies_table(rated: &RatedMovies) -> Table {
    let mut columns: Vec<Column> = CANONICAL_COLUMNS
        .iter()
        .map(|name| Column::new(*name, canonical_kind(name)))
        .collect();
    columns.extend(
        rated
            .rating_columns
            .iter()
            .map(|name| Column::new(name.clone(), ColumnKind::Integer)),
    );

    let rows = rated
        .rows
        .iter()
        .map(|row| {
            let mut cells = canonical_cells(&row.movie);
            cells.extend(row.rating_counts.iter().map(|c| Cell::Int(*c as i64)));
            cells
        })
        .collect();

    Table::with_rows(columns, rows)
}

pub fn ratings_columns() -> Vec<Column> {
    let kinds = [
        ColumnKind::Integer,
        ColumnKind::Integer,
        ColumnKind::Real,
        ColumnKind::Timestamp,
    ];
    RATINGS_COLUMNS
        .iter()
        .zip(kinds)
        .map(|(name, kind)| Column::new(*name, kind))
        .collect()
}

pub fn ratings_table(events: &[TimedRating]) -> Table {
    let rows = events
        .iter()
        .map(|e| {
            vec![
                Cell::Int(e.user_id),
                Cell::Int(e.movie_id),
                Cell::Float(e.rating),
                e.rated_at.into(),
            ]
        })
        .collect();
    Table::with_rows(ratings_columns(), rows)
}
