use chrono::{DateTime, Utc};
use metrics::counter;
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{info, instrument, warn};

use crate::constants::RATING_COLUMN_PREFIX;
use crate::types::{CanonicalMovie, RatingEvent};

/// A rating event with its epoch timestamp converted to a calendar timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedRating {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
    pub rated_at: Option<DateTime<Utc>>,
}

pub fn to_calendar_time(events: &[RatingEvent]) -> Vec<TimedRating> {
    let timed: Vec<TimedRating> = events
        .iter()
        .map(|e| TimedRating {
            user_id: e.user_id,
            movie_id: e.movie_id,
            rating: e.rating,
            rated_at: e.rated_at(),
        })
        .collect();
    let out_of_range = timed.iter().filter(|t| t.rated_at.is_none()).count();
    if out_of_range > 0 {
        warn!("{} rating timestamps are outside the calendar range", out_of_range);
    }
    timed
}

/// Per-movie counts of events at each distinct rating value. Only observed
/// (movie, rating) pairs are stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingHistogram {
    values: BTreeSet<OrderedFloat<f64>>,
    counts: HashMap<i64, BTreeMap<OrderedFloat<f64>, u64>>,
}

impl RatingHistogram {
    /// Distinct rating values in ascending order.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.into_inner()).collect()
    }

    /// `rating_<value>` names aligned with `values()`.
    pub fn column_names(&self) -> Vec<String> {
        self.values.iter().map(|v| rating_column_name(v.into_inner())).collect()
    }

    pub fn movie_count(&self) -> usize {
        self.counts.len()
    }

    /// Count for one pair, `None` when that pair never occurred.
    pub fn count(&self, movie_id: i64, rating: f64) -> Option<u64> {
        self.counts
            .get(&movie_id)
            .and_then(|m| m.get(&OrderedFloat(rating)))
            .copied()
    }

    /// Dense row for `movie_id`: one count per column, missing pairs as 0.
    pub fn dense_row(&self, movie_id: i64) -> Vec<u64> {
        let per_movie = self.counts.get(&movie_id);
        self.values
            .iter()
            .map(|v| per_movie.and_then(|m| m.get(v)).copied().unwrap_or(0))
            .collect()
    }
}

/// Column name for a rating value; the value keeps at least one decimal so
/// 5 prints as `rating_5.0`.
pub fn rating_column_name(value: f64) -> String {
    format!("{RATING_COLUMN_PREFIX}{value:?}")
}

/// Groups the log by (movie, rating) and counts events per group.
#[instrument(skip(events), fields(events = events.len()))]
pub fn aggregate_ratings(events: &[TimedRating]) -> RatingHistogram {
    let mut histogram = RatingHistogram::default();
    for event in events {
        let value = OrderedFloat(event.rating);
        histogram.values.insert(value);
        *histogram
            .counts
            .entry(event.movie_id)
            .or_default()
            .entry(value)
            .or_insert(0) += 1;
    }
    info!(
        "Aggregated {} rating events into {} movies x {} rating values",
        events.len(),
        histogram.counts.len(),
        histogram.values.len()
    );
    histogram
}

/// A canonical movie with its rating histogram columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedMovie {
    pub movie: CanonicalMovie,
    pub rating_counts: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatedMovies {
    pub rating_columns: Vec<String>,
    pub rows: Vec<RatedMovie>,
}

/// Left-joins the histogram onto the movies by `kaggle_id`. Movies without any
/// rating get an all-zero row.
pub fn attach_ratings(movies: Vec<CanonicalMovie>, histogram: &RatingHistogram) -> RatedMovies {
    let rating_columns = histogram.column_names();
    let mut unrated = 0u64;
    let rows = movies
        .into_iter()
        .map(|movie| {
            if !histogram.counts.contains_key(&movie.kaggle_id) {
                unrated += 1;
            }
            let rating_counts = histogram.dense_row(movie.kaggle_id);
            RatedMovie { movie, rating_counts }
        })
        .collect();
    counter!("movie_etl_unrated_movies_total").increment(unrated);
    RatedMovies { rating_columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatingEvent;

    fn event(user_id: i64, movie_id: i64, rating: f64) -> RatingEvent {
        RatingEvent {
            user_id,
            movie_id,
            rating,
            timestamp: 1_425_941_529,
        }
    }

    fn movie(kaggle_id: i64) -> CanonicalMovie {
        CanonicalMovie {
            imdb_id: format!("tt{:07}", kaggle_id),
            kaggle_id,
            title: None,
            original_title: None,
            tagline: None,
            belongs_to_collection: None,
            wikipedia_url: None,
            imdb_link: None,
            runtime: None,
            budget: None,
            revenue: None,
            release_date: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
            genres: None,
            original_language: None,
            overview: None,
            spoken_languages: None,
            country: None,
            production_companies: None,
            production_countries: None,
            distributor: None,
            producers: None,
            director: None,
            starring: None,
            cinematography: None,
            editors: None,
            writers: None,
            composers: None,
            based_on: None,
        }
    }

    fn histogram(events: &[RatingEvent]) -> RatingHistogram {
        aggregate_ratings(&to_calendar_time(events))
    }

    #[test]
    fn test_timestamps_become_calendar_time() {
        let timed = to_calendar_time(&[event(1, 1, 4.0)]);
        let rated_at = timed[0].rated_at.unwrap();
        assert_eq!(rated_at.to_rfc3339(), "2015-03-09T22:52:09+00:00");
    }

    #[test]
    fn test_counts_per_movie_and_value() {
        let h = histogram(&[
            event(1, 10, 4.0),
            event(2, 10, 4.0),
            event(3, 10, 0.5),
            event(1, 20, 5.0),
        ]);

        assert_eq!(h.count(10, 4.0), Some(2));
        assert_eq!(h.count(10, 0.5), Some(1));
        assert_eq!(h.count(20, 5.0), Some(1));
        // sparse: unobserved pairs are absent, not zero
        assert_eq!(h.count(20, 4.0), None);
        assert_eq!(h.movie_count(), 2);
    }

    #[test]
    fn test_column_names_are_sorted_and_decimal() {
        let h = histogram(&[event(1, 1, 5.0), event(1, 1, 0.5), event(1, 2, 3.5)]);
        assert_eq!(h.column_names(), vec!["rating_0.5", "rating_3.5", "rating_5.0"]);
        assert_eq!(h.values(), vec![0.5, 3.5, 5.0]);
    }

    #[test]
    fn test_unrated_movie_gets_zero_row() {
        let h = histogram(&[event(1, 10, 4.0), event(2, 10, 2.0)]);
        let rated = attach_ratings(vec![movie(10), movie(99)], &h);

        assert_eq!(rated.rating_columns, vec!["rating_2.0", "rating_4.0"]);
        assert_eq!(rated.rows[0].rating_counts, vec![1, 1]);
        assert_eq!(rated.rows[1].rating_counts, vec![0, 0]);
    }

    #[test]
    fn test_movie_order_is_preserved() {
        let h = histogram(&[event(1, 2, 1.0)]);
        let rated = attach_ratings(vec![movie(3), movie(2), movie(1)], &h);
        let ids: Vec<i64> = rated.rows.iter().map(|r| r.movie.kaggle_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_empty_log_has_no_columns() {
        let rated = attach_ratings(vec![movie(1)], &histogram(&[]));
        assert!(rated.rating_columns.is_empty());
        assert!(rated.rows[0].rating_counts.is_empty());
    }
}
