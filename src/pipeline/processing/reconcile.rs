use chrono::NaiveDate;
use metrics::counter;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::constants::{MODERN_WIKI_AFTER, OLD_CATALOG_BEFORE};
use crate::types::{CanonicalMovie, CatalogMovie, WikiMovie};

/// Output of the cross-source merge.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub movies: Vec<CanonicalMovie>,
    /// Encyclopedia rows with no catalog row for their `imdb_id`.
    pub unmatched: usize,
    /// Joined rows dropped as likely identifier collisions.
    pub era_mismatches: usize,
}

/// Inner-joins the two normalized sources on `imdb_id`. Catalog values win for
/// runtime, budget and revenue unless they are 0 or missing, in which case the
/// encyclopedia value fills the gap. Descriptive duplicates (title, release
/// date, language, production companies) always come from the catalog.
#[instrument(skip(wiki, catalog), fields(wiki = wiki.len(), catalog = catalog.len()))]
pub fn reconcile(wiki: &[WikiMovie], catalog: &[CatalogMovie]) -> Reconciliation {
    let mut by_imdb: HashMap<&str, &CatalogMovie> = HashMap::new();
    for movie in catalog {
        if let Some(imdb_id) = movie.imdb_id.as_deref() {
            by_imdb.entry(imdb_id).or_insert(movie);
        }
    }

    let mut result = Reconciliation::default();
    for wiki_movie in wiki {
        let Some(catalog_movie) = by_imdb.get(wiki_movie.imdb_id.as_str()) else {
            result.unmatched += 1;
            continue;
        };
        if is_era_mismatch(wiki_movie.release_date, catalog_movie.release_date) {
            debug!(
                "Dropping {}: encyclopedia date {:?} vs catalog date {:?}",
                wiki_movie.imdb_id, wiki_movie.release_date, catalog_movie.release_date
            );
            result.era_mismatches += 1;
            continue;
        }
        result.movies.push(merge(wiki_movie, catalog_movie));
    }

    info!(
        "Reconciled {} movies ({} unmatched, {} era mismatches)",
        result.movies.len(),
        result.unmatched,
        result.era_mismatches
    );
    counter!("movie_etl_era_mismatches_total").increment(result.era_mismatches as u64);
    counter!("movie_etl_reconciled_movies_total").increment(result.movies.len() as u64);
    result
}

/// A modern encyclopedia entry matched to a catalog entry from before 1965 is
/// almost certainly an identifier collision. Missing dates never match.
pub fn is_era_mismatch(wiki_date: Option<NaiveDate>, catalog_date: Option<NaiveDate>) -> bool {
    let (Some(wiki_date), Some(catalog_date)) = (wiki_date, catalog_date) else {
        return false;
    };
    wiki_date > date(MODERN_WIKI_AFTER) && catalog_date < date(OLD_CATALOG_BEFORE)
}

fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Catalog value unless it is the empty sentinel (0) or missing.
pub fn fill_gap(catalog: Option<f64>, wiki: Option<f64>) -> Option<f64> {
    match catalog {
        Some(v) if v != 0.0 => Some(v),
        _ => wiki,
    }
}

fn merge(wiki: &WikiMovie, catalog: &CatalogMovie) -> CanonicalMovie {
    CanonicalMovie {
        imdb_id: wiki.imdb_id.clone(),
        kaggle_id: catalog.id,
        title: catalog.title.clone(),
        original_title: catalog.original_title.clone(),
        tagline: catalog.tagline.clone(),
        belongs_to_collection: catalog.belongs_to_collection.clone(),
        wikipedia_url: wiki.text("url"),
        imdb_link: wiki.text("imdb_link"),
        runtime: fill_gap(catalog.runtime, Some(f64::from(wiki.running_time))),
        budget: fill_gap(Some(catalog.budget as f64), wiki.budget),
        revenue: fill_gap(catalog.revenue, wiki.box_office),
        release_date: catalog.release_date,
        popularity: catalog.popularity,
        vote_average: catalog.vote_average,
        vote_count: catalog.vote_count,
        genres: catalog.genres.clone(),
        original_language: catalog.original_language.clone(),
        overview: catalog.overview.clone(),
        spoken_languages: catalog.spoken_languages.clone(),
        country: wiki.text("Country"),
        production_companies: catalog.production_companies.clone(),
        production_countries: catalog.production_countries.clone(),
        distributor: wiki.text("Distributor"),
        producers: wiki.text("Producer(s)"),
        director: wiki.text("Director"),
        starring: wiki.text("Starring"),
        cinematography: wiki.text("Cinematography"),
        editors: wiki.text("Editor(s)"),
        writers: wiki.text("Writer(s)"),
        composers: wiki.text("Composer(s)"),
        based_on: wiki.text("Based on"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRecord;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn wiki(imdb_id: &str) -> WikiMovie {
        let attributes: RawRecord = serde_json::from_value(json!({
            "url": format!("https://en.wikipedia.org/wiki/{imdb_id}"),
            "imdb_link": format!("https://www.imdb.com/title/{imdb_id}/"),
            "title": "Encyclopedia Title",
            "Director": "Jane Doe",
            "Starring": ["A. Actor", "B. Actor"],
            "Language": "English",
        }))
        .unwrap();
        WikiMovie {
            imdb_id: imdb_id.to_string(),
            box_office: Some(5_300_000.0),
            budget: Some(900_000.0),
            release_date: ymd(2001, 2, 3),
            running_time: 95,
            attributes,
        }
    }

    fn catalog(id: i64, imdb_id: &str) -> CatalogMovie {
        CatalogMovie {
            id,
            imdb_id: Some(imdb_id.to_string()),
            title: Some("Catalog Title".to_string()),
            original_title: None,
            tagline: None,
            belongs_to_collection: None,
            genres: None,
            original_language: Some("en".to_string()),
            overview: None,
            spoken_languages: None,
            production_companies: None,
            production_countries: None,
            budget: 1_000_000,
            revenue: Some(0.0),
            runtime: Some(0.0),
            popularity: Some(3.5),
            vote_average: None,
            vote_count: None,
            release_date: ymd(2001, 2, 3),
            video: false,
        }
    }

    #[test]
    fn test_catalog_wins_unless_zero() {
        let result = reconcile(&[wiki("tt1234567")], &[catalog(42, "tt1234567")]);
        let movie = &result.movies[0];

        assert_eq!(movie.kaggle_id, 42);
        assert_eq!(movie.budget, Some(1_000_000.0));
        assert_eq!(movie.revenue, Some(5_300_000.0));
        assert_eq!(movie.runtime, Some(95.0));
        assert_eq!(movie.title.as_deref(), Some("Catalog Title"));
        assert_eq!(movie.director.as_deref(), Some("Jane Doe"));
        assert_eq!(movie.starring.as_deref(), Some("A. Actor, B. Actor"));
    }

    #[test]
    fn test_zero_budget_falls_back_to_wiki() {
        let mut c = catalog(1, "tt1234567");
        c.budget = 0;
        c.revenue = None;
        let result = reconcile(&[wiki("tt1234567")], &[c]);
        assert_eq!(result.movies[0].budget, Some(900_000.0));
        assert_eq!(result.movies[0].revenue, Some(5_300_000.0));
    }

    #[test]
    fn test_inner_join_drops_one_sided_rows() {
        let result = reconcile(
            &[wiki("tt0000001"), wiki("tt0000002")],
            &[catalog(1, "tt0000002"), catalog(3, "tt0000003")],
        );
        assert_eq!(result.movies.len(), 1);
        assert_eq!(result.movies[0].imdb_id, "tt0000002");
        assert_eq!(result.unmatched, 1);
    }

    #[test]
    fn test_duplicate_catalog_ids_keep_first() {
        let result = reconcile(
            &[wiki("tt0000001")],
            &[catalog(1, "tt0000001"), catalog(2, "tt0000001")],
        );
        assert_eq!(result.movies.len(), 1);
        assert_eq!(result.movies[0].kaggle_id, 1);
    }

    #[test]
    fn test_era_mismatch_is_dropped() {
        let mut c = catalog(1, "tt0000001");
        c.release_date = ymd(1950, 6, 1);
        let result = reconcile(&[wiki("tt0000001")], &[c]);
        assert!(result.movies.is_empty());
        assert_eq!(result.era_mismatches, 1);
    }

    #[test]
    fn test_era_mismatch_boundaries() {
        assert!(!is_era_mismatch(ymd(1996, 1, 1), ymd(1950, 1, 1)));
        assert!(is_era_mismatch(ymd(1996, 1, 2), ymd(1964, 12, 31)));
        assert!(!is_era_mismatch(ymd(2005, 1, 1), ymd(1965, 1, 1)));
        assert!(!is_era_mismatch(None, ymd(1950, 1, 1)));
        assert!(!is_era_mismatch(ymd(2005, 1, 1), None));
    }

    #[test]
    fn test_fill_gap() {
        assert_eq!(fill_gap(Some(7.0), Some(1.0)), Some(7.0));
        assert_eq!(fill_gap(Some(0.0), Some(1.0)), Some(1.0));
        assert_eq!(fill_gap(None, Some(1.0)), Some(1.0));
        assert_eq!(fill_gap(Some(0.0), None), None);
    }
}
