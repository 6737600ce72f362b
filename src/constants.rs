//! Field names and fixed rule tables shared across the normalization stages.

// Source-one attribute names
pub const DIRECTOR: &str = "Director";
pub const DIRECTED_BY: &str = "Directed by";
pub const IMDB_LINK: &str = "imdb_link";
pub const EPISODE_COUNT: &str = "No. of episodes";
pub const ALT_TITLES: &str = "alt_titles";
pub const BOX_OFFICE: &str = "Box office";
pub const BUDGET: &str = "Budget";
pub const RELEASE_DATE: &str = "Release date";
pub const RUNNING_TIME: &str = "Running time";

/// Keys that carry an alternate or localized title.
pub const ALT_TITLE_KEYS: [&str; 20] = [
    "Also known as",
    "Arabic",
    "Cantonese",
    "Chinese",
    "French",
    "Hangul",
    "Hebrew",
    "Hepburn",
    "Japanese",
    "Literally",
    "Mandarin",
    "McCune-Reischauer",
    "Original title",
    "Polish",
    "Revised Romanization",
    "Romanized",
    "Russian",
    "Simplified",
    "Traditional",
    "Yiddish",
];

/// Key renames applied in this exact order. Later rules may retarget a key an
/// earlier rule produced ("Released" -> "Release Date" -> "Release date").
pub const RENAME_RULES: [(&str, &str); 19] = [
    ("Adaptation by", "Writer(s)"),
    ("Country of origin", "Country"),
    ("Directed by", "Director"),
    ("Distributed by", "Distributor"),
    ("Edited by", "Editor(s)"),
    ("Length", "Running time"),
    ("Original release", "Release date"),
    ("Music by", "Composer(s)"),
    ("Produced by", "Producer(s)"),
    ("Producer", "Producer(s)"),
    ("Productioncompanies ", "Production company(s)"),
    ("Productioncompany ", "Production company(s)"),
    ("Released", "Release Date"),
    ("Release Date", "Release date"),
    ("Screen story by", "Writer(s)"),
    ("Screenplay by", "Writer(s)"),
    ("Story by", "Writer(s)"),
    ("Theme music composer", "Composer(s)"),
    ("Written by", "Writer(s)"),
];

/// Columns missing in at least this share of rows are pruned.
pub const SPARSE_COLUMN_RATIO: f64 = 0.9;

// Cross-era collision filter thresholds (year, month, day)
pub const MODERN_WIKI_AFTER: (i32, u32, u32) = (1996, 1, 1);
pub const OLD_CATALOG_BEFORE: (i32, u32, u32) = (1965, 1, 1);

/// Prefix of the dynamic rating histogram columns.
pub const RATING_COLUMN_PREFIX: &str = "rating_";

/// Public column order of the canonical movie table.
pub const CANONICAL_COLUMNS: [&str; 31] = [
    "imdb_id",
    "kaggle_id",
    "title",
    "original_title",
    "tagline",
    "belongs_to_collection",
    "wikipedia_url",
    "imdb_link",
    "runtime",
    "budget",
    "revenue",
    "release_date",
    "popularity",
    "vote_average",
    "vote_count",
    "genres",
    "original_language",
    "overview",
    "spoken_languages",
    "country",
    "production_companies",
    "production_countries",
    "distributor",
    "producers",
    "director",
    "starring",
    "cinematography",
    "editors",
    "writers",
    "composers",
    "based_on",
];

/// Ratings table column order.
pub const RATINGS_COLUMNS: [&str; 4] = ["userId", "movieId", "rating", "timestamp"];
