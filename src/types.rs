use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One encyclopedia-style movie record. Attribute names are free text and any
/// record may be missing any attribute, so this is an ordered key/value list
/// with optional accessors rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Map<String, Value>", into = "serde_json::Map<String, Value>")]
pub struct RawRecord {
    fields: Vec<(String, Value)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value for `key`; lists and other shapes return `None`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Present and not JSON `null`.
    pub fn has_value(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !v.is_null())
    }

    /// Inserts or overwrites `key`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|(k, _)| keep(k));
    }
}

impl From<serde_json::Map<String, Value>> for RawRecord {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

impl From<RawRecord> for serde_json::Map<String, Value> {
    fn from(record: RawRecord) -> Self {
        record.fields.into_iter().collect()
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Collapses a cell to text: strings pass through, lists of strings are joined
/// with `sep`, anything else is `None`.
pub fn flatten_text(value: &Value, sep: &str) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(sep))
            }
        }
        _ => None,
    }
}

/// One row of the normalized encyclopedia table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WikiMovie {
    pub imdb_id: String,
    pub box_office: Option<f64>,
    pub budget: Option<f64>,
    pub release_date: Option<NaiveDate>,
    /// Minutes; 0 when unknown.
    pub running_time: u32,
    /// Surviving (non-sparse) attributes, including `imdb_link`, `url`, credits.
    pub attributes: RawRecord,
}

impl WikiMovie {
    pub fn text(&self, key: &str) -> Option<String> {
        self.attributes.get(key).and_then(|v| flatten_text(v, ", "))
    }
}

/// One row of the catalog export as read, every column still text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCatalogRow {
    pub adult: String,
    pub belongs_to_collection: String,
    pub budget: String,
    pub genres: String,
    pub homepage: String,
    pub id: String,
    pub imdb_id: String,
    pub original_language: String,
    pub original_title: String,
    pub overview: String,
    pub popularity: String,
    pub poster_path: String,
    pub production_companies: String,
    pub production_countries: String,
    pub release_date: String,
    pub revenue: String,
    pub runtime: String,
    pub spoken_languages: String,
    pub status: String,
    pub tagline: String,
    pub title: String,
    pub video: String,
    pub vote_average: String,
    pub vote_count: String,
}

/// A catalog row after type coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMovie {
    pub id: i64,
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub belongs_to_collection: Option<String>,
    pub genres: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub spoken_languages: Option<String>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub budget: i64,
    pub revenue: Option<f64>,
    pub runtime: Option<f64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub video: bool,
}

/// The reconciled movie entity in the public schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMovie {
    pub imdb_id: String,
    pub kaggle_id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub tagline: Option<String>,
    pub belongs_to_collection: Option<String>,
    pub wikipedia_url: Option<String>,
    pub imdb_link: Option<String>,
    pub runtime: Option<f64>,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub genres: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub spoken_languages: Option<String>,
    pub country: Option<String>,
    pub production_companies: Option<String>,
    pub production_countries: Option<String>,
    pub distributor: Option<String>,
    pub producers: Option<String>,
    pub director: Option<String>,
    pub starring: Option<String>,
    pub cinematography: Option<String>,
    pub editors: Option<String>,
    pub writers: Option<String>,
    pub composers: Option<String>,
    pub based_on: Option<String>,
}

/// One event of the ratings log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "movieId")]
    pub movie_id: i64,
    pub rating: f64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl RatingEvent {
    pub fn rated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
