use serde_json::{Map, Value};

use crate::constants::{ALT_TITLES, ALT_TITLE_KEYS, RENAME_RULES};
use crate::types::RawRecord;

/// Restructures one encyclopedia record: alternate titles are gathered under
/// `alt_titles` and synonym keys are funnelled into one canonical key each.
/// The input is left untouched.
pub fn clean_record(record: &RawRecord) -> RawRecord {
    let mut movie = record.clone();

    let mut alt_titles = Map::new();
    for key in ALT_TITLE_KEYS {
        if let Some(value) = movie.remove(key) {
            alt_titles.insert(key.to_string(), value);
        }
    }
    if !alt_titles.is_empty() {
        movie.insert(ALT_TITLES, Value::Object(alt_titles));
    }

    for (old_name, new_name) in RENAME_RULES {
        rename_key(&mut movie, old_name, new_name);
    }

    movie
}

/// Moves the value under `old_name` to `new_name`, replacing whatever was there.
fn rename_key(movie: &mut RawRecord, old_name: &str, new_name: &str) {
    if let Some(value) = movie.remove(old_name) {
        movie.remove(new_name);
        movie.insert(new_name, value);
    }
}
