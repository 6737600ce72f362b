//! Readers for the three raw inputs. Core stages never touch the filesystem.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::config::InputConfig;
use crate::error::{EtlError, Result};
use crate::types::{RatingEvent, RawCatalogRow, RawRecord};

/// The three raw inputs, fully read.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub wiki: Vec<RawRecord>,
    pub catalog: Vec<RawCatalogRow>,
    pub ratings: Vec<RatingEvent>,
}

impl RawInputs {
    /// Checks that every input exists before reading any of them.
    pub fn read(inputs: &InputConfig) -> Result<Self> {
        for path in [&inputs.wiki_movies, &inputs.movies_metadata, &inputs.ratings] {
            ensure_exists(path)?;
        }
        Ok(Self {
            wiki: read_wiki_movies(&inputs.wiki_movies)?,
            catalog: read_movies_metadata(&inputs.movies_metadata)?,
            ratings: read_ratings(&inputs.ratings)?,
        })
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(EtlError::MissingInput {
            path: path.display().to_string(),
        })
    }
}

/// Reads the encyclopedia extract: a JSON array of objects.
pub fn read_wiki_movies(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    ensure_exists(path)?;
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<RawRecord> = serde_json::from_reader(reader)?;
    info!("Read {} encyclopedia records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads the catalog export with every column as text.
pub fn read_movies_metadata(path: impl AsRef<Path>) -> Result<Vec<RawCatalogRow>> {
    let path = path.as_ref();
    ensure_exists(path)?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let rows = reader
        .deserialize::<RawCatalogRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Read {} catalog rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn read_ratings(path: impl AsRef<Path>) -> Result<Vec<RatingEvent>> {
    let path = path.as_ref();
    ensure_exists(path)?;
    let mut reader = csv::Reader::from_path(path)?;
    let events = reader
        .deserialize::<RatingEvent>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Read {} rating events from {}", events.len(), path.display());
    Ok(events)
}

/// Streams the ratings log in fixed-size chunks so only one chunk is held in
/// memory at a time.
pub struct RatingsChunks {
    records: csv::DeserializeRecordsIntoIter<File, RatingEvent>,
    chunk_size: usize,
    done: bool,
}

impl RatingsChunks {
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;
        if chunk_size == 0 {
            return Err(EtlError::Config("chunk size must be at least 1".to_string()));
        }
        let reader = csv::Reader::from_path(path)?;
        Ok(Self {
            records: reader.into_deserialize(),
            chunk_size,
            done: false,
        })
    }
}

impl Iterator for RatingsChunks {
    type Item = Result<Vec<RatingEvent>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = Vec::with_capacity(self.chunk_size.min(65_536));
        while chunk.len() < self.chunk_size {
            match self.records.next() {
                Some(Ok(event)) => chunk.push(event),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}
