// Pipeline processing: field parsing, per-source normalization, merging and rating aggregation

pub mod catalog;
pub mod cleaner;
pub mod ratings;
pub mod reconcile;
pub mod values;
pub mod wiki;
