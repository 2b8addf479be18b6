//! CLO coefficient table and detection aggregation.
//!
//! This is the decision core of the crate: [`CloTable`] holds the garment
//! label to insulation coefficient mapping, [`annotate`] turns a detection
//! sequence into per-garment contributions plus an aggregate total, applying
//! the lower-body fallback policy.

mod aggregate;
mod table;

pub use aggregate::{annotate, FallbackPolicy};
pub use table::{CloTable, TableError};
