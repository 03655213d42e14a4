//! Fixed-record descriptor file I/O, manifest writing, and raw score
//! vector persistence.
//!
//! The descriptor file format and the mutual-exclusion write-back
//! protocol used by parallel extraction workers live here; see
//! [`descriptor`] for the record layout and [`manifest`]/[`scores`] for
//! the derived text/binary artifacts.

pub mod descriptor;
pub mod manifest;
pub mod scores;

pub use descriptor::{read_descriptors, write_bucket, DescriptorWriter};
pub use manifest::write_manifest;
pub use scores::{read_score_vector, write_score_vector};
