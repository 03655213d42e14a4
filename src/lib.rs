//! facebench - a benchmarking harness for pluggable biometric face
//! recognition engines.
//!
//! This library provides the pieces a `verify`/`identify` CLI composes:
//!
//! - Parse extraction lists and bucket them deterministically across workers
//! - Extract templates in parallel into a bit-exact descriptor file
//! - Drive all-pairs verification or N x M identification against a
//!   pluggable [`engine`]
//! - Compute ROC/TPIR curves with the `fast_roc` quickselect kernel
//!
//! # Example
//!
//! ```ignore
//! use facebench::config::{CommonConfig, VerifyConfig};
//! use facebench::engine::StubEngine;
//! use facebench::input_list::parse_input_list;
//!
//! let (buckets, total) = parse_input_list(Path::new("list.txt"), 4)?;
//! ```

pub mod binio;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod input_list;
pub mod loader;
pub mod metric;
pub mod report;
pub mod timer;
pub mod types;

pub use config::{CommonConfig, IdentifyConfig, VerifyConfig};
pub use engine::{EngineCode, EngineStatus, IdentificationEngine, VerificationEngine};
pub use error::HarnessError;
pub use types::{Candidate, DescriptorRecord, Image, Multiface, TemplateRole, TemplateSpec};
