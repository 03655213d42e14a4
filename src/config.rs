//! Validated, CLI-derived configuration for both pipelines.
//!
//! Built once in `main` from the parsed `clap` arguments and validated up
//! front so every failure surfaces as a single `HarnessError::Configuration`
//! before any stage runs.

use std::path::PathBuf;

use crate::error::HarnessError;

/// Flags and paths shared by both the `verify` and `identify` subcommands.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub split_dir: PathBuf,
    pub config_dir: PathBuf,
    pub extract_prefix: PathBuf,
    pub grayscale: bool,
    pub count_proc: u32,
    pub desc_size: u32,
    pub percentile: u32,
    pub debug_info: bool,
    pub extract_info: bool,
    pub extra_timings: bool,
}

impl CommonConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.count_proc == 0 {
            return Err(HarnessError::Configuration("count-proc must be greater than zero".into()));
        }
        if self.desc_size == 0 {
            return Err(HarnessError::Configuration("desc-size must be greater than zero".into()));
        }
        if self.percentile > 100 {
            return Err(HarnessError::Configuration(format!("percentile must be in 0..=100, got {}", self.percentile)));
        }
        if !self.split_dir.exists() {
            return Err(HarnessError::Configuration(format!("split directory not found: {}", self.split_dir.display())));
        }
        Ok(())
    }

    pub fn percentile_fraction(&self) -> f64 {
        self.percentile as f64 / 100.0
    }
}

/// `verify` subcommand configuration.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub common: CommonConfig,
    pub extract_list: PathBuf,
    pub do_extract: bool,
    pub do_match: bool,
    pub do_roc: bool,
}

impl VerifyConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        self.common.validate()?;
        if self.do_extract && !self.extract_list.exists() {
            return Err(HarnessError::Configuration(format!("extract list not found: {}", self.extract_list.display())));
        }
        Ok(())
    }
}

/// Ranks (below `nearest_count`) at which the identification driver
/// separately records per-rank mated scores.
pub const IDENTIFICATION_RANKS: [u32; 3] = [1, 5, 20];

/// Ranks TPIR is computed at: `0` (general) plus every configured rank.
pub fn tpir_ranks() -> Vec<u32> {
    let mut ranks = vec![0];
    ranks.extend_from_slice(&IDENTIFICATION_RANKS);
    ranks
}

/// `identify` subcommand configuration.
#[derive(Debug, Clone)]
pub struct IdentifyConfig {
    pub common: CommonConfig,
    pub db_list: Option<PathBuf>,
    pub mate_list: Option<PathBuf>,
    pub nonmate_list: Option<PathBuf>,
    pub insert_list: Option<PathBuf>,
    pub remove_list: Option<PathBuf>,
    pub nearest_count: u32,
    pub search_info: bool,
    pub do_extract: bool,
    pub do_graph: bool,
    pub do_insert: bool,
    pub do_remove: bool,
    pub do_search: bool,
    pub do_tpir: bool,
}

impl IdentifyConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        self.common.validate()?;

        for &rank in &IDENTIFICATION_RANKS {
            if rank >= self.nearest_count {
                return Err(HarnessError::Configuration(format!(
                    "nearest-count ({}) must strictly exceed every configured rank (got rank {rank})",
                    self.nearest_count
                )));
            }
        }

        if self.do_search && (self.mate_list.is_none() || self.nonmate_list.is_none()) {
            return Err(HarnessError::Configuration("search requires both --mate-list and --nonmate-list".into()));
        }
        if self.do_insert && self.insert_list.is_none() {
            return Err(HarnessError::Configuration("insert requires --insert-list".into()));
        }
        if self.do_remove && self.remove_list.is_none() {
            return Err(HarnessError::Configuration("remove requires --remove-list".into()));
        }

        Ok(())
    }
}
