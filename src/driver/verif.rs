//! All-pairs verification: every unordered pair of extracted descriptors
//! is matched once, partitioned into mated/non-mated score vectors, then
//! sanity-checked and fed to `fast_roc`.

use std::path::Path;

use crate::binio::{read_descriptors, read_score_vector, write_score_vector};
use crate::driver::check_median_in_range;
use crate::engine::EngineStatus;
use crate::error::HarnessError;
use crate::metric::fast_roc;
use crate::report::write_report;
use crate::timer::Timer;

/// Matches the verification engine's `match_templates` signature, boxed
/// so the driver doesn't need to know the engine's concrete type.
pub type Matcher<'a> = dyn Fn(&[u8], &[u8], &mut f64) -> EngineStatus + Sync + 'a;

pub struct VerifyOptions {
    pub desc_size: usize,
    pub fprs: Vec<u32>,
    pub true_median_range: (f32, f32),
    pub false_median_range: (f32, f32),
    pub extra_timings: bool,
    pub percentile: f64,
}

pub struct VerifyPaths {
    pub descriptors: std::path::PathBuf,
    pub matches_true: std::path::PathBuf,
    pub matches_false: std::path::PathBuf,
    pub roc: std::path::PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct VerifyReport {
    pub pairs: usize,
    pub mated: usize,
    pub non_mated: usize,
    pub skipped: usize,
}

/// Run the full match + ROC pass. Returns once `ROC.txt` has been
/// written.
pub fn run(options: &VerifyOptions, paths: &VerifyPaths, matcher: &Matcher<'_>) -> Result<VerifyReport, HarnessError> {
    let descriptors = read_descriptors(&paths.descriptors, options.desc_size)?;
    let count = descriptors.len();

    let mut matches_true = Vec::new();
    let mut matches_false = Vec::new();
    let mut skipped = 0usize;
    let mut timer = Timer::new(options.extra_timings);

    for i in 0..count.saturating_sub(1) {
        for j in (i + 1)..count {
            let label_i = descriptors[i].label;
            let label_j = descriptors[j].label;

            if label_i == 0 || label_j == 0 {
                return Err(HarnessError::Data(format!(
                    "cannot match: found image without a label (pair {i}, {j})"
                )));
            }

            let skip_match = label_i < 0 || label_j < 0;
            let id_i = label_i.abs();
            let id_j = label_j.abs();

            let similarity = if skip_match {
                skipped += 1;
                0.0
            } else {
                let mut similarity = 0.0;
                timer.start();
                let status = matcher(&descriptors[i].payload, &descriptors[j].payload, &mut similarity);
                timer.stop();
                if !status.is_success() {
                    return Err(HarnessError::Engine {
                        code: status.code,
                        context: format!("matchTemplates failed for pair ({i}, {j}): {}", status.info),
                    });
                }
                similarity
            };

            if id_i == id_j {
                matches_true.push(similarity as f32);
            } else {
                matches_false.push(similarity as f32);
            }
        }
    }

    tracing::info!(
        pairs = matches_true.len() + matches_false.len(),
        mated = matches_true.len(),
        non_mated = matches_false.len(),
        skipped,
        "matchTemplates done"
    );
    if let Some(average) = timer.average() {
        tracing::info!(?average, "matchTemplates average time");
    }
    if options.extra_timings {
        let info = timer.extended_info(options.percentile);
        tracing::info!(?info, "matchTemplates extended timing");
    }

    write_score_vector(&paths.matches_true, &matches_true)?;
    write_score_vector(&paths.matches_false, &matches_false)?;

    check_median_in_range(&mut matches_true.clone(), options.true_median_range)?;
    check_median_in_range(&mut matches_false.clone(), options.false_median_range)?;

    roc(&paths.matches_true, &paths.matches_false, &options.fprs, &paths.roc)?;

    Ok(VerifyReport {
        pairs: matches_true.len() + matches_false.len(),
        mated: matches_true.len(),
        non_mated: matches_false.len(),
        skipped,
    })
}

/// Re-derive the ROC curve from already-persisted score files, without
/// re-running the match pass. Exposed separately so `--do-match false
/// --do-roc true` can resume from a prior run's output.
pub fn roc(matches_true_path: &Path, matches_false_path: &Path, fprs: &[u32], out_path: &Path) -> Result<(), HarnessError> {
    let matches_true = read_score_vector(matches_true_path)?;
    let mut matches_false = read_score_vector(matches_false_path)?;

    let tprs = fast_roc(&matches_true, &mut matches_false, fprs);
    write_report(out_path, fprs, &tprs, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binio::write_bucket;
    use crate::engine::EngineCode;
    use crate::types::DescriptorRecord;
    use tempfile::tempdir;

    fn record(label: i32) -> DescriptorRecord {
        DescriptorRecord { label, payload: vec![1, 2, 3, 4] }
    }

    #[test]
    fn tiny_round_trip_partitions_mated_and_non_mated() {
        let dir = tempdir().unwrap();
        let desc_path = dir.path().join("d.bin");
        write_bucket(&desc_path, 4, &[record(1), record(1), record(2), record(2)]).unwrap();

        let matcher = |a: &[u8], b: &[u8], sim: &mut f64| {
            *sim = if a == b { 0.95 } else { 0.10 };
            EngineStatus::ok()
        };

        let options = VerifyOptions {
            desc_size: 4,
            fprs: vec![4, 5, 6, 7, 8],
            true_median_range: (0.0, 1.0),
            false_median_range: (0.0, 1.0),
            extra_timings: false,
            percentile: 0.9,
        };
        let paths = VerifyPaths {
            descriptors: desc_path,
            matches_true: dir.path().join("matches_true.bin"),
            matches_false: dir.path().join("matches_false.bin"),
            roc: dir.path().join("ROC.txt"),
        };

        let report = run(&options, &paths, &matcher).unwrap();
        assert_eq!(report.pairs, 6);
        assert_eq!(report.mated, 2);
        assert_eq!(report.non_mated, 4);
        assert_eq!(report.skipped, 0);

        let roc_contents = std::fs::read_to_string(&paths.roc).unwrap();
        assert_eq!(roc_contents, "-4 none\n-5 none\n-6 none\n-7 none\n-8 none\n");
    }

    #[test]
    fn refused_pair_is_skipped_not_matched() {
        let dir = tempdir().unwrap();
        let desc_path = dir.path().join("d.bin");
        write_bucket(&desc_path, 4, &[record(1), record(-1)]).unwrap();

        let matcher = |_: &[u8], _: &[u8], _: &mut f64| panic!("matcher must not be called for a skipped pair");

        let options = VerifyOptions {
            desc_size: 4,
            fprs: vec![4],
            true_median_range: (-1.0, 1.0),
            false_median_range: (-1.0, 1.0),
            extra_timings: false,
            percentile: 0.9,
        };
        let paths = VerifyPaths {
            descriptors: desc_path,
            matches_true: dir.path().join("matches_true.bin"),
            matches_false: dir.path().join("matches_false.bin"),
            roc: dir.path().join("ROC.txt"),
        };

        let report = run(&options, &paths, &matcher).unwrap();
        assert_eq!(report.skipped, 1);
        // same absolute id -> counted as mated with similarity 0.
        assert_eq!(report.mated, 1);
    }

    #[test]
    fn zero_label_is_fatal() {
        let dir = tempdir().unwrap();
        let desc_path = dir.path().join("d.bin");
        write_bucket(&desc_path, 4, &[record(0), record(1)]).unwrap();

        let matcher = |_: &[u8], _: &[u8], sim: &mut f64| {
            *sim = 0.5;
            EngineStatus::ok()
        };
        let options = VerifyOptions {
            desc_size: 4,
            fprs: vec![4],
            true_median_range: (-1.0, 1.0),
            false_median_range: (-1.0, 1.0),
            extra_timings: false,
            percentile: 0.9,
        };
        let paths = VerifyPaths {
            descriptors: desc_path,
            matches_true: dir.path().join("matches_true.bin"),
            matches_false: dir.path().join("matches_false.bin"),
            roc: dir.path().join("ROC.txt"),
        };

        assert!(matches!(run(&options, &paths, &matcher), Err(HarnessError::Data(_))));
    }

    #[test]
    fn non_success_match_status_is_fatal() {
        let dir = tempdir().unwrap();
        let desc_path = dir.path().join("d.bin");
        write_bucket(&desc_path, 4, &[record(1), record(2)]).unwrap();

        let matcher = |_: &[u8], _: &[u8], _: &mut f64| EngineStatus::new(EngineCode::VerifTemplateError, "bad template");
        let options = VerifyOptions {
            desc_size: 4,
            fprs: vec![4],
            true_median_range: (-1.0, 1.0),
            false_median_range: (-1.0, 1.0),
            extra_timings: false,
            percentile: 0.9,
        };
        let paths = VerifyPaths {
            descriptors: desc_path,
            matches_true: dir.path().join("matches_true.bin"),
            matches_false: dir.path().join("matches_false.bin"),
            roc: dir.path().join("ROC.txt"),
        };

        assert!(matches!(run(&options, &paths, &matcher), Err(HarnessError::Engine { .. })));
    }
}
