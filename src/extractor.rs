//! Parallel extraction: fan out across worker threads, drive the engine's
//! `create_template` per template, and write the resulting records back
//! into a shared descriptor file under a single mutex.

use std::path::{Path, PathBuf};

use crate::binio::descriptor::{preallocate, AuxLogs, DescriptorWriter};
use crate::error::HarnessError;
use crate::loader::load_image;
use crate::timer::Timer;
use crate::types::{DescriptorRecord, Multiface, TemplateRole, TemplateSpec};

/// Paths to the four output files an extraction run produces.
pub struct ExtractionPaths {
    pub descriptors: PathBuf,
    pub debug_info: PathBuf,
    pub extra_info: PathBuf,
    pub fail_detect: PathBuf,
}

/// Tunables forwarded from `HarnessConfig`.
pub struct ExtractionOptions {
    pub extract_prefix: PathBuf,
    pub gray_flag: bool,
    pub desc_size: usize,
    pub role: TemplateRole,
    pub debug_info: bool,
    pub extract_info: bool,
    pub extra_timings: bool,
    pub percentile: f64,
}

/// Summary returned after every worker has joined successfully.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionReport {
    pub total: usize,
    pub refusals: usize,
}

type Creator<'a> = dyn Fn(&Multiface, TemplateRole, &mut Vec<u8>) -> crate::engine::EngineStatus + Sync + 'a;

/// Drive one worker's bucket to completion, returning its records (in
/// bucket order) plus the auxiliary log lines it produced.
fn run_worker(
    worker_index: usize,
    bucket: &[TemplateSpec],
    options: &ExtractionOptions,
    creator: &Creator<'_>,
) -> Result<(Vec<DescriptorRecord>, Vec<String>, Vec<String>, Vec<String>, usize), HarnessError> {
    let mut records = Vec::with_capacity(bucket.len());
    let mut fail_lines = Vec::new();
    let mut debug_lines = Vec::new();
    let mut extra_lines = Vec::new();
    let mut refusals = 0usize;
    let mut timer = Timer::new(options.extra_timings);

    for spec in bucket {
        let mut images = Vec::with_capacity(spec.paths.len());
        for rel_path in &spec.paths {
            let full_path = options.extract_prefix.join(rel_path);
            images.push(load_image(&full_path, options.gray_flag)?);
        }
        let faces: Multiface = images;

        let mut templ = Vec::new();
        timer.start();
        let status = creator(&faces, options.role, &mut templ);
        timer.stop();

        if status.is_refusal() {
            refusals += 1;
            fail_lines.push(spec.paths.join(" "));
            records.push(DescriptorRecord {
                label: -spec.class_id,
                payload: vec![0u8; options.desc_size],
            });
        } else if status.is_success() {
            if templ.len() != options.desc_size {
                return Err(HarnessError::Data(format!(
                    "wrong descriptor size: {} vs {}",
                    templ.len(),
                    options.desc_size
                )));
            }
            records.push(DescriptorRecord { label: spec.class_id, payload: templ });
        } else {
            return Err(HarnessError::Engine {
                code: status.code,
                context: format!("createTemplate failed for {:?}: {}", spec.paths, status.info),
            });
        }

        if options.debug_info {
            let record = records.last().unwrap();
            let payload = record.payload.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(" ");
            debug_lines.push(format!("{} {} {}", record.label, spec.paths.join(","), payload));
        }
        if options.extract_info {
            extra_lines.push(format!("{} {}", spec.paths.join(","), spec.class_id));
        }
    }

    if let Some(average) = timer.average() {
        tracing::info!(worker_index, ?average, "worker createTemplate average");
    }
    if options.extra_timings {
        let info = timer.extended_info(options.percentile);
        tracing::info!(worker_index, ?info, "worker createTemplate extended timing");
    }
    if refusals > 0 {
        tracing::warn!(worker_index, refusals, "worker refusal count");
    }

    Ok((records, debug_lines, extra_lines, fail_lines, refusals))
}

/// Run the full parallel extraction, writing the descriptor file and
/// auxiliary logs described by `paths`. Returns the total template count
/// and aggregate refusal count on success; aggregates every worker
/// failure (error or panic) into a single `HarnessError::WorkerFailure`.
pub fn run(buckets: &[Vec<TemplateSpec>], options: &ExtractionOptions, paths: &ExtractionPaths, creator: &Creator<'_>) -> Result<ExtractionReport, HarnessError> {
    let record_size = 4 + options.desc_size;
    let total: usize = buckets.iter().map(|b| b.len()).sum();
    preallocate(&paths.descriptors, total, options.desc_size)?;

    let writer = DescriptorWriter::new(&paths.descriptors, &paths.debug_info, &paths.extra_info, &paths.fail_detect);

    let mut offsets = Vec::with_capacity(buckets.len());
    let mut running = 0u64;
    for bucket in buckets {
        offsets.push(running);
        running += bucket.len() as u64 * record_size as u64;
    }

    let results: Vec<Result<(Vec<DescriptorRecord>, Vec<String>, Vec<String>, Vec<String>, usize), HarnessError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = buckets
            .iter()
            .enumerate()
            .map(|(worker_index, bucket)| scope.spawn(move || run_worker(worker_index, bucket, options, creator)))
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(HarnessError::Data("worker thread panicked".into())),
            })
            .collect()
    });

    let mut failed_indices = Vec::new();
    let mut total_refusals = 0usize;

    for (worker_index, result) in results.into_iter().enumerate() {
        match result {
            Ok((records, debug_lines, extra_lines, fail_lines, refusals)) => {
                total_refusals += refusals;
                writer.commit(
                    offsets[worker_index],
                    &records,
                    AuxLogs { debug_lines: &debug_lines, extra_lines: &extra_lines, fail_lines: &fail_lines },
                )?;
            }
            Err(_) => failed_indices.push(worker_index),
        }
    }

    if !failed_indices.is_empty() {
        return Err(HarnessError::worker_failure(failed_indices));
    }

    tracing::info!(total, refusals = total_refusals, "extraction complete");

    Ok(ExtractionReport { total, refusals: total_refusals })
}
