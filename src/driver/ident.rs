//! Identification pipeline: gallery finalize, mate/non-mate search with
//! per-rank accounting, insert/remove stress, and TPIR reporting.

use std::path::Path;

use crate::binio::{read_descriptors, read_score_vector, write_score_vector};
use crate::engine::EngineStatus;
use crate::error::HarnessError;
use crate::metric::fast_roc;
use crate::report::{rank_prefix, write_report};
use crate::timer::Timer;
use crate::types::{parse_template_id, Candidate, DescriptorRecord};

pub struct SearchOptions {
    pub desc_size: usize,
    pub ranks: Vec<u32>,
    pub nearest_count: u32,
    pub extra_timings: bool,
    pub percentile: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchReport {
    pub queries: usize,
    pub skipped: usize,
}

/// Search against the gallery for every mate then non-mate query,
/// persisting one `matches_true_r<rank>.bin` per configured rank below
/// `nearest_count` (the `nearest_count` rank itself is `matches_true.bin`)
/// plus a single shared `matches_false.bin`.
pub fn search(
    options: &SearchOptions,
    mate_path: &Path,
    nonmate_path: &Path,
    out_dir: &Path,
    identify: &(dyn Fn(&[u8], u32, &mut Vec<Candidate>, &mut bool) -> EngineStatus + Sync),
) -> Result<SearchReport, HarnessError> {
    for &rank in &options.ranks {
        if rank >= options.nearest_count {
            return Err(HarnessError::Configuration(format!(
                "rank {rank} must be strictly less than nearest_count ({})",
                options.nearest_count
            )));
        }
    }

    let mut rank_buckets: Vec<(u32, Vec<f32>)> = options.ranks.iter().map(|&r| (r, Vec::new())).collect();
    rank_buckets.push((options.nearest_count, Vec::new()));

    let mut matches_false = Vec::new();
    let mut skipped = 0usize;
    let mut queries = 0usize;
    let mut timer = Timer::new(options.extra_timings);

    for (path, is_mate) in [(mate_path, true), (nonmate_path, false)] {
        let descriptors = read_descriptors(path, options.desc_size)?;
        for desc in descriptors {
            let (class_id, candidate_list, decision) = run_one_query(&desc, options.nearest_count, identify, &mut timer, &mut skipped)?;
            let _ = decision;

            if is_mate {
                for (rank, bucket) in rank_buckets.iter_mut() {
                    if *rank as usize > candidate_list.len() {
                        return Err(HarnessError::Data("too short candidate list for configured rank".into()));
                    }
                    let score = candidate_list[..*rank as usize]
                        .iter()
                        .find(|candidate| candidate.parsed_class_id() == Some(class_id))
                        .map(|candidate| candidate.similarity_score as f32)
                        .unwrap_or(0.0);
                    bucket.push(score);
                }
            } else {
                let top = candidate_list
                    .first()
                    .map(|c| c.similarity_score as f32)
                    .ok_or_else(|| HarnessError::Data("empty candidate list for non-mate query".into()))?;
                matches_false.push(top);
            }

            queries += 1;
        }
    }

    tracing::info!(queries, skipped, "identifyTemplate done");
    if let Some(average) = timer.average() {
        tracing::info!(?average, "identifyTemplate average time");
    }
    if options.extra_timings {
        let info = timer.extended_info(options.percentile);
        tracing::info!(?info, "identifyTemplate extended timing");
    }

    write_score_vector(&out_dir.join("matches_false.bin"), &matches_false)?;
    for (i, (rank, scores)) in rank_buckets.iter().enumerate() {
        let is_last = i == rank_buckets.len() - 1;
        let filename = if is_last { "matches_true.bin".to_string() } else { format!("matches_true_r{rank}.bin") };
        write_score_vector(&out_dir.join(filename), scores)?;
    }

    Ok(SearchReport { queries, skipped })
}

fn run_one_query(
    desc: &DescriptorRecord,
    nearest_count: u32,
    identify: &(dyn Fn(&[u8], u32, &mut Vec<Candidate>, &mut bool) -> EngineStatus + Sync),
    timer: &mut Timer,
    skipped: &mut usize,
) -> Result<(i32, Vec<Candidate>, bool), HarnessError> {
    if desc.label == 0 {
        return Err(HarnessError::Data("cannot search: found image without a label".into()));
    }

    if desc.is_refused() {
        *skipped += 1;
        let stub = Candidate { assigned: true, template_id: "none".to_string(), similarity_score: 0.0 };
        return Ok((desc.class_id(), vec![stub; nearest_count as usize], false));
    }

    let mut candidate_list = Vec::new();
    let mut decision = false;
    timer.start();
    let status = identify(&desc.payload, nearest_count, &mut candidate_list, &mut decision);
    timer.stop();

    if !status.is_success() {
        return Err(HarnessError::Engine { code: status.code, context: format!("identifyTemplate failed: {}", status.info) });
    }

    Ok((desc.class_id(), candidate_list, decision))
}

/// Insert every record from the insert list, naming each gallery entry
/// `"<db_size + seq>_<class_id>"`. `seq` starts at zero per call (an
/// instance-scoped counter, not a process-wide static — see the design
/// notes on why the original's `static size_t counter_st` was dropped).
pub fn insert(
    insert_path: &Path,
    db_path: &Path,
    desc_size: usize,
    insert_fn: &mut (dyn FnMut(&[u8], &str) -> EngineStatus),
) -> Result<usize, HarnessError> {
    let insert_records = read_descriptors(insert_path, desc_size)?;
    let db_records = read_descriptors(db_path, desc_size)?;
    let db_size = db_records.len();

    for (seq, record) in insert_records.iter().enumerate() {
        let id = format!("{}_{}", db_size + seq, record.class_id());
        let status = insert_fn(&record.payload, &id);
        if !status.is_success() {
            return Err(HarnessError::Engine { code: status.code, context: format!("galleryInsertID failed for id {id}: {}", status.info) });
        }
    }

    tracing::info!(inserted = insert_records.len(), base_size = db_size + insert_records.len(), "galleryInsertID done");
    Ok(insert_records.len())
}

/// Delete every id named in `remove_path` (one whitespace-separated token
/// per line).
pub fn remove(remove_path: &Path, remove_fn: &mut (dyn FnMut(&str) -> EngineStatus)) -> Result<usize, HarnessError> {
    let contents = std::fs::read_to_string(remove_path)?;
    let ids: Vec<&str> = contents.split_whitespace().collect();

    for id in &ids {
        let status = remove_fn(id);
        if !status.is_success() {
            return Err(HarnessError::Engine { code: status.code, context: format!("galleryDeleteID failed for id {id}: {}", status.info) });
        }
    }

    tracing::info!(removed = ids.len(), "galleryDeleteID done");
    Ok(ids.len())
}

/// Run the TPIR pass: for each rank in `{0 (general), 1, 5, 20, ...}`,
/// read its `matches_true[_r<rank>].bin` against the shared
/// `matches_false.bin` and write a `tpirs[_r<rank>].txt` report.
pub fn tpir(out_dir: &Path, ranks: &[u32], fpirs: &[u32]) -> Result<(), HarnessError> {
    let matches_false = out_dir.join("matches_false.bin");

    for &rank in ranks {
        let postfix = if rank == 0 { String::new() } else { format!("_r{rank}") };
        let matches_true_path = out_dir.join(format!("matches_true{postfix}.bin"));

        let matches_true = read_score_vector(&matches_true_path)?;
        let mut matches_false_vec = read_score_vector(&matches_false)?;

        let tpirs = fast_roc(&matches_true, &mut matches_false_vec, fpirs);
        let report_path = out_dir.join(format!("tpirs{postfix}.txt"));
        write_report(&report_path, fpirs, &tpirs, Some(rank_prefix(rank)))?;
    }

    Ok(())
}
