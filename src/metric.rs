//! The `fast_roc` kernel: converts raw mated/non-mated score vectors into
//! TPR values at prescribed FPR decades using an amortized quickselect
//! instead of a full sort.

/// Compute TPR for each target FPR decade in `fprs` (interpreted as
/// `10^-fprs[i]`).
///
/// `matches_false` is mutated in place (partially partitioned by the
/// quickselect passes); `matches_true` is read-only. A target whose
/// implied rank `k = floor(matches_false.len() * 10^-fpr)` is zero is
/// unattainable at this corpus size and reports `None`.
pub fn fast_roc(matches_true: &[f32], matches_false: &mut [f32], fprs: &[u32]) -> Vec<Option<f64>> {
    let mut order: Vec<usize> = (0..fprs.len()).collect();
    order.sort_by_key(|&id| fprs[id]);

    let mut thresholds: Vec<Option<f32>> = vec![None; fprs.len()];
    let mut prev_k: usize = 0;

    for &id in &order {
        let k = ((matches_false.len() as f64) * 10f64.powi(-(fprs[id] as i32))) as usize;

        if k == 0 {
            continue;
        }

        let end = if prev_k > 0 { prev_k - 1 } else { matches_false.len() };
        let range = &mut matches_false[..end];
        // k-th largest == (k-1)-th smallest when compared with `>` reversed;
        // select_nth_unstable_by partitions ascending, so compare descending.
        range.select_nth_unstable_by(k - 1, |a, b| b.partial_cmp(a).unwrap());
        thresholds[id] = Some(matches_false[k - 1]);

        prev_k = k;
    }

    let mut counters = vec![0usize; fprs.len()];
    for &score in matches_true {
        for (i, threshold) in thresholds.iter().enumerate() {
            if let Some(t) = threshold {
                if score > *t {
                    counters[i] += 1;
                }
            }
        }
    }

    let true_count = matches_true.len() as f64;
    thresholds
        .iter()
        .zip(counters.iter())
        .map(|(threshold, &count)| threshold.map(|_| count as f64 / true_count))
        .collect()
}
