//! The two matching drivers: all-pairs verification and N×M
//! identification. Both consume descriptor files produced by
//! [`crate::extractor`] and persist raw score vectors for [`crate::metric`].

pub mod ident;
pub mod verif;

use crate::error::HarnessError;

/// Sanity-check a score vector's median against a configured `[lo, hi]`
/// band using `select_nth_unstable` (matching the original's `nth_element`
/// median check) rather than a full sort. Guards against silent engine
/// breakage: an engine that starts always returning ~0 similarity, say,
/// would otherwise only show up downstream in the ROC curve.
pub fn check_median_in_range(values: &mut [f32], range: (f32, f32)) -> Result<(), HarnessError> {
    if values.is_empty() {
        return Err(HarnessError::Sanity("cannot compute median of an empty score vector".into()));
    }
    let pos = values.len() / 2;
    values.select_nth_unstable_by(pos, |a, b| a.partial_cmp(b).unwrap());
    let median = values[pos];

    if median < range.0 || median > range.1 {
        return Err(HarnessError::Sanity(format!(
            "similarity median out of range: {:.2} <= {:.2} <= {:.2} failed",
            range.0, median, range.1
        )));
    }
    Ok(())
}
