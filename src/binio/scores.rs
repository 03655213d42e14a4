//! Raw little-endian `f32` score vectors: the on-disk form of a stage's
//! mated or non-mated similarity scores, consumed directly by the
//! `fast_roc` kernel.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::HarnessError;

/// Write `scores` to `path` as raw little-endian `f32` values, truncating
/// any existing file. Used by both verification and identification
/// drivers to persist a stage's full score vector in one call, so
/// re-running a stage overwrites stale scores instead of appending to them.
pub fn write_score_vector(path: &Path, scores: &[f32]) -> Result<(), HarnessError> {
    let mut file = std::fs::OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
    for score in scores {
        file.write_all(&score.to_le_bytes())?;
    }
    Ok(())
}

/// Read an entire raw little-endian `f32` stream. The element count is
/// inferred from the file size; a trailing partial record is an error.
pub fn read_score_vector(path: &Path) -> Result<Vec<f32>, HarnessError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    if bytes.len() % 4 != 0 {
        return Err(HarnessError::Data(format!(
            "score file {} has a trailing partial record ({} bytes)",
            path.display(),
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect())
}
