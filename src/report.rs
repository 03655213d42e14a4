//! Plain-text ROC / TPIR report writer shared by both drivers.

use std::io::Write;
use std::path::Path;

use crate::error::HarnessError;

/// Write one `"<-fpr> <tpr|none>"` line per entry. `prefix`, when given,
/// is written as its own leading line (`"Rank <r>:"` / `"General:"` for
/// TPIR reports; plain ROC reports pass `None`).
pub fn write_report(path: &Path, fprs: &[u32], tprs: &[Option<f64>], prefix: Option<String>) -> Result<(), HarnessError> {
    if fprs.len() != tprs.len() {
        return Err(HarnessError::Data("fprs/tprs length mismatch".into()));
    }

    let mut file = std::fs::File::create(path)?;
    if let Some(prefix) = prefix {
        writeln!(file, "{prefix}")?;
    }

    for (fpr, tpr) in fprs.iter().zip(tprs.iter()) {
        let tpr_str = match tpr {
            Some(value) => format!("{value:.3}"),
            None => "none".to_string(),
        };
        writeln!(file, "-{fpr} {tpr_str}")?;
    }

    Ok(())
}

/// `"Rank <r>:"` for `r>0`, `"General:"` for `r==0`.
pub fn rank_prefix(rank: u32) -> String {
    if rank == 0 {
        "General:".to_string()
    } else {
        format!("Rank {rank}:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_sentinel_and_value_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roc.txt");
        write_report(&path, &[4, 5], &[None, Some(0.5)], None).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "-4 none\n-5 0.500\n");
    }

    #[test]
    fn tpir_report_has_rank_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tpir_r1.txt");
        write_report(&path, &[1], &[Some(0.9)], Some(rank_prefix(1))).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Rank 1:\n-1 0.900\n");
    }

    #[test]
    fn general_rank_zero_prefix() {
        assert_eq!(rank_prefix(0), "General:");
    }
}
