//! The text manifest that maps template ids to their byte offset inside
//! the descriptor file, so a matching stage can seek straight to a
//! template without re-reading the whole descriptor file.

use std::io::Write;
use std::path::Path;

use crate::error::HarnessError;
use crate::types::DescriptorRecord;

/// Write one `"<seq>_<class_id> <desc_size> <byte_offset>"` line per
/// non-refused record, in file order. Refused records (`label < 0`) are
/// skipped entirely; they have no stable byte offset worth indexing.
pub fn write_manifest(path: &Path, records: &[DescriptorRecord], desc_size: usize) -> Result<(), HarnessError> {
    let mut file = std::fs::File::create(path)?;
    let record_size = 4 + desc_size;

    for (seq, record) in records.iter().enumerate() {
        if record.is_refused() {
            continue;
        }
        let offset = 4 + seq * record_size;
        writeln!(file, "{}_{} {} {}", seq, record.class_id(), desc_size, offset)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(label: i32, size: usize) -> DescriptorRecord {
        DescriptorRecord { label, payload: vec![0; size] }
    }

    #[test]
    fn skips_refused_and_preserves_seq_based_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.txt");

        let records = vec![record(1, 4), record(-2, 4), record(3, 4)];
        write_manifest(&path, &records, 4).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0_1 4 4");
        // seq is the original file-order index, not the post-filter index.
        assert_eq!(lines[1], "2_3 4 20");
    }

    #[test]
    fn all_refused_yields_empty_manifest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.txt");
        let records = vec![record(-1, 4), record(-2, 4)];
        write_manifest(&path, &records, 4).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.is_empty());
    }
}
