//! The fixed-record descriptor file: `(label: i32 LE, payload: [u8; D])`
//! repeated back to back, and the mutex-guarded write-back protocol used
//! by parallel extraction workers.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::HarnessError;
use crate::types::DescriptorRecord;

/// Pre-create (or truncate) the descriptor file at its final total size so
/// every worker can later open it for random-access update without
/// racing on file creation.
pub fn preallocate(path: &Path, total_records: usize, desc_size: usize) -> Result<(), HarnessError> {
    let total_len = (total_records * (4 + desc_size)) as u64;
    let file = File::create(path)?;
    file.set_len(total_len)?;
    Ok(())
}

/// Auxiliary per-bucket log lines appended alongside a descriptor write,
/// all under the same lock (debug info, extra extraction info, failed
/// detections).
#[derive(Default)]
pub struct AuxLogs<'a> {
    pub debug_lines: &'a [String],
    pub extra_lines: &'a [String],
    pub fail_lines: &'a [String],
}

/// Coordinates mutex-guarded writes into a shared descriptor file plus its
/// appended auxiliary logs. One instance is shared (via `Arc`) across all
/// extraction worker threads for a single `Extractor::run` call.
pub struct DescriptorWriter {
    desc_path: std::path::PathBuf,
    debug_path: std::path::PathBuf,
    extra_path: std::path::PathBuf,
    fail_path: std::path::PathBuf,
    lock: Mutex<()>,
}

impl DescriptorWriter {
    pub fn new(
        desc_path: impl Into<std::path::PathBuf>,
        debug_path: impl Into<std::path::PathBuf>,
        extra_path: impl Into<std::path::PathBuf>,
        fail_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        DescriptorWriter {
            desc_path: desc_path.into(),
            debug_path: debug_path.into(),
            extra_path: extra_path.into(),
            fail_path: fail_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Write one worker's bucket of records at `byte_offset`, then append
    /// its auxiliary log lines, all while holding the shared lock. A
    /// poisoned lock (a peer worker panicked mid-write) is treated as a
    /// fatal worker failure rather than silently ignored.
    pub fn commit(
        &self,
        byte_offset: u64,
        records: &[DescriptorRecord],
        aux: AuxLogs<'_>,
    ) -> Result<(), HarnessError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| HarnessError::Data("descriptor write mutex poisoned".into()))?;

        let mut file = OpenOptions::new().write(true).open(&self.desc_path)?;
        file.seek(SeekFrom::Start(byte_offset))?;
        for record in records {
            file.write_all(&record.label.to_le_bytes())?;
            file.write_all(&record.payload)?;
        }

        append_lines(&self.fail_path, aux.fail_lines)?;
        append_lines(&self.debug_path, aux.debug_lines)?;
        append_lines(&self.extra_path, aux.extra_lines)?;

        Ok(())
    }
}

fn append_lines(path: &Path, lines: &[String]) -> Result<(), HarnessError> {
    if lines.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Convenience wrapper for tests and non-parallel callers: write a single
/// contiguous block of records starting at byte offset 0.
pub fn write_bucket(path: &Path, desc_size: usize, records: &[DescriptorRecord]) -> Result<(), HarnessError> {
    preallocate(path, records.len(), desc_size)?;
    let writer = DescriptorWriter::new(path, "/dev/null", "/dev/null", "/dev/null");
    writer.commit(0, records, AuxLogs::default())
}

/// Sequentially read every `(label, payload)` record until EOF. An empty
/// file is an error. Logs the refusal count (`label < 0`).
pub fn read_descriptors(path: &Path, desc_size: usize) -> Result<Vec<DescriptorRecord>, HarnessError> {
    let mut file = File::open(path)?;
    let mut records = Vec::new();
    let mut refusal_count = 0usize;

    loop {
        let mut label_bytes = [0u8; 4];
        match file.read_exact(&mut label_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let label = i32::from_le_bytes(label_bytes);

        let mut payload = vec![0u8; desc_size];
        file.read_exact(&mut payload)
            .map_err(|_| HarnessError::Data(format!("short read in descriptor file {}", path.display())))?;

        if label < 0 {
            refusal_count += 1;
        }

        records.push(DescriptorRecord { label, payload });
    }

    if records.is_empty() {
        return Err(HarnessError::Data(format!("empty descriptors file: {}", path.display())));
    }

    tracing::info!(
        path = %path.display(),
        count = records.len(),
        refusals = refusal_count,
        "descriptors read"
    );

    Ok(records)
}
