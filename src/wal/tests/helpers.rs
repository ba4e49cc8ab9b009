use std::path::Path;

use crate::storage::{FileSequentialReader, FileWriter};
use crate::wal::{LogReader, LogWriter, Reporter, WalError};

/// A [`Reporter`] that records every corruption message for assertions.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub messages: Vec<String>,
}

impl Reporter for CollectingReporter {
    fn corruption(&mut self, err: &WalError) {
        self.messages.push(err.to_string());
    }
}

/// Opens a fresh log writer at `path`.
pub fn open_writer(path: &Path) -> LogWriter<FileWriter> {
    LogWriter::new(FileWriter::create(path).unwrap())
}

/// Opens a log reader over `path` with a collecting reporter.
pub fn open_reader(path: &Path) -> LogReader<FileSequentialReader, CollectingReporter> {
    LogReader::new(
        FileSequentialReader::open(path).unwrap(),
        CollectingReporter::default(),
    )
}

/// Serializes one physical record: `crc ‖ len ‖ type ‖ payload`.
///
/// `crc_override` substitutes a wrong checksum when set.
pub fn physical_record(record_type: u8, payload: &[u8], crc_override: Option<u32>) -> Vec<u8> {
    let crc = crc_override.unwrap_or_else(|| {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload);
        hasher.finalize()
    });
    let mut out = Vec::with_capacity(7 + payload.len());
    out.extend_from_slice(&crc.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.push(record_type);
    out.extend_from_slice(payload);
    out
}
