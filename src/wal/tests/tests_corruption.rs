#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom, Write};

    use tempfile::TempDir;

    use crate::storage::{FileWriter, WritableFile};
    use crate::wal::tests::helpers::*;
    use crate::wal::{RecordType, WalError};

    /// Writes raw bytes as a complete log file.
    fn write_raw(path: &std::path::Path, bytes: &[u8]) {
        let mut writer = FileWriter::create(path).unwrap();
        writer.append(bytes).unwrap();
        writer.sync().unwrap();
    }

    #[test]
    fn test_unknown_record_type() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");
        write_raw(&path, &physical_record(0x05, b"payload", None));

        let mut reader = open_reader(&path);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, WalError::Corruption { .. }));
        assert!(err.to_string().contains("unknown record type"));
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("unknown record type"))
        );
    }

    #[test]
    fn test_full_record_while_in_fragment() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        let mut bytes = physical_record(RecordType::First as u8, b"head", None);
        bytes.extend_from_slice(&physical_record(RecordType::Full as u8, b"whole", None));
        write_raw(&path, &bytes);

        let mut reader = open_reader(&path);
        // The reader reports the sequence violation and recovers with the
        // FULL record's payload.
        assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"whole"[..]));
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("get full type record, but in_fragment"))
        );
    }

    #[test]
    fn test_checksum_mismatch() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");
        write_raw(
            &path,
            &physical_record(RecordType::Full as u8, b"payload", Some(0xDEAD_BEEF)),
        );

        let mut reader = open_reader(&path);
        let err = reader.read_record().unwrap_err();
        assert!(err.to_string().contains("checksum not equal"));
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("checksum not equal"))
        );
    }

    #[test]
    fn test_flipped_payload_byte_detected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        let mut writer = open_writer(&path);
        writer.add_record(b"stable payload").unwrap();
        writer.sync().unwrap();
        drop(writer);

        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(10)).unwrap(); // inside the payload
        file.write_all(&[0xFF]).unwrap();
        file.sync_all().unwrap();

        let mut reader = open_reader(&path);
        let err = reader.read_record().unwrap_err();
        assert!(err.to_string().contains("checksum not equal"));
    }

    #[test]
    fn test_middle_without_first_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        let mut bytes = physical_record(RecordType::Middle as u8, b"stray", None);
        bytes.extend_from_slice(&physical_record(RecordType::Full as u8, b"ok", None));
        write_raw(&path, &bytes);

        let mut reader = open_reader(&path);
        assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"ok"[..]));
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("get middle type record, but not in_fragment"))
        );
    }

    #[test]
    fn test_last_without_first_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        let mut bytes = physical_record(RecordType::Last as u8, b"stray", None);
        bytes.extend_from_slice(&physical_record(RecordType::Full as u8, b"ok", None));
        write_raw(&path, &bytes);

        let mut reader = open_reader(&path);
        assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"ok"[..]));
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("get last type record, but not in_fragment"))
        );
    }

    #[test]
    fn test_dangling_first_at_eof_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");
        write_raw(&path, &physical_record(RecordType::First as u8, b"head", None));

        let mut reader = open_reader(&path);
        assert_eq!(reader.read_record().unwrap(), None);
        assert!(
            reader
                .reporter()
                .messages
                .iter()
                .any(|m| m.contains("partial record without last fragment"))
        );
    }

    #[test]
    fn test_length_overrunning_block_remainder() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        // Header declares 512 payload bytes; only 4 follow.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&512u16.to_be_bytes());
        bytes.push(RecordType::Full as u8);
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        write_raw(&path, &bytes);

        let mut reader = open_reader(&path);
        let err = reader.read_record().unwrap_err();
        assert!(err.to_string().contains("overruns block remainder"));
    }

    #[test]
    fn test_corruption_carries_offset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wal.log");

        let good = physical_record(RecordType::Full as u8, b"good", None);
        let offset = good.len() as u64;
        let mut bytes = good;
        bytes.extend_from_slice(&physical_record(0x09, b"bad", None));
        write_raw(&path, &bytes);

        let mut reader = open_reader(&path);
        assert_eq!(reader.read_record().unwrap().as_deref(), Some(&b"good"[..]));
        match reader.read_record().unwrap_err() {
            WalError::Corruption {
                offset: reported, ..
            } => assert_eq!(reported, offset),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
