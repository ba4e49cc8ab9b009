#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::storage::{
        FileSequentialReader, FileWriter, MmapReader, RandomReader, SequentialFile, StorageError,
        WritableFile,
    };

    #[test]
    fn test_write_then_sequential_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seq.bin");

        let mut writer = FileWriter::create(&path).unwrap();
        writer.append(b"hello ").unwrap();
        writer.append(b"world").unwrap();
        writer.sync().unwrap();

        let mut reader = FileSequentialReader::open(&path).unwrap();
        assert_eq!(reader.read(6).unwrap(), b"hello ");
        assert_eq!(reader.read(5).unwrap(), b"world");
        // Past end of file: short, then empty.
        assert_eq!(reader.read(16).unwrap(), b"");
    }

    #[test]
    fn test_sequential_read_short_at_eof() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("short.bin");

        let mut writer = FileWriter::create(&path).unwrap();
        writer.append(&[0xAB; 10]).unwrap();
        writer.sync().unwrap();

        let mut reader = FileSequentialReader::open(&path).unwrap();
        let chunk = reader.read(64).unwrap();
        assert_eq!(chunk, vec![0xAB; 10]);
    }

    #[test]
    fn test_mmap_read_at() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("random.bin");

        let mut writer = FileWriter::create(&path).unwrap();
        writer.append(b"0123456789").unwrap();
        writer.sync().unwrap();

        let reader = MmapReader::open(&path).unwrap();
        assert_eq!(reader.len(), 10);
        assert_eq!(reader.read_at(0, 4).unwrap(), b"0123");
        assert_eq!(reader.read_at(6, 4).unwrap(), b"6789");
        assert_eq!(reader.read_at(10, 0).unwrap(), b"");
    }

    #[test]
    fn test_mmap_read_past_eof() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bounds.bin");

        let mut writer = FileWriter::create(&path).unwrap();
        writer.append(b"abc").unwrap();
        writer.sync().unwrap();

        let reader = MmapReader::open(&path).unwrap();
        let err = reader.read_at(2, 5).unwrap_err();
        assert!(matches!(
            err,
            StorageError::OutOfBounds {
                offset: 2,
                requested: 5,
                file_len: 3
            }
        ));
        assert!(reader.read_at(u64::MAX, 1).is_err());
    }
}
