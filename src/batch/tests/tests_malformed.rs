#[cfg(test)]
mod tests {
    use crate::batch::{BatchError, BatchHandler, WriteBatch};

    struct Sink;

    impl BatchHandler for Sink {
        fn put(&mut self, _key: &[u8], _value: &[u8]) {}
        fn delete(&mut self, _key: &[u8]) {}
    }

    #[test]
    fn test_header_shorter_than_twelve_bytes() {
        let err = WriteBatch::from_contents(vec![0; 11]).unwrap_err();
        assert!(matches!(err, BatchError::Malformed(_)));
    }

    #[test]
    fn test_count_larger_than_body() {
        let mut batch = WriteBatch::new();
        batch.put(b"key", b"value");

        // Bump the declared count without adding an operation.
        let mut bytes = batch.contents().to_vec();
        bytes[11] = 2;
        let tampered = WriteBatch::from_contents(bytes).unwrap();

        let err = tampered.iterate(&mut Sink).unwrap_err();
        assert!(matches!(err, BatchError::Malformed(_)));
    }

    #[test]
    fn test_truncated_value() {
        let mut batch = WriteBatch::new();
        batch.put(b"key", b"a value long enough to truncate");

        let mut bytes = batch.contents().to_vec();
        bytes.truncate(bytes.len() - 5);
        let tampered = WriteBatch::from_contents(bytes).unwrap();

        let err = tampered.iterate(&mut Sink).unwrap_err();
        assert!(matches!(err, BatchError::Malformed(_)));
    }

    #[test]
    fn test_unknown_operation_tag() {
        let mut batch = WriteBatch::new();
        batch.delete(b"key");

        let mut bytes = batch.contents().to_vec();
        bytes[12] = 0x7E; // first operation tag
        let tampered = WriteBatch::from_contents(bytes).unwrap();

        let err = tampered.iterate(&mut Sink).unwrap_err();
        match err {
            BatchError::Malformed(msg) => assert!(msg.contains("unknown operation tag")),
        }
    }
}
