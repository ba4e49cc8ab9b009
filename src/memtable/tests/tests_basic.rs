#[cfg(test)]
mod tests {
    use crate::keys::ValueType;
    use crate::memtable::{MemTable, MemtableError};

    #[test]
    fn test_get_on_empty_table() {
        let mem = MemTable::new();
        assert_eq!(mem.get(b"anything"), None);
        assert!(mem.is_empty());
        assert_eq!(mem.len(), 0);
    }

    #[test]
    fn test_put_then_get() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"foo", b"bar").unwrap();
        assert_eq!(mem.get(b"foo"), Some(&b"bar"[..]));
        assert_eq!(mem.get(b"fo"), None);
        assert_eq!(mem.get(b"foo\0"), None);
    }

    #[test]
    fn test_delete_then_reinsert_visibility() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"foo", b"bar").unwrap();
        mem.insert(2, ValueType::Deletion, b"foo", b"").unwrap();
        assert_eq!(mem.get(b"foo"), None, "tombstone hides the older put");

        mem.insert(3, ValueType::Value, b"foo", b"baz").unwrap();
        assert_eq!(mem.get(b"foo"), Some(&b"baz"[..]));
    }

    #[test]
    fn test_newest_sequence_wins() {
        let mut mem = MemTable::new();
        // Insert out of sequence order; visibility is by sequence, not by
        // insertion order.
        mem.insert(5, ValueType::Value, b"k", b"v5").unwrap();
        mem.insert(2, ValueType::Value, b"k", b"v2").unwrap();
        mem.insert(9, ValueType::Value, b"k", b"v9").unwrap();
        assert_eq!(mem.get(b"k"), Some(&b"v9"[..]));
        assert_eq!(mem.len(), 3, "all versions are retained");
    }

    #[test]
    fn test_duplicate_internal_key_rejected() {
        let mut mem = MemTable::new();
        mem.insert(7, ValueType::Value, b"dup", b"a").unwrap();
        let err = mem
            .insert(7, ValueType::Value, b"dup", b"different value")
            .unwrap_err();
        assert_eq!(err, MemtableError::Duplicate { sequence: 7 });

        // Same sequence but different type packs a different tag.
        mem.insert(7, ValueType::Deletion, b"dup", b"").unwrap();
        // The deletion at the same sequence is older in tag order than the
        // put, so the put still wins.
        assert_eq!(mem.get(b"dup"), Some(&b"a"[..]));
    }

    #[test]
    fn test_keys_sharing_prefixes_stay_separate() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"app", b"1").unwrap();
        mem.insert(2, ValueType::Value, b"apple", b"2").unwrap();
        mem.insert(3, ValueType::Deletion, b"app", b"").unwrap();

        assert_eq!(mem.get(b"app"), None);
        assert_eq!(mem.get(b"apple"), Some(&b"2"[..]));
    }

    #[test]
    fn test_empty_user_key_and_value() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"", b"empty-key").unwrap();
        mem.insert(2, ValueType::Value, b"empty-value", b"").unwrap();
        assert_eq!(mem.get(b""), Some(&b"empty-key"[..]));
        assert_eq!(mem.get(b"empty-value"), Some(&b""[..]));
    }

    #[test]
    fn test_memory_usage_grows() {
        let mut mem = MemTable::new();
        let before = mem.approximate_memory_usage();
        mem.insert(1, ValueType::Value, b"some key", &[0u8; 1024])
            .unwrap();
        assert!(mem.approximate_memory_usage() >= before + 1024);
    }

    #[test]
    fn test_many_keys() {
        let mut mem = MemTable::new();
        for i in 0..1000u32 {
            let key = format!("key-{i:05}");
            let value = format!("value-{i}");
            mem.insert(u64::from(i) + 1, ValueType::Value, key.as_bytes(), value.as_bytes())
                .unwrap();
        }
        for i in (0..1000u32).step_by(37) {
            let key = format!("key-{i:05}");
            let expected = format!("value-{i}");
            assert_eq!(mem.get(key.as_bytes()), Some(expected.as_bytes()));
        }
        assert_eq!(mem.get(b"key-99999"), None);
    }
}
