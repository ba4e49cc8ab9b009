#[cfg(test)]
mod tests {
    use crate::iter::Iter;
    use crate::keys::{LookupKey, MAX_SEQUENCE, ValueType, split_internal_key};
    use crate::memtable::MemTable;

    /// Collects `(user_key, seq, type, value)` tuples by walking forward.
    fn collect_forward(mem: &MemTable) -> Vec<(Vec<u8>, u64, ValueType, Vec<u8>)> {
        let mut out = Vec::new();
        let mut iter = mem.iter();
        iter.seek_to_first();
        while iter.valid() {
            let (user, seq, vt) = split_internal_key(iter.key()).unwrap();
            out.push((user.to_vec(), seq, vt, iter.value().to_vec()));
            iter.next();
        }
        out
    }

    #[test]
    fn test_fresh_iterator_is_invalid() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"a", b"1").unwrap();
        let iter = mem.iter();
        assert!(!iter.valid());
    }

    #[test]
    fn test_forward_order_is_user_asc_seq_desc() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"b", b"b1").unwrap();
        mem.insert(3, ValueType::Value, b"a", b"a3").unwrap();
        mem.insert(2, ValueType::Value, b"a", b"a2").unwrap();
        mem.insert(4, ValueType::Deletion, b"b", b"").unwrap();

        let entries = collect_forward(&mem);
        let shape: Vec<(&[u8], u64, ValueType)> = vec![
            (b"a", 3, ValueType::Value),
            (b"a", 2, ValueType::Value),
            (b"b", 4, ValueType::Deletion),
            (b"b", 1, ValueType::Value),
        ];
        assert_eq!(entries.len(), shape.len());
        for ((user, seq, vt, _), (want_user, want_seq, want_vt)) in entries.iter().zip(shape) {
            assert_eq!(user.as_slice(), want_user);
            assert_eq!(*seq, want_seq);
            assert_eq!(*vt, want_vt);
        }
    }

    #[test]
    fn test_backward_walk_mirrors_forward() {
        let mut mem = MemTable::new();
        for (seq, key) in [(1u64, "m"), (2, "c"), (3, "x"), (4, "c"), (5, "a")] {
            mem.insert(seq, ValueType::Value, key.as_bytes(), b"v")
                .unwrap();
        }

        let forward = collect_forward(&mem);

        let mut backward = Vec::new();
        let mut iter = mem.iter();
        iter.seek_to_last();
        while iter.valid() {
            let (user, seq, vt) = split_internal_key(iter.key()).unwrap();
            backward.push((user.to_vec(), seq, vt, iter.value().to_vec()));
            iter.prev();
        }
        backward.reverse();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_seek_lands_on_newest_version() {
        let mut mem = MemTable::new();
        mem.insert(10, ValueType::Value, b"k", b"v10").unwrap();
        mem.insert(20, ValueType::Value, b"k", b"v20").unwrap();
        mem.insert(30, ValueType::Value, b"k", b"v30").unwrap();

        let lookup = LookupKey::new(b"k", MAX_SEQUENCE);
        let mut iter = mem.iter();
        iter.seek_lookup(&lookup);
        assert!(iter.valid());
        let (user, seq, _) = split_internal_key(iter.key()).unwrap();
        assert_eq!(user, b"k");
        assert_eq!(seq, 30);
        assert_eq!(iter.value(), b"v30");

        iter.next();
        let (_, seq, _) = split_internal_key(iter.key()).unwrap();
        assert_eq!(seq, 20);
    }

    #[test]
    fn test_seek_past_everything_is_invalid() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"a", b"1").unwrap();

        let lookup = LookupKey::new(b"zzz", MAX_SEQUENCE);
        let mut iter = mem.iter();
        iter.seek_lookup(&lookup);
        assert!(!iter.valid());
    }

    #[test]
    fn test_seek_between_user_keys() {
        let mut mem = MemTable::new();
        mem.insert(1, ValueType::Value, b"alpha", b"1").unwrap();
        mem.insert(2, ValueType::Value, b"gamma", b"2").unwrap();

        let lookup = LookupKey::new(b"beta", MAX_SEQUENCE);
        let mut iter = mem.iter();
        iter.seek_lookup(&lookup);
        assert!(iter.valid());
        let (user, _, _) = split_internal_key(iter.key()).unwrap();
        assert_eq!(user, b"gamma");
    }
}
