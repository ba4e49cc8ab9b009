#[cfg(test)]
mod tests {
    use crate::encoding::{
        EncodingError, decode_fixed32_be, decode_fixed64_be, put_fixed32_be, put_fixed64_be,
    };

    #[test]
    fn test_fixed32_roundtrip_is_big_endian() {
        let mut buf = Vec::new();
        put_fixed32_be(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decode_fixed32_be(&buf).unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_fixed64_roundtrip_is_big_endian() {
        let mut buf = Vec::new();
        put_fixed64_be(&mut buf, 0xDB47_7524_8B80_FB57);
        assert_eq!(buf[0], 0xDB);
        assert_eq!(buf[7], 0x57);
        assert_eq!(decode_fixed64_be(&buf).unwrap(), 0xDB47_7524_8B80_FB57);
    }

    #[test]
    fn test_short_buffers_rejected() {
        assert!(matches!(
            decode_fixed32_be(&[1, 2, 3]),
            Err(EncodingError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode_fixed64_be(&[0; 7]),
            Err(EncodingError::UnexpectedEof { .. })
        ));
    }
}
