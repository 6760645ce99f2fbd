//! Compiled-in canonical stream header.
//!
//! Every JPEG XE canonical raw event stream starts with a fixed byte
//! prefix: 11 header bytes, one field-descriptor count byte, and one
//! 4-byte descriptor per field (kind, field code, bit width, reserved).
//! The codec treats the whole sequence as opaque: it is written verbatim
//! by the encoder and compared byte-exact by the decoder, with no
//! interpretation of descriptor contents.

/// Length of the fixed header prefix in bytes.
pub const HEADER_PREFIX_BYTES: usize = 11;

/// Length of one field descriptor in bytes.
pub const FIELD_DESCRIPTOR_BYTES: usize = 4;

/// Hex rendering of the reference canonical header.
///
/// This is the normative constant: header validation hex-renders the
/// consumed stream bytes and compares the result against this string.
pub const REFERENCE_HEADER_HEX: &str = concat!(
    "4a5045475845", // "JPEGXE"
    "0100",         // format version 1.0
    "30",           // event word size: 48 bits
    "02",           // event-type discriminant: 2 bits
    "00",           // reserved
    "09",           // field-descriptor count
    "00121700",     // CD: relative timestamp, 23 bits
    "00010100",     // CD: polarity, 1 bit
    "00020b00",     // CD: x coordinate, 11 bits
    "00030b00",     // CD: y coordinate, 11 bits
    "01121700",     // trigger: relative timestamp, 23 bits
    "01010100",     // trigger: polarity, 1 bit
    "01040800",     // trigger: id, 8 bits
    "01060e00",     // trigger: padding, 14 bits
    "02102e00",     // abs timestamp: value, 46 bits
);

/// Reference canonical header as raw bytes, decoded at compile time from
/// [`REFERENCE_HEADER_HEX`].
pub const REFERENCE_HEADER_BYTES: [u8; REFERENCE_HEADER_HEX.len() / 2] =
    parse_hex(REFERENCE_HEADER_HEX);

/// Number of field descriptors in the reference header.
pub const REFERENCE_FIELD_COUNT: usize =
    (REFERENCE_HEADER_BYTES.len() - HEADER_PREFIX_BYTES - 1) / FIELD_DESCRIPTOR_BYTES;

const fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => panic!("invalid hex digit in reference header constant"),
    }
}

const fn parse_hex<const N: usize>(hex: &str) -> [u8; N] {
    let digits = hex.as_bytes();
    assert!(digits.len() == 2 * N);
    let mut bytes = [0u8; N];
    let mut i = 0;
    while i < N {
        bytes[i] = (hex_digit(digits[2 * i]) << 4) | hex_digit(digits[2 * i + 1]);
        i += 1;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_header_shape() {
        assert_eq!(REFERENCE_HEADER_BYTES.len(), 48);
        assert_eq!(REFERENCE_FIELD_COUNT, 9);
        // The count byte itself must agree with the descriptor table size.
        assert_eq!(
            REFERENCE_HEADER_BYTES[HEADER_PREFIX_BYTES] as usize,
            REFERENCE_FIELD_COUNT
        );
    }

    #[test]
    fn test_header_bytes_match_hex() {
        let mut rendered = String::new();
        for byte in REFERENCE_HEADER_BYTES {
            write!(rendered, "{byte:02x}").unwrap();
        }
        assert_eq!(rendered, REFERENCE_HEADER_HEX);
    }

    #[test]
    fn test_header_magic() {
        assert_eq!(&REFERENCE_HEADER_BYTES[..6], b"JPEGXE");
    }
}
