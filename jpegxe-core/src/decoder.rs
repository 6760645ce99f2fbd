//! Decoding of JPEG XE canonical raw event streams.
//!
//! The free functions implement the individual decode operations: header
//! validation, word reads, type classification, and field unpacking.
//! [`XeDecoder`] wraps them into a stateful reader that mirrors the
//! encoder's time-base policy and yields fully resolved events.

use crate::header::{
    FIELD_DESCRIPTOR_BYTES, HEADER_PREFIX_BYTES, REFERENCE_FIELD_COUNT, REFERENCE_HEADER_HEX,
};
use crate::layout::{mask, FieldLayout};
use crate::types::{AbsTimestampEvent, CdEvent, Event, EventType, TriggerEvent};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{ErrorKind, Read};
use thiserror::Error;

/// Errors that can occur while decoding a stream.
///
/// Running out of input is not an error: it is reported as the soft
/// end-of-stream outcome of [`read_word`] and [`XeDecoder::next_event`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream header does not match the canonical reference header")]
    HeaderMismatch,

    #[error("unsupported event type tag {0:#x}")]
    UnsupportedEventType(u8),
}

fn push_hex(rendered: &mut String, bytes: &[u8]) {
    use std::fmt::Write;
    for byte in bytes {
        let _ = write!(rendered, "{byte:02x}");
    }
}

/// Reads `buf.len()` bytes and appends their hex rendering to `rendered`.
///
/// Returns `Ok(false)` if the stream ends before the segment is complete.
fn read_header_segment<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    rendered: &mut String,
) -> Result<bool, DecodeError> {
    match reader.read_exact(buf) {
        Ok(()) => {
            push_hex(rendered, buf);
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Validates the canonical header at the current stream position.
///
/// Consumes the fixed prefix, the field-descriptor count byte, and the
/// descriptor table, hex-rendering every consumed byte and comparing the
/// result against the compiled-in reference. Any mismatching byte, a
/// descriptor count differing from the reference, or a premature end of
/// stream yields `Ok(false)`. The check is all-or-nothing; callers must
/// not process a stream whose header failed to validate.
pub fn validate_header<R: Read>(reader: &mut R) -> Result<bool, DecodeError> {
    let mut rendered = String::with_capacity(REFERENCE_HEADER_HEX.len());

    let mut prefix = [0u8; HEADER_PREFIX_BYTES];
    if !read_header_segment(reader, &mut prefix, &mut rendered)? {
        return Ok(false);
    }

    let mut count = [0u8; 1];
    if !read_header_segment(reader, &mut count, &mut rendered)? {
        return Ok(false);
    }
    if count[0] as usize != REFERENCE_FIELD_COUNT {
        return Ok(false);
    }

    let mut descriptor = [0u8; FIELD_DESCRIPTOR_BYTES];
    for _ in 0..count[0] {
        if !read_header_segment(reader, &mut descriptor, &mut rendered)? {
            return Ok(false);
        }
    }

    Ok(rendered == REFERENCE_HEADER_HEX)
}

/// Reads the next encoded event word from the stream.
///
/// Words are `layout.word_bytes` bytes long, big-endian. Returns
/// `Ok(None)` when the stream has too few bytes left for a full word.
pub fn read_word<R: Read>(reader: &mut R, layout: &FieldLayout) -> Result<Option<u64>, DecodeError> {
    debug_assert!(layout.word_bits <= 64 && layout.word_bits % 8 == 0);
    match reader.read_uint::<BigEndian>(layout.word_bytes as usize) {
        Ok(word) => Ok(Some(word)),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Classifies an encoded word by its type discriminant bits.
pub fn decode_type(word: u64, layout: &FieldLayout) -> Result<EventType, DecodeError> {
    let tag = (word & mask(layout.type_bits)) as u8;
    EventType::from_u8(tag).ok_or(DecodeError::UnsupportedEventType(tag))
}

/// Decodes the timestamp field of an encoded word.
///
/// For absolute-timestamp events this is the absolute value itself; for CD
/// and trigger events it is the relative offset from the active time base.
pub fn decode_timestamp(word: u64, layout: &FieldLayout) -> Result<u64, DecodeError> {
    let payload = word >> layout.type_bits;
    Ok(match decode_type(word, layout)? {
        EventType::AbsTimestamp => payload & mask(layout.abs.timestamp),
        EventType::Cd => payload & mask(layout.cd.relative_timestamp),
        EventType::Trigger => payload & mask(layout.trigger.relative_timestamp),
    })
}

/// Decodes a CD event word against the active absolute time base.
///
/// The word must have been classified as [`EventType::Cd`].
pub fn decode_cd(word: u64, abs_time_base: u64, layout: &FieldLayout) -> CdEvent {
    debug_assert!(matches!(decode_type(word, layout), Ok(EventType::Cd)));
    let mut rest = word >> layout.type_bits;
    let timestamp = abs_time_base + (rest & mask(layout.cd.relative_timestamp));
    rest >>= layout.cd.relative_timestamp;
    let polarity = (rest & mask(layout.cd.polarity)) as u8;
    rest >>= layout.cd.polarity;
    let x = (rest & mask(layout.cd.x)) as u16;
    rest >>= layout.cd.x;
    let y = (rest & mask(layout.cd.y)) as u16;
    CdEvent {
        x,
        y,
        polarity,
        timestamp,
    }
}

/// Decodes a trigger event word against the active absolute time base.
///
/// The word must have been classified as [`EventType::Trigger`]. Padding
/// bits are never transmitted; the decoded padding field is always zero.
pub fn decode_trigger(word: u64, abs_time_base: u64, layout: &FieldLayout) -> TriggerEvent {
    debug_assert!(matches!(decode_type(word, layout), Ok(EventType::Trigger)));
    let mut rest = word >> layout.type_bits;
    let timestamp = abs_time_base + (rest & mask(layout.trigger.relative_timestamp));
    rest >>= layout.trigger.relative_timestamp;
    let polarity = (rest & mask(layout.trigger.polarity)) as u8;
    rest >>= layout.trigger.polarity;
    let id = (rest & mask(layout.trigger.id)) as u8;
    TriggerEvent {
        polarity,
        id,
        padding: 0,
        timestamp,
    }
}

/// Stateful reader over one canonical stream.
///
/// Validates the header at construction, then reads one word per call to
/// [`next_event`](Self::next_event), maintaining the absolute-time-base
/// cursor so that returned CD and trigger events carry fully resolved
/// timestamps. One reader owns one stream's cursor; concurrent streams
/// need independent readers.
#[derive(Debug)]
pub struct XeDecoder<R> {
    reader: R,
    layout: FieldLayout,
    time_base: u64,
}

impl<R: Read> XeDecoder<R> {
    /// Validates the canonical header and constructs a reader positioned
    /// at the first event word.
    pub fn new(mut reader: R, layout: FieldLayout) -> Result<Self, DecodeError> {
        if !validate_header(&mut reader)? {
            return Err(DecodeError::HeaderMismatch);
        }
        Ok(Self {
            reader,
            layout,
            time_base: 0,
        })
    }

    /// The active absolute time base.
    pub fn time_base(&self) -> u64 {
        self.time_base
    }

    /// The field layout this reader decodes with.
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Reads, classifies, and decodes the next event.
    ///
    /// Absolute-timestamp events update the time base before being
    /// returned. `Ok(None)` signals end of stream.
    pub fn next_event(&mut self) -> Result<Option<Event>, DecodeError> {
        let word = match read_word(&mut self.reader, &self.layout)? {
            Some(word) => word,
            None => return Ok(None),
        };
        let event = match decode_type(word, &self.layout)? {
            EventType::AbsTimestamp => {
                let timestamp = decode_timestamp(word, &self.layout)?;
                self.time_base = timestamp;
                Event::AbsTimestamp(AbsTimestampEvent { timestamp })
            }
            EventType::Cd => Event::Cd(decode_cd(word, self.time_base, &self.layout)),
            EventType::Trigger => Event::Trigger(decode_trigger(word, self.time_base, &self.layout)),
        };
        Ok(Some(event))
    }

    /// Consumes the reader and returns the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::REFERENCE_HEADER_BYTES;
    use std::io::Cursor;

    fn cd_word(relative: u64, polarity: u64, x: u64, y: u64) -> u64 {
        let mut word = y;
        word = (word << 11) | x;
        word = (word << 1) | polarity;
        word = (word << 23) | relative;
        (word << 2) | EventType::Cd as u64
    }

    fn trigger_word(relative: u64, polarity: u64, id: u64) -> u64 {
        let mut word = id;
        word = (word << 1) | polarity;
        word = (word << 23) | relative;
        (word << 2) | EventType::Trigger as u64
    }

    #[test]
    fn test_decode_type_exhaustive() {
        let layout = FieldLayout::reference();
        assert!(matches!(decode_type(0b00, &layout), Ok(EventType::Cd)));
        assert!(matches!(decode_type(0b01, &layout), Ok(EventType::Trigger)));
        assert!(matches!(
            decode_type(0b10, &layout),
            Ok(EventType::AbsTimestamp)
        ));
        assert!(matches!(
            decode_type(0b11, &layout),
            Err(DecodeError::UnsupportedEventType(0x3))
        ));
        // Only the low discriminant bits participate in classification.
        assert!(matches!(
            decode_type(0xFFFF_FFFF_FF00 | 0b01, &layout),
            Ok(EventType::Trigger)
        ));
    }

    #[test]
    fn test_decode_cd_fields() {
        let layout = FieldLayout::reference();
        let word = cd_word(100, 1, 5, 7);
        let event = decode_cd(word, 0, &layout);
        assert_eq!(event, CdEvent::new(5, 7, 1, 100));

        // A non-zero base shifts the resolved timestamp only.
        let event = decode_cd(word, 8_388_608, &layout);
        assert_eq!(event, CdEvent::new(5, 7, 1, 8_388_708));
    }

    #[test]
    fn test_decode_cd_extreme_fields() {
        let layout = FieldLayout::reference();
        let word = cd_word((1 << 23) - 1, 1, 2047, 2047);
        let event = decode_cd(word, 0, &layout);
        assert_eq!(event, CdEvent::new(2047, 2047, 1, (1 << 23) - 1));
    }

    #[test]
    fn test_decode_trigger_fields() {
        let layout = FieldLayout::reference();
        let word = trigger_word(611_392, 1, 42);
        let event = decode_trigger(word, 8_388_608, &layout);
        assert_eq!(event.polarity, 1);
        assert_eq!(event.id, 42);
        assert_eq!(event.padding, 0);
        assert_eq!(event.timestamp, 9_000_000);
    }

    #[test]
    fn test_decode_timestamp_per_kind() {
        let layout = FieldLayout::reference();
        assert_eq!(decode_timestamp(cd_word(100, 1, 5, 7), &layout).unwrap(), 100);
        assert_eq!(
            decode_timestamp(trigger_word(200, 0, 1), &layout).unwrap(),
            200
        );

        let abs_word = (8_388_608u64 << 2) | EventType::AbsTimestamp as u64;
        assert_eq!(decode_timestamp(abs_word, &layout).unwrap(), 8_388_608);

        assert!(matches!(
            decode_timestamp(0b11, &layout),
            Err(DecodeError::UnsupportedEventType(0x3))
        ));
    }

    #[test]
    fn test_read_word_big_endian() {
        let layout = FieldLayout::reference();
        let mut cursor = Cursor::new(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let word = read_word(&mut cursor, &layout).unwrap();
        assert_eq!(word, Some(0x0102_0304_0506));
    }

    #[test]
    fn test_read_word_end_of_stream() {
        let layout = FieldLayout::reference();

        let mut empty = Cursor::new(Vec::new());
        assert!(matches!(read_word(&mut empty, &layout), Ok(None)));

        // A partial word counts as stream exhaustion, not as data.
        let mut partial = Cursor::new(vec![0xAA, 0xBB, 0xCC]);
        assert!(matches!(read_word(&mut partial, &layout), Ok(None)));
    }

    #[test]
    fn test_validate_header_reference() {
        let mut cursor = Cursor::new(REFERENCE_HEADER_BYTES.to_vec());
        assert!(validate_header(&mut cursor).unwrap());
    }

    #[test]
    fn test_validate_header_rejects_any_flipped_bit() {
        for index in 0..REFERENCE_HEADER_BYTES.len() {
            let mut bytes = REFERENCE_HEADER_BYTES.to_vec();
            bytes[index] ^= 0x01;
            let mut cursor = Cursor::new(bytes);
            assert!(
                !validate_header(&mut cursor).unwrap(),
                "flipped bit in byte {index} must fail validation"
            );
        }
    }

    #[test]
    fn test_validate_header_rejects_truncation() {
        for len in 0..REFERENCE_HEADER_BYTES.len() {
            let mut cursor = Cursor::new(REFERENCE_HEADER_BYTES[..len].to_vec());
            assert!(
                !validate_header(&mut cursor).unwrap(),
                "header truncated to {len} bytes must fail validation"
            );
        }
    }

    #[test]
    fn test_validate_header_rejects_count_mismatch() {
        let mut bytes = REFERENCE_HEADER_BYTES.to_vec();
        bytes[HEADER_PREFIX_BYTES] = 3;
        let mut cursor = Cursor::new(bytes);
        assert!(!validate_header(&mut cursor).unwrap());
    }

    #[test]
    fn test_decoder_rejects_bad_header() {
        let mut bytes = REFERENCE_HEADER_BYTES.to_vec();
        bytes[0] ^= 0x80;
        let result = XeDecoder::new(Cursor::new(bytes), FieldLayout::reference());
        assert!(matches!(result, Err(DecodeError::HeaderMismatch)));
    }

    #[test]
    fn test_decoder_resolves_time_base() {
        let layout = FieldLayout::reference();
        let mut stream = REFERENCE_HEADER_BYTES.to_vec();
        let abs_word = (500u64 << 2) | EventType::AbsTimestamp as u64;
        for word in [abs_word, cd_word(100, 1, 5, 7)] {
            stream.extend_from_slice(&word.to_be_bytes()[2..]);
        }

        let mut decoder = XeDecoder::new(Cursor::new(stream), layout).unwrap();
        assert_eq!(decoder.time_base(), 0);

        let first = decoder.next_event().unwrap().unwrap();
        assert_eq!(
            first,
            Event::AbsTimestamp(AbsTimestampEvent { timestamp: 500 })
        );
        assert_eq!(decoder.time_base(), 500);

        let second = decoder.next_event().unwrap().unwrap();
        assert_eq!(second, Event::Cd(CdEvent::new(5, 7, 1, 600)));

        assert!(decoder.next_event().unwrap().is_none());
    }

    #[test]
    fn test_decoder_unsupported_tag_is_fatal() {
        let layout = FieldLayout::reference();
        let mut stream = REFERENCE_HEADER_BYTES.to_vec();
        stream.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x03]);

        let mut decoder = XeDecoder::new(Cursor::new(stream), layout).unwrap();
        assert!(matches!(
            decoder.next_event(),
            Err(DecodeError::UnsupportedEventType(0x3))
        ));
    }
}
