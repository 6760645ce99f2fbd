//! Encoding of JPEG XE canonical raw event streams.
//!
//! The free functions implement the individual encode operations: header
//! emission, word packing, time-base rollover, and word writes.
//! [`XeEncoder`] wraps them into a stateful writer that owns one stream's
//! absolute-time-base cursor.

use crate::header::REFERENCE_HEADER_BYTES;
use crate::layout::{mask, FieldLayout};
use crate::types::{CdEvent, EventType, TriggerEvent};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use thiserror::Error;

/// Errors that can occur while encoding a stream.
///
/// The non-I/O variants are caller contract violations; they are detected
/// before any byte is written, so a failed encode never emits a partial or
/// truncated word.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{field} overflow ({value} does not fit in {bits} bits)")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u8,
    },

    #[error("the event's timestamp ({timestamp}) precedes the absolute time base ({base})")]
    TimestampBeforeBase { timestamp: u64, base: u64 },
}

#[inline]
fn check_width(field: &'static str, value: u64, bits: u8) -> Result<(), EncodeError> {
    if value > mask(bits) {
        return Err(EncodeError::FieldOverflow { field, value, bits });
    }
    Ok(())
}

/// Encodes an absolute-timestamp event word.
pub fn encode_absts(abs_time_base: u64, layout: &FieldLayout) -> Result<u64, EncodeError> {
    check_width("absolute timestamp", abs_time_base, layout.abs.timestamp)?;
    Ok((abs_time_base << layout.type_bits) | EventType::AbsTimestamp as u64)
}

/// Encodes a CD event word against the given absolute time base.
///
/// The event's timestamp must be at least `abs_time_base`, and its offset
/// from the base, as well as every other sub-field value, must fit the
/// declared field width.
pub fn encode_cd(event: &CdEvent, abs_time_base: u64, layout: &FieldLayout) -> Result<u64, EncodeError> {
    if event.timestamp < abs_time_base {
        return Err(EncodeError::TimestampBeforeBase {
            timestamp: event.timestamp,
            base: abs_time_base,
        });
    }
    let relative = event.timestamp - abs_time_base;
    check_width("relative timestamp", relative, layout.cd.relative_timestamp)?;
    check_width("polarity", event.polarity as u64, layout.cd.polarity)?;
    check_width("x", event.x as u64, layout.cd.x)?;
    check_width("y", event.y as u64, layout.cd.y)?;

    let mut word = event.y as u64;
    word = (word << layout.cd.x) | event.x as u64;
    word = (word << layout.cd.polarity) | event.polarity as u64;
    word = (word << layout.cd.relative_timestamp) | relative;
    Ok((word << layout.type_bits) | EventType::Cd as u64)
}

/// Encodes a trigger event word against the given absolute time base.
///
/// The padding field occupies no encoded bits; its value is ignored.
pub fn encode_trigger(
    event: &TriggerEvent,
    abs_time_base: u64,
    layout: &FieldLayout,
) -> Result<u64, EncodeError> {
    if event.timestamp < abs_time_base {
        return Err(EncodeError::TimestampBeforeBase {
            timestamp: event.timestamp,
            base: abs_time_base,
        });
    }
    let relative = event.timestamp - abs_time_base;
    check_width(
        "relative timestamp",
        relative,
        layout.trigger.relative_timestamp,
    )?;
    check_width("polarity", event.polarity as u64, layout.trigger.polarity)?;
    check_width("trigger id", event.id as u64, layout.trigger.id)?;

    let mut word = event.id as u64;
    word = (word << layout.trigger.polarity) | event.polarity as u64;
    word = (word << layout.trigger.relative_timestamp) | relative;
    Ok((word << layout.type_bits) | EventType::Trigger as u64)
}

/// Advances the absolute time base until `next_timestamp` fits within the
/// relative-timestamp window.
///
/// The base moves in whole multiples of `2^relative_timestamp` bits, so it
/// always lands on the largest such multiple that keeps the next event's
/// offset representable, and never decreases. Returns whether the base
/// changed; when it did, the caller must emit one absolute-timestamp event
/// per span increment before the next record.
pub fn update_time_base(abs_time_base: &mut u64, next_timestamp: u64, layout: &FieldLayout) -> bool {
    let span = layout.relative_timestamp_span();
    let mut updated = false;
    while *abs_time_base + span <= next_timestamp {
        *abs_time_base += span;
        updated = true;
    }
    updated
}

/// Writes one encoded word to the stream as `layout.word_bytes` big-endian
/// bytes. Bits above `layout.word_bits` are not transmitted.
pub fn write_word<W: Write>(writer: &mut W, layout: &FieldLayout, word: u64) -> Result<(), EncodeError> {
    debug_assert!(layout.word_bits <= 64 && layout.word_bits % 8 == 0);
    let word = if layout.word_bits < 64 {
        word & mask(layout.word_bits)
    } else {
        word
    };
    writer.write_uint::<BigEndian>(word, layout.word_bytes as usize)?;
    Ok(())
}

/// Initializes a canonical stream.
///
/// Writes the reference header bytes verbatim, then one absolute-timestamp
/// event carrying the stream's initial time base, so every stream begins
/// with a resolvable time origin.
pub fn write_header<W: Write>(
    writer: &mut W,
    abs_time_base: u64,
    layout: &FieldLayout,
) -> Result<(), EncodeError> {
    let abs_word = encode_absts(abs_time_base, layout)?;
    writer.write_all(&REFERENCE_HEADER_BYTES)?;
    write_word(writer, layout, abs_word)
}

/// Writes one absolute-timestamp event per span increment between the old
/// and the new base. The new base, being the largest value emitted, must
/// be validated before anything is written.
fn write_base_increments<W: Write>(
    writer: &mut W,
    old_base: u64,
    new_base: u64,
    layout: &FieldLayout,
) -> Result<(), EncodeError> {
    encode_absts(new_base, layout)?;
    let span = layout.relative_timestamp_span();
    let mut base = old_base;
    while base < new_base {
        base += span;
        write_word(writer, layout, encode_absts(base, layout)?)?;
    }
    Ok(())
}

/// Encodes and writes a CD event, rolling the absolute time base forward
/// first if the event's timestamp falls outside the current window.
///
/// Each span increment of the base emits one absolute-timestamp event
/// before the CD word. All packing happens before any write, so a
/// rejected event leaves the stream untouched.
pub fn write_cd_event<W: Write>(
    event: &CdEvent,
    abs_time_base: &mut u64,
    layout: &FieldLayout,
    writer: &mut W,
) -> Result<(), EncodeError> {
    let mut new_base = *abs_time_base;
    let updated = update_time_base(&mut new_base, event.timestamp, layout);
    let word = encode_cd(event, new_base, layout)?;
    if updated {
        write_base_increments(writer, *abs_time_base, new_base, layout)?;
    }
    write_word(writer, layout, word)?;
    *abs_time_base = new_base;
    Ok(())
}

/// Encodes and writes a trigger event, rolling the absolute time base
/// forward first if the event's timestamp falls outside the current
/// window.
pub fn write_trigger_event<W: Write>(
    event: &TriggerEvent,
    abs_time_base: &mut u64,
    layout: &FieldLayout,
    writer: &mut W,
) -> Result<(), EncodeError> {
    let mut new_base = *abs_time_base;
    let updated = update_time_base(&mut new_base, event.timestamp, layout);
    let word = encode_trigger(event, new_base, layout)?;
    if updated {
        write_base_increments(writer, *abs_time_base, new_base, layout)?;
    }
    write_word(writer, layout, word)?;
    *abs_time_base = new_base;
    Ok(())
}

/// Stateful writer over one canonical stream.
///
/// Writes the header and the initial absolute-timestamp event at
/// construction, then packs events one call at a time, owning the stream's
/// absolute-time-base cursor. Input timestamps must be non-decreasing;
/// events are never reordered or buffered. One writer owns one stream's
/// cursor; concurrent streams need independent writers.
#[derive(Debug)]
pub struct XeEncoder<W: Write> {
    writer: W,
    layout: FieldLayout,
    time_base: u64,
}

impl<W: Write> XeEncoder<W> {
    /// Writes the canonical header and initial time-base event, and
    /// constructs a writer ready to accept events.
    pub fn new(mut writer: W, layout: FieldLayout, abs_time_base: u64) -> Result<Self, EncodeError> {
        write_header(&mut writer, abs_time_base, &layout)?;
        Ok(Self {
            writer,
            layout,
            time_base: abs_time_base,
        })
    }

    /// The active absolute time base.
    pub fn time_base(&self) -> u64 {
        self.time_base
    }

    /// The field layout this writer encodes with.
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Encodes and writes a CD event, rolling the time base if needed.
    pub fn write_cd(&mut self, event: &CdEvent) -> Result<(), EncodeError> {
        write_cd_event(event, &mut self.time_base, &self.layout, &mut self.writer)
    }

    /// Encodes and writes a trigger event, rolling the time base if needed.
    pub fn write_trigger(&mut self, event: &TriggerEvent) -> Result<(), EncodeError> {
        write_trigger_event(event, &mut self.time_base, &self.layout, &mut self.writer)
    }

    /// Consumes the writer and returns the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
