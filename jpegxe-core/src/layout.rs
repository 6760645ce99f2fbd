//! Field-width configuration for encoded event words.
//!
//! A [`FieldLayout`] describes how many bits each sub-field of each event
//! kind occupies inside a fixed-size word. The codec is generic over these
//! widths; only [`FieldLayout::reference`] is wired to the canonical header.

/// Sub-field bit widths of an absolute-timestamp event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsTimestampWidths {
    /// Absolute time-base value width
    pub timestamp: u8,
}

/// Sub-field bit widths of a CD event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdWidths {
    /// Relative timestamp width (shared with the trigger kind)
    pub relative_timestamp: u8,
    /// Polarity width
    pub polarity: u8,
    /// X coordinate width
    pub x: u8,
    /// Y coordinate width
    pub y: u8,
}

/// Sub-field bit widths of a trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerWidths {
    /// Relative timestamp width (shared with the CD kind)
    pub relative_timestamp: u8,
    /// Polarity width
    pub polarity: u8,
    /// Trigger channel ID width
    pub id: u8,
    /// Padding width. Padding bits are never transmitted and decode to zero.
    pub padding: u8,
}

/// Bit-level layout of encoded event words.
///
/// Invariants assumed by the codec:
/// - `word_bits` is a multiple of 8 and at most 64;
/// - for each event kind, `type_bits` plus the kind's sub-field widths do
///   not exceed `word_bits`;
/// - the CD and trigger relative-timestamp widths are identical (both kinds
///   share one absolute time base).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Total encoded word size in bits
    pub word_bits: u8,
    /// Total encoded word size in bytes (`word_bits / 8`)
    pub word_bytes: u8,
    /// Event-type discriminant width
    pub type_bits: u8,
    /// Absolute-timestamp event widths
    pub abs: AbsTimestampWidths,
    /// CD event widths
    pub cd: CdWidths,
    /// Trigger event widths
    pub trigger: TriggerWidths,
}

impl FieldLayout {
    /// Constructs the canonical reference layout.
    ///
    /// 48-bit words with a 2-bit type discriminant; a 46-bit absolute
    /// timestamp; a 23-bit relative timestamp shared by CD and trigger
    /// events; 1/11/11 bits of polarity/x/y for CD events and 1/8/14 bits
    /// of polarity/id/padding for trigger events.
    pub fn reference() -> Self {
        let word_bits = 48;
        Self {
            word_bits,
            word_bytes: word_bits / 8,
            type_bits: 2,
            abs: AbsTimestampWidths { timestamp: 46 },
            cd: CdWidths {
                relative_timestamp: 23,
                polarity: 1,
                x: 11,
                y: 11,
            },
            trigger: TriggerWidths {
                relative_timestamp: 23,
                polarity: 1,
                id: 8,
                padding: 14,
            },
        }
    }

    /// Maximum representable relative-timestamp span, `2^relative_timestamp`.
    ///
    /// The absolute time base always advances by whole multiples of this
    /// value.
    #[inline]
    pub fn relative_timestamp_span(&self) -> u64 {
        debug_assert_eq!(
            self.cd.relative_timestamp, self.trigger.relative_timestamp,
            "CD and trigger events share one time base"
        );
        1u64 << self.cd.relative_timestamp
    }
}

/// Mask selecting the low `bits` bits of a word. `bits` must be below 64.
#[inline]
pub(crate) const fn mask(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(1), 0x1);
        assert_eq!(mask(2), 0x3);
        assert_eq!(mask(23), 0x7F_FFFF);
        assert_eq!(mask(46), 0x3FFF_FFFF_FFFF);
    }

    #[test]
    fn test_reference_layout_widths() {
        let layout = FieldLayout::reference();
        assert_eq!(layout.word_bits, 48);
        assert_eq!(layout.word_bytes, 6);
        assert_eq!(layout.type_bits, 2);
        assert_eq!(layout.abs.timestamp, 46);
        assert_eq!(layout.cd.relative_timestamp, 23);
        assert_eq!(layout.trigger.relative_timestamp, 23);
    }

    #[test]
    fn test_reference_layout_fills_word() {
        let layout = FieldLayout::reference();

        // Every kind uses the full 48-bit word.
        assert_eq!(layout.type_bits + layout.abs.timestamp, layout.word_bits);
        assert_eq!(
            layout.type_bits
                + layout.cd.relative_timestamp
                + layout.cd.polarity
                + layout.cd.x
                + layout.cd.y,
            layout.word_bits
        );
        assert_eq!(
            layout.type_bits
                + layout.trigger.relative_timestamp
                + layout.trigger.polarity
                + layout.trigger.id
                + layout.trigger.padding,
            layout.word_bits
        );
    }

    #[test]
    fn test_relative_timestamp_span() {
        let layout = FieldLayout::reference();
        assert_eq!(layout.relative_timestamp_span(), 1 << 23);
        assert_eq!(layout.relative_timestamp_span(), 8_388_608);
    }
}
