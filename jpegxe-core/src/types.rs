//! Core types for JPEG XE canonical raw event data.
//!
//! This module defines the decoded event records and the event-type
//! discriminant stored in the low-order bits of every encoded word.

/// A decoded Change Detection (CD) event.
///
/// CD events represent brightness changes detected by the event camera
/// sensor. The timestamp is fully resolved, i.e. the active absolute time
/// base has already been added to the relative field stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdEvent {
    /// X coordinate of the pixel
    pub x: u16,
    /// Y coordinate of the pixel
    pub y: u16,
    /// Event polarity: 0 = OFF (decrease), 1 = ON (increase in brightness)
    pub polarity: u8,
    /// Fully resolved timestamp
    pub timestamp: u64,
}

impl CdEvent {
    /// Creates a new CD event.
    #[inline]
    pub fn new(x: u16, y: u16, polarity: u8, timestamp: u64) -> Self {
        Self {
            x,
            y,
            polarity,
            timestamp,
        }
    }
}

/// An external trigger event.
///
/// Trigger events indicate that an edge (change of electrical state) was
/// detected on an external trigger signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Trigger edge polarity: 0 = falling edge, 1 = rising edge
    pub polarity: u8,
    /// Trigger channel ID
    pub id: u8,
    /// Padding field. Occupies no encoded bits and always decodes to zero.
    pub padding: u16,
    /// Fully resolved timestamp
    pub timestamp: u64,
}

impl TriggerEvent {
    /// Creates a new trigger event with zero padding.
    #[inline]
    pub fn new(polarity: u8, id: u8, timestamp: u64) -> Self {
        Self {
            polarity,
            id,
            padding: 0,
            timestamp,
        }
    }
}

/// An absolute-timestamp event.
///
/// Establishes a new time-base origin; relative timestamps of subsequent
/// CD and trigger events are offsets from this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsTimestampEvent {
    /// Absolute time-base value
    pub timestamp: u64,
}

/// Event-type discriminant of an encoded word.
///
/// Stored in the low-order bits of every word (width given by the active
/// [`FieldLayout`](crate::FieldLayout)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    /// Change Detection event (0x0)
    Cd = 0x0,
    /// External trigger event (0x1)
    Trigger = 0x1,
    /// Absolute-timestamp event (0x2)
    AbsTimestamp = 0x2,
}

impl EventType {
    /// Attempts to parse an event type from its encoded tag value.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Cd),
            0x1 => Some(Self::Trigger),
            0x2 => Some(Self::AbsTimestamp),
            _ => None,
        }
    }
}

/// A fully decoded event of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Change Detection event
    Cd(CdEvent),
    /// External trigger event
    Trigger(TriggerEvent),
    /// Absolute-timestamp event
    AbsTimestamp(AbsTimestampEvent),
}

impl Event {
    /// Returns the fully resolved timestamp of the event.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        match self {
            Event::Cd(ev) => ev.timestamp,
            Event::Trigger(ev) => ev.timestamp,
            Event::AbsTimestamp(ev) => ev.timestamp,
        }
    }
}
