//! Codec for the JPEG XE canonical raw event format.
//!
//! This crate packs and unpacks streams of event-camera sensor events
//! (Change Detection, external trigger, and absolute-timestamp marker
//! events) into the fixed-width, bit-packed canonical representation. It
//! covers the configurable field layout, the bit-level packing and
//! unpacking algorithms, canonical-header validation, and the
//! absolute-time-base rollover that keeps per-event relative timestamps
//! within their bit budget. Encoding is bit-exact with respect to other
//! readers of the format.
//!
//! # Example
//!
//! ```
//! use jpegxe_core::{CdEvent, Event, FieldLayout, XeDecoder, XeEncoder};
//!
//! let layout = FieldLayout::reference();
//! let mut encoder = XeEncoder::new(Vec::new(), layout, 0).unwrap();
//! encoder.write_cd(&CdEvent::new(5, 7, 1, 100)).unwrap();
//! let bytes = encoder.into_inner();
//!
//! let mut decoder = XeDecoder::new(bytes.as_slice(), layout).unwrap();
//! while let Some(event) = decoder.next_event().unwrap() {
//!     if let Event::Cd(cd) = event {
//!         assert_eq!(cd.timestamp, 100);
//!     }
//! }
//! ```

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod layout;
pub mod types;

// Re-export commonly used types
pub use decoder::{DecodeError, XeDecoder};
pub use encoder::{EncodeError, XeEncoder};
pub use layout::FieldLayout;
pub use types::{AbsTimestampEvent, CdEvent, Event, EventType, TriggerEvent};
