//! Wire-level codec for the Frame Streams framing protocol.
//!
//! Frame Streams transports opaque payload blobs over a byte stream. Every
//! frame starts with a 32-bit big-endian length prefix:
//!
//! ```text
//! ┌──────────────┬──────────────────┐
//! │ Length       │ Payload          │
//! │ (4B BE, ≠ 0) │ (Length bytes)   │
//! └──────────────┴──────────────────┘
//! ```
//!
//! A zero length is an *escape* introducing a control frame, the in-band
//! signaling used for the handshake (READY/ACCEPT/START) and teardown
//! (STOP/FINISH). See [`control::ControlFrame`] for the control frame
//! layout.
//!
//! This crate is the codec only: byte-exact encode and decode with strict
//! bounds checking. Session state (handshake sequencing, content-type
//! negotiation, endpoint lifecycles) lives in the `framestream` crate.

pub mod codec;
pub mod control;
pub mod error;

pub use codec::{read_be32, read_be32_or_eof, read_full, write_be32, DEFAULT_MAX_PAYLOAD};
pub use control::{ControlFrame, ControlType, CONTROL_FIELD_CONTENT_TYPE, MAX_CONTROL_FRAME_SIZE};
pub use error::{Result, WireError};
