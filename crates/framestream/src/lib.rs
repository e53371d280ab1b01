//! Frame Streams protocol endpoints.
//!
//! Frame Streams is the length-prefixed framing used by logging and
//! telemetry pipelines (notably the `dnstap` DNS telemetry format). A
//! [`Writer`] transports opaque payload blobs to a [`Reader`] over any
//! byte-oriented transport, preceded by a handshake that optionally
//! negotiates a content type:
//!
//! ```text
//! writer ──▶ [ START | data frame* | STOP ] ──▶ reader      (unidirectional)
//! writer ──▶ [ READY ]              [ ACCEPT ] ◀── reader   (bidirectional
//! writer ──▶ [ START | data* | STOP ] [ FINISH ] ◀── reader    preamble)
//! ```
//!
//! Data frames are delivered in order, byte-exact. The content type is an
//! opaque byte string the codec never interprets; both sides list what
//! they speak and the handshake agrees on one (or none).
//!
//! Endpoints are single-threaded and blocking: every operation may block
//! on the transport, and an endpoint must not be shared across threads
//! without external serialization. Independent endpoints on independent
//! transports are unrelated.
//!
//! Wire-level encode/decode lives in `framestream-wire`; concrete
//! deadline-capable transports in `framestream-transport`.

pub mod error;
mod handshake;
pub mod negotiate;
pub mod reader;
pub mod writer;

pub use error::{Error, Result};
pub use negotiate::match_content_types;
pub use reader::{Reader, ReaderOptions};
pub use writer::{Writer, WriterOptions};

pub use framestream_transport::Conn;
#[cfg(unix)]
pub use framestream_transport::UnixSocketListener;
pub use framestream_wire::{DEFAULT_MAX_PAYLOAD, MAX_CONTROL_FRAME_SIZE};
