//! Byte transports for Frame Streams endpoints.
//!
//! The codec itself is transport-agnostic; any `Read`/`Write` pair will
//! do. This crate provides the concrete stream type most deployments use:
//! [`Conn`] wraps a Unix domain socket or TCP stream and exposes the read
//! deadline control the handshake timeout relies on, plus a listener for
//! the common collector setup (a socket accepting sender connections).

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::Conn;

#[cfg(unix)]
pub use uds::UnixSocketListener;
