use framestream_wire::WireError;

/// Errors surfaced by Frame Streams endpoints.
///
/// The set is closed: every operation on a [`Reader`](crate::Reader) or
/// [`Writer`](crate::Writer) reports failures through these variants.
/// Handshake errors are terminal for the endpoint; steady-state errors are
/// terminal except [`Error::DataFrameTooLarge`], after which the stream
/// remains aligned and may be read further.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport ended cleanly before the handshake began.
    ///
    /// A clean end of stream *after* the handshake is not an error; it is
    /// reported as `Ok(None)` by the reader.
    #[error("end of stream")]
    Eof,

    /// The transport returned fewer bytes than the wire format requires.
    #[error("short read (transport truncated mid-frame)")]
    ShortRead,

    /// Structural violation of the wire format: bad length bounds, an
    /// unknown control or field type, a cardinality violation, an
    /// unexpected control frame, or a nonzero escape.
    #[error("decoding error: {0}")]
    Decode(String),

    /// A data frame length exceeded the reader's maximum payload size.
    /// The offending payload has been discarded; the stream is still
    /// aligned on a frame boundary.
    #[error("data frame too large ({len} bytes, max {max})")]
    DataFrameTooLarge { len: usize, max: usize },

    /// Content-type negotiation found no mutually acceptable type, or a
    /// peer selected a type that was never offered.
    #[error("content type mismatch")]
    ContentTypeMismatch,

    /// A frame the writer refuses to put on the wire.
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    /// Bidirectional mode was requested on a transport that cannot both
    /// read and write.
    #[error("bidirectional mode requires a duplex transport")]
    Duplex,

    /// An I/O error surfaced by the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WireError> for Error {
    fn from(err: WireError) -> Self {
        match err {
            WireError::ShortRead => Error::ShortRead,
            WireError::Decode(msg) => Error::Decode(msg),
            WireError::Io(err) => Error::Io(err),
        }
    }
}

impl From<framestream_transport::TransportError> for Error {
    fn from(err: framestream_transport::TransportError) -> Self {
        use framestream_transport::TransportError;
        match err {
            TransportError::Io(io) | TransportError::Accept(io) => Error::Io(io),
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Error::Io(source)
            }
            other => Error::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
