/// Errors produced by the wire-level codec.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The transport ended before a complete wire element was read.
    #[error("short read (transport truncated mid-element)")]
    ShortRead,

    /// Structural violation of the wire format.
    #[error("decoding error: {0}")]
    Decode(String),

    /// An I/O error surfaced by the underlying transport.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WireError>;
