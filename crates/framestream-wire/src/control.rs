use std::fmt;
use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{read_be32, read_be32_or_eof, read_full};
use crate::error::{Result, WireError};

/// Maximum control frame body size in bytes.
pub const MAX_CONTROL_FRAME_SIZE: usize = 512;

/// Control field type carrying a content type byte string.
pub const CONTROL_FIELD_CONTENT_TYPE: u32 = 1;

/// Control frame types of the handshake and teardown sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlType {
    /// Reader → writer: the selected content type (bidirectional only).
    Accept = 1,
    /// Writer → reader: the stream begins.
    Start = 2,
    /// Writer → reader: the stream ends.
    Stop = 3,
    /// Writer → reader: offered content types (bidirectional only).
    Ready = 4,
    /// Reader → writer: STOP acknowledged (bidirectional only).
    Finish = 5,
}

impl ControlType {
    /// Decode a wire control type code.
    pub fn from_u32(val: u32) -> Result<Self> {
        match val {
            1 => Ok(ControlType::Accept),
            2 => Ok(ControlType::Start),
            3 => Ok(ControlType::Stop),
            4 => Ok(ControlType::Ready),
            5 => Ok(ControlType::Finish),
            other => Err(WireError::Decode(format!(
                "unknown control type: {other}"
            ))),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlType::Accept => "ACCEPT",
            ControlType::Start => "START",
            ControlType::Stop => "STOP",
            ControlType::Ready => "READY",
            ControlType::Finish => "FINISH",
        };
        f.write_str(name)
    }
}

/// An in-band signaling frame: a control type plus zero or more
/// content-type fields.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────────┬────────────┬──────────────────────────────┐
/// │ Escape     │ Body len   │ Type       │ Fields                       │
/// │ (4B BE, 0) │ (4B BE)    │ (4B BE)    │ (type | len | bytes)*        │
/// └────────────┴────────────┴────────────┴──────────────────────────────┘
/// ```
/// The body length covers the type word and the fields; it excludes the
/// escape and the length word itself, and must lie in
/// `4..=MAX_CONTROL_FRAME_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub control_type: ControlType,
    pub content_types: Vec<Bytes>,
}

impl ControlFrame {
    /// A control frame carrying no content types.
    pub fn new(control_type: ControlType) -> Self {
        Self {
            control_type,
            content_types: Vec::new(),
        }
    }

    /// A control frame carrying the given content types, in order.
    pub fn with_content_types(control_type: ControlType, content_types: Vec<Bytes>) -> Self {
        Self {
            control_type,
            content_types,
        }
    }

    fn body_len(&self) -> usize {
        4 + self
            .content_types
            .iter()
            .map(|ct| 8 + ct.len())
            .sum::<usize>()
    }

    /// Encode to wire bytes: escape, body length, body.
    ///
    /// Fails if the body would exceed [`MAX_CONTROL_FRAME_SIZE`]; the peer
    /// is required to reject such a frame, so it must never be sent.
    pub fn encode(&self) -> Result<Bytes> {
        let body_len = self.body_len();
        if body_len > MAX_CONTROL_FRAME_SIZE {
            return Err(WireError::Decode(format!(
                "control frame body too large ({body_len} bytes, max {MAX_CONTROL_FRAME_SIZE})"
            )));
        }

        let mut dst = BytesMut::with_capacity(8 + body_len);
        dst.put_u32(0);
        dst.put_u32(body_len as u32);
        dst.put_u32(self.control_type as u32);
        for ct in &self.content_types {
            dst.put_u32(CONTROL_FIELD_CONTENT_TYPE);
            dst.put_u32(ct.len() as u32);
            dst.put_slice(ct);
        }
        Ok(dst.freeze())
    }

    /// Encode and write, without flushing.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let wire = self.encode()?;
        w.write_all(&wire)?;
        Ok(())
    }

    /// Encode, write, and flush.
    ///
    /// Control frames delimit protocol phases; the peer blocks on them, so
    /// they must not sit in a write buffer.
    pub fn write_flush<W: Write>(&self, w: &mut W) -> Result<()> {
        self.write_to(w)?;
        w.flush()?;
        Ok(())
    }

    /// Read a control frame. The escape must already have been consumed.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let body_len = read_be32(r)? as usize;
        if !(4..=MAX_CONTROL_FRAME_SIZE).contains(&body_len) {
            return Err(WireError::Decode(format!(
                "control frame length {body_len} outside 4..={MAX_CONTROL_FRAME_SIZE}"
            )));
        }

        let mut body = vec![0u8; body_len];
        read_full(r, &mut body)?;
        Self::parse(&body)
    }

    /// Read the zero escape, then a control frame, and require its type to
    /// be `want`.
    ///
    /// Returns `Ok(None)` when the transport ends cleanly before the
    /// escape: the peer never spoke. A nonzero escape is a decoding
    /// error.
    pub fn read_expected<R: Read>(r: &mut R, want: ControlType) -> Result<Option<Self>> {
        let escape = match read_be32_or_eof(r)? {
            None => return Ok(None),
            Some(escape) => escape,
        };
        if escape != 0 {
            return Err(WireError::Decode(format!(
                "nonzero escape: {escape:#010x}"
            )));
        }
        let cf = Self::read_from(r)?;
        if cf.control_type != want {
            return Err(WireError::Decode(format!(
                "unexpected control frame: got {}, want {}",
                cf.control_type, want
            )));
        }
        Ok(Some(cf))
    }

    fn parse(body: &[u8]) -> Result<Self> {
        let mut buf = body;
        let control_type = ControlType::from_u32(buf.get_u32())?;

        let mut content_types = Vec::new();
        while buf.has_remaining() {
            if buf.remaining() < 8 {
                return Err(WireError::Decode(
                    "truncated control field header".to_string(),
                ));
            }
            let field_type = buf.get_u32();
            if field_type != CONTROL_FIELD_CONTENT_TYPE {
                return Err(WireError::Decode(format!(
                    "unknown control field type: {field_type}"
                )));
            }
            let field_len = buf.get_u32() as usize;
            if field_len > MAX_CONTROL_FRAME_SIZE {
                return Err(WireError::Decode(format!(
                    "content type length {field_len} exceeds {MAX_CONTROL_FRAME_SIZE}"
                )));
            }
            if field_len > buf.remaining() {
                return Err(WireError::Decode(
                    "content type overruns control frame".to_string(),
                ));
            }
            content_types.push(Bytes::copy_from_slice(&buf[..field_len]));
            buf.advance(field_len);
        }

        let cf = Self {
            control_type,
            content_types,
        };
        cf.check_cardinality()?;
        Ok(cf)
    }

    fn check_cardinality(&self) -> Result<()> {
        let n = self.content_types.len();
        match self.control_type {
            ControlType::Start if n > 1 => Err(WireError::Decode(
                "START carries more than one content type".to_string(),
            )),
            ControlType::Stop | ControlType::Finish if n > 0 => Err(WireError::Decode(format!(
                "{} carries a content type",
                self.control_type
            ))),
            _ => Ok(()),
        }
    }
}
