use std::io::{BufReader, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use framestream_transport::Conn;
use framestream_wire::{read_be32_or_eof, read_full, ControlFrame, ControlType, DEFAULT_MAX_PAYLOAD};

use crate::error::{Error, Result};
use crate::handshake;

/// Configuration for a [`Reader`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Acceptable content types, most preferred first. Empty accepts any.
    pub content_types: Vec<Bytes>,
    /// Expect the bidirectional READY/ACCEPT handshake and acknowledge
    /// STOP with FINISH. Requires a duplex transport
    /// ([`Reader::bidirectional`]).
    pub bidirectional: bool,
    /// Read deadline applied to the transport during the handshake only.
    /// Honored by constructors over deadline-capable transports
    /// ([`Reader::from_conn`]); the generic constructors cannot arm it.
    pub timeout: Option<Duration>,
    /// Upper bound on data frame length. Default 1 MiB.
    pub max_payload_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            content_types: Vec::new(),
            bidirectional: false,
            timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ReaderOptions {
    /// Options accepting a single content type.
    pub fn content_type(ct: impl Into<Bytes>) -> Self {
        Self {
            content_types: vec![ct.into()],
            ..Self::default()
        }
    }
}

/// The receiving endpoint of a Frame Streams connection.
///
/// Created over a byte source; the constructor runs the handshake, so a
/// returned reader is always in the data phase. Frames are yielded in
/// wire order until STOP (or a clean transport EOF), after which
/// [`next_frame`](Reader::next_frame) returns `Ok(None)` forever.
#[derive(Debug)]
pub struct Reader<R> {
    src: BufReader<R>,
    /// Reusable receive buffer; slices handed out borrow from here.
    recv: Vec<u8>,
    content_type: Option<Bytes>,
    max_payload_size: usize,
    stopped: bool,
    /// Write capability captured by the duplex constructor, where the
    /// `Write` bound is known; lets STOP handling answer with FINISH even
    /// though reads are only bounded on `Read`.
    respond: Option<fn(&mut R, &ControlFrame) -> Result<()>>,
}

impl<R: Read> Reader<R> {
    /// Create a unidirectional reader: awaits START, negotiates the
    /// content type, and enters the data phase.
    ///
    /// Fails with [`Error::Duplex`] if `opts.bidirectional` is set; a
    /// bare byte source cannot answer the peer.
    pub fn new(mut source: R, opts: &ReaderOptions) -> Result<Self> {
        if opts.bidirectional {
            return Err(Error::Duplex);
        }
        let content_type = handshake::reader_await_start(&mut source, &opts.content_types)?;
        Ok(Self::assemble(source, content_type, opts, None))
    }

    /// Read the next data frame.
    ///
    /// Returns a slice into the reader's receive buffer, valid until the
    /// next call on this reader. `Ok(None)` is the clean end of stream and
    /// is sticky.
    ///
    /// An oversize frame is discarded from the transport in full before
    /// [`Error::DataFrameTooLarge`] is returned, so the stream stays
    /// aligned and the reader stays usable.
    pub fn next_frame(&mut self) -> Result<Option<&[u8]>> {
        match self.fill_next()? {
            Some(len) => Ok(Some(&self.recv[..len])),
            None => Ok(None),
        }
    }

    /// Copying variant of [`next_frame`](Reader::next_frame): reads the
    /// next data frame into `buf` and returns its length.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.fill_next()? {
            None => Ok(None),
            Some(len) if len <= buf.len() => {
                buf[..len].copy_from_slice(&self.recv[..len]);
                Ok(Some(len))
            }
            Some(len) => Err(Error::DataFrameTooLarge {
                len,
                max: buf.len(),
            }),
        }
    }

    fn fill_next(&mut self) -> Result<Option<usize>> {
        if self.stopped {
            return Ok(None);
        }

        let len = match read_be32_or_eof(&mut self.src)? {
            None => {
                self.stopped = true;
                return Ok(None);
            }
            Some(len) => len as usize,
        };

        if len == 0 {
            // Control frame in the data phase: only STOP is legal.
            let cf = ControlFrame::read_from(&mut self.src)?;
            if cf.control_type != ControlType::Stop {
                return Err(Error::Decode(format!(
                    "unexpected control frame in data phase: {}",
                    cf.control_type
                )));
            }
            self.stopped = true;
            if let Some(respond) = self.respond {
                // FINISH is best-effort; the stream is over either way.
                let _ = respond(self.src.get_mut(), &ControlFrame::new(ControlType::Finish));
            }
            return Ok(None);
        }

        if len > self.max_payload_size {
            discard(&mut self.src, len)?;
            return Err(Error::DataFrameTooLarge {
                len,
                max: self.max_payload_size,
            });
        }

        read_full(&mut self.src, &mut self.recv[..len])?;
        Ok(Some(len))
    }

    /// The content type agreed during the handshake, if any.
    pub fn content_type(&self) -> Option<&[u8]> {
        self.content_type.as_deref()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &R {
        self.src.get_ref()
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut R {
        self.src.get_mut()
    }

    /// Consume the reader and return the transport. Buffered but unread
    /// bytes are discarded.
    pub fn into_inner(self) -> R {
        self.src.into_inner()
    }

    fn assemble(
        source: R,
        content_type: Option<Bytes>,
        opts: &ReaderOptions,
        respond: Option<fn(&mut R, &ControlFrame) -> Result<()>>,
    ) -> Self {
        Self {
            src: BufReader::new(source),
            recv: vec![0u8; opts.max_payload_size],
            content_type,
            max_payload_size: opts.max_payload_size,
            stopped: false,
            respond,
        }
    }
}

impl<T: Read + Write> Reader<T> {
    /// Create a bidirectional reader: awaits READY, answers ACCEPT with
    /// the chosen content type, verifies START, and enters the data
    /// phase. On STOP it acknowledges with FINISH.
    pub fn bidirectional(mut transport: T, opts: &ReaderOptions) -> Result<Self> {
        let agreed = handshake::reader_negotiate_ready(&mut transport, &opts.content_types)?;
        handshake::reader_verify_start(&mut transport, agreed.as_ref())?;
        let respond: fn(&mut T, &ControlFrame) -> Result<()> =
            |t, cf| cf.write_flush(t).map_err(Error::from);
        Ok(Self::assemble(transport, agreed, opts, Some(respond)))
    }
}

impl Reader<Conn> {
    /// Create a reader over a [`Conn`], arming `opts.timeout` as the
    /// transport read deadline for the duration of the handshake. The
    /// deadline is cleared once START is accepted so idle connections are
    /// not killed in the data phase.
    pub fn from_conn(conn: Conn, opts: &ReaderOptions) -> Result<Self> {
        conn.set_read_timeout(opts.timeout)?;
        let reader = if opts.bidirectional {
            Self::bidirectional(conn, opts)
        } else {
            Self::new(conn, opts)
        }?;
        reader.get_ref().set_read_timeout(None)?;
        Ok(reader)
    }
}

fn discard<R: Read>(src: &mut R, len: usize) -> Result<()> {
    let copied = std::io::copy(&mut src.by_ref().take(len as u64), &mut std::io::sink())?;
    if copied < len as u64 {
        return Err(Error::ShortRead);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::writer::{Writer, WriterOptions};

    fn wire_with_frames(opts: &WriterOptions, frames: &[&[u8]]) -> Vec<u8> {
        let mut writer = Writer::new(Cursor::new(Vec::<u8>::new()), opts).unwrap();
        for frame in frames {
            writer.write_frame(frame).unwrap();
        }
        writer.close().unwrap();
        writer.into_inner().unwrap().into_inner()
    }

    #[test]
    fn frames_arrive_in_order_then_eof() {
        let wire = wire_with_frames(&WriterOptions::default(), &[b"one", b"two", b"three"]);
        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();

        assert_eq!(reader.next_frame().unwrap(), Some(b"one".as_ref()));
        assert_eq!(reader.next_frame().unwrap(), Some(b"two".as_ref()));
        assert_eq!(reader.next_frame().unwrap(), Some(b"three".as_ref()));
        assert_eq!(reader.next_frame().unwrap(), None);
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn content_type_is_negotiated_and_exposed() {
        let wire = wire_with_frames(&WriterOptions::content_type("test"), &[b"payload"]);
        let reader = Reader::new(Cursor::new(wire), &ReaderOptions::content_type("test")).unwrap();
        assert_eq!(reader.content_type(), Some(b"test".as_ref()));
    }

    #[test]
    fn mismatched_content_type_fails_construction() {
        let wire = wire_with_frames(&WriterOptions::content_type("test"), &[]);
        let err =
            Reader::new(Cursor::new(wire), &ReaderOptions::content_type("wrong")).unwrap_err();
        assert!(matches!(err, Error::ContentTypeMismatch));
    }

    #[test]
    fn unconfigured_reader_adopts_writer_type() {
        let wire = wire_with_frames(&WriterOptions::content_type("adopted"), &[]);
        let reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();
        assert_eq!(reader.content_type(), Some(b"adopted".as_ref()));
    }

    #[test]
    fn empty_source_is_eof_not_short_read() {
        let err = Reader::new(Cursor::new(Vec::<u8>::new()), &ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Eof));
    }

    #[test]
    fn data_before_start_is_a_decode_error() {
        // A nonzero leading word where the START escape belongs.
        let wire = 5u32.to_be_bytes().to_vec();
        let err = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn bidirectional_flag_needs_duplex_constructor() {
        let opts = ReaderOptions {
            bidirectional: true,
            ..ReaderOptions::default()
        };
        let err = Reader::new(Cursor::new(Vec::<u8>::new()), &opts).unwrap_err();
        assert!(matches!(err, Error::Duplex));
    }

    #[test]
    fn oversize_frame_is_discarded_and_reported() {
        let wire = wire_with_frames(&WriterOptions::default(), &[&[0xAB; 15], b"after"]);
        let opts = ReaderOptions {
            max_payload_size: 10,
            ..ReaderOptions::default()
        };
        let mut reader = Reader::new(Cursor::new(wire), &opts).unwrap();

        let err = reader.next_frame().unwrap_err();
        assert!(matches!(
            err,
            Error::DataFrameTooLarge { len: 15, max: 10 }
        ));

        // The payload was discarded, so the stream is still aligned.
        assert_eq!(reader.next_frame().unwrap(), Some(b"after".as_ref()));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn truncated_payload_is_a_short_read() {
        let mut wire = wire_with_frames(&WriterOptions::default(), &[b"whole frame"]);
        wire.truncate(wire.len() - 16); // cut into the payload and the STOP
        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, Error::ShortRead));
    }

    #[test]
    fn ready_in_data_phase_is_a_decode_error() {
        let mut wire = wire_with_frames(&WriterOptions::default(), &[]);
        // Splice a READY between START and STOP.
        let ready = ControlFrame::new(ControlType::Ready).encode().unwrap();
        wire.splice(12..12, ready.to_vec());

        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn read_into_copies_and_bounds_checks() {
        let wire = wire_with_frames(&WriterOptions::default(), &[b"copyme"]);
        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(reader.read_into(&mut buf).unwrap(), Some(6));
        assert_eq!(&buf[..6], b"copyme");
        assert_eq!(reader.read_into(&mut buf).unwrap(), None);

        let wire = wire_with_frames(&WriterOptions::default(), &[b"too big for buf"]);
        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();
        let mut tiny = [0u8; 4];
        let err = reader.read_into(&mut tiny).unwrap_err();
        assert!(matches!(err, Error::DataFrameTooLarge { .. }));
    }

    #[test]
    fn clean_eof_without_stop_is_end_of_stream() {
        let mut wire = wire_with_frames(&WriterOptions::default(), &[b"x"]);
        wire.truncate(wire.len() - 12); // drop the STOP frame entirely
        let mut reader = Reader::new(Cursor::new(wire), &ReaderOptions::default()).unwrap();

        assert_eq!(reader.next_frame().unwrap(), Some(b"x".as_ref()));
        assert_eq!(reader.next_frame().unwrap(), None);
        assert_eq!(reader.next_frame().unwrap(), None);
    }
}
