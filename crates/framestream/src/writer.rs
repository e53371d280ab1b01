use std::io::{BufWriter, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use framestream_transport::Conn;
use framestream_wire::{write_be32, ControlFrame, ControlType};

use crate::error::{Error, Result};
use crate::handshake;

/// Configuration for a [`Writer`].
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Offered content types, most preferred first. In unidirectional
    /// mode only the first is announced.
    pub content_types: Vec<Bytes>,
    /// Run the bidirectional READY/ACCEPT handshake and await FINISH on
    /// close. Requires a duplex transport ([`Writer::bidirectional`]).
    pub bidirectional: bool,
    /// Read deadline applied to the transport during the handshake only.
    /// Honored by constructors over deadline-capable transports
    /// ([`Writer::from_conn`]); the generic constructors cannot arm it.
    pub timeout: Option<Duration>,
}

impl WriterOptions {
    /// Options offering a single content type.
    pub fn content_type(ct: impl Into<Bytes>) -> Self {
        Self {
            content_types: vec![ct.into()],
            ..Self::default()
        }
    }
}

/// The sending endpoint of a Frame Streams connection.
///
/// The constructor runs the handshake, so a returned writer is always in
/// the data phase. Data frames are buffered; call
/// [`flush`](Writer::flush) to make them observable downstream, and
/// [`close`](Writer::close) to end the stream with STOP.
#[derive(Debug)]
pub struct Writer<W: Write> {
    dst: BufWriter<W>,
    content_type: Option<Bytes>,
    closed: bool,
    /// Read capability captured by the duplex constructor, where the
    /// `Read` bound is known; lets `close` wait for FINISH even though
    /// writes are only bounded on `Write`.
    await_finish: Option<fn(&mut W) -> Result<()>>,
}

impl<W: Write> Writer<W> {
    /// Create a unidirectional writer: emits START (carrying the first
    /// configured content type, if any) and enters the data phase.
    ///
    /// Fails with [`Error::Duplex`] if `opts.bidirectional` is set; a
    /// bare byte sink cannot hear the peer.
    pub fn new(mut sink: W, opts: &WriterOptions) -> Result<Self> {
        if opts.bidirectional {
            return Err(Error::Duplex);
        }
        let content_type = opts.content_types.first().cloned();
        handshake::writer_send_start(&mut sink, content_type.as_ref())?;
        Ok(Self::assemble(sink, content_type, None))
    }

    /// Append a data frame: length prefix plus payload, buffered.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidFrame("write after close"));
        }
        if frame.is_empty() {
            return Err(Error::InvalidFrame(
                "empty data frame (a zero length prefix is the control escape)",
            ));
        }
        if frame.len() > u32::MAX as usize {
            return Err(Error::InvalidFrame("data frame length exceeds u32"));
        }
        write_be32(&mut self.dst, frame.len() as u32)?;
        self.dst.write_all(frame)?;
        Ok(())
    }

    /// Flush buffered frames through to the transport. Idempotent.
    pub fn flush(&mut self) -> Result<()> {
        self.dst.flush()?;
        Ok(())
    }

    /// End the stream: emit STOP and flush; in bidirectional mode, block
    /// until the peer's FINISH arrives. Idempotent: a second call does
    /// nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        ControlFrame::new(ControlType::Stop).write_flush(&mut self.dst)?;
        if let Some(await_finish) = self.await_finish {
            await_finish(self.dst.get_mut())?;
        }
        Ok(())
    }

    /// The content type agreed during the handshake, if any.
    pub fn content_type(&self) -> Option<&[u8]> {
        self.content_type.as_deref()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &W {
        self.dst.get_ref()
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut W {
        self.dst.get_mut()
    }

    /// Consume the writer, flushing buffered frames, and return the
    /// transport.
    pub fn into_inner(self) -> Result<W> {
        self.dst.into_inner().map_err(|e| Error::Io(e.into_error()))
    }

    fn assemble(sink: W, content_type: Option<Bytes>, await_finish: Option<fn(&mut W) -> Result<()>>) -> Self {
        Self {
            dst: BufWriter::new(sink),
            content_type,
            closed: false,
            await_finish,
        }
    }
}

impl<T: Read + Write> Writer<T> {
    /// Create a bidirectional writer: offers the configured content types
    /// with READY, validates the peer's ACCEPT, emits START with the
    /// agreed type, and enters the data phase. [`close`](Writer::close)
    /// will block until FINISH.
    pub fn bidirectional(mut transport: T, opts: &WriterOptions) -> Result<Self> {
        let agreed = handshake::writer_negotiate_ready(&mut transport, &opts.content_types)?;
        handshake::writer_send_start(&mut transport, agreed.as_ref())?;
        let await_finish: fn(&mut T) -> Result<()> =
            |t| handshake::recv_control(t, ControlType::Finish).map(drop);
        Ok(Self::assemble(transport, agreed, Some(await_finish)))
    }
}

impl Writer<Conn> {
    /// Create a writer over a [`Conn`], arming `opts.timeout` as the
    /// transport read deadline for the duration of the handshake (the
    /// ACCEPT wait in bidirectional mode). The deadline is cleared once
    /// START is sent.
    pub fn from_conn(conn: Conn, opts: &WriterOptions) -> Result<Self> {
        conn.set_read_timeout(opts.timeout)?;
        let writer = if opts.bidirectional {
            Self::bidirectional(conn, opts)
        } else {
            Self::new(conn, opts)
        }?;
        writer.get_ref().set_read_timeout(None)?;
        Ok(writer)
    }
}
