//! Handshake sequencing for both endpoint roles.
//!
//! The unidirectional sequences are suffixes of the bidirectional ones,
//! so each step is its own function and the constructors compose them:
//!
//! ```text
//! reader:  [negotiate READY, send ACCEPT]   await START
//! writer:  [send READY, await ACCEPT]       send START
//! ```
//!
//! The bracketed prefix runs only in bidirectional mode and is the only
//! part that needs the transport's write (reader) or read (writer)
//! capability ahead of the data phase.

use std::io::{Read, Write};

use bytes::Bytes;
use framestream_wire::{ControlFrame, ControlType};

use crate::error::{Error, Result};
use crate::negotiate::{choose_content_type, validate_accept};

/// Read one control frame and require its type.
///
/// A clean transport EOF before the escape means the peer never spoke:
/// [`Error::Eof`]. A nonzero escape here is a protocol violation, not a
/// data frame.
pub(crate) fn recv_control<R: Read>(src: &mut R, want: ControlType) -> Result<ControlFrame> {
    ControlFrame::read_expected(src, want)?.ok_or(Error::Eof)
}

/// Unidirectional reader handshake: await START and negotiate its content
/// type against `acceptable`.
pub(crate) fn reader_await_start<R: Read>(
    src: &mut R,
    acceptable: &[Bytes],
) -> Result<Option<Bytes>> {
    let start = recv_control(src, ControlType::Start)?;
    choose_content_type(acceptable, &start.content_types)
}

/// Bidirectional reader prefix: await READY, choose a content type, answer
/// with ACCEPT.
pub(crate) fn reader_negotiate_ready<T: Read + Write>(
    transport: &mut T,
    acceptable: &[Bytes],
) -> Result<Option<Bytes>> {
    let ready = recv_control(transport, ControlType::Ready)?;
    let agreed = choose_content_type(acceptable, &ready.content_types)?;

    let mut accept = ControlFrame::new(ControlType::Accept);
    accept.content_types.extend(agreed.clone());
    accept.write_flush(transport)?;

    Ok(agreed)
}

/// Bidirectional reader suffix: await START and require it to carry the
/// agreed content type, or none.
pub(crate) fn reader_verify_start<R: Read>(src: &mut R, agreed: Option<&Bytes>) -> Result<()> {
    let start = recv_control(src, ControlType::Start)?;
    match (&start.content_types[..], agreed) {
        ([], _) => Ok(()),
        ([one], Some(want)) if one == want => Ok(()),
        _ => Err(Error::ContentTypeMismatch),
    }
}

/// Writer start: announce the stream, carrying the content type if one is
/// configured (unidirectional) or agreed (bidirectional).
pub(crate) fn writer_send_start<W: Write>(
    dst: &mut W,
    content_type: Option<&Bytes>,
) -> Result<()> {
    let mut start = ControlFrame::new(ControlType::Start);
    start.content_types.extend(content_type.cloned());
    start.write_flush(dst)?;
    Ok(())
}

/// Bidirectional writer prefix: offer content types with READY, await
/// ACCEPT, and validate the peer's selection.
pub(crate) fn writer_negotiate_ready<T: Read + Write>(
    transport: &mut T,
    offered: &[Bytes],
) -> Result<Option<Bytes>> {
    let ready = ControlFrame::with_content_types(ControlType::Ready, offered.to_vec());
    ready.write_flush(transport)?;

    let accept = recv_control(transport, ControlType::Accept)?;
    validate_accept(offered, &accept.content_types)
}
