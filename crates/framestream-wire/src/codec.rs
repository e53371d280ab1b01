use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, WireError};

/// Default maximum data frame payload size: 1 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 1_048_576;

/// Read exactly four bytes as a big-endian u32.
///
/// Truncation at any point, including before the first byte, is a
/// [`WireError::ShortRead`].
pub fn read_be32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_full(r, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read a big-endian u32, reporting a clean end of stream as `Ok(None)`.
///
/// The stream may only end *between* wire elements, so EOF counts as clean
/// only before the first byte; one to three bytes followed by EOF is a
/// [`WireError::ShortRead`].
pub fn read_be32_or_eof<R: Read>(r: &mut R) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0usize;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(WireError::ShortRead),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(WireError::Io(err)),
        }
    }
    Ok(Some(u32::from_be_bytes(buf)))
}

/// Write a u32 as four big-endian bytes.
pub fn write_be32<W: Write>(w: &mut W, val: u32) -> Result<()> {
    w.write_all(&val.to_be_bytes())?;
    Ok(())
}

/// Fill `buf` completely from `r`; anything less is a short read.
pub fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => WireError::ShortRead,
        _ => WireError::Io(err),
    })
}
