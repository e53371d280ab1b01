//! Content-type negotiation.
//!
//! Content types are opaque byte strings compared byte-for-byte. Each side
//! configures an ordered preference list; the handshake agrees on a single
//! type, or on none when neither side cares.

use bytes::Bytes;

use crate::error::{Error, Result};

/// Intersection of `offered` and `acceptable`, preserving the offerer's
/// order.
pub fn match_content_types(offered: &[Bytes], acceptable: &[Bytes]) -> Vec<Bytes> {
    offered
        .iter()
        .filter(|ct| acceptable.contains(ct))
        .cloned()
        .collect()
}

/// The chooser's pick: the first entry of `preferred` that also appears in
/// `offered`.
///
/// An endpoint with no preferences accepts anything and adopts the
/// offerer's first type (or none, when nothing was offered). An endpoint
/// with preferences fails on an offer with no overlap; a mismatch never
/// silently degrades to "no content type".
pub(crate) fn choose_content_type(
    preferred: &[Bytes],
    offered: &[Bytes],
) -> Result<Option<Bytes>> {
    if preferred.is_empty() {
        return Ok(offered.first().cloned());
    }
    match_content_types(preferred, offered)
        .into_iter()
        .next()
        .map(Some)
        .ok_or(Error::ContentTypeMismatch)
}

/// Validate the selection carried by an ACCEPT frame against what was
/// offered, returning the agreed type.
///
/// The selection must be a single previously offered type; an empty
/// selection is valid only when nothing was offered.
pub(crate) fn validate_accept(offered: &[Bytes], selected: &[Bytes]) -> Result<Option<Bytes>> {
    match selected {
        [] if offered.is_empty() => Ok(None),
        [] => Err(Error::ContentTypeMismatch),
        [one] if offered.contains(one) => Ok(Some(one.clone())),
        _ => Err(Error::ContentTypeMismatch),
    }
}
