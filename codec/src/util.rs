//! Helpers shared by [crate::Read] implementations.

use crate::Error;
use bytes::Buf;

/// Returns [Error::EndOfBuffer] if `buf` holds fewer than `len` bytes.
#[inline]
pub fn at_least<B: Buf>(buf: &mut B, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}

/// Converts a decoded length to `usize`, rejecting values above `max`.
#[inline]
pub fn bounded(len: u64, max: usize) -> Result<usize, Error> {
    match usize::try_from(len) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(Error::LengthExceeded(len, max)),
    }
}
