//! Unsigned variable-length integers.
//!
//! Each byte carries 7 bits of the value (least significant group first) and a "continuation"
//! bit in its most significant position that is set when more bytes follow. This is the
//! multiformats `unsigned-varint` format used for every length prefix in a CAR, as well as
//! for CID versions, codecs and multihash headers.
//!
//! Unlike plain LEB128, decoding is strict:
//! - encodings must be minimal (no trailing `0x00` groups)
//! - at most [MAX_LEN] bytes (63 bits of value) are accepted

use crate::{EncodeSize, Error, Read, Write};
use bytes::{Buf, BufMut};

/// Maximum number of bytes of a valid varint.
pub const MAX_LEN: usize = 9;

const DATA_BITS_PER_BYTE: u32 = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// Encodes an unsigned integer as a varint.
///
/// Values above `2^63 - 1` are written in ten bytes and will be rejected by [read].
pub fn write(value: u64, buf: &mut impl BufMut) {
    if value < CONTINUATION_BIT_MASK as u64 {
        // Fast path for small values (common case for lengths).
        buf.put_u8(value as u8);
        return;
    }

    let mut val = value;
    while val >= CONTINUATION_BIT_MASK as u64 {
        buf.put_u8((val as u8) | CONTINUATION_BIT_MASK);
        val >>= DATA_BITS_PER_BYTE;
    }
    buf.put_u8(val as u8);
}

/// Decodes an unsigned integer from a varint.
pub fn read(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut result = 0u64;
    for i in 0..MAX_LEN {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();
        result |= ((byte & DATA_BITS_MASK) as u64) << (i as u32 * DATA_BITS_PER_BYTE);

        // If the continuation bit is not set, this is the last byte.
        if byte & CONTINUATION_BIT_MASK == 0 {
            // A zero final group (other than for the value zero itself) is overlong.
            if byte == 0 && i > 0 {
                return Err(Error::InvalidVarint);
            }
            return Ok(result);
        }
    }
    Err(Error::InvalidVarint)
}

/// Calculates the number of bytes needed to encode an unsigned integer as a varint.
pub fn size(value: u64) -> usize {
    let data_bits = u64::BITS - value.leading_zeros();
    usize::max(1, data_bits.div_ceil(DATA_BITS_PER_BYTE) as usize)
}

/// An ergonomic wrapper to allow for encoding and decoding of integers as varints through the
/// codec traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UVar(pub u64);

impl Write for UVar {
    fn write(&self, buf: &mut impl BufMut) {
        write(self.0, buf);
    }
}

impl Read for UVar {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        read(buf).map(UVar)
    }
}

impl EncodeSize for UVar {
    fn encode_size(&self) -> usize {
        size(self.0)
    }
}
