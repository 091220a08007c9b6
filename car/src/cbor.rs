//! The subset of DAG-CBOR needed for CAR headers.
//!
//! Every CBOR data item starts with a head: a major type in the top 3 bits of the first byte,
//! and an argument that is either stored inline (values below 24) or in the following 1, 2, 4,
//! or 8 bytes. DAG-CBOR requires the shortest form, which is the only form accepted here.
//! Indefinite lengths are rejected.

use bytes::{Buf, BufMut};
use w3up_codec::{util::at_least, Error};

/// Major types used by CAR headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Major {
    Unsigned = 0,
    Bytes = 2,
    Text = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
}

impl Major {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Unsigned),
            2 => Some(Self::Bytes),
            3 => Some(Self::Text),
            4 => Some(Self::Array),
            5 => Some(Self::Map),
            6 => Some(Self::Tag),
            _ => None,
        }
    }
}

/// Tag marking a CID in DAG-CBOR.
pub const CID_TAG: u64 = 42;

/// Writes a head for `major` with argument `value`.
pub fn write_head(major: Major, value: u64, buf: &mut impl BufMut) {
    let major = (major as u8) << 5;
    match value {
        0..=23 => buf.put_u8(major | value as u8),
        24..=0xFF => {
            buf.put_u8(major | 24);
            buf.put_u8(value as u8);
        }
        0x100..=0xFFFF => {
            buf.put_u8(major | 25);
            buf.put_u16(value as u16);
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.put_u8(major | 26);
            buf.put_u32(value as u32);
        }
        _ => {
            buf.put_u8(major | 27);
            buf.put_u64(value);
        }
    }
}

/// Returns the size of a head with argument `value`.
pub fn head_size(value: u64) -> usize {
    match value {
        0..=23 => 1,
        24..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Writes a text string.
pub fn write_text(text: &str, buf: &mut impl BufMut) {
    write_head(Major::Text, text.len() as u64, buf);
    buf.put_slice(text.as_bytes());
}

/// Returns the encoded size of a text string.
pub fn text_size(text: &str) -> usize {
    head_size(text.len() as u64) + text.len()
}

/// Reads a head, returning its major type and argument.
pub fn read_head(buf: &mut impl Buf) -> Result<(Major, u64), Error> {
    at_least(buf, 1)?;
    let initial = buf.get_u8();
    let major = Major::from_bits(initial >> 5)
        .ok_or(Error::InvalidData("CBOR", "unsupported major type"))?;
    let value = match initial & 0x1F {
        info @ 0..=23 => return Ok((major, info as u64)),
        24 => {
            at_least(buf, 1)?;
            buf.get_u8() as u64
        }
        25 => {
            at_least(buf, 2)?;
            buf.get_u16() as u64
        }
        26 => {
            at_least(buf, 4)?;
            buf.get_u32() as u64
        }
        27 => {
            at_least(buf, 8)?;
            buf.get_u64()
        }
        _ => return Err(Error::InvalidData("CBOR", "indefinite or reserved length")),
    };
    if head_size(value) != 1 + (1 << ((initial & 0x1F) - 24)) {
        return Err(Error::InvalidData("CBOR", "non-minimal head"));
    }
    Ok((major, value))
}

/// Reads a head and checks its major type.
pub fn expect_head(buf: &mut impl Buf, expected: Major) -> Result<u64, Error> {
    let (major, value) = read_head(buf)?;
    if major != expected {
        return Err(Error::InvalidData("CBOR", "unexpected major type"));
    }
    Ok(value)
}

/// Reads the payload length of a byte or text string, checking it is available.
pub fn expect_len(buf: &mut impl Buf, expected: Major) -> Result<usize, Error> {
    let len = expect_head(buf, expected)?;
    let len = usize::try_from(len).map_err(|_| Error::EndOfBuffer)?;
    at_least(buf, len)?;
    Ok(len)
}
