//! The CAR header and its length estimator.
//!
//! The header is the DAG-CBOR map `{"roots": [CID, ...], "version": 1}`. Keys are written in
//! canonical (length-first) order; each root is a tag-42 byte string holding a zero byte (the
//! identity multibase prefix) followed by the binary CID.

use crate::{cbor, cbor::Major, Link};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use w3up_codec::{util::at_least, varint, EncodeSize, Error, Read, ReadExt, Write};

/// The only supported CAR version.
pub const VERSION: u64 = 1;

/// Exact length of a framed header with no roots: 17 bytes of DAG-CBOR plus a 1 byte prefix.
pub const EMPTY_HEADER_LEN: usize = 18;

const ROOTS_KEY: &str = "roots";
const VERSION_KEY: &str = "version";

/// Longest key accepted when reading a header.
const MAX_KEY_LEN: usize = 16;

/// Returns the exact number of bytes the framed header (length prefix included) for `roots`
/// occupies in an archive, without serializing it.
pub fn header_len(roots: &[Link]) -> usize {
    if roots.is_empty() {
        return EMPTY_HEADER_LEN;
    }
    let len = body_size(VERSION, roots);
    varint::size(len as u64) + len
}

/// Serializes the framed header for `roots`.
pub fn frame(roots: &[Link]) -> Bytes {
    let len = body_size(VERSION, roots);
    let mut buf = BytesMut::with_capacity(varint::size(len as u64) + len);
    varint::write(len as u64, &mut buf);
    write_body(VERSION, roots, &mut buf);
    buf.freeze()
}

fn root_size(root: &Link) -> usize {
    let len = 1 + root.encode_size();
    cbor::head_size(cbor::CID_TAG) + cbor::head_size(len as u64) + len
}

fn body_size(version: u64, roots: &[Link]) -> usize {
    cbor::head_size(2)
        + cbor::text_size(ROOTS_KEY)
        + cbor::head_size(roots.len() as u64)
        + roots.iter().map(root_size).sum::<usize>()
        + cbor::text_size(VERSION_KEY)
        + cbor::head_size(version)
}

fn write_body(version: u64, roots: &[Link], buf: &mut impl BufMut) {
    cbor::write_head(Major::Map, 2, buf);
    cbor::write_text(ROOTS_KEY, buf);
    cbor::write_head(Major::Array, roots.len() as u64, buf);
    for root in roots {
        cbor::write_head(Major::Tag, cbor::CID_TAG, buf);
        cbor::write_head(Major::Bytes, 1 + root.encode_size() as u64, buf);
        buf.put_u8(0);
        root.write(buf);
    }
    cbor::write_text(VERSION_KEY, buf);
    cbor::write_head(Major::Unsigned, version, buf);
}

/// A decoded (unframed) CAR header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u64,
    pub roots: Vec<Link>,
}

impl Header {
    pub fn new(roots: Vec<Link>) -> Self {
        Self {
            version: VERSION,
            roots,
        }
    }
}

impl Write for Header {
    fn write(&self, buf: &mut impl BufMut) {
        write_body(self.version, &self.roots, buf);
    }
}

impl EncodeSize for Header {
    fn encode_size(&self) -> usize {
        body_size(self.version, &self.roots)
    }
}

impl Read for Header {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        if cbor::expect_head(buf, Major::Map)? != 2 {
            return Err(Error::InvalidData("Header", "expected two entries"));
        }

        let mut version = None;
        let mut roots = None;
        for _ in 0..2 {
            let len = cbor::expect_len(buf, Major::Text)?;
            if len > MAX_KEY_LEN {
                return Err(Error::InvalidData("Header", "unknown key"));
            }
            let key = buf.copy_to_bytes(len);
            match &key[..] {
                b"version" if version.is_none() => {
                    version = Some(cbor::expect_head(buf, Major::Unsigned)?);
                }
                b"roots" if roots.is_none() => {
                    roots = Some(read_roots(buf)?);
                }
                b"version" | b"roots" => {
                    return Err(Error::InvalidData("Header", "duplicate key"));
                }
                _ => return Err(Error::InvalidData("Header", "unknown key")),
            }
        }

        match (version, roots) {
            (Some(version), Some(roots)) => Ok(Self { version, roots }),
            _ => Err(Error::InvalidData("Header", "missing key")),
        }
    }
}

fn read_roots(buf: &mut impl Buf) -> Result<Vec<Link>, Error> {
    let count = cbor::expect_head(buf, Major::Array)?;

    // Every root takes more than one byte, so this bounds the allocation by the input size.
    let count = usize::try_from(count).map_err(|_| Error::EndOfBuffer)?;
    at_least(buf, count)?;

    let mut roots = Vec::with_capacity(count);
    for _ in 0..count {
        if cbor::expect_head(buf, Major::Tag)? != cbor::CID_TAG {
            return Err(Error::InvalidData("Header", "root is not a CID"));
        }
        let len = cbor::expect_len(buf, Major::Bytes)?;
        if len == 0 || buf.get_u8() != 0 {
            return Err(Error::InvalidData("Header", "missing CID prefix"));
        }
        let mut cid = buf.copy_to_bytes(len - 1);
        let root = Link::read(&mut cid)?;
        if cid.has_remaining() {
            return Err(Error::ExtraData(cid.remaining()));
        }
        roots.push(root);
    }
    Ok(roots)
}
