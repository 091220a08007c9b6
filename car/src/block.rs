//! Blocks and their encoded length.

use crate::{
    link::{RAW, SHA2_256},
    Error, Link,
};
use bytes::{BufMut, Bytes};
use sha2::{Digest as _, Sha256};
use w3up_codec::{varint, EncodeSize, Write};

/// An immutable pairing of a [Link] and the bytes it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    link: Link,
    data: Bytes,
}

impl Block {
    pub fn new(link: Link, data: impl Into<Bytes>) -> Self {
        Self {
            link,
            data: data.into(),
        }
    }

    /// Creates a raw block named by the sha2-256 digest of `data`.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let link = Link::sha256(RAW, &data);
        Self { link, data }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consumes the block, returning its link and bytes.
    pub fn into_parts(self) -> (Link, Bytes) {
        (self.link, self.data)
    }

    /// Length of the section payload (link plus data), excluding its length prefix.
    pub fn payload_len(&self) -> usize {
        self.link.encode_size() + self.data.len()
    }

    /// Checks that the data hashes to the link's digest.
    ///
    /// Only sha2-256 links can be checked, blocks named with any other hash function are
    /// accepted as-is.
    pub fn verify(&self) -> Result<(), Error> {
        if self.link.hash() != SHA2_256 {
            return Ok(());
        }
        if Sha256::digest(&self.data).as_slice() != self.link.digest() {
            return Err(Error::DigestMismatch(self.link.clone()));
        }
        Ok(())
    }
}

/// A block is written as one archive section: `varint(len) ++ link ++ data`.
impl Write for Block {
    fn write(&self, buf: &mut impl BufMut) {
        varint::write(self.payload_len() as u64, buf);
        self.link.write(buf);
        buf.put_slice(&self.data);
    }
}

/// The number of bytes the block occupies in an archive, computed without serializing it.
impl EncodeSize for Block {
    fn encode_size(&self) -> usize {
        let len = self.payload_len();
        varint::size(len as u64) + len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::DAG_CBOR;
    use w3up_codec::Encode;

    #[test]
    fn test_encode_size() {
        // 36 byte link, 4000 bytes of data, 2 byte prefix.
        let block = Block::raw(vec![7u8; 4000]);
        assert_eq!(block.payload_len(), 4036);
        assert_eq!(block.encode_size(), 4038);
        assert_eq!(block.encode().len(), 4038);
    }

    #[test]
    fn test_encode_size_small() {
        let block = Block::raw(Bytes::new());
        assert_eq!(block.encode_size(), 37);

        let encoded = block.encode();
        assert_eq!(encoded[0], 36);
        assert_eq!(&encoded[1..], &block.link().to_bytes()[..]);
    }

    #[test]
    fn test_prefix_boundary() {
        // A payload of exactly 127 bytes fits a one byte prefix, 128 needs two.
        let block = Block::raw(vec![0u8; 91]);
        assert_eq!(block.encode_size(), 128);
        let block = Block::raw(vec![0u8; 92]);
        assert_eq!(block.encode_size(), 130);
    }

    #[test]
    fn test_verify() {
        let block = Block::raw(&b"hello"[..]);
        assert!(block.verify().is_ok());

        let forged = Block::new(block.link().clone(), &b"olleh"[..]);
        assert!(matches!(forged.verify(), Err(Error::DigestMismatch(_))));

        // Unknown hash functions are not checked.
        let other = Block::new(Link::new_v1(DAG_CBOR, 0x1e, &[0u8; 32]).unwrap(), &b"x"[..]);
        assert!(other.verify().is_ok());
    }
}
