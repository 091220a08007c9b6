//! Content identifiers (CIDs).
//!
//! A [Link] names a block by a digest of its bytes plus a codec tag describing how to
//! interpret them. Two binary layouts exist:
//!
//! ```text
//! v0: | 0x12 | 0x20 | sha2-256 digest (32 bytes) |                  (implicitly dag-pb)
//! v1: | varint(1) | varint(codec) | varint(hash) | varint(len) | digest |
//! ```
//!
//! The trailing `hash ++ len ++ digest` is a multihash. Parsing and the multibase text form are
//! provided by [cid]; the archive codecs only add exact sizing and buffer-oriented writes.

use bytes::{Buf, BufMut};
use cid::{multihash::Multihash, Cid};
use sha2::{Digest as _, Sha256};
use std::fmt;
use w3up_codec::{varint, EncodeSize, Error, Read, Write};

pub use cid::Version;

/// Codec of raw binary data.
pub const RAW: u64 = 0x55;

/// Codec of a UnixFS protobuf node.
pub const DAG_PB: u64 = 0x70;

/// Codec of DAG-CBOR data.
pub const DAG_CBOR: u64 = 0x71;

/// Codec of a CARv1 archive (used to name shards).
pub const CAR: u64 = 0x0202;

/// Multihash code of sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Largest digest a [Link] can hold.
pub const MAX_DIGEST_SIZE: usize = 64;

/// An immutable content identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link(Cid);

impl Link {
    /// Creates a CIDv1 from a codec and a multihash (`hash` code plus `digest`).
    ///
    /// Fails if `digest` is longer than [MAX_DIGEST_SIZE].
    pub fn new_v1(codec: u64, hash: u64, digest: &[u8]) -> Result<Self, Error> {
        let multihash = Multihash::wrap(hash, digest)
            .map_err(|_| Error::InvalidData("Link", "digest too long"))?;
        Ok(Self(Cid::new_v1(codec, multihash)))
    }

    /// Returns the CIDv1 naming a sha2-256 `digest` under `codec`.
    pub fn from_sha256(codec: u64, digest: [u8; 32]) -> Self {
        let multihash =
            Multihash::wrap(SHA2_256, &digest).expect("sha2-256 digest fits in a multihash");
        Self(Cid::new_v1(codec, multihash))
    }

    /// Hashes `data` with sha2-256 and returns the CIDv1 naming it under `codec`.
    pub fn sha256(codec: u64, data: &[u8]) -> Self {
        Self::from_sha256(codec, Sha256::digest(data).into())
    }

    pub fn version(&self) -> Version {
        self.0.version()
    }

    pub fn codec(&self) -> u64 {
        self.0.codec()
    }

    /// Multihash code of the digest.
    pub fn hash(&self) -> u64 {
        self.0.hash().code()
    }

    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Returns the binary representation of the link.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    fn multihash_size(&self) -> usize {
        let digest = self.digest().len();
        varint::size(self.hash()) + varint::size(digest as u64) + digest
    }
}

impl From<Cid> for Link {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl Write for Link {
    fn write(&self, buf: &mut impl BufMut) {
        if self.version() == Version::V1 {
            varint::write(1, buf);
            varint::write(self.codec(), buf);
        }
        varint::write(self.hash(), buf);
        varint::write(self.digest().len() as u64, buf);
        buf.put_slice(self.digest());
    }
}

impl EncodeSize for Link {
    fn encode_size(&self) -> usize {
        match self.version() {
            Version::V0 => self.multihash_size(),
            Version::V1 => varint::size(1) + varint::size(self.codec()) + self.multihash_size(),
        }
    }
}

impl Read for Link {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        let remaining = buf.remaining();
        match Cid::read_bytes(Buf::reader(&mut *buf)) {
            Ok(cid) => Ok(Self(cid)),
            // The reader only fails short when the buffer runs dry.
            Err(_) if !buf.has_remaining() && remaining > 0 => Err(Error::EndOfBuffer),
            Err(_) => Err(Error::InvalidData("Link", "invalid CID")),
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
