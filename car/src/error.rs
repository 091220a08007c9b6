//! Errors that can occur when encoding, decoding, or sharding an archive.

use crate::Link;
use thiserror::Error;

/// Errors that can occur when interacting with an archive.
#[derive(Debug, Error)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] w3up_codec::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported CAR version: {0}")]
    UnsupportedVersion(u64),
    #[error("header too large: {0} > {1}")]
    HeaderTooLarge(u64, usize),
    #[error("section too large: {0} > {1}")]
    SectionTooLarge(u64, usize),
    #[error("invalid section: {0}")]
    InvalidSection(&'static str),
    #[error("digest mismatch: {0}")]
    DigestMismatch(Link),
    #[error("block will cause CAR to exceed shard size: {link} ({size} > {max})")]
    OversizeBlock { link: Link, size: usize, max: usize },
    #[error("shard size {shard_size} leaves no room for blocks after a {header_len} byte header")]
    ShardSizeTooSmall { shard_size: usize, header_len: usize },
}
