//! Encode, decode, and shard content-addressed archives (CARv1).
//!
//! # Format
//!
//! A CAR is a header followed by any number of sections. Every length prefix is an unsigned
//! varint (see [w3up_codec::varint]):
//!
//! ```text
//! +--------------------+-------------------------------------+
//! | varint(header_len) | DAG-CBOR {roots: [CID...], version} |
//! +--------------------+-------------------------------------+
//! | varint(len)        | CID bytes | block bytes             |  (repeated)
//! +--------------------+-------------------------------------+
//! ```
//!
//! where `len` covers both the CID and the block bytes.
//!
//! # Sharding
//!
//! Storage backends cap the size of a single upload. [sharding::Sharder] repackages an ordered
//! stream of [Block]s into a lazy sequence of size-bounded archives ("shards"), each of which is
//! itself a complete CAR carrying the original root list. Shards are produced on demand and
//! encoded as they are read, so memory use stays constant (one block of lookahead) regardless
//! of the size of the input.
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use w3up_car::{sharding, Block};
//!
//! let blocks = (0..3u8).map(|i| Ok(Block::raw(vec![i; 1000])));
//! let cfg = sharding::Config { shard_size: 2100 };
//! let mut sharder = sharding::Sharder::new(&[], blocks, cfg).unwrap();
//!
//! let mut sizes = Vec::new();
//! while let Some(shard) = sharder.next_shard() {
//!     let mut buf = Vec::new();
//!     shard.unwrap().read_to_end(&mut buf).unwrap();
//!     sizes.push(buf.len());
//! }
//! assert_eq!(sizes.len(), 2);
//! assert!(sizes.iter().all(|size| *size <= 2100));
//! ```

pub mod block;
mod cbor;
pub mod decoder;
pub mod encoder;
mod error;
pub mod header;
pub mod link;
pub mod sharding;

pub use block::Block;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::Error;
pub use header::Header;
pub use link::Link;
