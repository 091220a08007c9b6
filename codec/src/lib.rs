//! Serialize length-prefixed content-addressed data.
//!
//! # Overview
//!
//! A small binary serialization layer shared by the archive crates. It is built
//! around four traits over [bytes::Buf] and [bytes::BufMut]:
//! - [Write] serializes a value into a buffer
//! - [EncodeSize] reports the exact number of bytes [Write] will produce, without producing them
//! - [Read] deserializes (possibly untrusted) input, optionally bounded by a configuration
//! - [Encode] and [Decode] are provided on top of the above
//!
//! Lengths are framed with unsigned [varint]s (the multiformats flavour of LEB128).
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use w3up_codec::{varint, DecodeExt, Encode, EncodeSize, Error, Read, Write};
//!
//! // A length-prefixed byte string
//! #[derive(Debug, PartialEq)]
//! struct Section(Vec<u8>);
//!
//! impl Write for Section {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         varint::write(self.0.len() as u64, buf);
//!         buf.put_slice(&self.0);
//!     }
//! }
//!
//! impl EncodeSize for Section {
//!     fn encode_size(&self) -> usize {
//!         varint::size(self.0.len() as u64) + self.0.len()
//!     }
//! }
//!
//! impl Read for Section {
//!     fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
//!         let len = varint::read(buf)? as usize;
//!         w3up_codec::util::at_least(buf, len)?;
//!         let mut data = vec![0; len];
//!         buf.copy_to_slice(&mut data);
//!         Ok(Self(data))
//!     }
//! }
//!
//! let section = Section(vec![1, 2, 3]);
//! let encoded = section.encode();
//! assert_eq!(encoded.len(), 4);
//! assert_eq!(Section::decode(encoded).unwrap(), section);
//! ```

pub mod codec;
pub mod error;
pub mod util;
pub mod varint;

// Re-export main types and traits
pub use codec::{Decode, DecodeExt, Encode, EncodeSize, Read, ReadExt, Write};
pub use error::Error;
pub use varint::UVar;
