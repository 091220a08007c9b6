//! Read an archive's roots and stream its blocks.
//!
//! [Decoder] reads the header eagerly (on [Decoder::new]) and then yields one [Block] per
//! section, pulling from the underlying reader only as blocks are requested. Length prefixes
//! are read byte-by-byte, so callers reading from a file or socket should wrap it in a
//! [std::io::BufReader].
//!
//! Archives are untrusted input: header and section lengths are bounded by [Config] before
//! anything is allocated.

use crate::{header::VERSION, Block, Error, Header, Link};
use bytes::Bytes;
use std::io::{self, Read};
use tracing::debug;
use w3up_codec::{varint, DecodeExt, ReadExt};

/// Configuration for [Decoder].
#[derive(Clone, Debug)]
pub struct Config {
    /// Largest header (in bytes, excluding its length prefix) that will be read.
    pub max_header_size: usize,

    /// Largest section (link plus data, excluding its length prefix) that will be read.
    pub max_section_size: usize,

    /// Whether to check each block's bytes against its link.
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_header_size: 32 << 20,
            max_section_size: 8 << 20,
            verify: false,
        }
    }
}

/// A streaming archive decoder.
pub struct Decoder<R> {
    reader: R,
    cfg: Config,
    roots: Vec<Link>,
    done: bool,
}

impl<R: Read> Decoder<R> {
    /// Reads and validates the header.
    pub fn new(mut reader: R, cfg: Config) -> Result<Self, Error> {
        let len = match read_prefix(&mut reader)? {
            Some(len) => len,
            None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
        };
        if len == 0 {
            return Err(Error::InvalidSection("empty header"));
        }
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= cfg.max_header_size)
            .ok_or(Error::HeaderTooLarge(len, cfg.max_header_size))?;

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let header = Header::decode(&buf[..])?;
        if header.version != VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }
        debug!(roots = header.roots.len(), header_len = len, "decoded header");

        Ok(Self {
            reader,
            cfg,
            roots: header.roots,
            done: false,
        })
    }

    /// The roots listed in the header.
    pub fn roots(&self) -> &[Link] {
        &self.roots
    }

    /// Consumes the decoder, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn next_block(&mut self) -> Result<Option<Block>, Error> {
        let len = match read_prefix(&mut self.reader)? {
            Some(len) => len,
            None => return Ok(None),
        };
        if len == 0 {
            return Err(Error::InvalidSection("empty section"));
        }
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.cfg.max_section_size)
            .ok_or(Error::SectionTooLarge(len, self.cfg.max_section_size))?;

        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        let mut section = Bytes::from(buf);
        let link = Link::read(&mut section)?;
        let block = Block::new(link, section);
        if self.cfg.verify {
            block.verify()?;
        }
        Ok(Some(block))
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Reads a varint length prefix, returning `None` on a clean end of input.
fn read_prefix(reader: &mut impl Read) -> Result<Option<u64>, Error> {
    let mut buf = [0u8; varint::MAX_LEN];
    for i in 0..varint::MAX_LEN {
        match read_byte(reader)? {
            None if i == 0 => return Ok(None),
            None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Some(byte) => {
                buf[i] = byte;
                if byte & 0x80 == 0 {
                    return Ok(Some(varint::read(&mut &buf[..=i])?));
                }
            }
        }
    }
    Err(w3up_codec::Error::InvalidVarint.into())
}

fn read_byte(reader: &mut impl Read) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{header, link::DAG_CBOR};
    use w3up_codec::{Encode, Write};

    fn archive(roots: &[Link], blocks: &[Block]) -> Vec<u8> {
        let mut buf = header::frame(roots).to_vec();
        for block in blocks {
            block.write(&mut buf);
        }
        buf
    }

    #[test]
    fn test_roundtrip() {
        let root = Link::sha256(DAG_CBOR, b"root");
        let blocks: Vec<Block> = (0..10u8).map(|i| Block::raw(vec![i; 300])).collect();
        let bytes = archive(&[root.clone()], &blocks);

        let decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert_eq!(decoder.roots(), &[root]);
        let decoded: Vec<Block> = decoder.collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn test_no_blocks() {
        let bytes = archive(&[], &[]);
        let mut decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert!(decoder.roots().is_empty());
        assert!(decoder.next().is_none());
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_empty_input() {
        let result = Decoder::new(&[][..], Config::default());
        assert!(matches!(result, Err(Error::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_unsupported_version() {
        let header = Header {
            version: 2,
            roots: Vec::new(),
        };
        let mut bytes = Vec::new();
        varint::write(header.encode().len() as u64, &mut bytes);
        header.write(&mut bytes);
        assert!(matches!(
            Decoder::new(&bytes[..], Config::default()),
            Err(Error::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_header_too_large() {
        let bytes = archive(&[], &[]);
        let cfg = Config {
            max_header_size: 16,
            ..Config::default()
        };
        assert!(matches!(
            Decoder::new(&bytes[..], cfg),
            Err(Error::HeaderTooLarge(17, 16))
        ));
    }

    #[test]
    fn test_section_too_large() {
        let bytes = archive(&[], &[Block::raw(vec![0u8; 100])]);
        let cfg = Config {
            max_section_size: 64,
            ..Config::default()
        };
        let mut decoder = Decoder::new(&bytes[..], cfg).unwrap();
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::SectionTooLarge(136, 64)))
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_truncated_section() {
        let mut bytes = archive(&[], &[Block::raw(vec![1u8; 50])]);
        bytes.pop();
        let mut decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::Io(err))) if err.kind() == io::ErrorKind::UnexpectedEof
        ));
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_truncated_prefix() {
        let mut bytes = archive(&[], &[]);
        bytes.push(0x80);
        let mut decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert!(matches!(decoder.next(), Some(Err(Error::Io(_)))));
    }

    #[test]
    fn test_empty_section() {
        let mut bytes = archive(&[], &[]);
        bytes.push(0x00);
        let mut decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::InvalidSection("empty section")))
        ));
    }

    #[test]
    fn test_verify() {
        let good = Block::raw(&b"good"[..]);
        let bad = Block::new(good.link().clone(), &b"evil"[..]);
        let bytes = archive(&[], &[good.clone(), bad]);

        // Without verification, the forged block is accepted.
        let decoder = Decoder::new(&bytes[..], Config::default()).unwrap();
        assert_eq!(decoder.count(), 2);

        let cfg = Config {
            verify: true,
            ..Config::default()
        };
        let mut decoder = Decoder::new(&bytes[..], cfg).unwrap();
        assert_eq!(decoder.next().unwrap().unwrap(), good);
        assert!(matches!(
            decoder.next(),
            Some(Err(Error::DigestMismatch(_)))
        ));
    }
}
