//! Serialize a root list and a block sequence into an archive, as the consumer reads.
//!
//! [Encoder] implements [std::io::Read]. It holds the pre-serialized header and at most one
//! in-flight section: a small buffer with the section's length prefix and link, and a
//! reference-counted view of the block's bytes. The next block is only pulled from the
//! underlying sequence once the previous one has been read in full.

use crate::{header, Block, Error, Link};
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use w3up_codec::{varint, EncodeSize, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Open,
    Done,
    Failed,
}

/// A lazily-encoded archive.
pub struct Encoder<I> {
    blocks: I,

    /// Unread bytes of the header, or of the current section's prefix and link.
    head: Bytes,

    /// Unread bytes of the current block.
    body: Bytes,

    state: State,
    count: usize,
    read: u64,
}

impl<I: Iterator<Item = Result<Block, Error>>> Encoder<I> {
    /// Creates an archive with the given roots and blocks.
    pub fn new(roots: &[Link], blocks: I) -> Self {
        Self::with_header(header::frame(roots), blocks)
    }

    /// Creates an archive from an already framed header (see [header::frame]).
    pub fn with_header(header: Bytes, blocks: I) -> Self {
        Self {
            blocks,
            head: header,
            body: Bytes::new(),
            state: State::Open,
            count: 0,
            read: 0,
        }
    }

    /// Number of blocks pulled into the archive so far.
    pub fn blocks(&self) -> usize {
        self.count
    }

    /// Number of bytes read from the archive so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    fn copy(&mut self, from_head: bool, buf: &mut [u8]) -> usize {
        let src = if from_head {
            &mut self.head
        } else {
            &mut self.body
        };
        let n = src.remaining().min(buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        src.advance(n);
        self.read += n as u64;
        n
    }
}

impl<I: Iterator<Item = Result<Block, Error>>> io::Read for Encoder<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.head.has_remaining() {
                return Ok(self.copy(true, buf));
            }
            if self.body.has_remaining() {
                return Ok(self.copy(false, buf));
            }
            match self.state {
                State::Open => {}
                State::Done => return Ok(0),
                State::Failed => return Err(io::Error::other("archive encoding failed")),
            }

            match self.blocks.next() {
                None => {
                    self.state = State::Done;
                    return Ok(0);
                }
                Some(Err(err)) => {
                    self.state = State::Failed;
                    return Err(io::Error::other(err));
                }
                Some(Ok(block)) => {
                    let (link, data) = block.into_parts();
                    let len = link.encode_size() + data.len();
                    let mut head = BytesMut::with_capacity(varint::MAX_LEN + link.encode_size());
                    varint::write(len as u64, &mut head);
                    link.write(&mut head);
                    self.head = head.freeze();
                    self.body = data;
                    self.count += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decoder, link::DAG_CBOR, Decoder};
    use std::io::Read;
    use w3up_codec::Encode;

    fn blocks(n: usize) -> Vec<Block> {
        (0..n).map(|i| Block::raw(vec![i as u8; 100 + i])).collect()
    }

    #[test]
    fn test_matches_eager_encoding() {
        let root = Link::sha256(DAG_CBOR, b"root");
        let blocks = blocks(5);

        let mut expected = header::frame(&[root.clone()]).to_vec();
        for block in &blocks {
            expected.extend_from_slice(&block.encode());
        }

        let mut encoder = Encoder::new(&[root], blocks.into_iter().map(Ok));
        let mut actual = Vec::new();
        encoder.read_to_end(&mut actual).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(encoder.blocks(), 5);
        assert_eq!(encoder.bytes_read(), expected.len() as u64);
    }

    #[test]
    fn test_small_reads() {
        let blocks = blocks(3);
        let mut expected = Vec::new();
        Encoder::new(&[], blocks.clone().into_iter().map(Ok))
            .read_to_end(&mut expected)
            .unwrap();

        let mut encoder = Encoder::new(&[], blocks.into_iter().map(Ok));
        let mut actual = Vec::new();
        let mut chunk = [0u8; 7];
        loop {
            let n = encoder.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            actual.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_empty_archive() {
        let mut encoder = Encoder::new(&[], std::iter::empty::<Result<Block, Error>>());
        let mut buf = Vec::new();
        encoder.read_to_end(&mut buf).unwrap();
        assert_eq!(buf.len(), header::EMPTY_HEADER_LEN);
        assert_eq!(encoder.blocks(), 0);
    }

    #[test]
    fn test_pulls_lazily() {
        let mut pulled = 0;
        let source = blocks(3).into_iter().map(|block| {
            pulled += 1;
            Ok(block)
        });
        let mut encoder = Encoder::new(&[], source);

        // Reading the header alone does not pull any block.
        let mut buf = [0u8; header::EMPTY_HEADER_LEN];
        encoder.read_exact(&mut buf).unwrap();
        assert_eq!(encoder.blocks(), 0);

        // Reading one byte more pulls exactly one block.
        encoder.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(encoder.blocks(), 1);
        drop(encoder);
        assert_eq!(pulled, 1);
    }

    #[test]
    fn test_upstream_error() {
        let source = vec![
            Ok(Block::raw(&b"a"[..])),
            Err(Error::InvalidSection("boom")),
            Ok(Block::raw(&b"b"[..])),
        ];
        let mut encoder = Encoder::new(&[], source.into_iter());
        let mut buf = Vec::new();
        let err = encoder.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        let inner = err.into_inner().unwrap().downcast::<Error>().unwrap();
        assert!(matches!(*inner, Error::InvalidSection("boom")));

        // The first block was fully emitted before the failure.
        assert_eq!(
            buf.len(),
            header::EMPTY_HEADER_LEN + Block::raw(&b"a"[..]).encode_size()
        );

        // Subsequent reads keep failing without pulling further.
        assert!(encoder.read(&mut [0u8; 8]).is_err());
        assert_eq!(encoder.blocks(), 1);
    }

    #[test]
    fn test_decodes() {
        let root = Link::sha256(DAG_CBOR, b"root");
        let blocks = blocks(4);
        let encoder = Encoder::new(&[root.clone()], blocks.clone().into_iter().map(Ok));

        let decoder = Decoder::new(encoder, decoder::Config::default()).unwrap();
        assert_eq!(decoder.roots(), &[root]);
        let decoded: Vec<Block> = decoder.collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, blocks);
    }
}
