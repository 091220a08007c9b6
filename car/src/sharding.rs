//! Split an ordered block sequence into size-bounded archives.
//!
//! # Overview
//!
//! [Sharder] consumes a sequence of [Block]s (which may fail at any point) and produces a lazy
//! sequence of shards. Every shard is a complete archive that carries the full original root
//! list in its header, followed by a contiguous run of the input blocks, such that:
//!
//! - the encoded length of a shard (header plus sections) never exceeds [Config::shard_size]
//! - concatenating the blocks of all shards, in order, reproduces the input exactly
//! - boundaries depend only on the input order and the configuration
//!
//! # Planning
//!
//! The header length is computed once, leaving `budget = shard_size - header_len` bytes per
//! shard for sections. Blocks are accepted into the current shard while their encoded lengths
//! fit within the budget. The first block that does not fit is held in a single lookahead slot
//! and becomes the first block of the next shard. A block whose encoded length alone exceeds the
//! budget can never be placed and fails the sequence with [Error::OversizeBlock]: from the read of
//! the shard it was pulled into, or from [Sharder::next_shard] when it would start a shard.
//!
//! # Laziness
//!
//! [Sharder::next_shard] returns a [Shard] that borrows the sharder: blocks are pulled from the
//! upstream sequence only as the shard's bytes are read, and only one shard can be alive at a
//! time. Before a shard is returned, its first block is pulled into the lookahead slot, so an
//! exhausted upstream ends the sequence without an empty trailing shard, and an upstream error
//! or oversize block at a boundary fails the pull itself rather than a shard's read.
//!
//! Dropping a shard before reading it to the end is allowed. The next call to
//! [Sharder::next_shard] then skips over the blocks that belonged to it.

use crate::{decoder, encoder::Encoder, header, Block, Decoder, Error, Link};
use bytes::Bytes;
use std::io;
use tracing::{debug, trace, warn};
use w3up_codec::EncodeSize;

/// Default maximum size of a shard, in bytes.
///
/// See <https://observablehq.com/@gozala/w3up-shard-size>.
pub const SHARD_SIZE: usize = 133_169_152;

/// Configuration for [Sharder].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum encoded size of a shard, header included.
    pub shard_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_size: SHARD_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Active,
    Drained,
    Failed,
}

/// Boundary decisions shared by the sharder and the shard currently being read.
struct Planner<I> {
    blocks: I,
    header_len: usize,
    budget: usize,

    /// A block pulled from upstream that starts the next shard.
    lookahead: Option<Block>,

    /// Whether a shard is being assembled.
    open: bool,

    /// Encoded length of the blocks accepted into the open shard.
    current: usize,
    count: usize,
    shards: usize,
    phase: Phase,
}

impl<I: Iterator<Item = Result<Block, Error>>> Planner<I> {
    /// Pulls the next block for the open shard, or `None` once the shard is complete.
    fn next_in_shard(&mut self) -> Option<Result<Block, Error>> {
        if !self.open {
            return None;
        }
        let block = match self.lookahead.take() {
            Some(block) => block,
            None => match self.blocks.next() {
                Some(Ok(block)) => block,
                Some(Err(err)) => {
                    self.fail("upstream error");
                    return Some(Err(err));
                }
                None => {
                    self.close();
                    self.phase = Phase::Drained;
                    return None;
                }
            },
        };

        // A block that can never be placed fails the shard being read.
        let len = block.encode_size();
        if len > self.budget {
            self.fail("oversize block");
            return Some(Err(self.oversize(&block, len)));
        }

        // A block that doesn't fit starts the next shard.
        if self.current + len > self.budget {
            self.lookahead = Some(block);
            self.close();
            return None;
        }

        self.current += len;
        self.count += 1;
        trace!(link = %block.link(), len, shard = self.shards, "accepted block");
        Some(Ok(block))
    }

    fn close(&mut self) {
        self.open = false;
        debug!(
            shard = self.shards,
            blocks = self.count,
            bytes = self.header_len + self.current,
            "shard complete"
        );
    }

    fn fail(&mut self, reason: &'static str) {
        self.open = false;
        self.phase = Phase::Failed;
        debug!(
            shard = self.shards,
            blocks = self.count,
            reason,
            "shard failed"
        );
    }

    fn oversize(&self, block: &Block, len: usize) -> Error {
        warn!(link = %block.link(), len, max = self.budget, "block exceeds shard size");
        Error::OversizeBlock {
            link: block.link().clone(),
            size: len,
            max: self.budget,
        }
    }

    /// Pulls the first block of the next shard into the lookahead slot.
    fn start(&mut self) -> Option<Result<(), Error>> {
        let block = match self.lookahead.take() {
            Some(block) => block,
            None => match self.blocks.next() {
                Some(Ok(block)) => block,
                Some(Err(err)) => {
                    self.phase = Phase::Failed;
                    return Some(Err(err));
                }
                None => {
                    self.phase = Phase::Drained;
                    return None;
                }
            },
        };

        let len = block.encode_size();
        if len > self.budget {
            self.phase = Phase::Failed;
            return Some(Err(self.oversize(&block, len)));
        }

        self.lookahead = Some(block);
        self.open = true;
        self.current = 0;
        self.count = 0;
        self.shards += 1;
        Some(Ok(()))
    }
}

/// The blocks of one shard, pulled from the sharder's upstream sequence on demand.
pub struct Blocks<'a, I> {
    planner: &'a mut Planner<I>,
}

impl<I: Iterator<Item = Result<Block, Error>>> Iterator for Blocks<'_, I> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.planner.next_in_shard()
    }
}

/// One size-bounded archive, encoded as it is read.
pub type Shard<'a, I> = Encoder<Blocks<'a, I>>;

/// Splits an ordered block sequence into size-bounded archives.
pub struct Sharder<I> {
    roots: Vec<Link>,
    header: Bytes,
    planner: Planner<I>,
}

impl<I: Iterator<Item = Result<Block, Error>>> Sharder<I> {
    /// Creates a sharder over `blocks`, writing `roots` into the header of every shard.
    ///
    /// Fails if `cfg.shard_size` cannot hold the header and at least one byte of sections.
    pub fn new(roots: &[Link], blocks: I, cfg: Config) -> Result<Self, Error> {
        let header_len = header::header_len(roots);
        if cfg.shard_size <= header_len {
            return Err(Error::ShardSizeTooSmall {
                shard_size: cfg.shard_size,
                header_len,
            });
        }
        let header = header::frame(roots);
        debug_assert_eq!(header.len(), header_len);

        Ok(Self {
            roots: roots.to_vec(),
            header,
            planner: Planner {
                blocks,
                header_len,
                budget: cfg.shard_size - header_len,
                lookahead: None,
                open: false,
                current: 0,
                count: 0,
                shards: 0,
                phase: Phase::Active,
            },
        })
    }

    /// The roots written into every shard.
    pub fn roots(&self) -> &[Link] {
        &self.roots
    }

    /// Length of each shard's header, length prefix included.
    pub fn header_len(&self) -> usize {
        self.planner.header_len
    }

    /// Bytes available for sections in each shard.
    pub fn budget(&self) -> usize {
        self.planner.budget
    }

    /// Number of shards handed out so far.
    pub fn shards(&self) -> usize {
        self.planner.shards
    }

    /// Returns the next shard.
    ///
    /// Returns `None` once the upstream sequence is exhausted. After an error is returned (either
    /// here or from reading a shard) the sequence is over and `None` is returned from then on.
    pub fn next_shard(&mut self) -> Option<Result<Shard<'_, I>, Error>> {
        let planner = &mut self.planner;

        // Skip whatever remains of a shard the caller stopped reading.
        while planner.open {
            if let Some(Err(err)) = planner.next_in_shard() {
                return Some(Err(err));
            }
        }

        if planner.phase != Phase::Active {
            return None;
        }
        match planner.start()? {
            Ok(()) => Some(Ok(Encoder::with_header(
                self.header.clone(),
                Blocks { planner },
            ))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<R: io::Read> Sharder<Decoder<R>> {
    /// Decodes the archive in `reader` and shards its blocks under its own roots.
    pub fn from_car(reader: R, decoder: decoder::Config, cfg: Config) -> Result<Self, Error> {
        let decoder = Decoder::new(reader, decoder)?;
        let roots = decoder.roots().to_vec();
        Self::new(&roots, decoder, cfg)
    }
}
