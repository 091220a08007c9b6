//! `inspect` subcommand

use crate::{config::Config, serialize_links, Error};
use serde::Serialize;
use std::{fmt, fs::File, io::BufReader, path::Path};
use w3up_car::{Decoder, Link};
use w3up_codec::EncodeSize;

pub const CMD: &str = "inspect";

/// What an archive contains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Stats {
    #[serde(serialize_with = "serialize_links")]
    pub roots: Vec<Link>,

    /// Number of blocks.
    pub blocks: usize,

    /// Total length of block data.
    pub data_bytes: u64,

    /// Total length of all sections, length prefixes and links included.
    pub section_bytes: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            writeln!(f, "root: {root}")?;
        }
        writeln!(f, "blocks: {}", self.blocks)?;
        writeln!(f, "data bytes: {}", self.data_bytes)?;
        writeln!(f, "section bytes: {}", self.section_bytes)
    }
}

/// Reads every block of the archive at `path`.
pub fn inspect(path: &Path, cfg: &Config) -> Result<Stats, Error> {
    let file = File::open(path)?;
    if file.metadata()?.is_dir() {
        return Err(Error::NotAFile(path.to_path_buf()));
    }
    let decoder = Decoder::new(BufReader::new(file), cfg.decoder())?;
    let mut stats = Stats {
        roots: decoder.roots().to_vec(),
        blocks: 0,
        data_bytes: 0,
        section_bytes: 0,
    };
    for block in decoder {
        let block = block?;
        stats.blocks += 1;
        stats.data_bytes += block.data().len() as u64;
        stats.section_bytes += block.encode_size() as u64;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use w3up_car::{link::DAG_CBOR, Block, Encoder};

    #[test]
    fn test_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.car");
        let root = Link::sha256(DAG_CBOR, b"root");
        let blocks: Vec<Block> = (0..4u8).map(|i| Block::raw(vec![i; 4000])).collect();
        let mut car = Vec::new();
        Encoder::new(&[root.clone()], blocks.into_iter().map(Ok))
            .read_to_end(&mut car)
            .unwrap();
        std::fs::write(&path, &car).unwrap();

        let stats = inspect(&path, &Config::default()).unwrap();
        assert_eq!(stats.roots, vec![root]);
        assert_eq!(stats.blocks, 4);
        assert_eq!(stats.data_bytes, 16_000);
        assert_eq!(stats.section_bytes, 4 * 4038);
    }

    #[test]
    fn test_inspect_verify() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.car");
        let good = Block::raw(&b"good"[..]);
        let forged = Block::new(good.link().clone(), &b"evil"[..]);
        let mut car = Vec::new();
        Encoder::new(&[], vec![Ok(good), Ok(forged)].into_iter())
            .read_to_end(&mut car)
            .unwrap();
        std::fs::write(&path, &car).unwrap();

        assert_eq!(inspect(&path, &Config::default()).unwrap().blocks, 2);
        let cfg = Config {
            verify: true,
            ..Config::default()
        };
        assert!(matches!(
            inspect(&path, &cfg),
            Err(Error::Car(w3up_car::Error::DigestMismatch(_)))
        ));
    }
}
