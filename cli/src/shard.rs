//! `shard` subcommand

use crate::{config::Config, serialize_link, serialize_links, store::ShardStore, Error};
use serde::Serialize;
use std::{
    fmt,
    fs::File,
    io::{BufReader, Seek, SeekFrom},
    path::Path,
};
use tracing::{debug, info};
use w3up_car::{sharding::Sharder, Decoder, Link};

pub const CMD: &str = "shard";

/// The links produced by sharding an archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The first root listed in the archive header.
    #[serde(serialize_with = "serialize_link")]
    pub root: Link,

    /// Links to the stored shards, in order.
    #[serde(serialize_with = "serialize_links")]
    pub shards: Vec<Link>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root: {}", self.root)?;
        for shard in &self.shards {
            writeln!(f, "shard: {shard}")?;
        }
        Ok(())
    }
}

/// Splits the archive at `path` into shards and hands each one to `store`.
///
/// An archive smaller than the shard size is stored unchanged as a single shard. With
/// verification enabled, its blocks are still decoded and checked before it is stored.
pub fn shard(path: &Path, cfg: &Config, store: &mut impl ShardStore) -> Result<Summary, Error> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(Error::NotAFile(path.to_path_buf()));
    }
    let size = metadata.len();

    let mut decoder = Decoder::new(BufReader::new(file), cfg.decoder())?;
    let roots = decoder.roots().to_vec();
    let root = roots.first().cloned().ok_or(Error::MissingRoot)?;
    info!(%root, roots = roots.len(), size, "decoded archive header");

    let mut shards = Vec::new();
    if size < cfg.shard_size as u64 {
        debug!(size, shard_size = cfg.shard_size, "archive fits in a single shard");
        if cfg.verify {
            for block in &mut decoder {
                block?;
            }
        }
        let mut file = decoder.into_inner().into_inner();
        file.seek(SeekFrom::Start(0))?;
        shards.push(store.put(&mut file)?);
    } else {
        let mut sharder = Sharder::new(&roots, decoder, cfg.sharding())?;
        while let Some(shard) = sharder.next_shard() {
            let mut shard = shard?;
            let link = store.put(&mut shard)?;
            debug!(%link, blocks = shard.blocks(), bytes = shard.bytes_read(), "sharded");
            shards.push(link);
        }
    }
    info!(shards = shards.len(), "sharded archive");

    Ok(Summary { root, shards })
}
