//! Split content-addressed archives into size-bounded shards and hand them to a store.
//!
//! This crate backs the `w3` binary. [shard::shard] decodes an archive and, when it is larger
//! than the configured shard size, repackages its blocks with [w3up_car::sharding::Sharder].
//! Every shard is passed to a [store::ShardStore], which names it by the sha2-256 digest of its
//! bytes.

use serde::Serializer;
use w3up_car::Link;

pub mod config;
mod error;
pub mod inspect;
pub mod shard;
pub mod store;

pub use error::Error;

/// Serializes a [Link] as its string form.
fn serialize_link<S: Serializer>(link: &Link, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(link)
}

/// Serializes a list of [Link]s as their string forms.
fn serialize_links<S: Serializer>(links: &[Link], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(links.iter().map(ToString::to_string))
}
