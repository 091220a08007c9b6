#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::io::Read;
use w3up_car::{
    decoder,
    link::DAG_CBOR,
    sharding::{Config, Sharder},
    Block, Decoder, Error, Link,
};

#[derive(Arbitrary, Debug)]
struct Input {
    shard_size: u16,
    roots: u8,
    blocks: Vec<Vec<u8>>,
    abandon: Vec<bool>,
}

fuzz_target!(|input: Input| {
    let roots: Vec<Link> = (0..input.roots % 8)
        .map(|i| Link::sha256(DAG_CBOR, &[i]))
        .collect();
    let blocks: Vec<Block> = input.blocks.into_iter().map(Block::raw).collect();
    let cfg = Config {
        shard_size: input.shard_size as usize,
    };
    let Ok(mut sharder) = Sharder::new(&roots, blocks.clone().into_iter().map(Ok), cfg) else {
        return;
    };

    let mut recovered = Vec::new();
    let mut index = 0;
    let mut skipped = false;
    while let Some(shard) = sharder.next_shard() {
        let mut shard = match shard {
            Ok(shard) => shard,
            Err(Error::OversizeBlock { size, max, .. }) => {
                assert!(size > max);
                return;
            }
            Err(err) => panic!("unexpected error: {err}"),
        };
        if input.abandon.get(index).copied().unwrap_or(false) {
            skipped = true;
            index += 1;
            continue;
        }
        index += 1;

        let mut bytes = Vec::new();
        if let Err(err) = shard.read_to_end(&mut bytes) {
            let err = err
                .into_inner()
                .and_then(|inner| inner.downcast::<Error>().ok())
                .expect("reading shard failed");
            assert!(matches!(*err, Error::OversizeBlock { size, max, .. } if size > max));
            return;
        }
        assert!(bytes.len() <= cfg.shard_size);

        let decoder = Decoder::new(&bytes[..], decoder::Config::default())
            .expect("shard header is invalid");
        assert_eq!(decoder.roots(), &roots[..]);
        let shard_blocks: Vec<Block> = decoder
            .collect::<Result<_, _>>()
            .expect("shard body is invalid");
        assert!(!shard_blocks.is_empty());
        recovered.extend(shard_blocks);
    }
    if !skipped {
        assert_eq!(recovered, blocks);
    }
});
