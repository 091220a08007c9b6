#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Read;
use w3up_car::{decoder::Config, Block, Decoder, Encoder};

fn config() -> Config {
    Config {
        max_header_size: 1 << 16,
        max_section_size: 1 << 16,
        verify: true,
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(decoder) = Decoder::new(data, config()) else {
        return;
    };
    let roots = decoder.roots().to_vec();
    let blocks: Vec<Block> = decoder.map_while(Result::ok).collect();

    // Whatever decodes cleanly survives re-encoding.
    let mut encoded = Vec::new();
    let mut encoder = Encoder::new(&roots, blocks.clone().into_iter().map(Ok));
    encoder
        .read_to_end(&mut encoded)
        .expect("re-encoding decoded blocks failed");
    assert_eq!(encoder.blocks(), blocks.len());

    let decoder = Decoder::new(&encoded[..], config()).expect("re-encoded header is invalid");
    assert_eq!(decoder.roots(), &roots[..]);
    let decoded: Vec<Block> = decoder
        .collect::<Result<_, _>>()
        .expect("re-encoded body is invalid");
    assert_eq!(decoded, blocks);
});
