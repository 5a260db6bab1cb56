//! QOI fixtures shared by the integration tests.
#![allow(dead_code, unused_imports)]

pub use scanguard_engine::testing::{Rgba, checker, encode, gradient, rgba_bytes};

/// A valid 4x3 RGBA stream.
pub fn small_image() -> Vec<u8> {
    encode(4, 3, 4, &checker(4, 3))
}

/// Stream whose chunk data stops partway through row `row`.
pub fn truncated_at_row(width: u32, height: u32, row: u32) -> Vec<u8> {
    // Distinct pixels with alternating alpha encode as 5-byte RGBA chunks.
    let pixels: Vec<Rgba> = (0..width * height)
        .map(|i| [i as u8, 0x80, (i >> 8) as u8, 0x7f + (i % 2) as u8])
        .collect();
    let mut data = encode(width, height, 4, &pixels);
    data.truncate(14 + (row * width) as usize * 5 + 2);
    data
}

/// The first `n` bytes of a valid header.
pub fn truncated_header(n: usize) -> Vec<u8> {
    small_image()[..n].to_vec()
}
