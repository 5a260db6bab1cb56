//! QOI stream builders for tests.
//!
//! Compiled for this crate's own tests and, through the `testing` feature,
//! for dependents' tests.

use crate::qoi::{END_MARKER, MAGIC};

pub type Rgba = [u8; 4];

fn hash(px: Rgba) -> usize {
    let [r, g, b, a] = px;
    (usize::from(r) * 3 + usize::from(g) * 5 + usize::from(b) * 7 + usize::from(a) * 11) % 64
}

/// Encode `pixels` (row-major RGBA) as a complete QOI stream, using every
/// chunk type.
pub fn encode(width: u32, height: u32, channels: u8, pixels: &[Rgba]) -> Vec<u8> {
    assert_eq!(pixels.len(), (width * height) as usize);
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.push(channels);
    out.push(0);

    let mut index = [[0u8; 4]; 64];
    let mut prev: Rgba = [0, 0, 0, 255];
    let mut run = 0u8;

    for &px in pixels {
        if px == prev {
            run += 1;
            if run == 62 {
                out.push(0xc0 | (run - 1));
                run = 0;
            }
            continue;
        }
        if run > 0 {
            out.push(0xc0 | (run - 1));
            run = 0;
        }

        let h = hash(px);
        if index[h] == px {
            out.push(h as u8);
        } else {
            index[h] = px;
            if px[3] == prev[3] {
                let vr = px[0].wrapping_sub(prev[0]) as i8;
                let vg = px[1].wrapping_sub(prev[1]) as i8;
                let vb = px[2].wrapping_sub(prev[2]) as i8;
                let vg_r = vr.wrapping_sub(vg);
                let vg_b = vb.wrapping_sub(vg);
                let small = -2..=1;
                if small.contains(&vr) && small.contains(&vg) && small.contains(&vb) {
                    out.push(
                        0x40 | ((vr + 2) as u8) << 4 | ((vg + 2) as u8) << 2 | (vb + 2) as u8,
                    );
                } else if (-32..=31).contains(&vg)
                    && (-8..=7).contains(&vg_r)
                    && (-8..=7).contains(&vg_b)
                {
                    out.push(0x80 | (vg + 32) as u8);
                    out.push(((vg_r + 8) as u8) << 4 | (vg_b + 8) as u8);
                } else {
                    out.extend_from_slice(&[0xfe, px[0], px[1], px[2]]);
                }
            } else {
                out.extend_from_slice(&[0xff, px[0], px[1], px[2], px[3]]);
            }
        }
        prev = px;
    }
    if run > 0 {
        out.push(0xc0 | (run - 1));
    }
    out.extend_from_slice(&END_MARKER);
    out
}

/// Smooth gradient with repeats, so DIFF, LUMA, INDEX and RUN all appear.
pub fn gradient(width: u32, height: u32) -> Vec<Rgba> {
    (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                if x % 7 == 6 {
                    [0, 0, 0, 255]
                } else {
                    [(x * 3) as u8, (y * 5) as u8, (x + y) as u8, 255]
                }
            })
        })
        .collect()
}

pub fn checker(width: u32, height: u32) -> Vec<Rgba> {
    (0..width * height)
        .map(|i| if i % 2 == 0 { [255, 0, 0, 255] } else { [0, 0, 255, 128] })
        .collect()
}

/// Flatten RGBA pixels into bytes.
pub fn rgba_bytes(pixels: &[Rgba]) -> Vec<u8> {
    pixels.iter().flatten().copied().collect()
}
