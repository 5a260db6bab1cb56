// crates/scanguard-engine/src/color.rs
//
// Output pixel layouts and the per-pixel conversion from decoded RGBA.

use std::fmt;

use crate::qoi::Pixel;

/// Output color space requested from the engine.
///
/// The `X` variants write an opaque `0xFF` filler byte in place of alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Grayscale,
    Rgb,
    Rgba,
    Bgra,
    Argb,
    Abgr,
    Rgbx,
    Bgrx,
    Xrgb,
    Xbgr,
}

impl ColorSpace {
    /// Bytes written per pixel.
    pub fn components(self) -> usize {
        match self {
            ColorSpace::Grayscale => 1,
            ColorSpace::Rgb => 3,
            _ => 4,
        }
    }

    /// Whether the layout carries the stream's alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            ColorSpace::Rgba | ColorSpace::Bgra | ColorSpace::Argb | ColorSpace::Abgr
        )
    }

    pub(crate) fn write_pixel(self, px: Pixel, out: &mut [u8]) {
        let [r, g, b, a] = px;
        match self {
            ColorSpace::Grayscale => out[0] = luma(r, g, b),
            ColorSpace::Rgb => out[..3].copy_from_slice(&[r, g, b]),
            ColorSpace::Rgba => out[..4].copy_from_slice(&[r, g, b, a]),
            ColorSpace::Bgra => out[..4].copy_from_slice(&[b, g, r, a]),
            ColorSpace::Argb => out[..4].copy_from_slice(&[a, r, g, b]),
            ColorSpace::Abgr => out[..4].copy_from_slice(&[a, b, g, r]),
            ColorSpace::Rgbx => out[..4].copy_from_slice(&[r, g, b, 0xff]),
            ColorSpace::Bgrx => out[..4].copy_from_slice(&[b, g, r, 0xff]),
            ColorSpace::Xrgb => out[..4].copy_from_slice(&[0xff, r, g, b]),
            ColorSpace::Xbgr => out[..4].copy_from_slice(&[0xff, b, g, r]),
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorSpace::Grayscale => "gray",
            ColorSpace::Rgb => "rgb",
            ColorSpace::Rgba => "rgba",
            ColorSpace::Bgra => "bgra",
            ColorSpace::Argb => "argb",
            ColorSpace::Abgr => "abgr",
            ColorSpace::Rgbx => "rgbx",
            ColorSpace::Bgrx => "bgrx",
            ColorSpace::Xrgb => "xrgb",
            ColorSpace::Xbgr => "xbgr",
        };
        f.write_str(name)
    }
}

/// ITU-R BT.601 luma, rounded.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000;
    y as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(space: ColorSpace, px: Pixel) -> Vec<u8> {
        let mut out = vec![0; space.components()];
        space.write_pixel(px, &mut out);
        out
    }

    #[test]
    fn component_counts() {
        assert_eq!(ColorSpace::Grayscale.components(), 1);
        assert_eq!(ColorSpace::Rgb.components(), 3);
        assert_eq!(ColorSpace::Xbgr.components(), 4);
    }

    #[test]
    fn channel_orders() {
        let px = [1, 2, 3, 4];
        assert_eq!(convert(ColorSpace::Rgb, px), [1, 2, 3]);
        assert_eq!(convert(ColorSpace::Rgba, px), [1, 2, 3, 4]);
        assert_eq!(convert(ColorSpace::Bgra, px), [3, 2, 1, 4]);
        assert_eq!(convert(ColorSpace::Argb, px), [4, 1, 2, 3]);
        assert_eq!(convert(ColorSpace::Abgr, px), [4, 3, 2, 1]);
    }

    #[test]
    fn filler_layouts_are_opaque() {
        let px = [1, 2, 3, 4];
        assert_eq!(convert(ColorSpace::Rgbx, px), [1, 2, 3, 255]);
        assert_eq!(convert(ColorSpace::Bgrx, px), [3, 2, 1, 255]);
        assert_eq!(convert(ColorSpace::Xrgb, px), [255, 1, 2, 3]);
        assert_eq!(convert(ColorSpace::Xbgr, px), [255, 3, 2, 1]);
        assert!(!ColorSpace::Rgbx.has_alpha());
        assert!(ColorSpace::Abgr.has_alpha());
    }

    #[test]
    fn grayscale_uses_luma() {
        assert_eq!(convert(ColorSpace::Grayscale, [255, 255, 255, 0]), [255]);
        assert_eq!(convert(ColorSpace::Grayscale, [0, 0, 0, 255]), [0]);
        assert_eq!(convert(ColorSpace::Grayscale, [255, 0, 0, 255]), [76]);
    }
}
