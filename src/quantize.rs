// quantize.rs
//
// Copyright (c) 2026  Douglas Lau
//
//! Color quantization (palette + color to index mapping)
use pix::el::Pixel;
use pix::rgb::{Rgb, SRgb8, SRgba8};

/// Alpha values below this are considered transparent
pub(crate) const ALPHA_THRESHOLD: u8 = 128;

/// A palette plus a deterministic mapping from colors to palette indices.
///
/// The palette must have no more than 256 entries, and `quantize` must
/// always return an index within it (or zero for an empty palette).
pub trait ColorQuantization: Send + Sync {
    /// Get the palette
    fn color_table(&self) -> &[SRgb8];

    /// Get the palette index for a color
    fn quantize(&self, clr: SRgb8) -> u8;
}

/// Get the red, green and blue channels of a color
pub(crate) fn channels(clr: SRgb8) -> [u8; 3] {
    [
        u8::from(Rgb::red(clr)),
        u8::from(Rgb::green(clr)),
        u8::from(Rgb::blue(clr)),
    ]
}

/// Drop the alpha channel of a color
pub(crate) fn opaque(clr: SRgba8) -> SRgb8 {
    SRgb8::new(
        u8::from(Rgb::red(clr)),
        u8::from(Rgb::green(clr)),
        u8::from(Rgb::blue(clr)),
    )
}

/// Check whether a color should be encoded as transparent
pub(crate) fn is_transparent(clr: SRgba8) -> bool {
    u8::from(Pixel::alpha(clr)) < ALPHA_THRESHOLD
}

/// Get the color table size exponent for a number of colors.
///
/// This is the smallest `s` where `2^(s+1)` entries can hold all colors.
pub fn table_exponent(n_colors: usize) -> u8 {
    let mut exp = 0;
    while (2 << exp) < n_colors && exp < 7 {
        exp += 1;
    }
    exp
}

/// Get the number of entries in a color table with a size exponent
pub fn table_len(exponent: u8) -> usize {
    2 << (exponent & 0b111)
}

/// Quantization with colors evenly spaced along each channel
#[derive(Debug, Clone)]
pub struct UniformQuantization {
    /// Palette colors
    palette: Vec<SRgb8>,
    /// Colors per channel
    per_channel: usize,
    /// Channel distance between colors
    stride: usize,
}

impl UniformQuantization {
    /// Create a uniform quantization with up to `color_count` colors.
    ///
    /// The palette holds the largest cube of colors that fits.
    pub fn new(color_count: usize) -> Self {
        let color_count = color_count.min(256);
        let mut per_channel = 1;
        while (per_channel + 1usize).pow(3) <= color_count {
            per_channel += 1;
        }
        let stride = 256 / per_channel;
        let mut palette = Vec::with_capacity(per_channel.pow(3));
        for r in 0..per_channel {
            for g in 0..per_channel {
                for b in 0..per_channel {
                    palette.push(SRgb8::new(
                        (r * stride) as u8,
                        (g * stride) as u8,
                        (b * stride) as u8,
                    ));
                }
            }
        }
        UniformQuantization {
            palette,
            per_channel,
            stride,
        }
    }
}

impl ColorQuantization for UniformQuantization {
    fn color_table(&self) -> &[SRgb8] {
        &self.palette
    }

    fn quantize(&self, clr: SRgb8) -> u8 {
        let n = self.per_channel;
        let [r, g, b] =
            channels(clr).map(|c| (usize::from(c) / self.stride).min(n - 1));
        (n * n * r + n * g + b) as u8
    }
}

/// Quantization by nearest entry of a fixed color table.
///
/// This is used for color tables read from a GIF, so that decoded frames
/// keep their original index assignment when encoded again.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    /// Palette colors
    palette: Vec<SRgb8>,
}

impl ColorTable {
    /// Create a color table (truncated to 256 colors)
    pub fn new(mut palette: Vec<SRgb8>) -> Self {
        palette.truncate(256);
        ColorTable { palette }
    }

    /// Create a color table from packed RGB bytes
    pub fn from_rgb(buf: &[u8]) -> Self {
        let palette = buf
            .chunks_exact(3)
            .map(|c| SRgb8::new(c[0], c[1], c[2]))
            .collect();
        Self::new(palette)
    }
}

impl ColorQuantization for ColorTable {
    fn color_table(&self) -> &[SRgb8] {
        &self.palette
    }

    fn quantize(&self, clr: SRgb8) -> u8 {
        if let Some(i) = self.palette.iter().position(|p| *p == clr) {
            return i as u8;
        }
        let [r, g, b] = channels(clr).map(i32::from);
        let mut best = (0, i32::MAX);
        for (i, p) in self.palette.iter().enumerate() {
            let [pr, pg, pb] = channels(*p).map(i32::from);
            let dist = (r - pr).pow(2) + (g - pg).pow(2) + (b - pb).pow(2);
            if dist < best.1 {
                best = (i, dist);
            }
        }
        best.0 as u8
    }
}
