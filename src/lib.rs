// lib.rs      gifkit crate.
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! A library for reading and writing animated GIF images.
//!
//! ## Decoding
//!
//! A [Decoder] reads a whole GIF into a [Gif], whose [Frame]s each carry
//! a `pix` raster of `SRgba8` pixels.
//!
//! ## Encoding
//!
//! A [Gif] can be built from rasters with [Gif::new] and
//! [Gif::push_frame].  Palettes are any [ColorQuantization], such as an
//! [Octree] built from an image.  An [Encoder] compresses frames in
//! parallel and writes them in order.
//!
//! [ColorQuantization]: quantize/trait.ColorQuantization.html
//! [Octree]: octree/struct.Octree.html
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod bits;
pub mod block;
mod decode;
mod encode;
mod error;
pub mod lzw;
pub mod octree;
pub mod packed;
mod pool;
mod private;
pub mod quantize;

pub use crate::error::{Error, Result};
pub use crate::octree::Octree;
pub use crate::private::{Decoder, Encoder, Frame, Gif};
pub use crate::quantize::{ColorQuantization, ColorTable, UniformQuantization};
