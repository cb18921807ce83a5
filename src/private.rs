// private.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! Private module for top-level items
use crate::{
    block::{
        Application, DisposalMethod, GraphicControl, Header, ImageDesc,
        ScreenDesc,
    },
    decode, encode,
    octree::Octree,
    pool,
    quantize::{table_exponent, ColorQuantization},
    Result,
};
use pix::rgb::SRgba8;
use pix::Raster;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Number of colors for generated palettes
const PALETTE_COLORS: usize = 255;

/// One frame of an animation.
///
/// A frame owns its raster, the image descriptor which places it on the
/// logical screen, an optional graphic control extension and an optional
/// local palette.
pub struct Frame {
    /// Frame raster
    pub(crate) raster: Raster<SRgba8>,
    /// Image descriptor
    pub(crate) image_desc: ImageDesc,
    /// Graphic control extension
    pub(crate) graphic_control: Option<GraphicControl>,
    /// Local color quantization
    pub(crate) local_palette: Option<Arc<dyn ColorQuantization>>,
}

/// An animated GIF.
///
/// ## Example: build a GIF
/// ```
/// use gifkit::{Frame, Gif};
/// use pix::{rgb::SRgba8, Raster};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut gif = Gif::new(16, 16);
/// let mut raster = Raster::with_clear(16, 16);
/// *raster.pixel_mut(4, 4) = SRgba8::new(0, 0, 255, 255);
/// gif.push_frame(Frame::new(raster)?.with_delay_time_cs(50));
/// let bytes = gif.to_bytes()?;
/// assert_eq!(&bytes[..6], b"GIF89a");
/// # Ok(())
/// # }
/// ```
pub struct Gif {
    /// Header block
    pub(crate) header: Header,
    /// Logical screen descriptor
    pub(crate) screen_desc: ScreenDesc,
    /// Global color quantization
    pub(crate) global_palette: Option<Arc<dyn ColorQuantization>>,
    /// Application extensions
    pub(crate) applications: Vec<Application>,
    /// Comment extensions
    pub(crate) comments: Vec<String>,
    /// Animation frames
    pub(crate) frames: Vec<Frame>,
}

impl Clone for Frame {
    fn clone(&self) -> Self {
        Frame {
            raster: Raster::with_raster(&self.raster),
            image_desc: self.image_desc,
            graphic_control: self.graphic_control,
            local_palette: self.local_palette.clone(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Frame")
            .field("image_desc", &self.image_desc)
            .field("graphic_control", &self.graphic_control)
            .field(
                "local_palette",
                &self.local_palette.as_ref().map(|p| p.color_table().len()),
            )
            .finish()
    }
}

impl Frame {
    /// Create a frame from a raster.
    ///
    /// The frame is placed at the screen origin, and has a graphic control
    /// extension with `Clear` disposal, no delay and transparent color
    /// index `0xFF`.
    pub fn new(raster: Raster<SRgba8>) -> Result<Self> {
        let image_desc = ImageDesc::default()
            .with_width(u16::try_from(raster.width())?)
            .with_height(u16::try_from(raster.height())?);
        let graphic_control = GraphicControl::default()
            .with_disposal_method(DisposalMethod::Clear)
            .with_transparent(true)
            .with_transparent_color_idx(0xFF);
        Ok(Frame {
            raster,
            image_desc,
            graphic_control: Some(graphic_control),
            local_palette: None,
        })
    }

    /// Adjust the delay time (centiseconds)
    pub fn with_delay_time_cs(mut self, delay: u16) -> Self {
        let ctrl = self.graphic_control.unwrap_or_default();
        self.graphic_control = Some(ctrl.with_delay_time_cs(delay));
        self
    }

    /// Adjust the disposal method
    pub fn with_disposal_method(mut self, method: DisposalMethod) -> Self {
        let ctrl = self.graphic_control.unwrap_or_default();
        self.graphic_control = Some(ctrl.with_disposal_method(method));
        self
    }

    /// Adjust the position on the logical screen
    pub fn with_position(mut self, left: u16, top: u16) -> Self {
        self.image_desc = self.image_desc.with_left(left).with_top(top);
        self
    }

    /// Set a local palette
    pub fn with_local_palette(
        mut self,
        palette: Arc<dyn ColorQuantization>,
    ) -> Self {
        let exp = table_exponent(palette.color_table().len());
        self.image_desc = self
            .image_desc
            .with_local_table(true)
            .with_table_exponent(exp);
        self.local_palette = Some(palette);
        self
    }

    /// Replace (or remove) the graphic control extension
    pub fn with_graphic_control(
        mut self,
        graphic_control: Option<GraphicControl>,
    ) -> Self {
        self.graphic_control = graphic_control;
        self
    }

    /// Get the raster
    pub fn raster(&self) -> &Raster<SRgba8> {
        &self.raster
    }

    /// Get the image descriptor
    pub fn image_desc(&self) -> ImageDesc {
        self.image_desc
    }

    /// Get the graphic control extension
    pub fn graphic_control(&self) -> Option<GraphicControl> {
        self.graphic_control
    }

    /// Get the local palette
    pub fn local_palette(&self) -> Option<&dyn ColorQuantization> {
        self.local_palette.as_deref()
    }

    /// Get the delay time in centiseconds
    pub fn delay_time_cs(&self) -> u16 {
        self.graphic_control
            .map(|c| c.delay_time_cs())
            .unwrap_or_default()
    }

    /// Get the disposal method
    pub fn disposal_method(&self) -> DisposalMethod {
        self.graphic_control
            .map(|c| c.disposal_method())
            .unwrap_or_default()
    }

    /// Get the transparent color index
    pub fn transparent_color(&self) -> Option<u8> {
        self.graphic_control.and_then(|c| c.transparent_color())
    }
}

impl Clone for Gif {
    fn clone(&self) -> Self {
        Gif {
            header: self.header,
            screen_desc: self.screen_desc,
            global_palette: self.global_palette.clone(),
            applications: self.applications.clone(),
            comments: self.comments.clone(),
            frames: self.frames.clone(),
        }
    }
}

impl fmt::Debug for Gif {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Gif")
            .field("header", &self.header)
            .field("screen_desc", &self.screen_desc)
            .field(
                "global_palette",
                &self.global_palette.as_ref().map(|p| p.color_table().len()),
            )
            .field("applications", &self.applications)
            .field("comments", &self.comments)
            .field("frames", &self.frames)
            .finish()
    }
}

impl Gif {
    /// Create an empty GIF, looping forever
    pub fn new(width: u16, height: u16) -> Self {
        let screen_desc = ScreenDesc::default()
            .with_width(width)
            .with_height(height)
            .with_color_resolution(7)
            .with_background_color_idx(0xFF);
        Gif {
            header: Header::default(),
            screen_desc,
            global_palette: None,
            applications: vec![Application::Looping(0)],
            comments: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Create an empty GIF with a global palette quantized from a raster
    pub fn quantizing_image(raster: &Raster<SRgba8>) -> Result<Self> {
        let width = u16::try_from(raster.width())?;
        let height = u16::try_from(raster.height())?;
        let palette = Octree::from_raster(raster, PALETTE_COLORS);
        Ok(Self::new(width, height).with_global_palette(Arc::new(palette)))
    }

    /// Decode a GIF from a buffer
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Decoder::new(buf).decode()
    }

    /// Encode into a buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode::encode_gif(self, pool::default_threads())
    }

    /// Set the global palette
    pub fn with_global_palette(
        mut self,
        palette: Arc<dyn ColorQuantization>,
    ) -> Self {
        self.set_global_palette(Some(palette));
        self
    }

    /// Set (or remove) the global palette
    pub fn set_global_palette(
        &mut self,
        palette: Option<Arc<dyn ColorQuantization>>,
    ) {
        self.screen_desc = match &palette {
            Some(p) => self
                .screen_desc
                .with_global_table(true)
                .with_table_exponent(table_exponent(p.color_table().len())),
            None => self.screen_desc.with_global_table(false),
        };
        self.global_palette = palette;
    }

    /// Get the header
    pub fn header(&self) -> Header {
        self.header
    }

    /// Get the logical screen descriptor
    pub fn screen_desc(&self) -> ScreenDesc {
        self.screen_desc
    }

    /// Get the global palette
    pub fn global_palette(&self) -> Option<&dyn ColorQuantization> {
        self.global_palette.as_deref()
    }

    /// Get the application extensions
    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Get the comments
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Add a comment
    pub fn push_comment<S: Into<String>>(&mut self, comment: S) {
        self.comments.push(comment.into());
    }

    /// Get the frames
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Get the loop count (zero means loop forever)
    pub fn loop_count(&self) -> Option<u16> {
        self.applications.iter().find_map(|a| a.loop_count())
    }

    /// Set the loop count, or remove the looping extension with `None`
    pub fn set_loop_count(&mut self, loop_count: Option<u16>) {
        self.applications
            .retain(|a| !matches!(a, Application::Looping(_)));
        if let Some(count) = loop_count {
            self.applications.insert(0, Application::Looping(count));
        }
    }

    /// Append a frame.
    ///
    /// If neither the GIF nor the frame has a palette, a global palette is
    /// quantized from the frame's raster.
    pub fn push_frame(&mut self, frame: Frame) {
        if self.global_palette.is_none() && frame.local_palette.is_none() {
            debug!("quantizing global palette");
            let palette = Octree::from_raster(&frame.raster, PALETTE_COLORS);
            self.set_global_palette(Some(Arc::new(palette)));
        }
        self.frames.push(frame);
    }
}

/// GIF decoder
///
/// ## Example: decode a GIF
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let gif = &[
/// #   0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00,
/// #   0x02, 0x00, 0x80, 0x01, 0x00, 0x00, 0x00, 0x00,
/// #   0xff, 0xff, 0xff, 0x2c, 0x00, 0x00, 0x00, 0x00,
/// #   0x02, 0x00, 0x02, 0x00, 0x00, 0x02, 0x03, 0x0c,
/// #   0x10, 0x05, 0x00, 0x3b,
/// # ][..];
/// // ... open a `File` as "gif"
/// let gif = gifkit::Decoder::new(gif).decode()?;
/// for frame in gif.frames() {
///     let raster = frame.raster();
///     // ... work with raster
/// #   assert_eq!(raster.width(), 2);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Decoder<R: Read> {
    /// Reader for input data
    reader: R,
    /// Maximum image size, in pixels
    max_image_sz: Option<usize>,
    /// Skip unsupported extensions
    skip_unknown_extensions: bool,
}

impl<R: Read> Decoder<R> {
    /// Create a new GIF decoder.
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            max_image_sz: Some(1 << 25),
            skip_unknown_extensions: false,
        }
    }

    /// Set the maximum image size (in pixels) to allow for decoding.
    pub fn max_image_sz(mut self, max_image_sz: Option<usize>) -> Self {
        self.max_image_sz = max_image_sz;
        self
    }

    /// Skip unsupported extensions instead of failing.
    pub fn skip_unknown_extensions(mut self, skip: bool) -> Self {
        self.skip_unknown_extensions = skip;
        self
    }

    /// Read all input and decode it
    pub fn decode(mut self) -> Result<Gif> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        let config = decode::Config {
            max_image_sz: self.max_image_sz,
            skip_unknown_extensions: self.skip_unknown_extensions,
        };
        decode::decode_gif(&buf, config)
    }
}

/// GIF encoder
///
/// ## Encoding Example
/// ```
/// use gifkit::{Encoder, Frame, Gif};
/// use pix::{rgb::SRgba8, Raster};
/// use std::error::Error;
/// use std::io::Write;
///
/// fn encode<W: Write>(mut w: W) -> Result<(), Box<dyn Error>> {
///     let mut raster = Raster::with_clear(4, 4);
///     *raster.pixel_mut(0, 0) = SRgba8::new(0xFF, 0, 0, 0xFF);
///     *raster.pixel_mut(1, 1) = SRgba8::new(0xFF, 0xFF, 0, 0xFF);
///     let mut gif = Gif::quantizing_image(&raster)?;
///     gif.push_frame(Frame::new(raster)?);
///     Encoder::new(&mut w).threads(Some(1)).encode(&gif)?;
///     Ok(())
/// }
/// # encode(Vec::new()).unwrap();
/// ```
pub struct Encoder<W: Write> {
    /// Writer for output data
    writer: W,
    /// Number of frame encoding threads
    threads: Option<usize>,
}

impl<W: Write> Encoder<W> {
    /// Create a new GIF encoder.
    pub fn new(writer: W) -> Self {
        Encoder {
            writer,
            threads: None,
        }
    }

    /// Set the number of frame encoding threads (default: hardware
    /// concurrency).
    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Encode a GIF.
    ///
    /// Nothing is written unless the entire GIF encodes successfully.
    pub fn encode(mut self, gif: &Gif) -> Result<()> {
        let threads = self.threads.unwrap_or_else(pool::default_threads);
        let buf = encode::encode_gif(gif, threads)?;
        self.writer.write_all(&buf)?;
        self.writer.flush()?;
        Ok(())
    }
}
