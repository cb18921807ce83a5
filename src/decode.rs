// decode.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! GIF decoding
use crate::bits::BitReader;
use crate::block::*;
use crate::error::{Error, Result};
use crate::lzw::Decompressor;
use crate::private::{Frame, Gif};
use crate::quantize::{table_len, ColorQuantization, ColorTable};
use pix::rgb::SRgba8;
use pix::Raster;
use std::sync::Arc;

/// Decoder configuration
#[derive(Clone, Copy, Debug)]
pub(crate) struct Config {
    /// Maximum image size, in pixels
    pub max_image_sz: Option<usize>,
    /// Skip over unsupported extensions
    pub skip_unknown_extensions: bool,
}

/// Forward-only cursor over GIF bytes
struct Cursor<'a> {
    /// Input buffer
    buf: &'a [u8],
    /// Current offset
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Get the number of unread bytes
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Peek at a byte ahead of the cursor
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.buf.get(self.pos + ahead).copied()
    }

    /// Read one byte
    fn byte(&mut self) -> Result<u8> {
        let b = self.peek(0).ok_or(Error::UnexpectedEndOfFile)?;
        self.pos += 1;
        Ok(b)
    }

    /// Read a little-endian u16
    fn u16(&mut self) -> Result<u16> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Read a slice of bytes
    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEndOfFile);
        }
        let buf = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(buf)
    }

    /// Read sub-blocks until the zero-length terminator
    fn sub_blocks(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let len = usize::from(self.byte()?);
            if len == 0 {
                return Ok(data);
            }
            data.extend_from_slice(self.bytes(len)?);
        }
    }

    /// Expect a block terminator
    fn terminator(&mut self) -> Result<()> {
        match self.byte()? {
            0 => Ok(()),
            _ => Err(Error::InvalidBlockTerminator),
        }
    }
}

/// GIF parser state
struct Parser<'a> {
    /// Input cursor
    cursor: Cursor<'a>,
    /// Decoder configuration
    config: Config,
    /// Global color table
    global: Option<Arc<dyn ColorQuantization>>,
}

/// Decode a GIF from a buffer
pub(crate) fn decode_gif(buf: &[u8], config: Config) -> Result<Gif> {
    let mut parser = Parser {
        cursor: Cursor { buf, pos: 0 },
        config,
        global: None,
    };
    parser.parse()
}

impl<'a> Parser<'a> {
    /// Parse all blocks
    fn parse(&mut self) -> Result<Gif> {
        let header = self.parse_header()?;
        let screen_desc = self.parse_screen_desc()?;
        if screen_desc.global_table() {
            let table = self.parse_color_table(screen_desc.table_exponent())?;
            self.global = Some(Arc::new(table));
        }
        let mut gif = Gif {
            header,
            screen_desc,
            global_palette: self.global.clone(),
            applications: Vec::new(),
            comments: Vec::new(),
            frames: Vec::new(),
        };
        // an unknown lead byte is a bad trailer once any block was read
        let mut any_block = false;
        loop {
            match (self.cursor.peek(0), self.cursor.peek(1)) {
                (Some(EXTENSION), Some(GRAPHIC_CONTROL)) => {
                    self.cursor.pos += 2;
                    let ctrl = self.parse_graphic_control()?;
                    if self.cursor.peek(0) != Some(IMAGE_DESC) {
                        return Err(Error::MissingImageDescriptor);
                    }
                    gif.frames.push(self.parse_frame(Some(ctrl))?);
                }
                (Some(EXTENSION), Some(APPLICATION)) => {
                    self.cursor.pos += 2;
                    if let Some(app) = self.parse_application()? {
                        gif.applications.push(app);
                    }
                }
                (Some(EXTENSION), Some(COMMENT)) => {
                    self.cursor.pos += 2;
                    gif.comments.push(self.parse_comment()?);
                }
                (Some(EXTENSION), Some(label)) => {
                    if !self.config.skip_unknown_extensions {
                        return Err(Error::UnrecognizedBlock([
                            EXTENSION, label,
                        ]));
                    }
                    warn!("skipping extension: {:#04X}", label);
                    self.cursor.pos += 2;
                    self.cursor.sub_blocks()?;
                }
                (Some(EXTENSION), None) => {
                    return Err(Error::UnexpectedEndOfFile)
                }
                (Some(IMAGE_DESC), _) => {
                    gif.frames.push(self.parse_frame(None)?);
                }
                (Some(b), next) if b != TRAILER && !any_block => {
                    return Err(Error::UnrecognizedBlock([
                        b,
                        next.unwrap_or_default(),
                    ]));
                }
                _ => break,
            }
            any_block = true;
        }
        self.parse_trailer()?;
        Ok(gif)
    }

    /// Parse the header block
    fn parse_header(&mut self) -> Result<Header> {
        let buf = self.cursor.bytes(6)?;
        let mut sig = [0; 6];
        sig.copy_from_slice(buf);
        match &sig {
            b"GIF87a" | b"GIF89a" => {
                debug!("header: {:?}", String::from_utf8_lossy(&sig));
                Ok(Header::with_version([sig[3], sig[4], sig[5]]))
            }
            _ => Err(Error::InvalidHeader(sig)),
        }
    }

    /// Parse the logical screen descriptor block
    fn parse_screen_desc(&mut self) -> Result<ScreenDesc> {
        let width = self.cursor.u16()?;
        let height = self.cursor.u16()?;
        let flags = self.cursor.byte()?;
        let bg_color = self.cursor.byte()?;
        let aspect = self.cursor.byte()?;
        let desc = ScreenDesc::default()
            .with_width(width)
            .with_height(height)
            .with_flags(flags)
            .with_background_color_idx(bg_color)
            .with_pixel_aspect_ratio(aspect);
        debug!("screen: {:?}", desc);
        Ok(desc)
    }

    /// Parse a color table
    fn parse_color_table(&mut self, exponent: u8) -> Result<ColorTable> {
        let len = table_len(exponent);
        debug!("color table: {} entries", len);
        Ok(ColorTable::from_rgb(self.cursor.bytes(len * 3)?))
    }

    /// Parse a graphic control extension (after label)
    fn parse_graphic_control(&mut self) -> Result<GraphicControl> {
        if self.cursor.byte()? != 4 {
            return Err(Error::InvalidBlockSize);
        }
        let flags = self.cursor.byte()?;
        let delay = self.cursor.u16()?;
        let idx = self.cursor.byte()?;
        self.cursor.terminator()?;
        let ctrl = GraphicControl::default()
            .with_flags(flags)?
            .with_delay_time_cs(delay)
            .with_transparent_color_idx(idx);
        debug!("graphic control: {:?}", ctrl);
        Ok(ctrl)
    }

    /// Parse an application extension (after label)
    fn parse_application(&mut self) -> Result<Option<Application>> {
        if self.cursor.byte()? != 11 {
            return Err(Error::InvalidBlockSize);
        }
        let app_id = self.cursor.bytes(11)?;
        let app_str = std::str::from_utf8(app_id)
            .map_err(|_| Error::InvalidStringEncoding)?;
        if !Application::is_looping(app_id) {
            if self.config.skip_unknown_extensions {
                warn!("skipping application extension: {}", app_str);
                self.cursor.sub_blocks()?;
                return Ok(None);
            }
            return Err(Error::InvalidLoopingExtension);
        }
        if self.cursor.byte()? != 3 {
            return Err(Error::InvalidBlockSize);
        }
        if self.cursor.byte()? != 1 {
            return Err(Error::InvalidLoopingExtension);
        }
        let loop_count = self.cursor.u16()?;
        self.cursor.terminator()?;
        debug!("application: {} loop count {}", app_str, loop_count);
        Ok(Some(Application::Looping(loop_count)))
    }

    /// Parse a comment extension (after label)
    fn parse_comment(&mut self) -> Result<String> {
        let data = self.cursor.sub_blocks()?;
        let comment =
            String::from_utf8(data).map_err(|_| Error::InvalidStringEncoding)?;
        debug!("comment: {:?}", comment);
        Ok(comment)
    }

    /// Parse an image descriptor, color table and image data
    fn parse_frame(&mut self, ctrl: Option<GraphicControl>) -> Result<Frame> {
        // image separator
        self.cursor.byte()?;
        let left = self.cursor.u16()?;
        let top = self.cursor.u16()?;
        let width = self.cursor.u16()?;
        let height = self.cursor.u16()?;
        let flags = self.cursor.byte()?;
        let desc = ImageDesc::default()
            .with_left(left)
            .with_top(top)
            .with_width(width)
            .with_height(height)
            .with_flags(flags);
        debug!("image: {:?}", desc);
        let image_sz = desc.image_sz();
        if let Some(max) = self.config.max_image_sz {
            if image_sz > max {
                return Err(Error::TooLargeImage);
            }
        }
        let local: Option<Arc<dyn ColorQuantization>> = if desc.local_table() {
            Some(Arc::new(self.parse_color_table(desc.table_exponent())?))
        } else {
            None
        };
        let indices = self.parse_image_data(image_sz)?;
        let palette = local
            .as_ref()
            .or(self.global.as_ref())
            .ok_or(Error::MissingColorTable)?;
        let transparent = ctrl.and_then(|c| c.transparent_color());
        let raster = index_raster(&desc, &indices, &**palette, transparent)?;
        Ok(Frame {
            raster,
            image_desc: desc,
            graphic_control: ctrl,
            local_palette: local,
        })
    }

    /// Parse LZW image data into color indices
    fn parse_image_data(&mut self, image_sz: usize) -> Result<Vec<u8>> {
        let min_code_size = self.cursor.byte()?;
        if min_code_size > 8 {
            return Err(Error::InvalidCodeSize);
        }
        let data = self.cursor.sub_blocks()?;
        debug!("image data: {} bytes", data.len());
        let mut indices = Vec::with_capacity(image_sz);
        let mut dec = Decompressor::new(min_code_size.max(2));
        let mut reader = BitReader::new(&data);
        let full = dec.decompress_max(&mut reader, &mut indices, image_sz)?;
        if indices.len() < image_sz {
            return Err(Error::IncompleteImageData);
        }
        if full {
            let mut extra = indices.split_off(image_sz);
            dec.decompress_next(&mut reader, &mut extra)?;
            if !extra.is_empty() {
                warn!("extra image data after {} indices", image_sz);
            }
        }
        Ok(indices)
    }

    /// Parse the trailer
    fn parse_trailer(&mut self) -> Result<()> {
        match self.cursor.byte()? {
            TRAILER => {
                if self.cursor.remaining() > 0 {
                    warn!("{} bytes after trailer", self.cursor.remaining());
                }
                Ok(())
            }
            b => Err(Error::InvalidTrailer(b)),
        }
    }
}

/// Make a raster from color indices
fn index_raster(
    desc: &ImageDesc,
    indices: &[u8],
    palette: &dyn ColorQuantization,
    transparent: Option<u8>,
) -> Result<Raster<SRgba8>> {
    let table = palette.color_table();
    let mut raster = Raster::with_clear(
        u32::from(desc.width()),
        u32::from(desc.height()),
    );
    for (p, idx) in raster.pixels_mut().iter_mut().zip(indices) {
        *p = if Some(*idx) == transparent {
            SRgba8::new(0, 0, 0, 0)
        } else {
            let clr = table
                .get(usize::from(*idx))
                .ok_or(Error::InvalidColorIndex)?;
            let [r, g, b] = crate::quantize::channels(*clr);
            SRgba8::new(r, g, b, 255)
        };
    }
    Ok(raster)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bits::BitStream;
    use crate::lzw::Compressor;

    const CONFIG: Config = Config {
        max_image_sz: Some(1 << 25),
        skip_unknown_extensions: false,
    };

    // 10x10 sample with a graphic control extension
    const SAMPLE: [u8; 69] = [
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x0A, 0x00, 0x0A, 0x00, 0x91,
        0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF,
        0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x2C, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x0A, 0x00, 0x00, 0x02,
        0x16, 0x8C, 0x2D, 0x99, 0x87, 0x2A, 0x1C, 0xDC, 0x33, 0xA0, 0x02,
        0x75, 0xEC, 0x95, 0xFA, 0xA8, 0xDE, 0x60, 0x8C, 0x04, 0x91, 0x4C,
        0x01, 0x00, 0x3B,
    ];

    // 2x2 image without graphic control
    const TINY: [u8; 36] = [
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x02, 0x00, 0x80,
        0x01, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x02, 0x00, 0x02, 0x00, 0x00, 0x02, 0x03, 0x0c, 0x10,
        0x05, 0x00, 0x3b,
    ];

    #[rustfmt::skip]
    const INDICES: [u8; 100] = [
        1, 1, 1, 1, 1, 2, 2, 2, 2, 2,
        1, 1, 1, 1, 1, 2, 2, 2, 2, 2,
        1, 1, 1, 1, 1, 2, 2, 2, 2, 2,
        1, 1, 1, 0, 0, 0, 0, 2, 2, 2,
        1, 1, 1, 0, 0, 0, 0, 2, 2, 2,
        2, 2, 2, 0, 0, 0, 0, 1, 1, 1,
        2, 2, 2, 0, 0, 0, 0, 1, 1, 1,
        2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
        2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
        2, 2, 2, 2, 2, 1, 1, 1, 1, 1,
    ];

    #[test]
    fn simple_1() -> Result<()> {
        let gif = decode_gif(&SAMPLE, CONFIG)?;
        assert_eq!(gif.header().version(), *b"89a");
        assert_eq!(gif.screen_desc().width(), 10);
        assert_eq!(gif.screen_desc().color_resolution(), 1);
        assert_eq!(gif.frames().len(), 1);
        let palette = gif.global_palette().unwrap().color_table().to_vec();
        assert_eq!(palette.len(), 4);
        let frame = &gif.frames()[0];
        assert_eq!(frame.delay_time_cs(), 0);
        assert!(frame.local_palette().is_none());
        for (p, idx) in frame.raster().pixels().iter().zip(INDICES.iter()) {
            let [r, g, b] = crate::quantize::channels(palette[*idx as usize]);
            assert_eq!(*p, SRgba8::new(r, g, b, 255));
        }
        Ok(())
    }

    #[test]
    fn tiny() -> Result<()> {
        let gif = decode_gif(&TINY, CONFIG)?;
        assert_eq!(gif.frames().len(), 1);
        let frame = &gif.frames()[0];
        assert!(frame.graphic_control().is_none());
        assert_eq!(frame.raster().width(), 2);
        let white = SRgba8::new(255, 255, 255, 255);
        let black = SRgba8::new(0, 0, 0, 255);
        assert_eq!(frame.raster().pixels(), &[white, black, black, white]);
        assert_eq!(gif.loop_count(), None);
        Ok(())
    }

    #[test]
    fn invalid_header() {
        let mut buf = TINY;
        buf[4] = b'8';
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidHeader(sig)) if &sig == b"GIF88a"
        ));
    }

    #[test]
    fn truncated() {
        for len in 0..TINY.len() {
            assert!(matches!(
                decode_gif(&TINY[..len], CONFIG),
                Err(Error::UnexpectedEndOfFile)
            ));
        }
    }

    #[test]
    fn invalid_trailer() {
        let mut buf = TINY;
        buf[35] = 0x3A;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidTrailer(0x3A))
        ));
    }

    #[test]
    fn unknown_lead_byte() {
        let mut buf = TINY;
        buf[19] = 0x00;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::UnrecognizedBlock([0x00, 0x00]))
        ));
        // after a frame, it is in trailer position
        let mut buf = TINY.to_vec();
        buf.insert(35, 0x00);
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidTrailer(0x00))
        ));
    }

    #[test]
    fn too_large() {
        let config = Config {
            max_image_sz: Some(3),
            ..CONFIG
        };
        assert!(matches!(
            decode_gif(&TINY, config),
            Err(Error::TooLargeImage)
        ));
    }

    #[test]
    fn missing_color_table() {
        let mut buf = TINY.to_vec();
        // clear global table flag, and remove table
        buf[10] = 0x00;
        buf.drain(13..19);
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::MissingColorTable)
        ));
    }

    #[test]
    fn missing_image_desc() {
        let mut buf = SAMPLE.to_vec();
        buf[33] = 0x3B;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::MissingImageDescriptor)
        ));
    }

    #[test]
    fn invalid_disposal() {
        let mut buf = SAMPLE.to_vec();
        buf[28] = 0b0001_1000;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidDisposalMethod(6))
        ));
    }

    #[test]
    fn invalid_gce_size() {
        let mut buf = SAMPLE.to_vec();
        buf[27] = 0x05;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidBlockSize)
        ));
        let mut buf = SAMPLE.to_vec();
        buf[32] = 0x01;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidBlockTerminator)
        ));
    }

    #[test]
    fn unrecognized_block() {
        let mut buf = SAMPLE.to_vec();
        buf[26] = 0x01;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::UnrecognizedBlock([0x21, 0x01]))
        ));
    }

    #[test]
    fn skip_unknown() -> Result<()> {
        let mut buf = TINY.to_vec();
        let ext = [
            0x21, 0xFF, 0x0B, b'X', b'M', b'P', b' ', b'D', b'a', b't', b'a',
            b'X', b'M', b'P', 0x02, 0xAB, 0xCD, 0x00, 0x21, 0x01, 0x01, 0x00,
            0x00,
        ];
        buf.splice(19..19, ext.iter().copied());
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidLoopingExtension)
        ));
        let config = Config {
            skip_unknown_extensions: true,
            ..CONFIG
        };
        let gif = decode_gif(&buf, config)?;
        assert!(gif.applications().is_empty());
        assert_eq!(gif.frames().len(), 1);
        Ok(())
    }

    #[test]
    fn looping_and_comment() -> Result<()> {
        let mut buf = TINY.to_vec();
        let ext = [
            0x21, 0xFF, 0x0B, b'N', b'E', b'T', b'S', b'C', b'A', b'P', b'E',
            b'2', b'.', b'0', 0x03, 0x01, 0x05, 0x00, 0x00, 0x21, 0xFE, 0x02,
            b'h', b'i', 0x01, b'!', 0x00,
        ];
        buf.splice(19..19, ext.iter().copied());
        let gif = decode_gif(&buf, CONFIG)?;
        assert_eq!(gif.loop_count(), Some(5));
        assert_eq!(gif.comments(), &["hi!".to_string()]);
        // invalid looping sub-block id
        buf[34] = 0x02;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidLoopingExtension)
        ));
        Ok(())
    }

    #[test]
    fn invalid_comment() {
        let mut buf = TINY.to_vec();
        buf.splice(19..19, [0x21, 0xFE, 0x02, 0xC3, 0x28, 0x00]);
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidStringEncoding)
        ));
    }

    #[test]
    fn transparent_index() -> Result<()> {
        let mut buf = SAMPLE.to_vec();
        // transparent flag, index 2
        buf[28] = 0x01;
        buf[31] = 0x02;
        let gif = decode_gif(&buf, CONFIG)?;
        let frame = &gif.frames()[0];
        let ctrl = frame.graphic_control().unwrap();
        assert_eq!(ctrl.transparent_color(), Some(2));
        let clear = SRgba8::new(0, 0, 0, 0);
        for (p, idx) in frame.raster().pixels().iter().zip(INDICES.iter()) {
            assert_eq!(*p == clear, *idx == 2);
        }
        Ok(())
    }

    #[test]
    fn incomplete_data() {
        let mut buf = TINY.to_vec();
        // height 3
        buf[26] = 0x03;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::IncompleteImageData)
        ));
    }

    /// Compress a run of zero indices
    fn zero_run(len: usize) -> Vec<u8> {
        let mut bits = BitStream::new();
        Compressor::new(4).compress(&vec![0; len], &mut bits);
        bits.into_bytes()
    }

    /// Wrap compressed data as image data sub-blocks
    fn image_data(data: &[u8]) -> Vec<u8> {
        let mut buf = vec![2];
        for chunk in data.chunks(255) {
            buf.push(chunk.len() as u8);
            buf.extend_from_slice(chunk);
        }
        buf.push(0);
        buf
    }

    #[test]
    fn image_data_limit() -> Result<()> {
        let data = image_data(&zero_run(1_000_000));
        let mut parser = Parser {
            cursor: Cursor { buf: &data, pos: 0 },
            config: CONFIG,
            global: None,
        };
        let indices = parser.parse_image_data(1)?;
        assert_eq!(indices, [0]);
        // at most one code past the frame size was decompressed
        assert!(indices.capacity() <= 8192);
        assert_eq!(parser.cursor.remaining(), 0);
        Ok(())
    }

    #[test]
    fn oversized_image_data() -> Result<()> {
        let mut buf = TINY[..19].to_vec();
        buf.extend_from_slice(&[0x2C, 0, 0, 0, 0, 1, 0, 1, 0, 0]);
        buf.extend_from_slice(&image_data(&zero_run(1_000_000)));
        buf.push(TRAILER);
        let config = Config {
            max_image_sz: Some(1),
            ..CONFIG
        };
        let gif = decode_gif(&buf, config)?;
        let raster = gif.frames()[0].raster();
        assert_eq!(raster.pixels(), &[SRgba8::new(0, 0, 0, 255)]);
        Ok(())
    }

    #[test]
    fn invalid_code_size() {
        let mut buf = TINY.to_vec();
        buf[29] = 0x09;
        assert!(matches!(
            decode_gif(&buf, CONFIG),
            Err(Error::InvalidCodeSize)
        ));
    }
}
