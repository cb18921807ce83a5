// encode.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! GIF encoding
use crate::bits::BitStream;
use crate::block::*;
use crate::error::{Error, Result};
use crate::lzw::Compressor;
use crate::pool;
use crate::private::{Frame, Gif};
use crate::quantize::{
    channels, is_transparent, opaque, table_exponent, table_len,
    ColorQuantization,
};
use std::io::{self, Write};

/// Encode a GIF into a buffer.
///
/// Every frame is checked before any encoding work starts.  Frames are
/// encoded on `threads` workers, and concatenated in order.
pub(crate) fn encode_gif(gif: &Gif, threads: usize) -> Result<Vec<u8>> {
    let screen = gif.screen_desc();
    for frame in gif.frames() {
        check_frame(gif, frame)?;
    }
    let global = gif.global_palette();
    let mut buf = Vec::new();
    gif.header().format(&mut buf)?;
    let screen = match global {
        Some(palette) => screen
            .with_global_table(true)
            .with_table_exponent(table_exponent(palette.color_table().len())),
        None => screen.with_global_table(false),
    };
    screen.format(&mut buf)?;
    if let Some(palette) = global {
        format_color_table(palette, screen.table_exponent(), &mut buf)?;
    }
    for app in gif.applications() {
        app.format(&mut buf)?;
    }
    for comment in gif.comments() {
        format_comment(comment, &mut buf)?;
    }
    let frames = pool::map_ordered(gif.frames(), threads, |frame| {
        encode_frame(&screen, global, frame)
    })?;
    for frame in frames {
        buf.extend_from_slice(&frame);
    }
    buf.push(TRAILER);
    debug!("encoded {} frames, {} bytes", gif.frames().len(), buf.len());
    Ok(buf)
}

/// Check that a frame can be encoded
fn check_frame(gif: &Gif, frame: &Frame) -> Result<()> {
    let desc = frame.image_desc();
    let raster = frame.raster();
    if raster.width() != u32::from(desc.width())
        || raster.height() != u32::from(desc.height())
    {
        return Err(Error::InvalidFrameDimensions);
    }
    let screen = gif.screen_desc();
    if u32::from(desc.left()) + u32::from(desc.width())
        > u32::from(screen.width())
        || u32::from(desc.top()) + u32::from(desc.height())
            > u32::from(screen.height())
    {
        return Err(Error::InvalidFrameDimensions);
    }
    let palette = frame
        .local_palette()
        .or_else(|| gif.global_palette())
        .ok_or(Error::MissingColorTable)?;
    if palette.color_table().len() > 256 {
        return Err(Error::InvalidColorTableSize);
    }
    Ok(())
}

/// Encode one frame (graphic control, image descriptor, local color table
/// and image data)
fn encode_frame(
    screen: &ScreenDesc,
    global: Option<&dyn ColorQuantization>,
    frame: &Frame,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(ctrl) = frame.graphic_control() {
        ctrl.format(&mut buf)?;
    }
    let local = frame.local_palette();
    let desc = match local {
        Some(palette) => frame
            .image_desc()
            .with_local_table(true)
            .with_table_exponent(table_exponent(palette.color_table().len())),
        None => frame.image_desc().with_local_table(false),
    };
    desc.format(&mut buf)?;
    let (palette, exponent) = match (local, global) {
        (Some(palette), _) => (palette, desc.table_exponent()),
        (None, Some(palette)) => (palette, screen.table_exponent()),
        (None, None) => return Err(Error::MissingColorTable),
    };
    if local.is_some() {
        format_color_table(palette, exponent, &mut buf)?;
    }
    let transparent =
        frame.graphic_control().and_then(|c| c.transparent_color());
    let mut color_count = table_len(exponent);
    if let Some(t) = transparent {
        color_count = color_count.max(usize::from(t) + 1);
    }
    let mut bits = BitStream::new();
    let mut comp = Compressor::new(color_count);
    comp.begin(&mut bits);
    for p in frame.raster().pixels() {
        let idx = match transparent {
            Some(t) if is_transparent(*p) => t,
            _ => palette.quantize(opaque(*p)),
        };
        if usize::from(idx) >= color_count {
            return Err(Error::InvalidColorIndex);
        }
        comp.push(idx, &mut bits);
    }
    comp.finish(&mut bits);
    buf.push(comp.min_code_bits());
    let mut bw = BlockWriter::new(&mut buf);
    bw.write_all(bits.bytes())?;
    bw.flush()?;
    buf.push(0);
    debug!("frame: {:?} {} bytes", desc, buf.len());
    Ok(buf)
}

/// Format a color table, padded with zeros
fn format_color_table<W: Write>(
    palette: &dyn ColorQuantization,
    exponent: u8,
    w: &mut W,
) -> io::Result<()> {
    let len = table_len(exponent);
    let mut buf = Vec::with_capacity(len * 3);
    for clr in palette.color_table() {
        buf.extend_from_slice(&channels(*clr));
    }
    buf.resize(len * 3, 0);
    w.write_all(&buf)
}

/// Format a comment extension
fn format_comment<W: Write>(comment: &str, w: &mut W) -> io::Result<()> {
    w.write_all(&[EXTENSION, COMMENT])?;
    let mut bw = BlockWriter::new(w);
    bw.write_all(comment.as_bytes())?;
    bw.flush()?;
    w.write_all(&[0]) // block terminator
}

impl Header {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"GIF")?;
        w.write_all(&self.version())
    }
}

impl ScreenDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(7);
        buf.extend_from_slice(&self.width().to_le_bytes());
        buf.extend_from_slice(&self.height().to_le_bytes());
        buf.push(self.flags());
        buf.push(self.background_color_idx());
        buf.push(self.pixel_aspect_ratio());
        w.write_all(&buf)
    }
}

impl GraphicControl {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(8);
        buf.push(EXTENSION);
        buf.push(GRAPHIC_CONTROL);
        buf.push(4); // block size
        buf.push(self.flags());
        buf.extend_from_slice(&self.delay_time_cs().to_le_bytes());
        buf.push(self.transparent_color_idx());
        buf.push(0); // block terminator
        w.write_all(&buf)
    }
}

impl Application {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Application::Looping(loop_count) => {
                w.write_all(&[EXTENSION, APPLICATION, 11])?;
                w.write_all(LOOPING_ID)?;
                w.write_all(&[3, 1])?; // block size, sub-block ID
                w.write_all(&loop_count.to_le_bytes())?;
                w.write_all(&[0]) // block terminator
            }
        }
    }
}

impl ImageDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(10);
        buf.push(IMAGE_DESC);
        buf.extend_from_slice(&self.left().to_le_bytes());
        buf.extend_from_slice(&self.top().to_le_bytes());
        buf.extend_from_slice(&self.width().to_le_bytes());
        buf.extend_from_slice(&self.height().to_le_bytes());
        buf.push(self.flags());
        w.write_all(&buf)
    }
}

/// Writer which splits data into sub-blocks
struct BlockWriter<'a, W: Write> {
    writer: &'a mut W,
    buf: Vec<u8>,
}

impl<'a, W: Write> BlockWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        let buf = Vec::with_capacity(0xFF);
        BlockWriter { writer, buf }
    }
}

impl<'a, W: Write> Write for BlockWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = 0xFF - self.buf.len();
        let consumed = remaining.min(buf.len());
        self.buf.extend_from_slice(&buf[..consumed]);
        if self.buf.len() == 0xFF {
            self.writer.write_all(&[0xFF])?;
            self.writer.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(consumed)
    }

    fn flush(&mut self) -> io::Result<()> {
        let len = self.buf.len();
        if len > 0 {
            self.writer.write_all(&[len as u8])?;
            self.writer.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantize::ColorTable;
    use pix::rgb::{SRgb8, SRgba8};
    use pix::Raster;
    use std::sync::Arc;

    fn sub_blocks(data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut bw = BlockWriter::new(&mut buf);
        bw.write_all(data).unwrap();
        bw.flush().unwrap();
        buf
    }

    #[test]
    fn block_writer() {
        assert!(sub_blocks(&[]).is_empty());
        assert_eq!(sub_blocks(&[1, 2, 3]), [3, 1, 2, 3]);
        let data = vec![7; 300];
        let buf = sub_blocks(&data);
        assert_eq!(buf.len(), 302);
        assert_eq!(buf[0], 0xFF);
        assert_eq!(buf[256], 45);
        let buf = sub_blocks(&data[..255]);
        assert_eq!(buf.len(), 256);
    }

    #[test]
    fn looping() -> io::Result<()> {
        let mut buf = Vec::new();
        Application::Looping(0x1234).format(&mut buf)?;
        assert_eq!(
            buf,
            [
                0x21, 0xFF, 0x0B, b'N', b'E', b'T', b'S', b'C', b'A', b'P',
                b'E', b'2', b'.', b'0', 0x03, 0x01, 0x34, 0x12, 0x00,
            ]
        );
        Ok(())
    }

    #[test]
    fn graphic_control() -> io::Result<()> {
        let mut buf = Vec::new();
        GraphicControl::default()
            .with_disposal_method(DisposalMethod::Clear)
            .with_transparent(true)
            .with_transparent_color_idx(0xFF)
            .with_delay_time_cs(100)
            .format(&mut buf)?;
        assert_eq!(buf, [0x21, 0xF9, 0x04, 0x09, 0x64, 0x00, 0xFF, 0x00]);
        Ok(())
    }

    #[test]
    fn comment() -> io::Result<()> {
        let mut buf = Vec::new();
        format_comment("hi", &mut buf)?;
        assert_eq!(buf, [0x21, 0xFE, 0x02, b'h', b'i', 0x00]);
        let mut buf = Vec::new();
        format_comment("", &mut buf)?;
        assert_eq!(buf, [0x21, 0xFE, 0x00]);
        Ok(())
    }

    #[test]
    fn padded_table() -> io::Result<()> {
        let palette = ColorTable::new(vec![
            SRgb8::new(1, 2, 3),
            SRgb8::new(4, 5, 6),
            SRgb8::new(7, 8, 9),
        ]);
        let mut buf = Vec::new();
        format_color_table(&palette, table_exponent(3), &mut buf)?;
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn frame_size_mismatch() {
        let mut gif = Gif::new(4, 4);
        let palette = Arc::new(ColorTable::new(vec![SRgb8::new(0, 0, 0)]));
        let frame = Frame::new(Raster::<SRgba8>::with_clear(4, 4))
            .unwrap()
            .with_position(1, 0)
            .with_local_palette(palette);
        gif.push_frame(frame);
        assert!(matches!(
            encode_gif(&gif, 1),
            Err(Error::InvalidFrameDimensions)
        ));
    }
}
