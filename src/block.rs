// block.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! GIF blocks which describe the screen and each frame
use crate::error::Error;
use crate::packed::PackedByte;

/// Extension introducer (`!`)
pub(crate) const EXTENSION: u8 = 0x21;

/// Image separator (`,`)
pub(crate) const IMAGE_DESC: u8 = 0x2C;

/// GIF trailer (`;`)
pub(crate) const TRAILER: u8 = 0x3B;

/// Graphic control extension label
pub(crate) const GRAPHIC_CONTROL: u8 = 0xF9;

/// Comment extension label
pub(crate) const COMMENT: u8 = 0xFE;

/// Application extension label
pub(crate) const APPLICATION: u8 = 0xFF;

/// Application identifier / authentication code of looping extension
pub(crate) const LOOPING_ID: &[u8; 11] = b"NETSCAPE2.0";

/// Alternate identifier also used for looping
pub(crate) const LOOPING_ID_ALT: &[u8; 11] = b"ANIMEXTS1.0";

/// Header block (signature and version)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    version: [u8; 3],
}

impl Default for Header {
    fn default() -> Self {
        Header {
            version: *b"89a",
        }
    }
}

impl Header {
    /// Create a header with a version (`87a` or `89a`)
    pub fn with_version(version: [u8; 3]) -> Self {
        Header { version }
    }

    /// Get the version
    pub fn version(&self) -> [u8; 3] {
        self.version
    }
}

/// Logical screen descriptor block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenDesc {
    width: u16,
    height: u16,
    global_table: bool,
    color_resolution: u8,
    sorted: bool,
    table_exponent: u8,
    background_color_idx: u8,
    pixel_aspect_ratio: u8,
}

impl ScreenDesc {
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Set the packed flags
    pub fn with_flags(mut self, flags: u8) -> Self {
        let mut packed = PackedByte::from(flags);
        self.global_table = packed.read_flag();
        self.color_resolution = packed.read(3);
        self.sorted = packed.read_flag();
        self.table_exponent = packed.read(3);
        self
    }

    /// Get the packed flags
    pub fn flags(&self) -> u8 {
        let mut packed = PackedByte::new();
        packed.append_flag(self.global_table);
        packed.append(self.color_resolution, 3);
        packed.append_flag(self.sorted);
        packed.append(self.table_exponent, 3);
        packed.into()
    }

    pub fn with_global_table(mut self, global_table: bool) -> Self {
        self.global_table = global_table;
        self
    }

    /// Check if a global color table follows the descriptor
    pub fn global_table(&self) -> bool {
        self.global_table
    }

    /// Set the color resolution (bits per primary color, minus 1)
    pub fn with_color_resolution(mut self, color_resolution: u8) -> Self {
        self.color_resolution = color_resolution & 0b111;
        self
    }

    pub fn color_resolution(&self) -> u8 {
        self.color_resolution
    }

    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn sorted(&self) -> bool {
        self.sorted
    }

    /// Set the global color table size exponent
    pub fn with_table_exponent(mut self, table_exponent: u8) -> Self {
        self.table_exponent = table_exponent & 0b111;
        self
    }

    /// Get the global color table size exponent (`2^(exp+1)` entries)
    pub fn table_exponent(&self) -> u8 {
        self.table_exponent
    }

    pub fn with_background_color_idx(mut self, idx: u8) -> Self {
        self.background_color_idx = idx;
        self
    }

    pub fn background_color_idx(&self) -> u8 {
        self.background_color_idx
    }

    pub fn with_pixel_aspect_ratio(mut self, ratio: u8) -> Self {
        self.pixel_aspect_ratio = ratio;
        self
    }

    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.pixel_aspect_ratio
    }
}

/// Image descriptor block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageDesc {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    local_table: bool,
    interlaced: bool,
    sorted: bool,
    table_exponent: u8,
}

impl ImageDesc {
    pub fn with_left(mut self, left: u16) -> Self {
        self.left = left;
        self
    }

    pub fn left(&self) -> u16 {
        self.left
    }

    pub fn with_top(mut self, top: u16) -> Self {
        self.top = top;
        self
    }

    pub fn top(&self) -> u16 {
        self.top
    }

    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Set the packed flags (reserved bits are ignored)
    pub fn with_flags(mut self, flags: u8) -> Self {
        let mut packed = PackedByte::from(flags);
        self.local_table = packed.read_flag();
        self.interlaced = packed.read_flag();
        self.sorted = packed.read_flag();
        packed.skip(2);
        self.table_exponent = packed.read(3);
        self
    }

    /// Get the packed flags
    pub fn flags(&self) -> u8 {
        let mut packed = PackedByte::new();
        packed.append_flag(self.local_table);
        packed.append_flag(self.interlaced);
        packed.append_flag(self.sorted);
        packed.skip(2);
        packed.append(self.table_exponent, 3);
        packed.into()
    }

    pub fn with_local_table(mut self, local_table: bool) -> Self {
        self.local_table = local_table;
        self
    }

    /// Check if a local color table follows the descriptor
    pub fn local_table(&self) -> bool {
        self.local_table
    }

    /// Set interlaced flag.
    ///
    /// The flag is preserved, but image data is never interlaced or
    /// deinterlaced.
    pub fn with_interlaced(mut self, interlaced: bool) -> Self {
        self.interlaced = interlaced;
        self
    }

    pub fn interlaced(&self) -> bool {
        self.interlaced
    }

    pub fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn sorted(&self) -> bool {
        self.sorted
    }

    /// Set the local color table size exponent
    pub fn with_table_exponent(mut self, table_exponent: u8) -> Self {
        self.table_exponent = table_exponent & 0b111;
        self
    }

    /// Get the local color table size exponent (`2^(exp+1)` entries)
    pub fn table_exponent(&self) -> u8 {
        self.table_exponent
    }

    /// Get the image size (in pixels)
    pub fn image_sz(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// Disposal method for a frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisposalMethod {
    /// No disposal specified
    #[default]
    Undefined,
    /// Leave frame in place
    Keep,
    /// Clear frame area to background
    Clear,
    /// Restore area to previous contents
    Restore,
}

impl TryFrom<u8> for DisposalMethod {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        use self::DisposalMethod::*;
        match n {
            0 => Ok(Undefined),
            1 => Ok(Keep),
            2 => Ok(Clear),
            3 => Ok(Restore),
            _ => Err(Error::InvalidDisposalMethod(n)),
        }
    }
}

impl From<DisposalMethod> for u8 {
    fn from(d: DisposalMethod) -> Self {
        use self::DisposalMethod::*;
        match d {
            Undefined => 0,
            Keep => 1,
            Clear => 2,
            Restore => 3,
        }
    }
}

/// Graphic control extension block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphicControl {
    disposal_method: DisposalMethod,
    user_input: bool,
    transparent: bool,
    delay_time_cs: u16,
    transparent_color_idx: u8,
}

impl GraphicControl {
    /// Get the packed flags
    pub fn flags(&self) -> u8 {
        let mut packed = PackedByte::new();
        packed.skip(3);
        packed.append(self.disposal_method.into(), 3);
        packed.append_flag(self.user_input);
        packed.append_flag(self.transparent);
        packed.into()
    }

    /// Set the packed flags
    pub fn with_flags(mut self, flags: u8) -> Result<Self, Error> {
        let mut packed = PackedByte::from(flags);
        packed.skip(3);
        self.disposal_method = DisposalMethod::try_from(packed.read(3))?;
        self.user_input = packed.read_flag();
        self.transparent = packed.read_flag();
        Ok(self)
    }

    pub fn with_disposal_method(mut self, disposal: DisposalMethod) -> Self {
        self.disposal_method = disposal;
        self
    }

    pub fn disposal_method(&self) -> DisposalMethod {
        self.disposal_method
    }

    pub fn with_user_input(mut self, user_input: bool) -> Self {
        self.user_input = user_input;
        self
    }

    pub fn user_input(&self) -> bool {
        self.user_input
    }

    /// Set delay time in centiseconds (hundredths of a second)
    pub fn with_delay_time_cs(mut self, delay_time_cs: u16) -> Self {
        self.delay_time_cs = delay_time_cs;
        self
    }

    pub fn delay_time_cs(&self) -> u16 {
        self.delay_time_cs
    }

    /// Set the transparent color flag
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Check the transparent color flag
    pub fn transparent(&self) -> bool {
        self.transparent
    }

    pub fn with_transparent_color_idx(mut self, idx: u8) -> Self {
        self.transparent_color_idx = idx;
        self
    }

    /// Get the transparent color index (valid even when flag is clear)
    pub fn transparent_color_idx(&self) -> u8 {
        self.transparent_color_idx
    }

    /// Get the transparent color index, if flag is set
    pub fn transparent_color(&self) -> Option<u8> {
        if self.transparent {
            Some(self.transparent_color_idx)
        } else {
            None
        }
    }
}

/// Application extension block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Application {
    /// Animation looping (loop count; zero means loop forever)
    Looping(u16),
}

impl Application {
    /// Get the loop count
    pub fn loop_count(&self) -> Option<u16> {
        match self {
            Application::Looping(count) => Some(*count),
        }
    }

    /// Check if an application identifier is for looping
    pub(crate) fn is_looping(app_id: &[u8]) -> bool {
        app_id == LOOPING_ID || app_id == LOOPING_ID_ALT
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn screen_flags() {
        let desc = ScreenDesc::default().with_flags(0b1111_0010);
        assert!(desc.global_table());
        assert_eq!(desc.color_resolution(), 7);
        assert!(!desc.sorted());
        assert_eq!(desc.table_exponent(), 2);
        assert_eq!(desc.flags(), 0b1111_0010);
        let desc = ScreenDesc::default().with_flags(0x91);
        assert_eq!(desc.color_resolution(), 1);
        assert_eq!(desc.table_exponent(), 1);
        assert_eq!(desc.flags(), 0x91);
    }

    #[test]
    fn image_flags() {
        let desc = ImageDesc::default()
            .with_local_table(true)
            .with_interlaced(true)
            .with_table_exponent(7);
        assert_eq!(desc.flags(), 0b1100_0111);
        // reserved bits dropped
        let desc = ImageDesc::default().with_flags(0b0011_1011);
        assert!(desc.sorted());
        assert!(!desc.local_table());
        assert_eq!(desc.table_exponent(), 3);
        assert_eq!(desc.flags(), 0b0010_0011);
    }

    #[test]
    fn control_flags() -> Result<(), Error> {
        let ctrl = GraphicControl::default().with_flags(0b0000_1001)?;
        assert_eq!(ctrl.disposal_method(), DisposalMethod::Clear);
        assert!(!ctrl.user_input());
        assert!(ctrl.transparent());
        assert_eq!(ctrl.transparent_color(), Some(0));
        let ctrl = ctrl
            .with_disposal_method(DisposalMethod::Restore)
            .with_user_input(true)
            .with_transparent(false);
        assert_eq!(ctrl.flags(), 0b0000_1110);
        assert_eq!(ctrl.transparent_color(), None);
        Ok(())
    }

    #[test]
    fn disposal() {
        for n in 0..4 {
            let d = DisposalMethod::try_from(n).unwrap();
            assert_eq!(u8::from(d), n);
        }
        for n in 4..8 {
            assert!(matches!(
                DisposalMethod::try_from(n),
                Err(Error::InvalidDisposalMethod(m)) if m == n
            ));
        }
        let res = GraphicControl::default().with_flags(0b0001_0000);
        assert!(matches!(res, Err(Error::InvalidDisposalMethod(4))));
    }

    #[test]
    fn looping() {
        assert_eq!(Application::Looping(4).loop_count(), Some(4));
        assert!(Application::is_looping(b"NETSCAPE2.0"));
        assert!(Application::is_looping(b"ANIMEXTS1.0"));
        assert!(!Application::is_looping(b"XMP DataXMP"));
    }
}
