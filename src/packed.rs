// packed.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! Packed fields within a single flag byte.
//!
//! Fields are packed starting at the most significant bit.

/// Packed field byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackedByte {
    /// Raw byte value
    raw: u8,
    /// Bit position (from MSB)
    pos: u8,
}

impl From<u8> for PackedByte {
    fn from(raw: u8) -> Self {
        PackedByte { raw, pos: 0 }
    }
}

impl From<PackedByte> for u8 {
    fn from(packed: PackedByte) -> Self {
        packed.raw
    }
}

impl PackedByte {
    /// Create an empty packed byte
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the raw byte value
    pub fn raw(self) -> u8 {
        self.raw
    }

    /// Get a field mask
    fn mask(n_bits: u8) -> u8 {
        ((1u16 << n_bits) - 1) as u8
    }

    /// Advance the cursor, checking the field fits
    fn advance(&mut self, n_bits: u8) -> u8 {
        assert!(
            n_bits > 0 && self.pos + n_bits <= 8,
            "packed field overflow: {} + {}",
            self.pos,
            n_bits
        );
        self.pos += n_bits;
        8 - self.pos
    }

    /// Append a field of `n_bits`
    pub fn append(&mut self, value: u8, n_bits: u8) {
        let shift = self.advance(n_bits);
        self.raw |= (value & Self::mask(n_bits)) << shift;
    }

    /// Append a single-bit flag
    pub fn append_flag(&mut self, flag: bool) {
        self.append(u8::from(flag), 1);
    }

    /// Read a field of `n_bits`
    pub fn read(&mut self, n_bits: u8) -> u8 {
        let shift = self.advance(n_bits);
        (self.raw >> shift) & Self::mask(n_bits)
    }

    /// Read a single-bit flag
    pub fn read_flag(&mut self) -> bool {
        self.read(1) != 0
    }

    /// Skip `n_bits` without reading
    pub fn skip(&mut self, n_bits: u8) {
        self.advance(n_bits);
    }
}
