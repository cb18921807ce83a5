// bits.rs
//
// Copyright (c) 2019-2026  Douglas Lau
//
//! Variable-width bit packing for LZW code streams.
//!
//! Bits are packed starting at the least significant bit of each byte, and
//! values may cross byte boundaries.  This is the ordering of the GIF image
//! data code stream -- packed flag bytes use the opposite ordering (see
//! `packed`).

/// Number of bits in a machine word
const WORD_BITS: u32 = usize::BITS;

/// Get a mask of the lowest `n_bits` bits
fn mask(n_bits: u32) -> usize {
    if n_bits >= WORD_BITS {
        usize::MAX
    } else {
        (1 << n_bits) - 1
    }
}

/// Growable LSB-first bit buffer
///
/// Writes append at the end of the buffer, while reads consume from an
/// independent cursor starting at the head.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitStream {
    /// Packed bytes
    bytes: Vec<u8>,
    /// Number of bits written
    n_bits: usize,
    /// Read cursor (in bits)
    read_pos: usize,
}

/// Read-only view over a packed bit buffer
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    /// Packed bytes
    bytes: &'a [u8],
    /// Number of readable bits
    n_bits: usize,
    /// Read cursor (in bits)
    pos: usize,
}

impl BitStream {
    /// Create an empty bit stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bit stream with bytes already written
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        let n_bits = bytes.len() * 8;
        BitStream {
            bytes,
            n_bits,
            read_pos: 0,
        }
    }

    /// Get the packed bytes (last byte may be partially filled)
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert into packed bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Get the number of bits written
    pub fn len_bits(&self) -> usize {
        self.n_bits
    }

    /// Check if no bits have been written
    pub fn is_empty(&self) -> bool {
        self.n_bits == 0
    }

    /// Write the `n_bits` least significant bits of a value.
    ///
    /// # Panics
    ///
    /// If `n_bits` is larger than the machine word size.
    pub fn write(&mut self, value: usize, n_bits: u32) {
        assert!(n_bits <= WORD_BITS, "bit count {} too large", n_bits);
        let mut value = value & mask(n_bits);
        let mut remaining = n_bits as usize;
        while remaining > 0 {
            let shift = self.n_bits % 8;
            if shift == 0 {
                self.bytes.push(0);
            }
            let take = (8 - shift).min(remaining);
            if let Some(byte) = self.bytes.last_mut() {
                *byte |= ((value & mask(take as u32)) << shift) as u8;
            }
            value >>= take;
            remaining -= take;
            self.n_bits += take;
        }
    }

    /// Read the next `n_bits` bits from the read cursor.
    ///
    /// Returns `None` (without consuming) if not enough bits remain.
    ///
    /// # Panics
    ///
    /// If `n_bits` is larger than the machine word size.
    pub fn read(&mut self, n_bits: u32) -> Option<usize> {
        let mut reader = BitReader {
            bytes: &self.bytes,
            n_bits: self.n_bits,
            pos: self.read_pos,
        };
        let value = reader.read(n_bits)?;
        self.read_pos = reader.pos;
        Some(value)
    }

    /// Get a read-only view rewound to the first bit
    pub fn at_head(&self) -> BitReader<'_> {
        BitReader {
            bytes: &self.bytes,
            n_bits: self.n_bits,
            pos: 0,
        }
    }
}

impl<'a> BitReader<'a> {
    /// Create a reader over a byte slice
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader {
            bytes,
            n_bits: bytes.len() * 8,
            pos: 0,
        }
    }

    /// Get the number of unread bits
    pub fn remaining(&self) -> usize {
        self.n_bits - self.pos
    }

    /// Read the next `n_bits` bits.
    ///
    /// Returns `None` (without consuming) if not enough bits remain.
    ///
    /// # Panics
    ///
    /// If `n_bits` is larger than the machine word size.
    pub fn read(&mut self, n_bits: u32) -> Option<usize> {
        assert!(n_bits <= WORD_BITS, "bit count {} too large", n_bits);
        let n_bits = n_bits as usize;
        if self.remaining() < n_bits {
            return None;
        }
        let mut value = 0;
        let mut done = 0;
        while done < n_bits {
            let shift = self.pos % 8;
            let take = (8 - shift).min(n_bits - done);
            let byte = usize::from(self.bytes[self.pos / 8]);
            value |= ((byte >> shift) & mask(take as u32)) << done;
            done += take;
            self.pos += take;
        }
        Some(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_crosses_bytes() {
        let mut bits = BitStream::new();
        assert!(bits.bytes().is_empty());
        bits.write(0b11, 2);
        assert_eq!(bits.bytes(), &[0b11]);
        bits.write(0b0, 1);
        assert_eq!(bits.bytes(), &[0b011]);
        bits.write(0b0101, 4);
        assert_eq!(bits.bytes(), &[0b0101011]);
        bits.write(0b101, 3);
        assert_eq!(bits.bytes(), &[0b10101011, 0b10]);
        assert_eq!(bits.len_bits(), 10);
    }

    #[test]
    fn read_at_head() {
        let mut bits = BitStream::new();
        bits.write(0b11, 2);
        bits.write(0b0, 1);
        bits.write(0b0101, 4);
        bits.write(0b101, 3);
        let mut head = bits.at_head();
        assert_eq!(head.read(2), Some(0b11));
        assert_eq!(head.read(1), Some(0b0));
        assert_eq!(head.read(4), Some(0b0101));
        assert_eq!(head.read(3), Some(0b101));
        assert_eq!(head.read(1), None);
        // the view does not disturb the stream's own cursor
        assert_eq!(bits.read(10), Some(0b10_1010_1011));
    }

    #[test]
    fn wide_values() {
        let mut bits = BitStream::new();
        bits.write(0xABCD, 16);
        bits.write(usize::MAX, usize::BITS);
        let mut head = bits.at_head();
        assert_eq!(head.read(16), Some(0xABCD));
        assert_eq!(head.read(usize::BITS), Some(usize::MAX));
    }

    #[test]
    fn mixed_widths() {
        let mut bits = BitStream::new();
        let codes = [(4, 3), (1, 3), (6, 3), (2, 3), (9, 4), (0x3FF, 10)];
        for (v, n) in codes {
            bits.write(v, n);
        }
        let mut head = bits.at_head();
        for (v, n) in codes {
            assert_eq!(head.read(n), Some(v));
        }
    }

    #[test]
    fn value_is_masked() {
        let mut bits = BitStream::new();
        bits.write(0b1111_0110, 3);
        assert_eq!(bits.bytes(), &[0b110]);
    }

    #[test]
    fn short_read() {
        let mut bits = BitStream::with_bytes(vec![0xFF]);
        assert_eq!(bits.read(9), None);
        assert_eq!(bits.read(8), Some(0xFF));
    }

    #[test]
    #[should_panic]
    fn too_wide() {
        let mut bits = BitStream::new();
        bits.write(0, usize::BITS + 1);
    }
}
