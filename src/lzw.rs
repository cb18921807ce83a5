// lzw.rs
//
// Copyright (c) 2020-2026  Douglas Lau
//
//! Lempel-Ziv-Welch compression for GIF
use crate::bits::{BitReader, BitStream};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::ops::AddAssign;

/// Code Bits
#[derive(Clone, Copy, Debug, PartialEq)]
struct Bits(u8);

impl From<u8> for Bits {
    fn from(bits: u8) -> Self {
        Bits(bits.min(Self::MAX.0))
    }
}

impl From<Bits> for u8 {
    fn from(bits: Bits) -> Self {
        bits.0
    }
}

impl AddAssign<u8> for Bits {
    fn add_assign(&mut self, rhs: u8) {
        self.0 = (self.0 + rhs).min(Self::MAX.0)
    }
}

impl Bits {
    /// Maximum code bits allowed for GIF
    const MAX: Self = Bits(12);

    /// Get the number of entries
    fn entries(self) -> u16 {
        1 << (self.0 as u16)
    }
}

/// Code type
type Code = u16;

/// Entry count at which the compressor resets its table
const MAX_COUNT: Code = (1 << 12) - 1;

/// Get the minimum code bits able to hold `color_count` distinct values
pub fn min_code_bits(color_count: usize) -> u8 {
    let mut bits = 2;
    while (1 << bits) < color_count && bits < 8 {
        bits += 1;
    }
    bits
}

/// Code table bookkeeping, shared by both table directions
#[derive(Clone, Copy, Debug)]
pub struct TableMeta {
    /// Minimum code bits
    min_code_bits: u8,
    /// Next code to be assigned
    count: Code,
    /// Current code bits
    code_bits: Bits,
}

impl TableMeta {
    /// Create table bookkeeping for a minimum code size
    pub fn new(min_code_bits: u8) -> Self {
        let mut meta = TableMeta {
            min_code_bits,
            count: 0,
            code_bits: Bits::from(min_code_bits + 1),
        };
        meta.reset();
        meta
    }

    /// Get the minimum code bits
    pub fn min_code_bits(&self) -> u8 {
        self.min_code_bits
    }

    /// Get the clear code
    pub fn clear_code(&self) -> Code {
        1 << self.min_code_bits
    }

    /// Get the end of information code
    pub fn end_code(&self) -> Code {
        self.clear_code() + 1
    }

    /// Get the first code available for learned entries
    pub fn min_count(&self) -> Code {
        self.clear_code() + 2
    }

    /// Get the next code to be assigned
    pub fn count(&self) -> Code {
        self.count
    }

    /// Get the current code width
    pub fn code_bits(&self) -> u8 {
        self.code_bits.into()
    }

    /// Count a new entry, widening codes at the `offset` boundary
    fn increment(&mut self, offset: Code) {
        self.count += 1;
        if self.count == self.code_bits.entries() + offset {
            self.code_bits += 1;
        }
    }

    /// Reset count and code width
    fn reset(&mut self) {
        self.count = self.min_count();
        self.code_bits = Bits::from(self.min_code_bits + 1);
    }
}

/// Compressor code table.
///
/// A sequence is keyed by the code of its prefix sequence and its final
/// index; single-index sequences are their own literal code.
#[derive(Debug)]
struct EncoderTable {
    /// Table bookkeeping
    meta: TableMeta,
    /// Learned entries
    entries: HashMap<(Code, u8), Code>,
}

impl EncoderTable {
    /// Create a new compressor table
    fn new(min_code_bits: u8) -> Self {
        EncoderTable {
            meta: TableMeta::new(min_code_bits),
            entries: HashMap::with_capacity(usize::from(MAX_COUNT)),
        }
    }

    /// Lookup the code for a prefix sequence extended by one index
    fn lookup(&self, prefix: Option<Code>, index: u8) -> Option<Code> {
        match prefix {
            Some(prefix) => self.entries.get(&(prefix, index)).copied(),
            None => Some(Code::from(index)),
        }
    }

    /// Add an extended sequence
    fn insert(&mut self, prefix: Code, index: u8) {
        self.entries.insert((prefix, index), self.meta.count);
        self.meta.increment(1);
    }

    /// Forget all learned entries
    fn reset(&mut self) {
        self.entries.clear();
        self.meta.reset();
    }
}

/// Node for decompressor table
#[derive(Clone, Copy, Debug)]
struct DNode {
    /// Prefix sequence code
    prefix: Code,
    /// Final index
    index: u8,
    /// First index of the sequence
    first: u8,
}

/// Decompressor code table.
///
/// Codes below the minimum count are literal indices and are not stored.
#[derive(Debug)]
struct DecoderTable {
    /// Table bookkeeping
    meta: TableMeta,
    /// Learned entries, starting at `min_count`
    entries: Vec<DNode>,
}

impl DecoderTable {
    /// Create a new decompressor table
    fn new(min_code_bits: u8) -> Self {
        DecoderTable {
            meta: TableMeta::new(min_code_bits),
            entries: Vec::with_capacity(usize::from(Bits::MAX.entries())),
        }
    }

    /// Get a learned node
    fn node(&self, code: Code) -> DNode {
        debug_assert!(code >= self.meta.min_count() && code < self.meta.count);
        self.entries[usize::from(code - self.meta.min_count())]
    }

    /// Get the first index of a code's sequence
    fn first(&self, code: Code) -> u8 {
        if code < self.meta.clear_code() {
            code as u8
        } else {
            self.node(code).first
        }
    }

    /// Append the sequence for a code to a buffer
    fn push_sequence(&self, code: Code, buffer: &mut Vec<u8>) {
        let start = buffer.len();
        let mut code = code;
        while code >= self.meta.min_count() {
            let node = self.node(code);
            buffer.push(node.index);
            code = node.prefix;
        }
        buffer.push(code as u8);
        buffer[start..].reverse();
    }

    /// Add a sequence extended from a prefix code
    fn insert(&mut self, prefix: Code, index: u8) {
        if self.meta.count < Bits::MAX.entries() {
            let first = self.first(prefix);
            self.entries.push(DNode {
                prefix,
                index,
                first,
            });
            self.meta.increment(0);
        }
    }

    /// Forget all learned entries
    fn reset(&mut self) {
        self.entries.clear();
        self.meta.reset();
    }
}

/// LZW Data Compressor
#[derive(Debug)]
pub struct Compressor {
    /// Code dictionary
    table: EncoderTable,
    /// Code of buffered sequence
    prefix: Option<Code>,
}

impl Compressor {
    /// Create a new compressor for a number of colors
    pub fn new(color_count: usize) -> Self {
        Compressor {
            table: EncoderTable::new(min_code_bits(color_count)),
            prefix: None,
        }
    }

    /// Get the minimum code bits
    pub fn min_code_bits(&self) -> u8 {
        self.table.meta.min_code_bits()
    }

    /// Get the table bookkeeping
    pub fn meta(&self) -> &TableMeta {
        &self.table.meta
    }

    /// Pack a code into a bit stream
    fn pack(&self, code: Code, bits: &mut BitStream) {
        let n_bits = self.table.meta.code_bits();
        trace!("code {} @ {} bits", code, n_bits);
        bits.write(usize::from(code), u32::from(n_bits));
    }

    /// Begin compressing (writes a clear code)
    pub fn begin(&mut self, bits: &mut BitStream) {
        self.pack(self.table.meta.clear_code(), bits);
    }

    /// Compress one index
    pub fn push(&mut self, index: u8, bits: &mut BitStream) {
        debug_assert!(Code::from(index) < self.table.meta.clear_code());
        if let Some(code) = self.table.lookup(self.prefix, index) {
            self.prefix = Some(code);
            return;
        }
        if let Some(prefix) = self.prefix {
            self.pack(prefix, bits);
            if self.table.meta.count() >= MAX_COUNT {
                self.pack(self.table.meta.clear_code(), bits);
                self.table.reset();
            } else {
                self.table.insert(prefix, index);
            }
        }
        self.prefix = Some(Code::from(index));
    }

    /// Finish compressing (writes buffered code and end code)
    pub fn finish(&mut self, bits: &mut BitStream) {
        if let Some(prefix) = self.prefix.take() {
            self.pack(prefix, bits);
        }
        self.pack(self.table.meta.end_code(), bits);
    }

    /// Compress a slice of indices
    pub fn compress(&mut self, indices: &[u8], bits: &mut BitStream) {
        self.begin(bits);
        for index in indices {
            self.push(*index, bits);
        }
        self.finish(bits);
    }
}

/// LZW Data Decompressor
#[derive(Debug)]
pub struct Decompressor {
    /// Code dictionary
    table: DecoderTable,
    /// Last code
    last: Option<Code>,
}

impl Decompressor {
    /// Create a new decompressor
    pub fn new(min_code_bits: u8) -> Self {
        Decompressor {
            table: DecoderTable::new(min_code_bits),
            last: None,
        }
    }

    /// Create a new decompressor for a number of colors
    pub fn with_color_count(color_count: usize) -> Self {
        Self::new(min_code_bits(color_count))
    }

    /// Get the table bookkeeping
    pub fn meta(&self) -> &TableMeta {
        &self.table.meta
    }

    /// Decompress codes until end of information (or end of data)
    pub fn decompress(
        &mut self,
        reader: &mut BitReader,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        while self.decompress_next(reader, buffer)? {}
        Ok(())
    }

    /// Decompress codes until at least `max` indices are in the buffer.
    ///
    /// One code can add up to 4096 indices, so the buffer may end up that
    /// much longer than `max`.  Returns `true` if decompression stopped
    /// because the limit was reached.
    pub fn decompress_max(
        &mut self,
        reader: &mut BitReader,
        buffer: &mut Vec<u8>,
        max: usize,
    ) -> Result<bool> {
        while buffer.len() < max {
            if !self.decompress_next(reader, buffer)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Decompress one code at the current code width.
    ///
    /// Returns `false` at end of information, or when the data is
    /// exhausted.
    pub fn decompress_next(
        &mut self,
        reader: &mut BitReader,
        buffer: &mut Vec<u8>,
    ) -> Result<bool> {
        let n_bits = self.table.meta.code_bits();
        match reader.read(u32::from(n_bits)) {
            Some(code) => self.decompress_code(code as Code, buffer),
            None => {
                debug!("LZW data ended without end code");
                Ok(false)
            }
        }
    }

    /// Decompress one code
    fn decompress_code(
        &mut self,
        code: Code,
        buffer: &mut Vec<u8>,
    ) -> Result<bool> {
        let meta = self.table.meta;
        trace!("code {} @ {} bits", code, meta.code_bits());
        if code == meta.clear_code() {
            self.table.reset();
            self.last = None;
            return Ok(true);
        }
        if code == meta.end_code() {
            return Ok(false);
        }
        match self.last {
            _ if code > meta.count() => return Err(Error::InvalidLzwData),
            Some(last) if code == meta.count() => {
                let first = self.table.first(last);
                self.table.push_sequence(last, buffer);
                buffer.push(first);
                self.table.insert(last, first);
            }
            Some(last) => {
                self.table.push_sequence(code, buffer);
                let first = self.table.first(code);
                self.table.insert(last, first);
            }
            None if code < meta.clear_code() => buffer.push(code as u8),
            None => return Err(Error::InvalidLzwData),
        }
        self.last = Some(code);
        Ok(true)
    }
}
