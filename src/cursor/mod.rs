//! Read position over a [`BlockChain`][crate::pool::BlockChain].
use std::borrow::Cow;

use crate::pool::Block;

mod simd;

/// Lightweight position within a chain of blocks.
///
/// A cursor is `Copy`; cloning it and scanning ahead never affects the original, and
/// nothing is consumed from the chain until the owner of the chain consumes it.
/// Cursors compared against each other must come from the same chain.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    blocks: &'a [Block],
    block: usize,
    index: usize,
}

impl<'a> Cursor<'a> {
    /// Create cursor at the first unconsumed byte of `blocks`.
    pub fn new(blocks: &'a [Block]) -> Self {
        Self {
            blocks,
            block: 0,
            index: blocks.first().map_or(0, Block::start),
        }
    }

    fn next_block(&mut self) -> bool {
        match self.blocks.get(self.block + 1) {
            Some(next) => {
                self.block += 1;
                self.index = next.start();
                true
            }
            None => false,
        }
    }

    /// Returns the next byte and advance past it, `None` at end of data.
    pub fn take(&mut self) -> Option<u8> {
        loop {
            let block = self.blocks.get(self.block)?;
            if let Some(&byte) = block.bytes().get(self.index) {
                self.index += 1;
                return Some(byte);
            }
            if !self.next_block() {
                return None;
            }
        }
    }

    /// Returns the next byte without advancing.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        let mut cursor = *self;
        cursor.take()
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Advance up to `n` bytes, returning the number actually skipped.
    pub fn advance(&mut self, n: usize) -> usize {
        let mut left = n;
        while left > 0 {
            let Some(block) = self.blocks.get(self.block) else {
                break;
            };
            let available = block.end() - self.index;
            if available >= left {
                self.index += left;
                left = 0;
                break;
            }
            self.index = block.end();
            left -= available;
            if !self.next_block() {
                break;
            }
        }
        n - left
    }

    /// Advance to the first occurrence of `byte`, returning it.
    ///
    /// The cursor stays on the matched byte. If not found, the cursor is left at end of
    /// data and `None` is returned.
    #[inline]
    pub fn seek(&mut self, byte: u8) -> Option<u8> {
        self.seek_any([byte])
    }

    /// Advance to the first occurrence of either byte, returning which was found.
    #[inline]
    pub fn seek2(&mut self, byte0: u8, byte1: u8) -> Option<u8> {
        self.seek_any([byte0, byte1])
    }

    /// Advance to the first occurrence of any of three bytes, returning which was found.
    #[inline]
    pub fn seek3(&mut self, byte0: u8, byte1: u8, byte2: u8) -> Option<u8> {
        self.seek_any([byte0, byte1, byte2])
    }

    fn seek_any<const N: usize>(&mut self, needles: [u8; N]) -> Option<u8> {
        loop {
            let block = self.blocks.get(self.block)?;
            let rest = block.bytes().get(self.index..).unwrap_or_default();
            if let Some(at) = simd::find(rest, needles) {
                self.index += at;
                return rest.get(at).copied();
            }
            self.index = block.end();
            if !self.next_block() {
                return None;
            }
        }
    }

    /// Returns the number of bytes from this cursor up to `end`.
    ///
    /// Returns 0 if `end` is behind this cursor.
    pub fn length_to(&self, end: &Cursor<'_>) -> usize {
        debug_assert!(std::ptr::eq(self.blocks, end.blocks), "cursors from different chains");

        if end.block < self.block {
            return 0;
        }
        if end.block == self.block {
            return end.index.saturating_sub(self.index);
        }

        let head = self.blocks.get(self.block).map_or(0, |b| b.end() - self.index);
        let middle: usize = self
            .blocks
            .get(self.block + 1..end.block)
            .unwrap_or_default()
            .iter()
            .map(Block::len)
            .sum();
        let tail = self
            .blocks
            .get(end.block)
            .map_or(0, |b| end.index.saturating_sub(b.start()));

        head + middle + tail
    }

    /// Iterate the contiguous slices between this cursor and `end`.
    fn segments(&self, end: &Cursor<'a>) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        let (first, last) = (self.block, end.block);
        let (from, to) = (self.index, end.index);
        let blocks: &'a [Block] = self.blocks;
        blocks
            .iter()
            .enumerate()
            .skip(first)
            .take(last.saturating_sub(first) + 1)
            .map(move |(i, block)| {
                let lo = if i == first { from } else { block.start() };
                let hi = if i == last { to } else { block.end() };
                block.bytes().get(lo..hi).unwrap_or_default()
            })
    }

    /// Returns the bytes between this cursor and `end`.
    ///
    /// Borrowed when the range lies within one block, copied otherwise.
    pub fn get_array_segment(&self, end: &Cursor<'a>) -> Cow<'a, [u8]> {
        if self.block == end.block {
            return Cow::Borrowed(self.segments(end).next().unwrap_or_default());
        }
        let mut out = Vec::with_capacity(self.length_to(end));
        for segment in self.segments(end) {
            out.extend_from_slice(segment);
        }
        Cow::Owned(out)
    }

    /// Decode the bytes between this cursor and `end` as UTF-8.
    ///
    /// Invalid sequences are replaced with `U+FFFD`. A multi-byte sequence split across
    /// a block boundary decodes the same as a contiguous one.
    pub fn get_string(&self, end: &Cursor<'a>) -> Cow<'a, str> {
        if self.block == end.block {
            return String::from_utf8_lossy(self.segments(end).next().unwrap_or_default());
        }
        let mut decoder = Utf8Decoder::with_capacity(self.length_to(end));
        for segment in self.segments(end) {
            decoder.push(segment);
        }
        Cow::Owned(decoder.finish())
    }

    /// Copy bytes into `dest` and advance past them, returning the copied count.
    pub fn copy_to(&mut self, dest: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dest.len() {
            let Some(block) = self.blocks.get(self.block) else {
                break;
            };
            let available = block.bytes().get(self.index..).unwrap_or_default();
            if available.is_empty() {
                if self.next_block() {
                    continue;
                }
                break;
            }
            let n = available.len().min(dest.len() - copied);
            dest[copied..copied + n].copy_from_slice(&available[..n]);
            self.index += n;
            copied += n;
        }
        copied
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("block", &self.block)
            .field("index", &self.index)
            .finish()
    }
}

/// Incremental lossy UTF-8 decoder carrying incomplete sequences between pushes.
struct Utf8Decoder {
    out: String,
    carry: [u8; 4],
    carried: usize,
}

impl Utf8Decoder {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            carry: [0; 4],
            carried: 0,
        }
    }

    fn push(&mut self, mut bytes: &[u8]) {
        // complete a sequence split by the previous segment
        while self.carried > 0 {
            let Some((&byte, rest)) = bytes.split_first() else {
                return;
            };
            let width = utf8_width(self.carry[0]);
            if byte & 0b1100_0000 != 0b1000_0000 {
                // not a continuation byte, the carried prefix is invalid
                self.out.push(char::REPLACEMENT_CHARACTER);
                self.carried = 0;
                break;
            }
            self.carry[self.carried] = byte;
            self.carried += 1;
            bytes = rest;
            if self.carried == width {
                self.out.push_str(&String::from_utf8_lossy(&self.carry[..width]));
                self.carried = 0;
            }
        }

        let incomplete = incomplete_suffix(bytes);
        let (complete, tail) = bytes.split_at(bytes.len() - incomplete);
        self.out.push_str(&String::from_utf8_lossy(complete));
        self.carry[..tail.len()].copy_from_slice(tail);
        self.carried = tail.len();
    }

    fn finish(mut self) -> String {
        if self.carried > 0 {
            self.out.push(char::REPLACEMENT_CHARACTER);
        }
        self.out
    }
}

/// Returns the width of a UTF-8 sequence from its lead byte, 1 for invalid leads.
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

/// Returns the length of a trailing sequence that a later segment could complete.
fn incomplete_suffix(bytes: &[u8]) -> usize {
    let window = bytes.len().min(3);
    for back in 1..=window {
        let lead = bytes[bytes.len() - back];
        if lead & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = utf8_width(lead);
        return if width > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod test;
