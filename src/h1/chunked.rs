use bytes::{BufMut, BytesMut};

use super::error::BodyError;
use crate::common::{ParseResult, ready};
use crate::config::{Config, DEFAULT_MAX_HEADERS, DEFAULT_MAX_REQUEST_HEAD};
use crate::headers::HeaderTable;
use crate::input::SocketInput;
use crate::log::trace;
use crate::matches;

/// Chunk size is limited to 8 hex digits.
const MAX_CHUNK_DIGITS: usize = 8;
const MAX_CHUNK_SIZE: u64 = i32::MAX as u64;
/// Whitespace allowed between the chunk size and the extension or CRLF.
const MAX_CHUNK_WHITESPACE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Hex size up to the extension or CRLF.
    Prefix,
    /// Chunk extension, skipped up to the CRLF.
    Extension { size: u64 },
    Data { remaining: u64 },
    /// CRLF after chunk data.
    Suffix,
    /// Trailer fields after the last chunk.
    Trailer,
    Complete,
}

/// Incremental decoder of the chunked transfer coding.
#[derive(Debug)]
pub struct ChunkedDecoder {
    phase: Phase,
    trailers: HeaderTable,
    /// Trailer section bytes consumed so far.
    trailer_len: usize,
    max_trailers: usize,
    max_trailer_len: usize,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    /// Decoder with the default trailer limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_HEADERS, DEFAULT_MAX_REQUEST_HEAD)
    }

    /// Decoder with trailer limits taken from the header limits of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(config.max_headers, config.max_request_head)
    }

    /// Decoder accepting at most `max_trailers` trailer fields spanning at most
    /// `max_trailer_len` bytes.
    pub fn with_limits(max_trailers: usize, max_trailer_len: usize) -> Self {
        Self {
            phase: Phase::Prefix,
            trailers: HeaderTable::new(),
            trailer_len: 0,
            max_trailers,
            max_trailer_len,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Trailer fields, populated once the body is complete.
    #[inline]
    pub fn trailers(&self) -> &HeaderTable {
        &self.trailers
    }

    pub(crate) fn abandon(&mut self) {
        self.phase = Phase::Complete;
    }

    /// Decode buffered input into `dest`, `Ok(0)` means end of body.
    ///
    /// `dest` must not be empty.
    pub(crate) fn decode<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
        dest: &mut [u8],
    ) -> ParseResult<usize, BodyError> {
        debug_assert!(!dest.is_empty());
        loop {
            let result = match self.phase {
                Phase::Prefix => self.take_prefix(input),
                Phase::Extension { size } => self.take_extension(input, size),
                Phase::Data { remaining } => {
                    let max = dest.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
                    let read = input.cursor().copy_to(&mut dest[..max]);
                    if read == 0 {
                        return ParseResult::Pending;
                    }
                    input.skip(read);

                    let remaining = remaining - read as u64;
                    self.phase = match remaining {
                        0 => Phase::Suffix,
                        _ => Phase::Data { remaining },
                    };
                    return ParseResult::Ok(read);
                }
                Phase::Suffix => self.take_suffix(input),
                Phase::Trailer => self.take_trailer(input),
                Phase::Complete => return ParseResult::Ok(0),
            };
            match result {
                ParseResult::Ok(()) => {}
                ParseResult::Err(err) => return ParseResult::Err(err),
                ParseResult::Pending => return ParseResult::Pending,
            }
        }
    }

    fn after_prefix(size: u64) -> Phase {
        match size {
            0 => Phase::Trailer,
            _ => Phase::Data { remaining: size },
        }
    }

    fn take_prefix<IO>(&mut self, input: &mut SocketInput<IO>) -> ParseResult<(), BodyError> {
        let begin = input.cursor();
        let mut scan = begin;

        let mut size = 0u64;
        let mut digits = 0;
        loop {
            let byte = ready!(scan.peek());
            let Some(digit) = (byte as char).to_digit(16) else {
                break;
            };
            digits += 1;
            if digits > MAX_CHUNK_DIGITS {
                return ParseResult::Err(BodyError::ChunkFraming("chunk size has too many digits"));
            }
            size = size << 4 | u64::from(digit);
            scan.take();
        }

        if digits == 0 {
            return ParseResult::Err(BodyError::ChunkFraming("missing chunk size"));
        }
        if size > MAX_CHUNK_SIZE {
            return ParseResult::Err(BodyError::ChunkFraming("chunk size too large"));
        }

        let mut spaces = 0;
        while matches::is_ows(ready!(scan.peek())) {
            spaces += 1;
            if spaces > MAX_CHUNK_WHITESPACE {
                return ParseResult::Err(BodyError::ChunkFraming(
                    "too much whitespace after chunk size",
                ));
            }
            scan.take();
        }

        match ready!(scan.take()) {
            b';' => {
                let consumed = begin.length_to(&scan);
                input.skip(consumed);
                self.phase = Phase::Extension { size };
            }
            b'\r' => {
                if ready!(scan.take()) != b'\n' {
                    return ParseResult::Err(BodyError::ChunkFraming("missing LF after chunk size"));
                }
                let consumed = begin.length_to(&scan);
                input.skip(consumed);
                trace!("chunk of {size} bytes");
                self.phase = Self::after_prefix(size);
            }
            _ => return ParseResult::Err(BodyError::ChunkFraming("invalid chunk size")),
        }
        ParseResult::Ok(())
    }

    /// Extension bytes are consumed as they arrive, so a long extension never
    /// accumulates in the buffer.
    fn take_extension<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
        size: u64,
    ) -> ParseResult<(), BodyError> {
        let begin = input.cursor();
        let mut scan = begin;
        loop {
            if scan.seek(b'\r').is_none() {
                let consumed = begin.length_to(&scan);
                input.skip(consumed);
                return ParseResult::Pending;
            }
            let cr = scan;
            scan.take();
            match scan.take() {
                Some(b'\n') => {
                    let consumed = begin.length_to(&scan);
                    input.skip(consumed);
                    self.phase = Self::after_prefix(size);
                    return ParseResult::Ok(());
                }
                Some(_) => {
                    // bare CR inside the extension, rescan from the byte after it
                    scan = cr;
                    scan.take();
                }
                None => {
                    let consumed = begin.length_to(&cr);
                    input.skip(consumed);
                    return ParseResult::Pending;
                }
            }
        }
    }

    fn take_suffix<IO>(&mut self, input: &mut SocketInput<IO>) -> ParseResult<(), BodyError> {
        let mut scan = input.cursor();
        if ready!(scan.take()) != b'\r' || ready!(scan.take()) != b'\n' {
            return ParseResult::Err(BodyError::ChunkFraming("missing CRLF after chunk data"));
        }
        input.skip(2);
        self.phase = Phase::Prefix;
        ParseResult::Ok(())
    }

    fn take_trailer<IO>(&mut self, input: &mut SocketInput<IO>) -> ParseResult<(), BodyError> {
        let begin = input.cursor();
        let mut scan = begin;

        if ready!(scan.peek()) == b'\r' {
            scan.take();
            if ready!(scan.take()) != b'\n' {
                return ParseResult::Err(BodyError::ChunkFraming("invalid end of trailer section"));
            }
            input.skip(2);
            self.phase = Phase::Complete;
            return ParseResult::Ok(());
        }

        if scan.seek(b'\r').is_none() {
            // everything buffered belongs to the unterminated line
            if self.trailer_len + input.len() > self.max_trailer_len {
                return ParseResult::Err(BodyError::ChunkFraming("trailer section too large"));
            }
            return ParseResult::Pending;
        }
        let line_end = scan;
        scan.take();
        if ready!(scan.take()) != b'\n' {
            return ParseResult::Err(BodyError::ChunkFraming("bare CR in trailer field"));
        }
        let consumed = begin.length_to(&scan);

        let line = begin.get_string(&line_end);
        let Some((name, value)) = line.split_once(':') else {
            return ParseResult::Err(BodyError::ChunkFraming("missing colon in trailer field"));
        };
        if name.is_empty() || !name.bytes().all(matches::is_token) {
            return ParseResult::Err(BodyError::ChunkFraming("invalid trailer field name"));
        }
        if self.trailers.len() >= self.max_trailers {
            return ParseResult::Err(BodyError::ChunkFraming("too many trailer fields"));
        }
        self.trailer_len += consumed;
        if self.trailer_len > self.max_trailer_len {
            return ParseResult::Err(BodyError::ChunkFraming("trailer section too large"));
        }
        self.trailers.append(name, matches::trim_ows(value));

        input.skip(consumed);
        ParseResult::Ok(())
    }
}

/// Encode one chunk of the chunked transfer coding into `buf`.
///
/// Empty chunks are skipped, an empty chunk would terminate the body.
pub fn encode_chunk(chunk: &[u8], buf: &mut BytesMut) {
    if chunk.is_empty() {
        return;
    }
    buf.reserve(chunk.len() + 2 * size_of::<usize>() + 4);
    put_hex(buf, chunk.len());
    buf.put_slice(b"\r\n");
    buf.put_slice(chunk);
    buf.put_slice(b"\r\n");
}

/// Write the terminating zero sized chunk.
pub fn encode_last_chunk(buf: &mut BytesMut) {
    buf.put_slice(b"0\r\n\r\n");
}

fn put_hex(buf: &mut BytesMut, mut value: usize) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut scratch = [0u8; 2 * size_of::<usize>()];
    let mut at = scratch.len();
    loop {
        at -= 1;
        scratch[at] = DIGITS[value & 0xf];
        value >>= 4;
        if value == 0 {
            break;
        }
    }
    buf.put_slice(&scratch[at..]);
}
