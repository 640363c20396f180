// rfc-editor.org/rfc/rfc9112.html#name-message-body-length
//
// Transfer-Encoding - chunked
// Content-Length
// neither - empty when the connection persists, otherwise until close
use tokio::io::AsyncRead;

use super::chunked::ChunkedDecoder;
use super::error::{BodyError, FrameError};
use crate::common::ParseResult;
use crate::config::Config;
use crate::headers::HeaderTable;
use crate::headers::standard::{CONTENT_LENGTH, TRANSFER_ENCODING};
use crate::input::SocketInput;
use crate::matches;

/// Request body reader, selected once per request from its framing headers.
#[derive(Debug)]
pub enum MessageBody {
    /// Exactly `remaining` more bytes.
    Fixed { remaining: u64 },
    Chunked(ChunkedDecoder),
    /// Everything until the peer finishes sending.
    Remaining { complete: bool },
}

impl Default for MessageBody {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl MessageBody {
    /// Body of zero length.
    #[inline]
    pub const fn empty() -> Self {
        Self::Fixed { remaining: 0 }
    }

    /// Select the reader for a request.
    ///
    /// `Transfer-Encoding` takes precedence over `Content-Length`; without either, the
    /// body is empty on a persistent connection and runs until close otherwise. Chunked
    /// trailers are bounded by the header limits of `config`.
    pub fn for_request(
        headers: &HeaderTable,
        keep_alive: bool,
        config: &Config,
    ) -> Result<Self, FrameError> {
        if headers.contains(TRANSFER_ENCODING) {
            return Ok(Self::Chunked(ChunkedDecoder::from_config(config)));
        }

        if let Some((first, rest)) = headers.get_all(CONTENT_LENGTH).split_first() {
            let remaining = parse_content_length(first)?;
            for value in rest {
                if parse_content_length(value)? != remaining {
                    return Err(FrameError::InvalidContentLength);
                }
            }
            return Ok(Self::Fixed { remaining });
        }

        if keep_alive {
            Ok(Self::empty())
        } else {
            Ok(Self::Remaining { complete: false })
        }
    }

    /// Returns `true` once every body byte was read.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Fixed { remaining } => *remaining == 0,
            Self::Chunked(decoder) => decoder.is_complete(),
            Self::Remaining { complete } => *complete,
        }
    }

    /// Trailer fields of a chunked body.
    pub fn trailers(&self) -> Option<&HeaderTable> {
        match self {
            Self::Chunked(decoder) => Some(decoder.trailers()),
            _ => None,
        }
    }

    /// Read from the buffered bytes only, `Ok(0)` means end of body.
    ///
    /// `dest` must not be empty.
    pub fn read_buffered<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
        dest: &mut [u8],
    ) -> ParseResult<usize, BodyError> {
        match self {
            Self::Fixed { remaining } => {
                if *remaining == 0 {
                    return ParseResult::Ok(0);
                }
                let max = dest.len().min(usize::try_from(*remaining).unwrap_or(usize::MAX));
                let read = input.cursor().copy_to(&mut dest[..max]);
                if read == 0 {
                    return ParseResult::Pending;
                }
                input.skip(read);
                *remaining -= read as u64;
                ParseResult::Ok(read)
            }
            Self::Chunked(decoder) => decoder.decode(input, dest),
            Self::Remaining { complete } => {
                if *complete {
                    return ParseResult::Ok(0);
                }
                let read = input.cursor().copy_to(dest);
                if read == 0 {
                    return ParseResult::Pending;
                }
                input.skip(read);
                ParseResult::Ok(read)
            }
        }
    }

    fn on_fin(&mut self) -> Result<usize, BodyError> {
        match self {
            Self::Remaining { complete } => {
                *complete = true;
                Ok(0)
            }
            _ => Err(BodyError::TruncatedBody),
        }
    }

    /// Mark the body finished without reading it.
    fn abandon(&mut self) {
        match self {
            Self::Fixed { remaining } => *remaining = 0,
            Self::Chunked(decoder) => decoder.abandon(),
            Self::Remaining { complete } => *complete = true,
        }
    }
}

impl MessageBody {
    /// Read body bytes into `dest`, waiting for more input when needed.
    ///
    /// Returns `Ok(0)` at end of body, or when the connection was aborted.
    pub async fn read<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
        dest: &mut [u8],
    ) -> Result<usize, BodyError>
    where
        IO: AsyncRead + Unpin,
    {
        if dest.is_empty() {
            return Ok(0);
        }
        loop {
            if input.is_aborted() {
                self.abandon();
                return Ok(0);
            }
            match self.read_buffered(input, dest) {
                ParseResult::Ok(read) => return Ok(read),
                ParseResult::Err(err) => return Err(err),
                ParseResult::Pending => {}
            }
            if input.is_fin() {
                return self.on_fin();
            }
            input.fill().await?;
        }
    }

    /// Read and discard the rest of the body, returning the discarded count.
    pub async fn consume<IO>(&mut self, input: &mut SocketInput<IO>) -> Result<u64, BodyError>
    where
        IO: AsyncRead + Unpin,
    {
        let mut scratch = [0u8; 1024];
        let mut total = 0;
        loop {
            match self.read(input, &mut scratch).await? {
                0 => return Ok(total),
                read => total += read as u64,
            }
        }
    }
}

/// Parse a `Content-Length` value as a non negative decimal.
pub(crate) fn parse_content_length(value: &str) -> Result<u64, FrameError> {
    let value = matches::trim_ows(value);
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(FrameError::InvalidContentLength);
    }
    value.parse().map_err(|_| FrameError::InvalidContentLength)
}
