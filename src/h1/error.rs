use crate::http::StatusCode;
use crate::input::InputError;
use crate::pool::PoolError;

/// Failure while reading a request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The peer finished sending before the declared body was complete.
    #[error("connection closed before the request body was complete")]
    TruncatedBody,
    #[error("invalid chunked framing: {0}")]
    ChunkFraming(&'static str),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Failure while framing a request or response.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed request line: {0}")]
    MalformedStartLine(&'static str),
    #[error("malformed header line: {0}")]
    MalformedHeaderLine(&'static str),
    #[error("invalid request method")]
    InvalidMethod,
    #[error("unsupported http version")]
    UnsupportedVersion,
    #[error("request head exceeds the configured limit")]
    RequestHeadTooLarge,
    #[error("too many request header fields")]
    TooManyHeaders,
    #[error("invalid content-length")]
    InvalidContentLength,
    #[error("response already started")]
    ResponseStarted,
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<PoolError> for FrameError {
    #[inline]
    fn from(value: PoolError) -> Self {
        Self::Input(value.into())
    }
}

impl FrameError {
    /// Returns `true` if the peer sent something unparseable and deserves a response.
    pub fn is_bad_request(&self) -> bool {
        match self {
            Self::MalformedStartLine(_)
            | Self::MalformedHeaderLine(_)
            | Self::InvalidMethod
            | Self::UnsupportedVersion
            | Self::RequestHeadTooLarge
            | Self::TooManyHeaders
            | Self::InvalidContentLength => true,
            Self::Body(err) => err.is_bad_request(),
            Self::ResponseStarted | Self::Input(_) | Self::Io(_) => false,
        }
    }

    /// Returns the status code of the rejection response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RequestHeadTooLarge | Self::TooManyHeaders => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            _ if self.is_bad_request() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl BodyError {
    /// Returns `true` for framing errors caused by the peer.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::TruncatedBody | Self::ChunkFraming(_))
    }
}
