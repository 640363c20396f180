use std::task::Poll;

/// Outcome of parsing against the currently buffered bytes.
#[derive(Debug)]
pub enum ParseResult<T, E> {
    /// Buffered bytes are not sufficient, more IO read is required.
    ///
    /// This is not an error, the caller should wait for more data and retry.
    Pending,
    /// Parse success.
    Ok(T),
    /// Parse failed.
    Err(E),
}

impl<T, E> ParseResult<T, E> {
    /// Returns `true` if the parse result is [`Pending`].
    ///
    /// [`Pending`]: ParseResult::Pending
    #[inline]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if the parse result is [`Ok`].
    ///
    /// [`Ok`]: ParseResult::Ok
    #[inline]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(..))
    }

    /// Returns `true` if the parse result is [`Err`].
    ///
    /// [`Err`]: ParseResult::Err
    #[inline]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(..))
    }

    /// Maps the error value, leaving `Pending` and `Ok` untouched.
    #[inline]
    pub fn map_err<F, U>(self, f: F) -> ParseResult<T, U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            ParseResult::Pending => ParseResult::Pending,
            ParseResult::Ok(ok) => ParseResult::Ok(ok),
            ParseResult::Err(err) => ParseResult::Err(f(err)),
        }
    }

    /// Convert to [`Poll<Result<T, E>>`].
    #[inline]
    pub fn into_poll_result(self) -> Poll<Result<T, E>> {
        match self {
            ParseResult::Pending => Poll::Pending,
            ParseResult::Ok(ok) => Poll::Ready(Ok(ok)),
            ParseResult::Err(err) => Poll::Ready(Err(err)),
        }
    }
}

impl<T, E> From<Result<T, E>> for ParseResult<T, E> {
    #[inline]
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(ok) => Self::Ok(ok),
            Err(err) => Self::Err(err),
        }
    }
}

/// Unwrap an `Option`, returning [`ParseResult::Pending`] on `None`.
macro_rules! ready {
    ($e:expr) => {
        match $e {
            Some(ok) => ok,
            None => return $crate::common::ParseResult::Pending,
        }
    };
}

/// Unwrap a [`ParseResult`], propagating `Pending` and `Err`.
macro_rules! tri {
    ($e:expr) => {
        match $e {
            $crate::common::ParseResult::Ok(ok) => ok,
            $crate::common::ParseResult::Err(err) => {
                return $crate::common::ParseResult::Err(err.into())
            }
            $crate::common::ParseResult::Pending => return $crate::common::ParseResult::Pending,
        }
    };
}

pub(crate) use {ready, tri};
