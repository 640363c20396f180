//! HTTP/1.x request framing.
//!
//! - [`Frame`] parses the request head and produces the response head
//! - [`MessageBody`] reads the request body per its framing
//! - [`Connection`] drives a connection through requests with a [`Handler`]
mod error;
mod chunked;
mod body;
mod frame;
mod connection;

pub use error::{BodyError, FrameError};
pub use chunked::{ChunkedDecoder, encode_chunk, encode_last_chunk};
pub use body::MessageBody;
pub use frame::{Frame, State};
pub use connection::{BoxError, Connection, Exchange, Handler};
