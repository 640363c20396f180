//! HTTP/1.x request framing over pooled buffers.
//!
//! Bytes read from a socket land in fixed size blocks handed out by a
//! [`BufferPool`]. A [`Frame`] parses the request head straight out of those blocks
//! through a [`Cursor`], and a [`MessageBody`] delivers the request body according to
//! its framing. [`Connection`] ties them to an application [`Handler`], and
//! [`rt::serve`] runs the accept loop.
#![warn(missing_debug_implementations)]

mod log;
mod matches;

pub mod common;
pub mod config;
pub mod pool;
pub mod cursor;
pub mod input;
pub mod headers;
pub mod http;
pub mod h1;
pub mod rt;

#[cfg(test)]
mod test_util;

pub use config::Config;
pub use cursor::Cursor;
pub use headers::HeaderTable;
pub use input::{InputError, SocketInput};
pub use pool::{Block, BlockChain, BufferPool, PoolError};
pub use h1::{BodyError, Connection, Exchange, Frame, FrameError, Handler, MessageBody};
