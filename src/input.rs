//! Buffered inbound side of a connection.
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cursor::Cursor;
use crate::log::debug;
use crate::pool::{BlockChain, BufferPool, PoolError};
use crate::rt::Shutdown;

/// Failure to fill [`SocketInput`].
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Inbound byte stream of one connection, buffered in a [`BlockChain`].
///
/// Parsers look at the buffered bytes through [`cursor`][SocketInput::cursor] and
/// consume with [`skip`][SocketInput::skip]. When they need more, the caller awaits
/// [`fill`][SocketInput::fill].
pub struct SocketInput<IO> {
    io: IO,
    chain: BlockChain,
    fin: bool,
    aborted: bool,
    shutdown: Option<Shutdown>,
}

impl<IO> SocketInput<IO> {
    pub fn new(io: IO, pool: BufferPool) -> Self {
        Self {
            io,
            chain: BlockChain::new(pool),
            fin: false,
            aborted: false,
            shutdown: None,
        }
    }

    /// Stop waiting for data once `shutdown` is triggered.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Returns a cursor at the first unconsumed byte.
    #[inline]
    pub fn cursor(&self) -> Cursor<'_> {
        self.chain.cursor()
    }

    #[inline]
    pub fn chain(&self) -> &BlockChain {
        &self.chain
    }

    /// Returns the number of buffered, unconsumed bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Returns `true` once the peer finished sending; buffered bytes may remain.
    #[inline]
    pub fn is_fin(&self) -> bool {
        self.fin
    }

    /// Returns `true` if the connection was aborted, buffered bytes should be ignored.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Consume `n` buffered bytes.
    #[inline]
    pub fn skip(&mut self, n: usize) {
        self.chain.consume(n);
    }

    /// Append bytes as if they were received from the peer.
    pub fn push(&mut self, data: &[u8]) -> Result<(), PoolError> {
        self.chain.write(data)
    }

    /// Mark the remote end as finished.
    pub fn set_fin(&mut self) {
        self.fin = true;
    }

    /// Abort the connection, readers observe end of data.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.fin = true;
    }

    #[inline]
    pub fn get_ref(&self) -> &IO {
        &self.io
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

impl<IO: AsyncRead + Unpin> SocketInput<IO> {
    /// Read once from the underlying IO into the chain.
    ///
    /// Returns the number of bytes read. `Ok(0)` means the peer finished, or the
    /// connection is shutting down, and [`is_fin`][SocketInput::is_fin] is set.
    pub async fn fill(&mut self) -> Result<usize, InputError> {
        if self.fin {
            return Ok(0);
        }

        let tail = self.chain.writable_tail()?;
        let read = match self.shutdown.as_mut() {
            Some(shutdown) => tokio::select! {
                biased;
                read = self.io.read_buf(tail.buf_mut()) => Some(read),
                () = shutdown.wait() => None,
            },
            None => Some(self.io.read_buf(tail.buf_mut()).await),
        };

        match read {
            Some(Ok(0)) => {
                self.fin = true;
                Ok(0)
            }
            Some(Ok(read)) => {
                self.chain.commit(read);
                Ok(read)
            }
            Some(Err(err)) => Err(err.into()),
            None => {
                debug!("input aborted by shutdown");
                self.abort();
                Ok(0)
            }
        }
    }
}

impl<IO> std::fmt::Debug for SocketInput<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SocketInput")
            .field("buffered", &self.chain.len())
            .field("fin", &self.fin)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::rt::shutdown_channel;
    use crate::test_util::Script;

    fn pool() -> BufferPool {
        BufferPool::with_block_size(4, 16)
    }

    #[tokio::test]
    async fn test_fill_until_fin() {
        let mut input = SocketInput::new(Script::new([&b"hello "[..], b"world"]), pool());

        let mut total = 0;
        loop {
            let read = input.fill().await.unwrap();
            if read == 0 {
                break;
            }
            total += read;
        }

        assert_eq!(total, 11);
        assert!(input.is_fin());
        assert!(!input.is_aborted());

        let begin = input.cursor();
        let mut end = begin;
        end.advance(usize::MAX);
        assert_eq!(&*begin.get_array_segment(&end), b"hello world");

        input.skip(6);
        assert_eq!(input.len(), 5);
        assert_eq!(input.cursor().peek(), Some(b'w'));
    }

    #[tokio::test]
    async fn test_fill_after_fin() {
        let mut input = SocketInput::new(Script::new([]), pool());
        assert_eq!(input.fill().await.unwrap(), 0);
        assert!(input.is_fin());
        assert_eq!(input.fill().await.unwrap(), 0);
    }

    #[test]
    fn test_push() {
        let mut input = SocketInput::new((), pool());
        input.push(b"GET").unwrap();
        input.push(b" /").unwrap();
        assert_eq!(input.len(), 5);
        input.set_fin();
        assert!(input.is_fin());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_pending_fill() {
        let (mut client, server) = tokio::io::duplex(64);
        let (trigger, shutdown) = shutdown_channel();
        let mut input = SocketInput::new(server, pool()).with_shutdown(shutdown);

        client.write_all(b"abc").await.unwrap();
        assert_eq!(input.fill().await.unwrap(), 3);

        trigger.trigger();
        assert_eq!(input.fill().await.unwrap(), 0);
        assert!(input.is_aborted());
        assert!(input.is_fin());
        drop(client);
    }
}
