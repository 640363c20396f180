//! Accept loop and shutdown signal.
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use crate::config::Config;
use crate::h1::{Connection, Handler};
use crate::log::{debug, error, info};
use crate::pool::BufferPool;

// ===== Listener =====

pub trait Listener {
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    type Addr: std::fmt::Debug + Send + 'static;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    type Addr = SocketAddr;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send {
        TcpListener::accept(self)
    }
}

#[cfg(unix)]
impl Listener for UnixListener {
    type Stream = UnixStream;

    type Addr = tokio::net::unix::SocketAddr;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send {
        UnixListener::accept(self)
    }
}

// ===== Shutdown =====

/// Returns a connected shutdown trigger and signal.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every [`Shutdown`] clone.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of the shutdown signal, cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is triggered.
    ///
    /// Waits forever if the trigger was dropped without firing.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ===== Runtime =====

/// Accept connections and serve each on its own task until `shutdown` fires.
///
/// Connections in flight observe the same signal and stop after the current read.
pub async fn serve<L, H>(
    listener: L,
    pool: BufferPool,
    config: Arc<Config>,
    handler: Arc<H>,
    mut shutdown: Shutdown,
) where
    L: Listener,
    H: Handler<ReadHalf<L::Stream>, WriteHalf<L::Stream>> + 'static,
{
    info!("serving with block size {}", pool.block_size());
    loop {
        let (stream, _addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(ok) => ok,
                Err(_err) => {
                    error!("failed to accept: {_err}");
                    continue;
                }
            },
            () = shutdown.wait() => {
                info!("shutdown requested, stop accepting");
                return;
            }
        };

        let (reader, writer) = tokio::io::split(stream);
        let connection = Connection::new(reader, writer, pool.clone(), Arc::clone(&config))
            .with_shutdown(shutdown.clone());
        let handler = Arc::clone(&handler);

        tokio::spawn(async move {
            debug!("connection accepted: {_addr:?}");
            match connection.run(&*handler).await {
                Ok(()) => {
                    debug!("connection closed: {_addr:?}");
                }
                Err(_err) => {
                    debug!("connection {_addr:?} failed: {_err}");
                }
            }
        });
    }
}

#[cfg(test)]
mod test {
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    use super::*;
    use crate::h1::{BoxError, Exchange};

    struct Hello;

    impl<R, W> Handler<R, W> for Hello
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        async fn call(&self, ex: &mut Exchange<'_, R, W>) -> Result<(), BoxError> {
            ex.headers_mut()?.insert("Content-Length", "5");
            ex.write(b"hello").await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_serve() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Arc::new(Config::default().with_date_header(false));
        let pool = BufferPool::new(&config);
        let (trigger, shutdown) = shutdown_channel();

        let server = tokio::spawn(serve(listener, pool, config, Arc::new(Hello), shutdown));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello"
        );

        trigger.trigger();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let (trigger, mut shutdown) = shutdown_channel();
        assert!(!shutdown.is_triggered());
        let waiter = shutdown.clone();

        trigger.trigger();
        shutdown.wait().await;
        assert!(shutdown.is_triggered());
        assert!(waiter.is_triggered());
    }
}
