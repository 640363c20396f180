use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::error::FrameError;
use super::frame::Frame;
use crate::config::Config;
use crate::headers::HeaderTable;
use crate::http::{StatusCode, Version};
use crate::input::SocketInput;
use crate::log::{debug, error, warning};
use crate::pool::BufferPool;
use crate::rt::Shutdown;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_BUFFER_CAP: usize = 1024;

/// Application callback invoked once per request.
///
/// The handler reads the request and writes the response through [`Exchange`]. If it
/// returns without writing, an empty response with the chosen status is sent.
pub trait Handler<R, W>: Send + Sync {
    fn call(
        &self,
        exchange: &mut Exchange<'_, R, W>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Handle to the current request and its response.
pub struct Exchange<'a, R, W> {
    frame: &'a mut Frame,
    input: &'a mut SocketInput<R>,
    output: &'a mut W,
    write_buffer: &'a mut BytesMut,
}

impl<R, W> Exchange<'_, R, W> {
    #[inline]
    pub fn method(&self) -> &str {
        self.frame.method()
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.frame.path()
    }

    /// Query including the leading `?`, or empty.
    #[inline]
    pub fn query(&self) -> &str {
        self.frame.query()
    }

    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.frame.version()
    }

    #[inline]
    pub fn headers(&self) -> &HeaderTable {
        self.frame.request_headers()
    }

    /// Trailer fields of a chunked request body, once the body was read.
    pub fn trailers(&self) -> Option<&HeaderTable> {
        self.frame.body().trailers()
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &*self.frame
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), FrameError> {
        self.frame.set_status(status)
    }

    /// Response headers, only mutable before the response starts.
    pub fn headers_mut(&mut self) -> Result<&mut HeaderTable, FrameError> {
        self.frame.response_headers_mut()
    }
}

impl<R, W> Exchange<'_, R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Read request body bytes into `dest`, `Ok(0)` at end of body.
    ///
    /// The first read answers `Expect: 100-continue`.
    pub async fn read_body(&mut self, dest: &mut [u8]) -> Result<usize, FrameError> {
        if self.frame.produce_continue(self.write_buffer) {
            flush(self.output, self.write_buffer).await?;
        }
        Ok(self.frame.read_body(self.input, dest).await?)
    }

    /// Read the rest of the request body into `out`, returning the appended count.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, FrameError> {
        let mut scratch = [0u8; 1024];
        let mut total = 0;
        loop {
            match self.read_body(&mut scratch).await? {
                0 => return Ok(total),
                read => {
                    out.extend_from_slice(&scratch[..read]);
                    total += read;
                }
            }
        }
    }

    /// Write response body bytes, sending the response head first if needed.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.frame.produce_body(data, self.write_buffer);
        flush(self.output, self.write_buffer).await
    }

    /// Send the response head without body bytes.
    pub async fn flush(&mut self) -> Result<(), FrameError> {
        self.frame.produce_start(self.write_buffer, false);
        flush(self.output, self.write_buffer).await
    }
}

impl<R, W> std::fmt::Debug for Exchange<'_, R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

async fn flush<W>(output: &mut W, buffer: &mut BytesMut) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if !buffer.is_empty() {
        output.write_all(buffer).await?;
        buffer.clear();
    }
    output.flush().await?;
    Ok(())
}

/// HTTP/1.x connection driver.
///
/// Reads requests one at a time, hands each to the [`Handler`] and completes its
/// response. Pipelined requests are served in order.
pub struct Connection<R, W> {
    input: SocketInput<R>,
    output: W,
    frame: Frame,
    write_buffer: BytesMut,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, pool: BufferPool, config: Arc<Config>) -> Self {
        Self {
            input: SocketInput::new(reader, pool),
            output: writer,
            frame: Frame::new(config),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_CAP),
        }
    }

    /// Stop reading requests once `shutdown` is triggered.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.input = self.input.with_shutdown(shutdown);
        self
    }

    /// Serve requests until the peer finishes, the connection is not kept alive, or an
    /// error occurs. The writer is shut down before returning.
    pub async fn run<H>(mut self, handler: &H) -> Result<(), FrameError>
    where
        H: Handler<R, W>,
    {
        let result = self.process_requests(handler).await;
        if let Err(_err) = self.output.shutdown().await {
            debug!("failed to shutdown writer: {_err}");
        }
        result
    }

    async fn process_requests<H>(&mut self, handler: &H) -> Result<(), FrameError>
    where
        H: Handler<R, W>,
    {
        loop {
            match self.frame.read_request_head(&mut self.input).await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => return self.reject(err).await,
            }

            debug!("{} {}{}", self.frame.method(), self.frame.path(), self.frame.query());

            let result = {
                let mut exchange = Exchange {
                    frame: &mut self.frame,
                    input: &mut self.input,
                    output: &mut self.output,
                    write_buffer: &mut self.write_buffer,
                };
                handler.call(&mut exchange).await
            };

            if let Err(_err) = result {
                if self.frame.is_rejected() {
                    warning!("request body rejected: {_err}");
                    if self
                        .frame
                        .produce_rejection(StatusCode::BAD_REQUEST, &mut self.write_buffer)
                    {
                        flush(&mut self.output, &mut self.write_buffer).await?;
                    }
                    return Ok(());
                }
                error!("handler failed: {_err}");
                if !self
                    .frame
                    .produce_error(StatusCode::INTERNAL_SERVER_ERROR, &mut self.write_buffer)
                {
                    // partial response cannot be completed
                    return Ok(());
                }
            }

            self.frame.produce_end(&mut self.write_buffer);
            flush(&mut self.output, &mut self.write_buffer).await?;

            if !self.frame.keep_alive() || self.frame.is_rejected() {
                return Ok(());
            }

            if let Err(_err) = self.frame.consume_body(&mut self.input).await {
                debug!("failed to drain request body: {_err}");
                return Ok(());
            }

            self.frame.reset();
        }
    }

    async fn reject(&mut self, err: FrameError) -> Result<(), FrameError> {
        if !err.is_bad_request() {
            return Err(err);
        }
        warning!("bad request: {err}");
        if self.frame.produce_rejection(err.status(), &mut self.write_buffer) {
            flush(&mut self.output, &mut self.write_buffer).await?;
        }
        Err(err)
    }
}

impl<R, W> std::fmt::Debug for Connection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("input", &self.input)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}
