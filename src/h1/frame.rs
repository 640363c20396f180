use bytes::{BufMut, BytesMut};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::AsyncRead;

use super::body::MessageBody;
use super::chunked;
use super::error::{BodyError, FrameError};
use crate::common::{ParseResult, ready, tri};
use crate::config::Config;
use crate::cursor::Cursor;
use crate::headers::standard::{
    CONNECTION, CONTENT_LENGTH, DATE, EXPECT, SERVER, TRANSFER_ENCODING,
};
use crate::headers::{HeaderTable, contains_ignore_case};
use crate::http::{StatusCode, Version, httpdate_now};
use crate::input::SocketInput;
use crate::log::trace;
use crate::matches;

/// Parsing state of the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    StartLine,
    MessageHeader,
    MessageBody,
    /// No further request will be read from this connection.
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    RequestPending,
    RequestStarted,
    ResponseStarted,
}

/// Per connection request and response framing state.
///
/// One frame is reused for every request of a keep-alive connection, see
/// [`reset`][Frame::reset].
pub struct Frame {
    config: Arc<Config>,
    state: State,
    progress: Progress,
    method: String,
    path: String,
    query: String,
    version: Option<Version>,
    request_headers: HeaderTable,
    response_headers: HeaderTable,
    status: StatusCode,
    reason: Option<Cow<'static, str>>,
    keep_alive: bool,
    body: MessageBody,
    /// Request head bytes consumed so far.
    head_len: usize,
    continue_sent: bool,
    rejected: bool,
}

impl Frame {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            state: State::StartLine,
            progress: Progress::RequestPending,
            method: String::new(),
            path: String::new(),
            query: String::new(),
            version: None,
            request_headers: HeaderTable::new(),
            response_headers: HeaderTable::new(),
            status: StatusCode::OK,
            reason: None,
            keep_alive: false,
            body: MessageBody::empty(),
            head_len: 0,
            continue_sent: false,
            rejected: false,
        }
    }

    /// Prepare for the next request on a persistent connection.
    pub fn reset(&mut self) {
        self.state = State::StartLine;
        self.progress = Progress::RequestPending;
        self.method.clear();
        self.path.clear();
        self.query.clear();
        self.version = None;
        self.request_headers.clear();
        self.response_headers.clear();
        self.status = StatusCode::OK;
        self.reason = None;
        self.keep_alive = false;
        self.body = MessageBody::empty();
        self.head_len = 0;
        self.continue_sent = false;
        self.rejected = false;
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query including the leading `?`, or empty.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    #[inline]
    pub fn request_headers(&self) -> &HeaderTable {
        &self.request_headers
    }

    #[inline]
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Returns whether the connection persists after this request.
    ///
    /// Final once the response head is produced.
    #[inline]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    #[inline]
    pub fn has_response_started(&self) -> bool {
        self.progress == Progress::ResponseStarted
    }

    /// Returns `true` if reading this request failed and the connection must close.
    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.rejected
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), FrameError> {
        if self.has_response_started() {
            return Err(FrameError::ResponseStarted);
        }
        self.status = status;
        Ok(())
    }

    /// Override the canonical reason phrase.
    pub fn set_reason(&mut self, reason: impl Into<Cow<'static, str>>) -> Result<(), FrameError> {
        if self.has_response_started() {
            return Err(FrameError::ResponseStarted);
        }
        self.reason = Some(reason.into());
        Ok(())
    }

    #[inline]
    pub fn response_headers(&self) -> &HeaderTable {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> Result<&mut HeaderTable, FrameError> {
        if self.has_response_started() {
            return Err(FrameError::ResponseStarted);
        }
        Ok(&mut self.response_headers)
    }
}

// ===== Request =====

impl Frame {
    /// Read the request line and headers, waiting for more input as needed.
    ///
    /// Returns `Ok(false)` if the peer finished, or the connection shut down, before a
    /// complete request head arrived.
    pub async fn read_request_head<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
    ) -> Result<bool, FrameError>
    where
        IO: AsyncRead + Unpin,
    {
        loop {
            if input.is_aborted() {
                self.state = State::Terminated;
            }

            let result = match self.state {
                State::StartLine => self.take_start_line(input),
                State::MessageHeader => self.take_message_headers(input),
                State::MessageBody => return Ok(true),
                State::Terminated => return Ok(false),
            };

            match result {
                ParseResult::Ok(()) => {
                    if self.head_len > self.config.max_request_head {
                        self.rejected = true;
                        return Err(FrameError::RequestHeadTooLarge);
                    }
                }
                ParseResult::Err(err) => {
                    self.rejected = true;
                    return Err(err);
                }
                ParseResult::Pending => {
                    if self.head_len + input.len() > self.config.max_request_head {
                        self.rejected = true;
                        return Err(FrameError::RequestHeadTooLarge);
                    }
                    if input.is_fin() {
                        self.state = State::Terminated;
                        return Ok(false);
                    }
                    input.fill().await?;
                }
            }
        }
    }

    /// Parse the request line from buffered input.
    ///
    /// On success the line and its CRLF are consumed and the state moves to
    /// [`State::MessageHeader`].
    pub fn take_start_line<IO>(&mut self, input: &mut SocketInput<IO>) -> ParseResult<(), FrameError> {
        let begin = input.cursor();

        let mut line_end = begin;
        ready!(line_end.seek(b'\r'));
        let line_len = begin.length_to(&line_end);
        let mut scan = line_end;
        scan.take();
        if ready!(scan.take()) != b'\n' {
            return ParseResult::Err(FrameError::MalformedStartLine("missing LF after CR"));
        }
        let consumed = begin.length_to(&scan);
        self.progress = Progress::RequestStarted;

        let within_line = |at: &Cursor<'_>| begin.length_to(at) < line_len;

        // method
        let mut scan = begin;
        if scan.seek(b' ').is_none() || !within_line(&scan) {
            return ParseResult::Err(FrameError::MalformedStartLine("missing method separator"));
        }
        let method = begin.get_array_segment(&scan);
        if method.is_empty() || !method.iter().all(|&byte| matches::is_token(byte)) {
            return ParseResult::Err(FrameError::InvalidMethod);
        }
        scan.take();

        // path and query
        let path_begin = scan;
        let found = scan.seek2(b' ', b'?');
        if found.is_none() || !within_line(&scan) {
            return ParseResult::Err(FrameError::MalformedStartLine("missing version separator"));
        }
        let path_end = scan;
        let mut query = Cow::Borrowed("");
        if found == Some(b'?') {
            let query_begin = scan;
            if scan.seek(b' ').is_none() || !within_line(&scan) {
                return ParseResult::Err(FrameError::MalformedStartLine("missing version separator"));
            }
            query = query_begin.get_string(&scan);
        } else if path_begin.length_to(&path_end) == 0 {
            return ParseResult::Err(FrameError::MalformedStartLine("missing request target"));
        }
        let path = path_begin.get_string(&path_end);
        scan.take();

        // version
        let version = scan.get_array_segment(&line_end);
        let Some(version) = Version::from_bytes(&version) else {
            return ParseResult::Err(FrameError::UnsupportedVersion);
        };

        self.method.clear();
        self.method.push_str(&String::from_utf8_lossy(&method));
        self.path.clear();
        self.path.push_str(&path);
        self.query.clear();
        self.query.push_str(&query);
        self.version = Some(version);

        self.head_len += consumed;
        input.skip(consumed);
        self.state = State::MessageHeader;
        ParseResult::Ok(())
    }

    /// Parse header lines from buffered input up to the empty line.
    ///
    /// Each complete line is consumed as it is parsed, so a `Pending` result keeps the
    /// headers read so far. On success the body reader is selected and the state moves
    /// to [`State::MessageBody`].
    pub fn take_message_headers<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
    ) -> ParseResult<(), FrameError> {
        while tri!(self.take_header_line(input)) {}

        self.keep_alive = self.request_keep_alive();
        self.body = tri!(ParseResult::from(MessageBody::for_request(
            &self.request_headers,
            self.keep_alive,
            &self.config,
        )));
        self.state = State::MessageBody;
        trace!(
            "request head of {} bytes, {} header fields",
            self.head_len,
            self.request_headers.len()
        );
        ParseResult::Ok(())
    }

    /// Returns `Ok(false)` at the empty line ending the header section.
    fn take_header_line<IO>(&mut self, input: &mut SocketInput<IO>) -> ParseResult<bool, FrameError> {
        let begin = input.cursor();
        let mut scan = begin;

        if ready!(scan.peek()) == b'\r' {
            scan.take();
            if ready!(scan.take()) != b'\n' {
                return ParseResult::Err(FrameError::MalformedHeaderLine("invalid end of header section"));
            }
            self.head_len += 2;
            input.skip(2);
            return ParseResult::Ok(false);
        }

        if ready!(scan.seek2(b':', b'\r')) == b'\r' {
            return ParseResult::Err(FrameError::MalformedHeaderLine("missing colon"));
        }
        let name = begin.get_array_segment(&scan);
        if name.is_empty() || !name.iter().all(|&byte| matches::is_token(byte)) {
            return ParseResult::Err(FrameError::MalformedHeaderLine("invalid header name"));
        }
        scan.take();

        let value_begin = scan;
        let mut folded = false;
        let value_end = loop {
            ready!(scan.seek(b'\r'));
            let cr = scan;
            scan.take();
            if ready!(scan.take()) != b'\n' {
                return ParseResult::Err(FrameError::MalformedHeaderLine("bare CR in header value"));
            }
            // obs-fold, CRLF followed by whitespace continues the value
            if matches::is_ows(ready!(scan.peek())) {
                folded = true;
                continue;
            }
            break cr;
        };

        if self.request_headers.len() >= self.config.max_headers {
            return ParseResult::Err(FrameError::TooManyHeaders);
        }

        let raw = value_begin.get_string(&value_end);
        let value = match folded {
            true => unfold(&raw),
            false => matches::trim_ows(&raw).to_owned(),
        };
        let consumed = begin.length_to(&scan);
        self.request_headers.append(String::from_utf8_lossy(&name), value);

        self.head_len += consumed;
        input.skip(consumed);
        ParseResult::Ok(true)
    }

    fn request_keep_alive(&self) -> bool {
        let connection = self.request_headers.get_all(CONNECTION);
        if connection.iter().any(|value| contains_ignore_case(value, "close")) {
            return false;
        }
        self.version.is_some_and(|version| version.is_persistent())
            || self.request_headers.has_token(CONNECTION, "keep-alive")
    }

    /// Returns `true` if the client waits for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.version == Some(Version::HTTP_11)
            && self
                .request_headers
                .get(EXPECT)
                .is_some_and(|value| matches::trim_ows(value).eq_ignore_ascii_case("100-continue"))
    }

    /// Read request body bytes into `dest`, `Ok(0)` at end of body.
    pub async fn read_body<IO>(
        &mut self,
        input: &mut SocketInput<IO>,
        dest: &mut [u8],
    ) -> Result<usize, BodyError>
    where
        IO: AsyncRead + Unpin,
    {
        let result = self.body.read(input, dest).await;
        if result.is_err() {
            self.rejected = true;
        }
        result
    }

    /// Discard the unread request body so the next request starts at its first byte.
    pub async fn consume_body<IO>(&mut self, input: &mut SocketInput<IO>) -> Result<u64, BodyError>
    where
        IO: AsyncRead + Unpin,
    {
        let result = self.body.consume(input).await;
        if result.is_err() {
            self.rejected = true;
        }
        result
    }
}

/// Join folded header value lines with a single space.
fn unfold(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    for segment in raw.split("\r\n").map(matches::trim_ows).filter(|s| !s.is_empty()) {
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(segment);
    }
    value
}

// ===== Response =====

impl Frame {
    /// Write the interim `100 Continue` response if the client expects one.
    ///
    /// Returns `true` if it was written.
    pub fn produce_continue(&mut self, buf: &mut BytesMut) -> bool {
        if self.continue_sent || self.has_response_started() || !self.expects_continue() {
            return false;
        }
        self.continue_sent = true;
        buf.put_slice(b"HTTP/1.1 100 Continue\r\n\r\n");
        true
    }

    /// Decide whether the connection persists, adjusting the `Connection` header.
    fn finalize_keep_alive(&mut self) {
        let headers = &mut self.response_headers;
        let has_connection = headers.contains(CONNECTION);

        if self.keep_alive && headers.contains_ignore_case(CONNECTION, "close") {
            self.keep_alive = false;
        }
        if self.keep_alive
            && !headers.contains(CONTENT_LENGTH)
            && !headers.contains(TRANSFER_ENCODING)
        {
            self.keep_alive = false;
        }

        let http10 = self.version == Some(Version::HTTP_10);
        if !has_connection {
            if !self.keep_alive && !http10 {
                headers.append(CONNECTION, "close");
            } else if self.keep_alive && http10 {
                headers.append(CONNECTION, "keep-alive");
            }
        }
    }

    /// Write the response head into `buf`, once.
    ///
    /// With `app_completed`, the application finished without writing any body, so a
    /// response without framing headers gets `Content-Length: 0` where a body is
    /// allowed.
    pub fn produce_start(&mut self, buf: &mut BytesMut, app_completed: bool) {
        if self.has_response_started() {
            return;
        }
        self.progress = Progress::ResponseStarted;

        if app_completed
            && !self.response_headers.contains(CONTENT_LENGTH)
            && !self.response_headers.contains(TRANSFER_ENCODING)
            && self.method != "HEAD"
            && self.status.allows_body()
        {
            self.response_headers.append(CONTENT_LENGTH, "0");
        }

        self.finalize_keep_alive();

        if self.config.date_header && !self.response_headers.contains(DATE) {
            let date = httpdate_now();
            self.response_headers.append(DATE, String::from_utf8_lossy(&date));
        }
        if let Some(server) = &self.config.server_header {
            if !self.response_headers.contains(SERVER) {
                self.response_headers.append(SERVER, server.as_ref());
            }
        }

        self.write_head(buf);
    }

    fn write_head(&self, buf: &mut BytesMut) {
        let reason = match &self.reason {
            Some(reason) => reason.as_ref(),
            None => self.status.reason(),
        };

        buf.reserve(64 + self.response_headers.len() * 32);
        buf.put_slice(b"HTTP/1.1 ");
        buf.put_slice(itoa::Buffer::new().format(self.status.as_u16()).as_bytes());
        buf.put_u8(b' ');
        buf.put_slice(reason.as_bytes());
        buf.put_slice(b"\r\n");
        for (name, value) in self.response_headers.iter() {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
    }

    /// Returns `true` if response body writes use the chunked coding.
    pub fn is_chunked_response(&self) -> bool {
        self.response_headers.has_token(TRANSFER_ENCODING, "chunked")
    }

    /// Append response body bytes, starting the response if needed.
    pub fn produce_body(&mut self, data: &[u8], buf: &mut BytesMut) {
        self.produce_start(buf, false);
        if self.method == "HEAD" {
            return;
        }
        if self.is_chunked_response() {
            chunked::encode_chunk(data, buf);
        } else {
            buf.put_slice(data);
        }
    }

    /// Complete the response, writing the head if the application never did.
    pub fn produce_end(&mut self, buf: &mut BytesMut) {
        self.produce_start(buf, true);
        if self.method != "HEAD" && self.is_chunked_response() {
            chunked::encode_last_chunk(buf);
        }
    }

    /// Write an error response with an empty body, replacing any prepared headers.
    ///
    /// Returns `false` if the response already started and nothing was written.
    pub fn produce_error(&mut self, status: StatusCode, buf: &mut BytesMut) -> bool {
        if self.has_response_started() {
            return false;
        }
        self.status = status;
        self.reason = None;
        self.response_headers.clear();
        self.response_headers.append(CONTENT_LENGTH, "0");
        self.produce_start(buf, true);
        true
    }

    /// Answer a rejected request and give up the connection.
    ///
    /// Returns `false` if the response already started and nothing was written.
    pub fn produce_rejection(&mut self, status: StatusCode, buf: &mut BytesMut) -> bool {
        self.rejected = true;
        self.keep_alive = false;
        self.produce_error(status, buf)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("state", &self.state)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("version", &self.version)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
