use std::num::NonZeroU16;

/// HTTP response status code.
///
/// Any three digit code can be represented, well known codes carry a canonical
/// reason phrase.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(NonZeroU16);

impl Default for StatusCode {
    #[inline]
    fn default() -> Self {
        Self::OK
    }
}

impl StatusCode {
    /// Create status code from a three digit number.
    pub const fn from_u16(code: u16) -> Option<StatusCode> {
        if code < 100 || code > 999 {
            return None;
        }
        match NonZeroU16::new(code) {
            Some(code) => Some(Self(code)),
            None => None,
        }
    }

    /// Returns status code value, e.g: `200`.
    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0.get()
    }

    /// Returns `false` for codes whose responses never carry a body.
    #[inline]
    pub const fn allows_body(&self) -> bool {
        !matches!(self.0.get(), 101 | 204 | 205 | 304)
    }
}

macro_rules! status_codes {
    (
        $(
            $(#[$doc:meta])*
            $int:literal $id:ident $msg:literal;
        )*
    ) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $id: Self = match Self::from_u16($int) {
                    Some(code) => code,
                    None => panic!("invalid status code"),
                };
            )*

            /// Returns the canonical reason phrase, e.g: `"OK"`, or `""` for unknown codes.
            #[inline]
            pub const fn reason(&self) -> &'static str {
                match self.0.get() {
                    $(
                        $int => $msg,
                    )*
                    _ => "",
                }
            }
        }
    };
}

status_codes! {
    /// `100`. The client should continue sending the request body.
    100 CONTINUE "Continue";
    /// `101`. The server is switching to the protocol named by the `Upgrade` request header.
    101 SWITCHING_PROTOCOLS "Switching Protocols";
    /// `200`. The request succeeded.
    200 OK "OK";
    201 CREATED "Created";
    202 ACCEPTED "Accepted";
    /// `204`. There is no content to send for this request.
    204 NO_CONTENT "No Content";
    205 RESET_CONTENT "Reset Content";
    206 PARTIAL_CONTENT "Partial Content";
    301 MOVED_PERMANENTLY "Moved Permanently";
    302 FOUND "Found";
    303 SEE_OTHER "See Other";
    /// `304`. The cached version of the resource is still valid.
    304 NOT_MODIFIED "Not Modified";
    307 TEMPORARY_REDIRECT "Temporary Redirect";
    308 PERMANENT_REDIRECT "Permanent Redirect";
    /// `400`. The request is malformed.
    400 BAD_REQUEST "Bad Request";
    401 UNAUTHORIZED "Unauthorized";
    403 FORBIDDEN "Forbidden";
    404 NOT_FOUND "Not Found";
    405 METHOD_NOT_ALLOWED "Method Not Allowed";
    408 REQUEST_TIMEOUT "Request Timeout";
    411 LENGTH_REQUIRED "Length Required";
    413 CONTENT_TOO_LARGE "Content Too Large";
    414 URI_TOO_LONG "URI Too Long";
    415 UNSUPPORTED_MEDIA_TYPE "Unsupported Media Type";
    417 EXPECTATION_FAILED "Expectation Failed";
    426 UPGRADE_REQUIRED "Upgrade Required";
    429 TOO_MANY_REQUESTS "Too Many Requests";
    /// `431`. The request line and header fields exceed the configured limit.
    431 REQUEST_HEADER_FIELDS_TOO_LARGE "Request Header Fields Too Large";
    /// `500`. The application failed to produce a response.
    500 INTERNAL_SERVER_ERROR "Internal Server Error";
    501 NOT_IMPLEMENTED "Not Implemented";
    502 BAD_GATEWAY "Bad Gateway";
    503 SERVICE_UNAVAILABLE "Service Unavailable";
    /// `505`. The request used an HTTP version other than 1.0 or 1.1.
    505 HTTP_VERSION_NOT_SUPPORTED "HTTP Version Not Supported";
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

impl std::fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "StatusCode({})", self.as_u16())
    }
}
