//! Server configuration.
use std::borrow::Cow;

/// Default size of a single pooled block.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;
/// Default number of blocks carved out of one slab.
pub const DEFAULT_SLAB_BLOCKS: usize = 32;
/// Default limit of request line plus header section, in bytes.
pub const DEFAULT_MAX_REQUEST_HEAD: usize = 32 * 1024;
/// Default limit of header fields per request.
pub const DEFAULT_MAX_HEADERS: usize = 100;

/// Buffer pool and HTTP/1.x framing configuration.
///
/// ```
/// use rill::Config;
///
/// let config = Config::default()
///     .with_block_size(2048)
///     .with_max_headers(32)
///     .with_server_header("rill");
/// assert_eq!(config.block_size, 2048);
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Size of each pooled block in bytes.
    pub block_size: usize,
    /// Number of blocks per slab allocation.
    pub slab_blocks: usize,
    /// Maximum number of live slabs, `None` is unbounded.
    ///
    /// When the limit is reached, allocation fails with [`PoolError::Exhausted`].
    ///
    /// [`PoolError::Exhausted`]: crate::pool::PoolError::Exhausted
    pub max_slabs: Option<usize>,
    /// Maximum bytes of request line and headers before the request is rejected.
    pub max_request_head: usize,
    /// Maximum number of request header fields.
    pub max_headers: usize,
    /// Value of the `Server` response header, omitted when `None`.
    pub server_header: Option<Cow<'static, str>>,
    /// Whether to add a `Date` response header when the application did not.
    pub date_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            slab_blocks: DEFAULT_SLAB_BLOCKS,
            max_slabs: None,
            max_request_head: DEFAULT_MAX_REQUEST_HEAD,
            max_headers: DEFAULT_MAX_HEADERS,
            server_header: None,
            date_header: true,
        }
    }
}

impl Config {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_slab_blocks(mut self, slab_blocks: usize) -> Self {
        self.slab_blocks = slab_blocks.max(1);
        self
    }

    pub fn with_max_slabs(mut self, max_slabs: usize) -> Self {
        self.max_slabs = Some(max_slabs);
        self
    }

    pub fn with_max_request_head(mut self, max: usize) -> Self {
        self.max_request_head = max;
        self
    }

    pub fn with_max_headers(mut self, max: usize) -> Self {
        self.max_headers = max;
        self
    }

    pub fn with_server_header(mut self, value: impl Into<Cow<'static, str>>) -> Self {
        self.server_header = Some(value.into());
        self
    }

    pub fn with_date_header(mut self, enabled: bool) -> Self {
        self.date_header = enabled;
        self
    }
}
