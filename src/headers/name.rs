use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

/// Case insensitive view of a header name.
#[repr(transparent)]
pub(crate) struct Uncased(str);

impl Uncased {
    #[inline]
    pub(crate) fn new(name: &str) -> &Uncased {
        // SAFETY: `Uncased` is `repr(transparent)` over `str`
        unsafe { &*(name as *const str as *const Uncased) }
    }
}

impl PartialEq for Uncased {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Uncased {}

impl Hash for Uncased {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

/// Owned lookup key of a header name.
#[derive(Debug, Clone)]
pub(crate) struct Key(Box<str>);

impl Key {
    pub(crate) fn new(name: &str) -> Self {
        Self(name.into())
    }
}

impl Borrow<Uncased> for Key {
    #[inline]
    fn borrow(&self) -> &Uncased {
        Uncased::new(&self.0)
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Uncased::new(&self.0) == Uncased::new(&other.0)
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Uncased::new(&self.0).hash(state);
    }
}

/// Header names used by the framing layer, in their canonical casing.
pub mod standard {
    pub const CONNECTION: &str = "Connection";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    pub const EXPECT: &str = "Expect";
    pub const HOST: &str = "Host";
    pub const DATE: &str = "Date";
    pub const SERVER: &str = "Server";
    pub const CONTENT_TYPE: &str = "Content-Type";
}
