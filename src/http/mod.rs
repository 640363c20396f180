//! HTTP protocol primitives.
mod status;
mod version;
mod date;

pub use version::Version;
pub use status::StatusCode;
pub use date::{httpdate, httpdate_now};
