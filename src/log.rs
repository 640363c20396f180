//! Log macros, compiled out without the `log` feature.
#![allow(unused, reason = "logger")]

/// Target of every record emitted by this crate.
pub(crate) const TARGET: &str = "rill";

macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::trace!(target: $crate::log::TARGET, $($tt)*);
    };
}

macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::debug!(target: $crate::log::TARGET, $($tt)*);
    };
}

macro_rules! info {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::info!(target: $crate::log::TARGET, $($tt)*);
    };
}

macro_rules! warning {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::warn!(target: $crate::log::TARGET, $($tt)*);
    };
}

macro_rules! error {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        ::log::error!(target: $crate::log::TARGET, $($tt)*);
    };
}

pub(crate) use {trace, debug, info, warning, error};
