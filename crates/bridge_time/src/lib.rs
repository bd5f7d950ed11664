//! Time utilities: an injectable clock so that components polling or aging
//! state can be driven deterministically in tests.

pub mod converters;
pub mod time;

#[cfg(any(feature = "testing", test))]
pub mod test_utils;
