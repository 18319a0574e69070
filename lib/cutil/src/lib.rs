//! # CUtil - Common Utilities Library
//!
//! Small helpers shared by the workspace crates.
//!
//! ## Features
//!
//! - `fs`: File system utilities (prefix cleanup, extension helpers, existence checks)
//! - `str`: String utilities (random suffixes)
//! - `time`: Time utilities (log timestamps, millisecond clocks)

#[cfg(feature = "fs")]
pub mod fs;

#[cfg(feature = "str")]
pub mod str;

#[cfg(feature = "time")]
pub mod time;
