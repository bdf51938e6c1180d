//! # expo-tail
//!
//! Position-tracked log tailing and record parsing.
//!
//! [`LogTailer::poll`] returns only complete lines appended since the last
//! poll, tolerating a concurrent writer and detecting file rotation.
//! [`parse`] turns each raw line into a typed [`Record`], dropping anything
//! the closed tag set does not cover.

pub mod cursor;
pub mod error;
pub mod parser;
pub mod tailer;

pub use cursor::PositionCursor;
pub use error::TailError;
pub use parser::{parse, Record};
pub use tailer::LogTailer;
