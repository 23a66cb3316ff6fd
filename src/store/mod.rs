//! Archive storage access.

pub mod reader;
