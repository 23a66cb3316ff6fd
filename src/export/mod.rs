//! Export functionality: MBOX fragments for appending to archives.

pub mod mbox;
