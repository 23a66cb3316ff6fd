//! `mboxthread`: rebuild threaded conversations from MBOX archives.
//!
//! The forward path splits an archive into raw segments, undoes the
//! archive escaping, parses each segment into a [`Message`], and links the
//! messages into [`Conversation`] trees. The reverse path formats a single
//! message as a fragment that can be appended to an archive.

pub mod archive;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod store;
pub mod threading;

pub use archive::{parse_archive, parse_archive_with, ArchiveOptions};
pub use error::{MboxError, Result};
pub use export::mbox::format_message;
pub use model::conversation::Conversation;
pub use model::message::Message;
