//! Core data model: addresses, messages, and conversation trees.

pub mod address;
pub mod conversation;
pub mod message;
