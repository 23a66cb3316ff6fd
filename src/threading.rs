//! Conversation building from `Message-Id` / `In-Reply-To` links.
//!
//! Every message without `In-Reply-To` starts a conversation. Replies are then
//! attached, in archive order, under the conversation that already holds
//! their parent. Replies that cannot be placed are dropped and reported to a
//! [`Diagnostics`] sink; they never fail the build.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::conversation::Conversation;
use crate::model::message::Message;

/// How replies whose parent is not placed yet are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// One pass in archive order. A reply seen before its (non-root) parent
    /// has been attached is dropped.
    #[default]
    SinglePass,
    /// Keep such replies pending and retry until a pass attaches nothing.
    FixedPoint,
}

/// Why a reply was left out of every conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedReason {
    /// No message in the archive has the referenced id.
    MissingParent,
    /// The parent exists but is not part of any conversation.
    ParentNotInConversation,
}

/// A reply that was dropped while building conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReply {
    pub message_id: String,
    pub in_reply_to: String,
    pub reason: UnresolvedReason,
}

/// Receives non-fatal events from the conversation builder.
pub trait Diagnostics {
    fn unresolved_reply(&mut self, event: UnresolvedReply);
}

/// Reports events as `tracing` info events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn unresolved_reply(&mut self, event: UnresolvedReply) {
        match event.reason {
            UnresolvedReason::MissingParent => info!(
                message_id = %event.message_id,
                in_reply_to = %event.in_reply_to,
                "Can't find parent, discarding reply"
            ),
            UnresolvedReason::ParentNotInConversation => info!(
                message_id = %event.message_id,
                in_reply_to = %event.in_reply_to,
                "Can't find conversation for parent, discarding reply"
            ),
        }
    }
}

/// Collects events, e.g. to count or print them afterwards.
impl Diagnostics for Vec<UnresolvedReply> {
    fn unresolved_reply(&mut self, event: UnresolvedReply) {
        self.push(event);
    }
}

/// Link messages into conversations.
///
/// `messages` is in archive order. When several messages share an id, only
/// the first one takes part. Conversations come back in the order their
/// roots appear.
pub fn build_conversations(
    messages: Vec<Message>,
    resolution: Resolution,
    diagnostics: &mut dyn Diagnostics,
) -> Vec<Conversation> {
    // Step 1: id index, first occurrence wins.
    let mut known: HashSet<String> = HashSet::with_capacity(messages.len());
    let mut unique: Vec<Message> = Vec::with_capacity(messages.len());
    for msg in messages {
        if known.insert(msg.id.clone()) {
            unique.push(msg);
        } else {
            debug!(message_id = %msg.id, "Ignoring message with duplicate id");
        }
    }

    // Step 2: one conversation per root.
    let mut conversations: Vec<Conversation> = Vec::new();
    let mut conversation_of: HashMap<String, usize> = HashMap::new();
    let mut replies: Vec<(String, Message)> = Vec::new();
    for msg in unique {
        match msg.in_reply_to().map(str::to_string) {
            Some(parent) => replies.push((parent, msg)),
            None => {
                conversation_of.insert(msg.id.clone(), conversations.len());
                conversations.push(Conversation::new(msg));
            }
        }
    }

    // Step 3: attach replies in archive order.
    let mut pending: Vec<(String, Message)> = Vec::new();
    for (parent, msg) in replies {
        if !known.contains(&parent) {
            diagnostics.unresolved_reply(UnresolvedReply {
                message_id: msg.id,
                in_reply_to: parent,
                reason: UnresolvedReason::MissingParent,
            });
            continue;
        }
        if let Some((parent, msg)) =
            attach(&mut conversations, &mut conversation_of, parent, msg)
        {
            pending.push((parent, msg));
        }
    }

    if resolution == Resolution::FixedPoint {
        let mut pass = 1;
        loop {
            let before = pending.len();
            pending = pending
                .into_iter()
                .filter_map(|(parent, msg)| {
                    attach(&mut conversations, &mut conversation_of, parent, msg)
                })
                .collect();
            pass += 1;
            if pending.len() == before {
                break;
            }
        }
        debug!(passes = pass, "Reply resolution reached a fixed point");
    }

    for (parent, msg) in pending {
        diagnostics.unresolved_reply(UnresolvedReply {
            message_id: msg.id,
            in_reply_to: parent,
            reason: UnresolvedReason::ParentNotInConversation,
        });
    }

    conversations
}

/// Attach `msg` under `parent` if the parent is already placed.
///
/// Hands the pair back when it cannot be attached yet.
fn attach(
    conversations: &mut [Conversation],
    conversation_of: &mut HashMap<String, usize>,
    parent: String,
    msg: Message,
) -> Option<(String, Message)> {
    let Some(&idx) = conversation_of.get(&parent) else {
        return Some((parent, msg));
    };
    let id = msg.id.clone();
    match conversations[idx].add_reply(&parent, msg) {
        Ok(()) => {
            conversation_of.insert(id, idx);
            None
        }
        Err(msg) => {
            warn!(message_id = %msg.id, in_reply_to = %parent, "Reply rejected by conversation");
            None
        }
    }
}
