//! Reply trees rebuilt from an archive.

use std::collections::HashMap;

use serde::Serialize;

use super::message::Message;

/// A thread of messages rooted at a message without `In-Reply-To`.
///
/// Messages live in a flat arena; node 0 is always the root. Replies under a
/// node keep the order in which they were attached.
#[derive(Debug, Clone)]
pub struct Conversation {
    nodes: Vec<Node>,
    by_id: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct Node {
    message: Message,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Conversation {
    /// Start a conversation at `root`.
    pub fn new(root: Message) -> Self {
        let mut by_id = HashMap::new();
        by_id.insert(root.id.clone(), 0);
        Self {
            nodes: vec![Node {
                message: root,
                parent: None,
                children: Vec::new(),
            }],
            by_id,
        }
    }

    /// Attach `reply` as the last child of the message `parent_id`.
    ///
    /// Gives the reply back if the parent is not part of this conversation
    /// or the reply's id is already taken.
    pub fn add_reply(&mut self, parent_id: &str, reply: Message) -> Result<(), Message> {
        let Some(&parent) = self.by_id.get(parent_id) else {
            return Err(reply);
        };
        if self.by_id.contains_key(&reply.id) {
            return Err(reply);
        }
        let idx = self.nodes.len();
        self.by_id.insert(reply.id.clone(), idx);
        self.nodes.push(Node {
            message: reply,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        Ok(())
    }

    /// The root message.
    pub fn first(&self) -> &Message {
        &self.nodes[0].message
    }

    /// Look up a message of this conversation by id.
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.by_id.get(id).map(|&i| &self.nodes[i].message)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Direct replies to `id`, in attachment order. Empty for unknown ids.
    pub fn replies<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Message> + 'a {
        let children: &'a [usize] = self
            .by_id
            .get(id)
            .map_or(&[][..], |&i| self.nodes[i].children.as_slice());
        children.iter().map(move |&c| &self.nodes[c].message)
    }

    /// The message `id` replies to, `None` for the root or unknown ids.
    pub fn parent(&self, id: &str) -> Option<&Message> {
        let idx = *self.by_id.get(id)?;
        self.nodes[idx].parent.map(|p| &self.nodes[p].message)
    }

    /// Distance from the root (root = 0).
    pub fn depth(&self, id: &str) -> Option<usize> {
        let mut idx = *self.by_id.get(id)?;
        let mut depth = 0;
        while let Some(parent) = self.nodes[idx].parent {
            idx = parent;
            depth += 1;
        }
        Some(depth)
    }

    /// Every message, depth-first from the root, siblings in attachment order.
    pub fn all_messages(&self) -> Vec<&Message> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            out.push(&self.nodes[idx].message);
            stack.extend(self.nodes[idx].children.iter().rev());
        }
        out
    }

    /// Number of messages, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a conversation holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn tree(&self, idx: usize) -> TreeView<'_> {
        TreeView {
            message: &self.nodes[idx].message,
            replies: self.nodes[idx]
                .children
                .iter()
                .map(|&c| self.tree(c))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct TreeView<'a> {
    #[serde(flatten)]
    message: &'a Message,
    replies: Vec<TreeView<'a>>,
}

impl Serialize for Conversation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree(0).serialize(serializer)
    }
}
