//! Conversation state shared between front ends
//!
//! Messages are kept in chronological order, which is also the order they are
//! sent to the chat API. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A chat message in the assistant conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Ordered message history.
///
/// Unbounded unless a cap is given; with a cap the oldest messages are
/// evicted so the length never exceeds it.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: VecDeque<ChatMessage>,
    max_messages: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(max_messages: Option<usize>) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: max_messages.filter(|&cap| cap > 0),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        if let Some(cap) = self.max_messages {
            while self.messages.len() > cap {
                self.messages.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut conv = Conversation::new();
        conv.push(ChatMessage::user("one"));
        conv.push(ChatMessage::assistant("two"));
        let contents: Vec<&str> = conv.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut conv = Conversation::with_cap(Some(2));
        conv.push(ChatMessage::user("a"));
        conv.push(ChatMessage::assistant("b"));
        conv.push(ChatMessage::user("c"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.iter().next().unwrap().content, "b");
        assert_eq!(conv.last().unwrap().content, "c");
    }

    #[test]
    fn test_zero_cap_means_unbounded() {
        let mut conv = Conversation::with_cap(Some(0));
        for i in 0..5 {
            conv.push(ChatMessage::user(i.to_string()));
        }
        assert_eq!(conv.len(), 5);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }
}
