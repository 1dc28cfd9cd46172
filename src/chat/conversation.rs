use crate::models::message::ChatMessage;

pub const DEFAULT_GREETING: &str =
    "Hello! I'm an LLM chat app powered by Cloudflare Workers AI. How can I help you today?";

/// Ordered, append-only record of the conversation. Insertion order is
/// conversation order and doubles as the request payload.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log seeded with an assistant greeting as its first turn.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
        }
    }

    pub fn append(&mut self, message: ChatMessage) {
        log::debug!(
            "Appending {} message ({} bytes) at position {}",
            message.role(),
            message.content().len(),
            self.messages.len()
        );
        self.messages.push(message);
    }

    /// Copy of the log as it stands now.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
