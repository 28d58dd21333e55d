use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound chat events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wire tag the chat client uses for plain text messages.
pub const TEXT_KIND: &str = "chat";

/// Payload type of an inbound event.
///
/// Only [`MessageKind::Text`] is ever relayed; everything else (images,
/// stickers, calls, revoked messages...) keeps its raw tag for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Text,
    Other(String),
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        if tag == TEXT_KIND {
            Self::Text
        } else {
            Self::Other(tag)
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Text => TEXT_KIND.into(),
            MessageKind::Other(tag) => tag,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

/// An inbound chat event, as delivered by the chat client.
///
/// Field names on the wire follow the client's event shape:
/// `{ "from", "body", "type", "timestamp" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Conversation identifier (e.g. `123@c.us`).
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Event time in seconds since the Unix epoch.
    pub timestamp: i64,
}

impl InboundMessage {
    pub fn text(sender: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            kind: MessageKind::Text,
            timestamp,
        }
    }

    /// First `max` characters of the body, for log lines.
    pub fn preview(&self, max: usize) -> String {
        self.body.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_event_shape() {
        let json = r#"{"from":"123@c.us","body":"hello","type":"chat","timestamp":1700000000}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, "123@c.us");
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.timestamp, 1_700_000_000);
    }

    #[test]
    fn unknown_type_is_kept_verbatim() {
        let json = r#"{"from":"1@c.us","type":"image","timestamp":1}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageKind::Other("image".into()));
        assert!(msg.body.is_empty());
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        let msg = InboundMessage::text("a", "héllo wörld", 0);
        assert_eq!(msg.preview(5), "héllo");
    }
}
