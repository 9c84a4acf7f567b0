/// Author of a conversation message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    /// Any role this crate does not distinguish.
    #[serde(other)]
    Other,
}

/// One typed part of a message body.
///
/// Any part carrying a string `text` contributes to plain-text extraction,
/// whatever its kind. Kinds this crate does not model are kept as `Other`
/// together with their text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "RawPart", into = "RawPart")]
#[non_exhaustive]
pub enum ContentPart {
    /// Plain text. A missing `text` field reads as empty.
    Text { text: String },
    /// Image reference (URL or data URI).
    Image { image: String },
    /// Attached file.
    File {
        data: String,
        mime_type: Option<String>,
    },
    /// Part kind unknown to this crate, such as `reasoning`.
    Other { kind: String, text: Option<String> },
}

impl ContentPart {
    /// Returns the text this part contributes, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Other { text, .. } => text.as_deref(),
            Self::Image { .. } | Self::File { .. } => None,
        }
    }
}

/// Wire shape of a part: a `type` tag plus optional fields.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
struct RawPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

impl From<RawPart> for ContentPart {
    fn from(raw: RawPart) -> Self {
        let RawPart {
            kind,
            text,
            image,
            data,
            mime_type,
        } = raw;
        let text = match text {
            Some(serde_json::Value::String(text)) => Some(text),
            _ => None,
        };
        if kind == "text" {
            return Self::Text {
                text: text.unwrap_or_default(),
            };
        }
        if text.is_none() {
            match (kind.as_str(), image, data) {
                ("image", Some(image), _) => return Self::Image { image },
                ("file", _, Some(data)) => return Self::File { data, mime_type },
                _ => {}
            }
        }
        Self::Other { kind, text }
    }
}

impl From<ContentPart> for RawPart {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self {
                kind: "text".into(),
                text: Some(serde_json::Value::String(text)),
                ..Self::default()
            },
            ContentPart::Image { image } => Self {
                kind: "image".into(),
                image: Some(image),
                ..Self::default()
            },
            ContentPart::File { data, mime_type } => Self {
                kind: "file".into(),
                data: Some(data),
                mime_type,
                ..Self::default()
            },
            ContentPart::Other { kind, text } => Self {
                kind,
                text: text.map(serde_json::Value::String),
                ..Self::default()
            },
        }
    }
}

/// Message body: either a plain string or an ordered list of typed parts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenates, in order, the text of every part that carries one.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => {
                let mut out = String::new();
                for text in parts.iter().filter_map(ContentPart::text) {
                    out.push_str(text);
                }
                out
            }
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A conversation message as held by the caller.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    /// Creates a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text.into()))
    }
}

/// Returns the trimmed plain text of the most recent user message.
///
/// Returns `None` when the history has no user message or when that message
/// is blank after trimming.
pub fn latest_user_text(history: &[Message]) -> Option<String> {
    let message = history.iter().rev().find(|m| m.role == Role::User)?;
    let text = message.content.plain_text();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// One part of an emitted assistant snapshot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotPart {
    Text { text: String },
}

/// Full assistant reply accumulated so far.
///
/// Each snapshot replaces the previous one; it is never a delta.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssistantSnapshot {
    pub content: Vec<SnapshotPart>,
}

impl AssistantSnapshot {
    /// Creates a single-text-part snapshot.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![SnapshotPart::Text { text: text.into() }],
        }
    }

    /// Returns the concatenated text of the snapshot.
    pub fn as_text(&self) -> String {
        let mut out = String::new();
        for part in &self.content {
            let SnapshotPart::Text { text } = part;
            out.push_str(text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_skips_parts_without_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "hello".into(),
            },
            ContentPart::Image {
                image: "https://example.com/cat.png".into(),
            },
            ContentPart::Text {
                text: " world".into(),
            },
        ]);
        assert_eq!(content.plain_text(), "hello world");
    }

    #[test]
    fn latest_user_text_scans_from_the_end() {
        let history = vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("  second  "),
            Message::assistant("pending"),
        ];
        assert_eq!(latest_user_text(&history).as_deref(), Some("second"));
    }

    #[test]
    fn latest_user_text_is_none_without_user_or_when_blank() {
        assert_eq!(latest_user_text(&[Message::assistant("hi")]), None);
        assert_eq!(latest_user_text(&[Message::user(" \n\t ")]), None);
        assert_eq!(latest_user_text(&[]), None);
    }

    #[test]
    fn blank_latest_user_does_not_fall_back_to_older_turns() {
        let history = vec![Message::user("older"), Message::user("   ")];
        assert_eq!(latest_user_text(&history), None);
    }

    #[test]
    fn deserializes_ui_message_shapes() {
        let value = serde_json::json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": [
                {"type": "text", "text": "Hi "},
                {"type": "reasoning", "text": "thinking "},
                {"type": "file", "data": "abc", "mimeType": "text/plain"},
                {"type": "text", "text": "there"}
            ]},
            {"role": "data", "content": "x"}
        ]);
        let history: Vec<Message> = serde_json::from_value(value).expect("decode");
        assert_eq!(history[2].role, Role::Other);
        assert_eq!(
            latest_user_text(&history).as_deref(),
            Some("Hi thinking there")
        );
    }

    #[test]
    fn any_part_kind_with_text_contributes() {
        let history: Vec<Message> = serde_json::from_value(serde_json::json!([
            {"role": "user", "content": [{"type": "reasoning", "text": "abc"}]}
        ]))
        .expect("decode");
        assert_eq!(latest_user_text(&history).as_deref(), Some("abc"));
        let MessageContent::Parts(parts) = &history[0].content else {
            panic!("expected parts");
        };
        assert_eq!(
            parts[0],
            ContentPart::Other {
                kind: "reasoning".into(),
                text: Some("abc".into())
            }
        );
    }

    #[test]
    fn text_part_without_text_reads_as_empty() {
        let history: Vec<Message> = serde_json::from_value(serde_json::json!([
            {"role": "user", "content": [
                {"type": "text"},
                {"type": "text", "text": "hi"},
                {"type": "tool-call", "text": 42}
            ]}
        ]))
        .expect("decode");
        assert_eq!(latest_user_text(&history).as_deref(), Some("hi"));
    }

    #[test]
    fn parts_serialize_with_type_tag() {
        let value = serde_json::to_value(vec![
            ContentPart::Text { text: "a".into() },
            ContentPart::File {
                data: "abc".into(),
                mime_type: Some("text/plain".into()),
            },
        ])
        .expect("encode");
        assert_eq!(
            value,
            serde_json::json!([
                {"type": "text", "text": "a"},
                {"type": "file", "data": "abc", "mimeType": "text/plain"}
            ])
        );
    }

    #[test]
    fn snapshot_serializes_as_typed_text_part() {
        let value = serde_json::to_value(AssistantSnapshot::text("ok")).expect("encode");
        assert_eq!(
            value,
            serde_json::json!({"content": [{"type": "text", "text": "ok"}]})
        );
    }
}
