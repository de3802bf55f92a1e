//! Raw feed input → canonical [`Message`] records.
//!
//! A batch arrives as an ordered list of items, each carrying a JSON payload.
//! Three layouts are accepted and resolved once by [`InputShape::resolve`]:
//! the last payload is the message array itself, the last payload wraps a
//! `messages` array, or every item's payload is a single message.

use std::path::Path;

use nsync_types::{Attachment, Author, Message, Reaction, Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One item of an input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    pub json: Value,
}

/// Ordered batch of input items, as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub items: Vec<InputItem>,
}

impl RawBatch {
    pub fn new(items: Vec<InputItem>) -> Self {
        Self { items }
    }

    /// A batch of one item carrying `payload`.
    pub fn from_payload(payload: Value) -> Self {
        Self {
            items: vec![InputItem { json: payload }],
        }
    }

    /// Build a batch from a top-level JSON array.
    ///
    /// Objects with a `json` key and no `id` are taken as items, and sibling
    /// keys such as `pairedItem` or `binary` are dropped. Any other element is
    /// used as an item payload directly.
    pub fn from_value(value: Value) -> Result<Self> {
        let elements = match value {
            Value::Array(elements) => elements,
            other => {
                return Err(SyncError::InputShape(format!(
                    "input batch must be a JSON array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let items = elements
            .into_iter()
            .map(|element| match element {
                Value::Object(mut obj)
                    if obj.contains_key("json") && !obj.contains_key("id") =>
                {
                    InputItem {
                        json: obj.remove("json").unwrap_or(Value::Null),
                    }
                }
                other => InputItem { json: other },
            })
            .collect();

        Ok(Self { items })
    }

    /// Read a batch from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_value(value).map_err(|e| match e {
            SyncError::InputShape(msg) => {
                SyncError::InputShape(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Layout of a batch, resolved from its last item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputShape<'a> {
    /// The last item's payload is the message array.
    MessageArray(&'a [Value]),
    /// The last item's payload is an object with a `messages` array.
    Wrapped(&'a [Value]),
    /// Each item's payload is one message.
    PerItem(&'a [InputItem]),
}

impl<'a> InputShape<'a> {
    pub fn resolve(items: &'a [InputItem]) -> Self {
        match items.last().map(|item| &item.json) {
            Some(Value::Array(messages)) => Self::MessageArray(messages),
            Some(Value::Object(obj)) => match obj.get("messages") {
                Some(Value::Array(messages)) => Self::Wrapped(messages),
                _ => Self::PerItem(items),
            },
            _ => Self::PerItem(items),
        }
    }

    fn raw_messages(&self) -> Vec<&'a Value> {
        match *self {
            Self::MessageArray(messages) | Self::Wrapped(messages) => messages.iter().collect(),
            Self::PerItem(items) => items.iter().map(|item| &item.json).collect(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::MessageArray(_) => "message array",
            Self::Wrapped(_) => "wrapped messages",
            Self::PerItem(_) => "per-item",
        }
    }
}

/// Normalize a raw batch into messages, preserving input order.
pub fn normalize(batch: &RawBatch) -> Result<Vec<Message>> {
    let shape = InputShape::resolve(&batch.items);
    let raw = shape.raw_messages();
    debug!(
        shape = shape.label(),
        items = batch.len(),
        messages = raw.len(),
        "Input shape resolved"
    );

    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            RawMessage::deserialize(value)
                .map(Message::from)
                .map_err(|e| {
                    SyncError::InputShape(format!(
                        "{} batch of {} item(s), message #{index}: {e}",
                        shape.label(),
                        batch.len()
                    ))
                })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Feed payload (Discord message object). Unlisted fields are ignored.
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawMessage {
    id: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    timestamp: String,
    author: RawAuthor,
    channel_id: String,
    #[serde(default, rename = "type")]
    message_type: u16,
    #[serde(default)]
    reactions: Option<Vec<RawReaction>>,
    #[serde(default)]
    attachments: Option<Vec<RawAttachment>>,
}

#[derive(Deserialize)]
struct RawAuthor {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Deserialize)]
struct RawReaction {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    emoji: Option<RawEmoji>,
}

#[derive(Deserialize)]
struct RawEmoji {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawAttachment {
    id: String,
    filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        Message {
            id: raw.id,
            content: raw.content.unwrap_or_default(),
            timestamp: raw.timestamp,
            author: Author {
                id: raw.author.id,
                username: raw.author.username,
                display_name: raw.author.global_name,
            },
            channel_id: raw.channel_id,
            message_type: raw.message_type,
            reactions: raw
                .reactions
                .unwrap_or_default()
                .into_iter()
                .map(|r| Reaction {
                    emoji_name: r.emoji.and_then(|e| e.name),
                    count: r.count,
                })
                .collect(),
            attachments: raw
                .attachments
                .unwrap_or_default()
                .into_iter()
                .map(|a| Attachment {
                    id: a.id,
                    filename: a.filename,
                    size: a.size,
                    content_type: a.content_type,
                    url: a.url,
                })
                .collect(),
        }
    }
}
