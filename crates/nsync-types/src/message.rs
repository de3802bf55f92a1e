use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A reaction left on a message. Only the emoji name takes part in reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub emoji_name: Option<String>,
    #[serde(default)]
    pub count: u32,
}

/// File attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Attachment {
    /// The attachment URL, if present and non-empty.
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Canonical chat message, projected from the feed's raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    pub author: Author,
    pub channel_id: String,
    #[serde(default)]
    pub message_type: u16,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Status the record should carry: the first reaction's emoji name, or `""`.
    ///
    /// Later reactions never override the first one.
    pub fn desired_status(&self) -> &str {
        self.reactions
            .first()
            .and_then(|r| r.emoji_name.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message(reactions: Vec<Reaction>) -> Message {
        Message {
            id: "1001".to_string(),
            content: "se reporta una incidencia: X".to_string(),
            timestamp: "2025-06-01T10:00:00.000000+00:00".to_string(),
            author: Author {
                id: "42".to_string(),
                username: "alice".to_string(),
                display_name: Some("Alice".to_string()),
            },
            channel_id: "900".to_string(),
            message_type: 0,
            reactions,
            attachments: vec![],
        }
    }

    fn reaction(name: Option<&str>) -> Reaction {
        Reaction {
            emoji_name: name.map(str::to_string),
            count: 1,
        }
    }

    #[test]
    fn desired_status_without_reactions_is_empty() {
        assert_eq!(make_message(vec![]).desired_status(), "");
    }

    #[test]
    fn desired_status_uses_first_reaction() {
        let msg = make_message(vec![reaction(Some("resolved")), reaction(Some("open"))]);
        assert_eq!(msg.desired_status(), "resolved");
    }

    #[test]
    fn desired_status_with_nameless_emoji_is_empty() {
        let msg = make_message(vec![reaction(None), reaction(Some("open"))]);
        assert_eq!(msg.desired_status(), "");
    }

    #[test]
    fn usable_url_rejects_empty() {
        let mut att = Attachment {
            id: "a1".to_string(),
            filename: "y.png".to_string(),
            size: 10,
            content_type: None,
            url: Some(String::new()),
        };
        assert!(att.usable_url().is_none());
        att.url = None;
        assert!(att.usable_url().is_none());
        att.url = Some("https://x/y.png".to_string());
        assert_eq!(att.usable_url(), Some("https://x/y.png"));
    }

    #[test]
    fn message_defaults() {
        let json = r#"{
            "id": "1",
            "timestamp": "2025-01-01T00:00:00Z",
            "author": {"id": "u1", "username": "bob"},
            "channel_id": "c1"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(msg.content.is_empty());
        assert!(msg.reactions.is_empty());
        assert!(msg.attachments.is_empty());
        assert!(msg.author.display_name.is_none());
    }
}
