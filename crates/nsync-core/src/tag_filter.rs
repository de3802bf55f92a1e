use nsync_types::{EmptyTagPolicy, Message};
use tracing::debug;

/// Lower-cased substring needles parsed from a comma-separated tag string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    needles: Vec<String>,
}

impl TagSet {
    /// Split `raw` on `,` and lower-case each tag.
    ///
    /// Non-empty tags are kept verbatim (no trimming), so `"incidencia:"` only
    /// matches with the colon. Whitespace-only tags count as empty.
    pub fn parse(raw: &str, policy: EmptyTagPolicy) -> Self {
        let needles = raw
            .split(',')
            .filter_map(|tag| {
                if tag.trim().is_empty() {
                    match policy {
                        EmptyTagPolicy::Strip => None,
                        EmptyTagPolicy::MatchAll => Some(String::new()),
                    }
                } else {
                    Some(tag.to_lowercase())
                }
            })
            .collect();
        Self { needles }
    }

    /// True if the lower-cased content contains at least one needle.
    pub fn matches(&self, content: &str) -> bool {
        let content = content.to_lowercase();
        self.needles.iter().any(|n| content.contains(n.as_str()))
    }

    pub fn needles(&self) -> &[String] {
        &self.needles
    }

    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }
}

/// Result of filtering a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Nothing matched; the store does not need to be queried.
    NoMatches { processed: usize },
    /// Matching messages, in input order. Never empty.
    Matched(Vec<Message>),
}

/// Keep the messages whose content matches `tags`, preserving order.
pub fn filter_messages(messages: Vec<Message>, tags: &TagSet) -> FilterOutcome {
    let processed = messages.len();
    let matched: Vec<Message> = messages
        .into_iter()
        .filter(|m| tags.matches(&m.content))
        .collect();

    debug!(processed, matched = matched.len(), "Tag filter applied");

    if matched.is_empty() {
        FilterOutcome::NoMatches { processed }
    } else {
        FilterOutcome::Matched(matched)
    }
}
