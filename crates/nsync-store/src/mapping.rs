//! Translation between Notion's native property encoding and the plain record shape.

use std::collections::HashMap;

use nsync_types::{ExternalFileRef, ExternalRecord, PropertyChanges};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// A page as returned by a data source query. Only the parts we read are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionPage {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RichTextProperty {
    #[serde(default)]
    rich_text: Vec<RichTextRun>,
}

#[derive(Deserialize)]
struct RichTextRun {
    #[serde(default)]
    plain_text: Option<String>,
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct FilesProperty {
    #[serde(default)]
    files: Vec<FileObject>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FileObject {
    External { external: FileUrl },
    File { file: FileUrl },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct FileUrl {
    url: String,
}

/// Property names used on the Notion side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNames {
    pub status: String,
    pub attachments: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            status: "Status".to_string(),
            attachments: "attachments".to_string(),
        }
    }
}

/// Decode a page into an [`ExternalRecord`].
///
/// Status is the first rich-text run of the status property, `None` if the
/// property is missing, has another type, or holds no text. Attachments are the
/// URLs of external and Notion-hosted files, in order.
pub fn page_to_record(page: &NotionPage, names: &PropertyNames) -> ExternalRecord {
    let status = page
        .properties
        .get(&names.status)
        .and_then(|v| RichTextProperty::deserialize(v).ok())
        .and_then(|p| p.rich_text.into_iter().next())
        .and_then(|run| run.plain_text.or_else(|| run.text.map(|t| t.content)))
        .filter(|s| !s.is_empty());

    let attachments = page
        .properties
        .get(&names.attachments)
        .and_then(|v| FilesProperty::deserialize(v).ok())
        .map(|p| {
            p.files
                .into_iter()
                .filter_map(|f| match f {
                    FileObject::External { external } => Some(ExternalFileRef::new(external.url)),
                    FileObject::File { file } => Some(ExternalFileRef::new(file.url)),
                    FileObject::Unsupported => None,
                })
                .collect()
        })
        .unwrap_or_default();

    ExternalRecord {
        id: page.id.clone(),
        status,
        attachments,
    }
}

/// Encode changes as a Notion `properties` object for a page update.
pub fn native_properties(changes: &PropertyChanges, names: &PropertyNames) -> Value {
    let mut properties = Map::new();

    if let Some(status) = &changes.status {
        properties.insert(
            names.status.clone(),
            json!({
                "rich_text": [{"type": "text", "text": {"content": status}}]
            }),
        );
    }

    if let Some(attachments) = &changes.attachments {
        let files: Vec<Value> = attachments
            .iter()
            .map(|f| {
                json!({
                    "type": "external",
                    "name": f.file_name(),
                    "external": {"url": f.url}
                })
            })
            .collect();
        properties.insert(names.attachments.clone(), json!({ "files": files }));
    }

    Value::Object(properties)
}
