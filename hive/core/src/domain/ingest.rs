// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document Ingestion
//!
//! Bulk feeders for the context index. Two kinds of input are understood:
//!
//! - a documentation tree: top-level markdown files plus everything under
//!   `docs/` and `brain/`, one document per relative path
//! - a chat export: one document per conversation, rendered as markdown
//!   and stripped of anything that looks like a credential

use std::collections::BTreeMap;
use std::path::{Component, Path};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::context::slugify;

pub const DEFAULT_TREE_SOURCE: &str = "github";
pub const DEFAULT_EXPORT_SOURCE: &str = "chatgpt";

/// Directories never descended into.
pub const SKIP_DIRS: &[&str] = &[".git", ".github", "node_modules", ".venv", "venv", "__pycache__", "target"];

/// Top-level directories whose whole contents are ingested.
pub const INCLUDE_DIRS: &[&str] = &["docs", "brain"];

pub const REDACTED: &str = "[REDACTED]";

/// Length of the conversation id suffix kept in an export doc id.
const CONVERSATION_ID_CHARS: usize = 12;

/// A document ready to be chunked into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub doc_id: String,
    pub body: String,
    pub metadata: Value,
}

/// Whether `relative` (a file path below the ingest root) belongs in the index.
pub fn should_include(relative: &Path) -> bool {
    let mut components = relative.components();
    let Some(Component::Normal(first)) = components.next() else {
        return false;
    };
    if components.next().is_none() {
        return relative.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    }
    first.to_str().is_some_and(|dir| INCLUDE_DIRS.contains(&dir))
}

/// Relative path with `/` separators, used as the doc id of tree documents.
pub fn doc_id_for_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Replaces API keys, bearer-style tokens and long hex secrets with [`REDACTED`].
pub struct SecretRedactor {
    patterns: Vec<Regex>,
}

impl SecretRedactor {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = [
            r"sk-[A-Za-z0-9]{20,}",
            r"(?i)api[_-]?key[:=]\s*[A-Za-z0-9_-]{16,}",
            r"[A-Za-z0-9_-]{24,}\.[A-Za-z0-9_-]{10,}",
            r"[A-Fa-f0-9]{32,}",
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for pattern in &self.patterns {
            if pattern.is_match(&redacted) {
                redacted = pattern.replace_all(&redacted, REDACTED).into_owned();
            }
        }
        redacted
    }
}

/// One conversation of a chat export. Newer exports keep messages in a
/// `mapping` of nodes, older ones in a flat `messages` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mapping: Option<BTreeMap<String, MappingNode>>,
    #[serde(default)]
    pub messages: Vec<ExportMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingNode {
    #[serde(default)]
    pub message: Option<ExportMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportMessage {
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(default)]
    pub create_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub parts: Vec<Value>,
}

impl ExportMessage {
    fn role(&self) -> String {
        self.author
            .as_ref()
            .and_then(|author| author.role.clone())
            .or_else(|| self.role.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Text parts joined by newlines; non-text parts are dropped.
    fn text(&self) -> String {
        let Some(content) = &self.content else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter_map(|part| match part {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Conversation {
    pub fn title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or("Untitled")
    }

    /// `<title slug>-<first 12 chars of the id slug>`, or the bare title slug.
    pub fn doc_id(&self) -> String {
        let base = slugify(self.title());
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                let suffix: String = slugify(id).chars().take(CONVERSATION_ID_CHARS).collect();
                format!("{}-{}", base, suffix)
            }
            None => base,
        }
    }

    /// `(role, text)` pairs in conversation order; empty messages are skipped.
    pub fn turns(&self) -> Vec<(String, String)> {
        let mut messages: Vec<&ExportMessage> = match &self.mapping {
            Some(mapping) => mapping.values().filter_map(|node| node.message.as_ref()).collect(),
            None => self.messages.iter().collect(),
        };
        if self.mapping.is_some() {
            messages.sort_by(|a, b| a.create_time.unwrap_or(0.0).total_cmp(&b.create_time.unwrap_or(0.0)));
        }
        messages
            .into_iter()
            .map(|message| (message.role(), message.text()))
            .filter(|(_, text)| !text.trim().is_empty())
            .collect()
    }

    /// Markdown transcript: a title heading then one `**role:** text` paragraph per turn.
    pub fn to_markdown(&self) -> String {
        let body: Vec<String> = self
            .turns()
            .into_iter()
            .map(|(role, text)| {
                let role = match role.to_lowercase().as_str() {
                    "tool" => "user".to_string(),
                    other => other.to_string(),
                };
                format!("**{}:** {}", role, text).trim().to_string()
            })
            .collect();
        format!("# {}\n\n\n{}", self.title(), body.join("\n\n"))
    }

    pub fn into_document(self, redactor: &SecretRedactor, source_path: &str, export_kind: &str) -> SourceDocument {
        SourceDocument {
            doc_id: self.doc_id(),
            body: redactor.redact(&self.to_markdown()),
            metadata: serde_json::json!({
                "title": self.title,
                "source_path": source_path,
                "export_kind": export_kind,
            }),
        }
    }
}

/// Conversations in one export file: either a list or a single object.
pub fn parse_conversations(json: &str) -> Result<Vec<Conversation>, serde_json::Error> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_include_filter() {
        assert!(should_include(Path::new("README.md")));
        assert!(should_include(Path::new("NOVA_PROTOCOL.MD")));
        assert!(!should_include(Path::new("Cargo.toml")));
        assert!(should_include(Path::new("docs/guide/setup.md")));
        assert!(should_include(Path::new("brain/notes.txt")));
        assert!(!should_include(Path::new("src/notes.md")));
        assert!(!should_include(Path::new("docsite/index.md")));
    }

    #[test]
    fn test_doc_id_uses_forward_slashes() {
        let path: PathBuf = ["docs", "guide", "setup.md"].iter().collect();
        assert_eq!(doc_id_for_path(&path), "docs/guide/setup.md");
    }

    #[test]
    fn test_redaction() {
        let redactor = SecretRedactor::new().unwrap();
        let text = "key sk-abcdefghijklmnopqrstuvwx and API_KEY= abcdefghijklmnop1234 \
                    hash 0123456789abcdef0123456789abcdef ok";
        let redacted = redactor.redact(text);
        assert!(!redacted.contains("sk-abcdef"));
        assert!(!redacted.contains("abcdefghijklmnop1234"));
        assert!(!redacted.contains("0123456789abcdef"));
        assert!(redacted.starts_with("key [REDACTED]"));
        assert!(redacted.ends_with(" ok"));
        assert_eq!(redactor.redact("nothing secret here"), "nothing secret here");
    }

    #[test]
    fn test_redaction_of_token_like_strings() {
        let redactor = SecretRedactor::new().unwrap();
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6.eyJzdWIiOiIxMjM0";
        assert_eq!(redactor.redact(&format!("bearer {}", token)), "bearer [REDACTED]");
    }

    #[test]
    fn test_mapping_conversation_renders_in_time_order() {
        let json = r#"[{
            "title": "Deploy Plan",
            "id": "0f3a9c7e-1111-2222-3333-444455556666",
            "mapping": {
                "b": {"message": {"author": {"role": "assistant"}, "content": {"parts": ["Run migrations first."]}, "create_time": 2.0}},
                "a": {"message": {"author": {"role": "user"}, "content": {"parts": ["How do we deploy?"]}, "create_time": 1.0}},
                "c": {"message": null},
                "d": {"message": {"author": {"role": "tool"}, "content": {"parts": [""]}, "create_time": 3.0}}
            }
        }]"#;
        let conversations = parse_conversations(json).unwrap();
        assert_eq!(conversations.len(), 1);
        let conversation = &conversations[0];
        assert_eq!(conversation.doc_id(), "deploy-plan-0f3a9c7e-111");
        assert_eq!(
            conversation.to_markdown(),
            "# Deploy Plan\n\n\n**user:** How do we deploy?\n\n**assistant:** Run migrations first."
        );
    }

    #[test]
    fn test_flat_messages_and_missing_title() {
        let json = r#"{"messages": [{"role": "Tool", "content": {"parts": ["lookup", 42]}}]}"#;
        let conversation = parse_conversations(json).unwrap().remove(0);
        assert_eq!(conversation.doc_id(), "untitled");
        assert_eq!(conversation.to_markdown(), "# Untitled\n\n\n**user:** lookup\n42");
    }

    #[test]
    fn test_export_document_is_redacted() {
        let conversation = Conversation {
            title: Some("Keys".into()),
            messages: vec![ExportMessage {
                role: Some("user".into()),
                content: Some(MessageContent {
                    parts: vec![Value::String("my key is sk-aaaaaaaaaaaaaaaaaaaaaaaa".into())],
                }),
                ..Default::default()
            }],
            ..Default::default()
        };
        let redactor = SecretRedactor::new().unwrap();
        let document = conversation.into_document(&redactor, "conversations.json", "single");
        assert_eq!(document.doc_id, "keys");
        assert!(document.body.ends_with("my key is [REDACTED]"));
        assert_eq!(document.metadata["export_kind"], "single");
    }
}
