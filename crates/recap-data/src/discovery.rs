//! Finding the active chat file of every partner under a user data root.
//!
//! Layout:
//!
//! ```text
//! <root>/characters/<stem>.png      card names the active chat
//! <root>/chats/<stem>/<chat>.jsonl
//! <root>/groups/<id>.json           group names its chat_id
//! <root>/group chats/<chat_id>.jsonl
//! ```

use std::path::{Path, PathBuf};

use recap_core::error::{RecapError, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::card::read_character_card;

/// Label prefix for group conversations.
pub const GROUP_LABEL_PREFIX: &str = "[group] ";

/// Name used when a group file carries none.
pub const UNKNOWN_GROUP_NAME: &str = "Unknown Group";

// ── ChatSource ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Character,
    Group,
}

/// One `(partner label, log file)` pair to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSource {
    pub label: String,
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl ChatSource {
    pub fn character(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: name.into(),
            path: path.into(),
            kind: SourceKind::Character,
        }
    }

    /// A group source; the label becomes `[group] {name}`.
    pub fn group(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            label: format!("{}{}", GROUP_LABEL_PREFIX, name),
            path: path.into(),
            kind: SourceKind::Group,
        }
    }
}

// ── SourceEnumerator ──────────────────────────────────────────────────────────

/// Supplies the chat files that belong to a data root.
pub trait SourceEnumerator: Send + Sync {
    /// Active chats of individually tracked characters.
    fn character_chats(&self, root: &Path) -> Vec<ChatSource>;

    /// Active chats of group conversations.
    fn group_chats(&self, root: &Path) -> Vec<ChatSource>;

    /// Characters first, then groups.
    fn all_chats(&self, root: &Path) -> Vec<ChatSource> {
        let mut sources = self.character_chats(root);
        sources.extend(self.group_chats(root));
        sources
    }
}

/// The on-disk layout described in the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDirLayout;

impl SourceEnumerator for DataDirLayout {
    fn character_chats(&self, root: &Path) -> Vec<ChatSource> {
        let chats_dir = root.join("chats");
        let mut sources = Vec::new();

        for png in list_files(&root.join("characters"), "png") {
            let Some(stem) = png.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(card) = read_character_card(&png) else {
                continue;
            };
            let Some(chat) = non_empty_str(card.get("chat")) else {
                continue;
            };

            let name = non_empty_str(card.get("name"))
                .or_else(|| non_empty_str(card.get("data").and_then(|d| d.get("name"))))
                .unwrap_or(stem);
            let chat_path = chats_dir.join(stem).join(format!("{}.jsonl", chat));

            if chat_path.is_file() {
                sources.push(ChatSource::character(name, chat_path));
            } else {
                debug!("Active chat of {} not found: {}", name, chat_path.display());
            }
        }

        debug!("Found {} character chats under {}", sources.len(), root.display());
        sources
    }

    fn group_chats(&self, root: &Path) -> Vec<ChatSource> {
        let chats_dir = root.join("group chats");
        let mut sources = Vec::new();

        for file in list_files(&root.join("groups"), "json") {
            match group_source(&file, &chats_dir) {
                Ok(Some(source)) => sources.push(source),
                Ok(None) => {}
                Err(e) => warn!("Skipping group file: {}", e),
            }
        }

        debug!("Found {} group chats under {}", sources.len(), root.display());
        sources
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Regular files directly inside `dir` with the given extension, sorted by
/// name. A missing directory yields nothing.
fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!("Directory not present: {}", dir.display());
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Error listing {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == extension)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

fn group_source(file: &Path, chats_dir: &Path) -> Result<Option<ChatSource>> {
    let raw = std::fs::read_to_string(file).map_err(|source| RecapError::FileRead {
        path: file.to_path_buf(),
        source,
    })?;
    let group: Value = serde_json::from_str(&raw)?;

    let Some(chat_id) = chat_id(&group) else {
        return Ok(None);
    };
    let chat_path = chats_dir.join(format!("{}.jsonl", chat_id));
    if !chat_path.is_file() {
        return Ok(None);
    }

    let name = non_empty_str(group.get("name")).unwrap_or(UNKNOWN_GROUP_NAME);
    Ok(Some(ChatSource::group(name, chat_path)))
}

/// Group chat ids are usually strings but some exports store numbers.
fn chat_id(group: &Value) -> Option<String> {
    match group.get("chat_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
