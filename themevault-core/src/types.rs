//! Domain types shared by every themevault crate.
//!
//! Item keys are slash-delimited relative paths (`sections/header.liquid`).
//! Target roles are decoded once at the remote boundary into [`TargetRole`]
//! and never compared as raw strings afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::paths::RESERVED_DIR;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A validated, slash-delimited item key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey(String);

impl ItemKey {
    /// Validate and wrap a key.
    ///
    /// Rejects empty keys, absolute paths, backslashes, empty / `.` / `..`
    /// segments and anything under the reserved `.themevault/` directory.
    pub fn new(key: impl Into<String>) -> Result<Self, CoreError> {
        let key = key.into();
        let invalid = |reason| CoreError::InvalidKey {
            key: key.clone(),
            reason,
        };
        if key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if key.starts_with('/') {
            return Err(invalid("key must be relative"));
        }
        if key.contains('\\') {
            return Err(invalid("key must use forward slashes"));
        }
        for segment in key.split('/') {
            match segment {
                "" => return Err(invalid("key has an empty segment")),
                "." | ".." => return Err(invalid("key has a relative segment")),
                _ => {}
            }
        }
        if key == RESERVED_DIR || key.starts_with(&format!("{RESERVED_DIR}/")) {
            return Err(invalid("key is inside the reserved workspace directory"));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension (lowercased), if any.
    pub fn extension(&self) -> Option<String> {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        file.rsplit_once('.')
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Absolute path of this key under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |p, s| p.join(s))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ItemKey {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ItemKey> for String {
    fn from(k: ItemKey) -> Self {
        k.0
    }
}

impl AsRef<str> for ItemKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Remote identifier of a target (e.g. a numeric theme id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Media kinds and content
// ---------------------------------------------------------------------------

/// Declared media kind, derived from the key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Template,
    Stylesheet,
    Script,
    Json,
    Text,
    Binary,
}

impl MediaKind {
    pub fn from_key(key: &ItemKey) -> Self {
        match key.extension().as_deref() {
            Some("liquid") => MediaKind::Template,
            Some("css" | "scss") => MediaKind::Stylesheet,
            Some("js" | "mjs") => MediaKind::Script,
            Some("json") => MediaKind::Json,
            Some(
                "png" | "jpg" | "jpeg" | "gif" | "webp" | "ico" | "avif" | "woff" | "woff2"
                | "ttf" | "otf" | "eot" | "mp4" | "webm" | "mp3" | "pdf" | "zip",
            ) => MediaKind::Binary,
            _ => MediaKind::Text,
        }
    }

    /// MIME content type announced for this kind.
    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Template => "text/x-liquid",
            MediaKind::Stylesheet => "text/css",
            MediaKind::Script => "application/javascript",
            MediaKind::Json => "application/json",
            MediaKind::Text => "text/plain",
            MediaKind::Binary => "application/octet-stream",
        }
    }

    /// Binary kinds travel base64-encoded.
    pub fn is_binary(self) -> bool {
        matches!(self, MediaKind::Binary)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Template => write!(f, "template"),
            MediaKind::Stylesheet => write!(f, "stylesheet"),
            MediaKind::Script => write!(f, "script"),
            MediaKind::Json => write!(f, "json"),
            MediaKind::Text => write!(f, "text"),
            MediaKind::Binary => write!(f, "binary"),
        }
    }
}

/// Payload of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Binary(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(s) => s.into_bytes(),
            Content::Binary(b) => b,
        }
    }
}

/// One named content unit. Immutable within an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: ItemKey,
    pub kind: MediaKind,
    pub content: Content,
}

impl Item {
    pub fn new(key: ItemKey, content: Content) -> Self {
        let kind = MediaKind::from_key(&key);
        Self { key, kind, content }
    }

    /// Build an item from raw bytes read off disk.
    ///
    /// Text kinds holding invalid UTF-8 fall back to a binary payload.
    pub fn from_bytes(key: ItemKey, bytes: Vec<u8>) -> Self {
        let kind = MediaKind::from_key(&key);
        let content = if kind.is_binary() {
            Content::Binary(bytes)
        } else {
            match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(e) => Content::Binary(e.into_bytes()),
            }
        };
        Self { key, kind, content }
    }

    pub fn bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Role of a remote target. Only `Protected` is audience-facing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Protected,
    Mutable,
    /// Neither; operated on as mutable but flagged.
    Other(String),
}

impl TargetRole {
    /// Decode the remote role string. Only `"main"` is protected.
    pub fn from_wire(role: &str) -> Self {
        match role {
            "main" => TargetRole::Protected,
            "unpublished" | "demo" => TargetRole::Mutable,
            other => TargetRole::Other(other.to_owned()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, TargetRole::Protected)
    }
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRole::Protected => write!(f, "protected"),
            TargetRole::Mutable => write!(f, "mutable"),
            TargetRole::Other(raw) => write!(f, "other ({raw})"),
        }
    }
}

/// Authoritative metadata of a target, as freshly fetched from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub id: TargetId,
    pub name: String,
    pub role: TargetRole,
    /// The remote is still processing a previous upload.
    pub processing: bool,
}

/// A target as recorded in the config: identifier plus the name seen at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: TargetId,
    pub name: String,
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ItemKey {
        ItemKey::new(s).unwrap()
    }

    #[test]
    fn key_rejects_traversal_and_reserved_dir() {
        assert!(ItemKey::new("../etc/passwd").is_err());
        assert!(ItemKey::new("sections//header.liquid").is_err());
        assert!(ItemKey::new("/abs.css").is_err());
        assert!(ItemKey::new(".themevault/config.yaml").is_err());
        assert!(ItemKey::new("").is_err());
        assert!(ItemKey::new(".themevault-notes/x.txt").is_ok());
    }

    #[test]
    fn extension_is_lowercased_and_ignores_dotfiles() {
        assert_eq!(key("assets/Logo.PNG").extension().as_deref(), Some("png"));
        assert_eq!(key("config/.hidden").extension(), None);
        assert_eq!(key("layout/theme").extension(), None);
    }

    #[test]
    fn media_kind_from_extension() {
        assert_eq!(MediaKind::from_key(&key("sections/header.liquid")), MediaKind::Template);
        assert_eq!(MediaKind::from_key(&key("assets/base.css")), MediaKind::Stylesheet);
        assert_eq!(MediaKind::from_key(&key("assets/app.js")), MediaKind::Script);
        assert_eq!(MediaKind::from_key(&key("config/settings_data.json")), MediaKind::Json);
        assert_eq!(MediaKind::from_key(&key("assets/font.woff2")), MediaKind::Binary);
        assert_eq!(MediaKind::from_key(&key("assets/icon.svg")), MediaKind::Text);
    }

    #[test]
    fn invalid_utf8_text_falls_back_to_binary() {
        let item = Item::from_bytes(key("assets/odd.css"), vec![0xff, 0xfe]);
        assert_eq!(item.kind, MediaKind::Stylesheet);
        assert!(matches!(item.content, Content::Binary(_)));
    }

    #[test]
    fn role_decoding() {
        assert_eq!(TargetRole::from_wire("main"), TargetRole::Protected);
        assert_eq!(TargetRole::from_wire("unpublished"), TargetRole::Mutable);
        assert_eq!(TargetRole::from_wire("demo"), TargetRole::Mutable);
        assert_eq!(
            TargetRole::from_wire("development"),
            TargetRole::Other("development".into())
        );
    }

    #[test]
    fn key_serde_validates() {
        let ok: ItemKey = serde_yaml::from_str("snippets/price.liquid").unwrap();
        assert_eq!(ok.as_str(), "snippets/price.liquid");
        assert!(serde_yaml::from_str::<ItemKey>("../x").is_err());
    }

    #[test]
    fn to_path_joins_segments() {
        let root = Path::new("/work");
        assert_eq!(
            key("sections/header.liquid").to_path(root),
            PathBuf::from("/work/sections/header.liquid")
        );
    }
}
