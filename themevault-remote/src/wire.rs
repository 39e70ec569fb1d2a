//! JSON wire shapes of the remote API and their conversion to domain types.
//!
//! Item bodies carry either a text `value` or a base64 `attachment`. Any
//! other shape is reported as [`RemoteError::MalformedResponse`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use themevault_core::{Content, Item, ItemKey, TargetId, TargetInfo, TargetRole};

use crate::{ItemSummary, RemoteError};

#[derive(Debug, Deserialize)]
pub struct ThemeEnvelope {
    pub theme: WireTheme,
}

#[derive(Debug, Deserialize)]
pub struct WireTheme {
    pub id: Value,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub processing: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssetList {
    pub assets: Vec<WireAssetSummary>,
}

#[derive(Debug, Deserialize)]
pub struct WireAssetSummary {
    pub key: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetEnvelope {
    pub asset: WireAsset,
}

#[derive(Debug, Deserialize)]
pub struct WireAsset {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PutEnvelope<'a> {
    pub asset: PutAsset<'a>,
}

#[derive(Debug, Serialize)]
pub struct PutAsset<'a> {
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// Parse a response body, mapping any shape mismatch to `MalformedResponse`.
pub fn parse<T: for<'de> Deserialize<'de>>(body: &str, what: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|e| RemoteError::malformed(format!("{what}: {e}")))
}

pub fn decode_target(body: &str) -> Result<TargetInfo, RemoteError> {
    let envelope: ThemeEnvelope = parse(body, "target metadata")?;
    let theme = envelope.theme;
    let id = match theme.id {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        other => {
            return Err(RemoteError::malformed(format!(
                "target id has unexpected type: {other}"
            )))
        }
    };
    Ok(TargetInfo {
        id: TargetId(id),
        name: theme.name,
        role: TargetRole::from_wire(&theme.role),
        processing: theme.processing,
    })
}

pub fn decode_listing(body: &str) -> Result<Vec<ItemSummary>, RemoteError> {
    let list: AssetList = parse(body, "item listing")?;
    list.assets
        .into_iter()
        .map(|a| {
            let key = decode_key(a.key)?;
            let content_type = a
                .content_type
                .unwrap_or_else(|| themevault_core::MediaKind::from_key(&key).content_type().into());
            Ok(ItemSummary { key, content_type })
        })
        .collect()
}

pub fn decode_item(body: &str) -> Result<Item, RemoteError> {
    let envelope: AssetEnvelope = parse(body, "item")?;
    item_from_wire(envelope.asset)
}

pub fn item_from_wire(asset: WireAsset) -> Result<Item, RemoteError> {
    let key = decode_key(asset.key)?;
    let content = match (asset.attachment, asset.value) {
        (Some(encoded), _) => {
            let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
                RemoteError::malformed(format!("attachment of '{key}' is not base64: {e}"))
            })?;
            Content::Binary(bytes)
        }
        (None, Some(text)) => Content::Text(text),
        (None, None) => {
            return Err(RemoteError::malformed(format!(
                "item '{key}' has neither value nor attachment"
            )))
        }
    };
    Ok(Item::new(key, content))
}

/// Encode an item for upload. Binary payloads travel base64-encoded.
pub fn encode_item(item: &Item) -> PutEnvelope<'_> {
    let (value, attachment) = match &item.content {
        Content::Text(text) => (Some(text.as_str()), None),
        Content::Binary(bytes) => (None, Some(BASE64.encode(bytes))),
    };
    PutEnvelope {
        asset: PutAsset {
            key: item.key.as_str(),
            value,
            attachment,
        },
    }
}

/// Flatten a JSON `{"errors": …}` body into one message.
pub fn error_message(body: &str) -> String {
    let fallback = || {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "no error details".to_string()
        } else {
            trimmed.chars().take(200).collect()
        }
    };
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };
    match value.get("errors") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => join_values(items),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(field, v)| match v {
                Value::Array(items) => format!("{field}: {}", join_values(items)),
                other => format!("{field}: {}", value_text(other)),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => fallback(),
    }
}

fn join_values(items: &[Value]) -> String {
    items.iter().map(value_text).collect::<Vec<_>>().join(", ")
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_key(raw: String) -> Result<ItemKey, RemoteError> {
    ItemKey::new(raw).map_err(|e| RemoteError::malformed(e.to_string()))
}
