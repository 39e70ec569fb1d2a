//! Blocking HTTP implementation of [`RemoteStore`] on top of `ureq`.
//!
//! Every call goes through the [`Pacer`] first. Failure statuses are mapped
//! onto [`RemoteError`] by [`classify_status`]; nothing is retried here.

use std::time::Duration;

use themevault_core::{Config, Item, ItemKey, TargetId, TargetInfo};

use crate::pacer::{BucketUsage, Pacer};
use crate::store::{ItemSummary, RemoteStore};
use crate::wire;
use crate::RemoteError;

pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
pub const CALL_LIMIT_HEADER: &str = "X-Shopify-Shop-Api-Call-Limit";
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Wait advised when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);

const READ_CAPABILITY: &str = "read_themes";
const WRITE_CAPABILITY: &str = "write_themes";

/// Remote store client speaking the JSON theme/asset API.
pub struct HttpRemoteStore {
    agent: ureq::Agent,
    endpoint: String,
    credential: String,
    pacer: Pacer,
}

impl HttpRemoteStore {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.pacing.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: config.endpoint(),
            credential: config.credential.clone(),
            pacer: Pacer::new(Duration::from_millis(config.pacing.min_interval_ms)),
        }
    }

    fn target_url(&self, target: &TargetId) -> String {
        format!("{}/themes/{}.json", self.endpoint, target)
    }

    fn assets_url(&self, target: &TargetId) -> String {
        format!("{}/themes/{}/assets.json", self.endpoint, target)
    }

    /// Pace, send, and classify one request; returns the response body.
    fn send(
        &self,
        request: ureq::Request,
        body: Option<serde_json::Value>,
        capability: &str,
    ) -> Result<String, RemoteError> {
        self.pacer.wait();
        let request = request.set(ACCESS_TOKEN_HEADER, &self.credential);
        tracing::debug!("{} {}", request.method(), request.url());
        let result = match body {
            Some(json) => request.send_json(json),
            None => request.call(),
        };
        match result {
            Ok(response) => {
                self.pacer
                    .observe(response.header(CALL_LIMIT_HEADER).and_then(BucketUsage::parse));
                response.into_string().map_err(|e| RemoteError::Transport {
                    detail: format!("reading response body: {e}"),
                })
            }
            Err(ureq::Error::Status(code, response)) => {
                self.pacer
                    .observe(response.header(CALL_LIMIT_HEADER).and_then(BucketUsage::parse));
                let retry_after = response.header(RETRY_AFTER_HEADER).map(str::to_owned);
                let body = response.into_string().unwrap_or_default();
                Err(classify_status(code, retry_after.as_deref(), &body, capability))
            }
            Err(ureq::Error::Transport(transport)) => Err(RemoteError::Transport {
                detail: transport.to_string(),
            }),
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    fn list_items(&self, target: &TargetId) -> Result<Vec<ItemSummary>, RemoteError> {
        let request = self
            .agent
            .get(&self.assets_url(target))
            .query("fields", "key,content_type");
        let body = self.send(request, None, READ_CAPABILITY)?;
        wire::decode_listing(&body)
    }

    fn get_item(&self, target: &TargetId, key: &ItemKey) -> Result<Option<Item>, RemoteError> {
        let request = self
            .agent
            .get(&self.assets_url(target))
            .query("asset[key]", key.as_str());
        match self.send(request, None, READ_CAPABILITY) {
            Ok(body) => wire::decode_item(&body).map(Some),
            Err(RemoteError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put_item(&self, target: &TargetId, item: &Item) -> Result<(), RemoteError> {
        let payload = serde_json::to_value(wire::encode_item(item))
            .map_err(|e| RemoteError::malformed(format!("encoding '{}': {e}", item.key)))?;
        let request = self.agent.put(&self.assets_url(target));
        self.send(request, Some(payload), WRITE_CAPABILITY)?;
        Ok(())
    }

    fn delete_item(&self, target: &TargetId, key: &ItemKey) -> Result<(), RemoteError> {
        let request = self
            .agent
            .delete(&self.assets_url(target))
            .query("asset[key]", key.as_str());
        self.send(request, None, WRITE_CAPABILITY)?;
        Ok(())
    }

    fn target_info(&self, target: &TargetId) -> Result<TargetInfo, RemoteError> {
        let request = self.agent.get(&self.target_url(target));
        let body = self.send(request, None, READ_CAPABILITY)?;
        wire::decode_target(&body)
    }
}

/// Map an HTTP failure status onto the error taxonomy.
pub fn classify_status(
    code: u16,
    retry_after: Option<&str>,
    body: &str,
    capability: &str,
) -> RemoteError {
    match code {
        401 => RemoteError::Auth,
        403 => RemoteError::Forbidden {
            capability: capability.to_string(),
        },
        404 => RemoteError::NotFound {
            what: wire::error_message(body),
        },
        422 => RemoteError::Validation {
            message: wire::error_message(body),
        },
        429 => RemoteError::RateLimited {
            retry_after: parse_retry_after(retry_after),
        },
        _ => RemoteError::Status {
            code,
            message: wire::error_message(body),
        },
    }
}

/// `Retry-After` in (possibly fractional) seconds.
pub fn parse_retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_auth_and_forbidden() {
        assert_eq!(classify_status(401, None, "", WRITE_CAPABILITY), RemoteError::Auth);
        assert_eq!(
            classify_status(403, None, "", WRITE_CAPABILITY),
            RemoteError::Forbidden {
                capability: "write_themes".into()
            }
        );
    }

    #[test]
    fn classifies_rate_limit_with_advised_wait() {
        assert_eq!(
            classify_status(429, Some("2.0"), "", READ_CAPABILITY),
            RemoteError::RateLimited {
                retry_after: Duration::from_secs(2)
            }
        );
        assert_eq!(
            classify_status(429, Some("0.5"), "", READ_CAPABILITY),
            RemoteError::RateLimited {
                retry_after: Duration::from_millis(500)
            }
        );
    }

    #[test]
    fn missing_retry_after_uses_default() {
        assert_eq!(parse_retry_after(None), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(Some("soon")), DEFAULT_RETRY_AFTER);
        assert_eq!(parse_retry_after(Some("-1")), DEFAULT_RETRY_AFTER);
    }

    #[test]
    fn classifies_validation_with_message() {
        let err = classify_status(
            422,
            None,
            r#"{"errors":{"asset":["Liquid syntax error"]}}"#,
            WRITE_CAPABILITY,
        );
        assert_eq!(
            err,
            RemoteError::Validation {
                message: "asset: Liquid syntax error".into()
            }
        );
    }

    #[test]
    fn other_statuses_keep_code() {
        let err = classify_status(503, None, r#"{"errors":"busy"}"#, READ_CAPABILITY);
        assert_eq!(
            err,
            RemoteError::Status {
                code: 503,
                message: "busy".into()
            }
        );
        assert!(err.is_transient());
    }

    #[test]
    fn urls_follow_endpoint() {
        let store = HttpRemoteStore::new(&sample_config());
        assert_eq!(
            store.assets_url(&TargetId::from("2")),
            "http://127.0.0.1:9/themes/2/assets.json"
        );
        assert_eq!(store.target_url(&TargetId::from("1")), "http://127.0.0.1:9/themes/1.json");
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let mut config = sample_config();
        config.pacing.timeout_secs = 2;
        let store = HttpRemoteStore::new(&config);
        let err = store.target_info(&TargetId::from("1")).unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }), "got: {err}");
        assert!(err.is_transient());
    }

    fn sample_config() -> themevault_core::Config {
        themevault_core::Config {
            store: "http://127.0.0.1:9".into(),
            api_version: "2024-01".into(),
            protected: themevault_core::TargetRef {
                id: TargetId::from("1"),
                name: "Live".into(),
            },
            mutable: themevault_core::TargetRef {
                id: TargetId::from("2"),
                name: "Dev".into(),
            },
            credential: "c".into(),
            created_at: chrono::Utc::now(),
            pacing: themevault_core::Pacing {
                min_interval_ms: 0,
                timeout_secs: 5,
                ..themevault_core::Pacing::default()
            },
        }
    }
}
