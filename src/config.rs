//! Client configuration and the dynamic header capability.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{DEFAULT_HTTP_ENDPOINT, DEFAULT_WS_ENDPOINT};

/// Source of per-request headers resolved at call time.
///
/// Implementations may perform I/O (token refresh, request signing); the
/// client awaits the call once per request and imposes no timeout of its
/// own. Entries returned here override static headers on key collision.
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Return the headers to attach to the next request, or `None` when
    /// there are none.
    async fn headers(&self) -> Option<HashMap<String, String>>;
}

/// Client configuration.
///
/// Values are replaced, never mutated in place: construction and
/// [`crate::CodexClient::update_config`] produce a fresh configuration by
/// merging a [`ConfigUpdate`] onto the previous one.
#[derive(Clone)]
pub struct CodexConfig {
    /// HTTP GraphQL endpoint.
    pub http_endpoint: String,
    /// Websocket GraphQL endpoint.
    pub ws_endpoint: String,
    /// Whether the websocket transport is constructed.
    pub enable_websocket: bool,
    /// Static headers attached to every HTTP request.
    pub headers: HashMap<String, String>,
    /// Static connection params for the websocket handshake.
    pub ws_headers: HashMap<String, String>,
    /// Optional dynamic header source.
    pub header_provider: Option<Arc<dyn HeaderProvider>>,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            http_endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            enable_websocket: true,
            headers: HashMap::new(),
            ws_headers: HashMap::new(),
            header_provider: None,
        }
    }
}

impl fmt::Debug for CodexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodexConfig")
            .field("http_endpoint", &self.http_endpoint)
            .field("ws_endpoint", &self.ws_endpoint)
            .field("enable_websocket", &self.enable_websocket)
            .field("headers", &self.headers)
            .field("ws_headers", &self.ws_headers)
            .field("header_provider", &self.header_provider.is_some())
            .finish()
    }
}

/// Partial configuration override.
///
/// Set fields replace the corresponding configuration value wholesale
/// (header maps included, they are not deep-merged); unset fields keep
/// their current value.
#[derive(Default, Clone)]
pub struct ConfigUpdate {
    http_endpoint: Option<String>,
    ws_endpoint: Option<String>,
    enable_websocket: Option<bool>,
    headers: Option<HashMap<String, String>>,
    ws_headers: Option<HashMap<String, String>>,
    header_provider: Option<Arc<dyn HeaderProvider>>,
}

impl ConfigUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP GraphQL endpoint.
    #[must_use]
    pub fn with_http_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.http_endpoint = Some(endpoint.into());
        self
    }

    /// Set the websocket GraphQL endpoint.
    #[must_use]
    pub fn with_ws_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ws_endpoint = Some(endpoint.into());
        self
    }

    /// Enable or disable the websocket transport.
    #[must_use]
    pub const fn with_websocket(mut self, enabled: bool) -> Self {
        self.enable_websocket = Some(enabled);
        self
    }

    /// Replace the static HTTP headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a single static HTTP header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the static websocket connection params.
    #[must_use]
    pub fn with_ws_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.ws_headers = Some(headers);
        self
    }

    /// Add a single websocket connection param.
    #[must_use]
    pub fn with_ws_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ws_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the dynamic header provider.
    #[must_use]
    pub fn with_header_provider(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.header_provider = Some(Arc::new(provider));
        self
    }

    /// Apply this update on top of a base configuration.
    #[must_use]
    pub fn apply(self, base: CodexConfig) -> CodexConfig {
        CodexConfig {
            http_endpoint: self.http_endpoint.unwrap_or(base.http_endpoint),
            ws_endpoint: self.ws_endpoint.unwrap_or(base.ws_endpoint),
            enable_websocket: self.enable_websocket.unwrap_or(base.enable_websocket),
            headers: self.headers.unwrap_or(base.headers),
            ws_headers: self.ws_headers.unwrap_or(base.ws_headers),
            header_provider: self.header_provider.or(base.header_provider),
        }
    }
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("http_endpoint", &self.http_endpoint)
            .field("ws_endpoint", &self.ws_endpoint)
            .field("enable_websocket", &self.enable_websocket)
            .field("headers", &self.headers)
            .field("ws_headers", &self.ws_headers)
            .field("header_provider", &self.header_provider.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = CodexConfig::default();
        assert_eq!(config.http_endpoint, DEFAULT_HTTP_ENDPOINT);
        assert_eq!(config.ws_endpoint, DEFAULT_WS_ENDPOINT);
        assert!(config.enable_websocket);
        assert!(config.headers.is_empty());
        assert!(config.ws_headers.is_empty());
        assert!(config.header_provider.is_none());
    }

    #[test]
    fn default_config_is_fresh_per_call() {
        let mut first = CodexConfig::default();
        first.headers.insert("x-custom".into(), "1".into());
        let second = CodexConfig::default();
        assert!(second.headers.is_empty());
    }

    #[test]
    fn update_overrides_set_fields_only() {
        let update = ConfigUpdate::new()
            .with_http_endpoint("https://example.test/graphql")
            .with_websocket(false);

        let config = update.apply(CodexConfig::default());
        assert_eq!(config.http_endpoint, "https://example.test/graphql");
        assert!(!config.enable_websocket);
        assert_eq!(config.ws_endpoint, DEFAULT_WS_ENDPOINT);
    }

    #[test]
    fn update_replaces_header_maps_wholesale() {
        let base = ConfigUpdate::new()
            .with_header("a", "1")
            .with_header("b", "2")
            .apply(CodexConfig::default());

        let merged = ConfigUpdate::new()
            .with_header("c", "3")
            .apply(base);

        assert_eq!(merged.headers.len(), 1);
        assert_eq!(merged.headers.get("c").map(String::as_str), Some("3"));
        assert!(!merged.headers.contains_key("a"));
    }

    #[test]
    fn chained_updates_keep_most_recent_prior_values() {
        let first = ConfigUpdate::new()
            .with_http_endpoint("https://one.test")
            .apply(CodexConfig::default());

        let second = ConfigUpdate::new()
            .with_ws_endpoint("wss://two.test")
            .apply(first);

        assert_eq!(second.http_endpoint, "https://one.test");
        assert_eq!(second.ws_endpoint, "wss://two.test");
    }
}
