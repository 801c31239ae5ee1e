//! Codex client facade.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{CodexConfig, ConfigUpdate};
use crate::error::{CodexError, CodexResult};
use crate::operation::{GraphqlOperation, GraphqlQuery, GraphqlRequest, GraphqlResponse};
use crate::subscription::{
    SubscriptionClient, SubscriptionConfig, SubscriptionHandle, SubscriptionSink,
};
use crate::websocket::WsConfig;
use crate::KEEP_ALIVE_INTERVAL;

/// Header identifying the operation kind to the Codex gateway. The gateway
/// accepts the literal `query` for mutations as well.
const OPERATION_NAME_HEADER: &str = "x-operation-name";

/// Client for the Codex GraphQL API.
///
/// Owns an HTTP client and, when the configuration enables it, a websocket
/// subscription client; both are derived from the current configuration and
/// rebuilt by [`CodexClient::update_config`]. Requests borrow the client
/// immutably and are independent of each other; `update_config` requires
/// exclusive access, so callers sharing a client behind `Arc` must not
/// reconfigure it while requests are in flight.
#[derive(Debug)]
pub struct CodexClient {
    api_key: String,
    config: CodexConfig,
    http: reqwest::Client,
    subscriptions: Option<SubscriptionClient>,
}

impl CodexClient {
    /// Create a client with the default configuration.
    pub fn new(api_key: impl Into<String>) -> CodexResult<Self> {
        Self::with_config(api_key, ConfigUpdate::new())
    }

    /// Create a client, applying `update` on top of the defaults.
    pub fn with_config(api_key: impl Into<String>, update: ConfigUpdate) -> CodexResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CodexError::EmptyApiKey);
        }
        let config = update.apply(CodexConfig::default());
        let http = build_http_client(&api_key, &config)?;
        let subscriptions = build_subscription_client(&api_key, &config);
        Ok(Self {
            api_key,
            config,
            http,
            subscriptions,
        })
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &CodexConfig {
        &self.config
    }

    /// Execute a typed query and return the full response envelope.
    #[instrument(skip(self, variables), fields(operation = O::OPERATION_NAME))]
    pub async fn query<O: GraphqlOperation>(
        &self,
        variables: O::Variables,
    ) -> CodexResult<GraphqlResponse<O::ResponseData>> {
        let request = GraphqlRequest::new(GraphqlQuery::from_static(O::QUERY), variables)
            .with_operation_name(O::OPERATION_NAME);
        self.execute(request).await
    }

    /// Execute a typed mutation and return the full response envelope.
    ///
    /// Behaves exactly like [`CodexClient::query`]; the split exists for
    /// call-site clarity.
    #[instrument(skip(self, variables), fields(operation = O::OPERATION_NAME))]
    pub async fn mutation<O: GraphqlOperation>(
        &self,
        variables: O::Variables,
    ) -> CodexResult<GraphqlResponse<O::ResponseData>> {
        let request = GraphqlRequest::new(GraphqlQuery::from_static(O::QUERY), variables)
            .with_operation_name(O::OPERATION_NAME);
        self.execute(request).await
    }

    /// Execute a raw operation string without a typed definition.
    ///
    /// Missing variables are sent as `{}`.
    #[instrument(skip(self, operation, variables))]
    pub async fn send(
        &self,
        operation: impl Into<String>,
        variables: Option<Value>,
    ) -> CodexResult<GraphqlResponse<Value>> {
        let request = GraphqlRequest::new(
            GraphqlQuery::new(operation),
            variables.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        );
        self.execute(request).await
    }

    /// Subscribe to a raw operation string.
    ///
    /// Fails with [`CodexError::WebsocketDisabled`] when the configuration
    /// disabled the websocket transport; no connection is attempted in that
    /// case. Events are delivered to `sink`; the returned handle cancels
    /// the subscription and is safe to invoke repeatedly.
    pub async fn subscribe<S>(
        &self,
        operation: impl Into<String>,
        variables: Value,
        sink: S,
    ) -> CodexResult<SubscriptionHandle>
    where
        S: SubscriptionSink<Value>,
    {
        let Some(subscriptions) = &self.subscriptions else {
            return Err(CodexError::WebsocketDisabled);
        };
        subscriptions.subscribe(operation, variables, sink).await
    }

    /// Subscribe to a typed operation; the sink receives deserialized
    /// response data.
    pub async fn subscribe_typed<O, S>(
        &self,
        variables: O::Variables,
        sink: S,
    ) -> CodexResult<SubscriptionHandle>
    where
        O: GraphqlOperation,
        O::ResponseData: 'static,
        S: SubscriptionSink<O::ResponseData>,
    {
        let Some(subscriptions) = &self.subscriptions else {
            return Err(CodexError::WebsocketDisabled);
        };
        let variables = serde_json::to_value(variables)?;
        subscriptions.subscribe(O::QUERY, variables, sink).await
    }

    /// Apply a partial configuration on top of the current one.
    ///
    /// Disposes the existing websocket client, then rebuilds both
    /// transports from the merged configuration with the original API key.
    pub fn update_config(&mut self, update: ConfigUpdate) -> CodexResult<()> {
        let config = update.apply(self.config.clone());
        let http = build_http_client(&self.api_key, &config)?;
        let subscriptions = build_subscription_client(&self.api_key, &config);
        if let Some(old) = self.subscriptions.take() {
            old.dispose();
        }
        self.http = http;
        self.subscriptions = subscriptions;
        self.config = config;
        Ok(())
    }

    /// Release the websocket transport's active streams, if any.
    ///
    /// A no-op when the websocket transport is disabled; safe to call more
    /// than once.
    pub fn dispose(&self) {
        if let Some(subscriptions) = &self.subscriptions {
            subscriptions.dispose();
        }
    }

    /// Merge static headers with the dynamic provider's result; dynamic
    /// entries win on key collision.
    async fn resolve_request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.config.headers.clone();
        if let Some(provider) = &self.config.header_provider {
            if let Some(dynamic) = provider.headers().await {
                headers.extend(dynamic);
            }
        }
        headers
    }

    async fn execute<V, R>(&self, request: GraphqlRequest<V>) -> CodexResult<GraphqlResponse<R>>
    where
        V: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let headers = self.resolve_request_headers().await;
        let header_map = to_header_map(&headers)?;
        debug!(
            endpoint = %self.config.http_endpoint,
            "sending GraphQL request"
        );

        let response = self
            .http
            .post(&self.config.http_endpoint)
            .headers(header_map)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(CodexError::HttpStatus {
                status,
                body: truncate_body(&bytes),
            });
        }

        let parsed: GraphqlResponse<R> = serde_json::from_slice(&bytes)?;
        Ok(parsed)
    }
}

fn build_http_client(api_key: &str, config: &CodexConfig) -> CodexResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(api_key).map_err(|err| CodexError::Header {
            message: format!("invalid API key value: {err}"),
        })?,
    );
    headers.insert(
        HeaderName::from_static(OPERATION_NAME_HEADER),
        HeaderValue::from_static("query"),
    );
    for (name, value) in &config.headers {
        let (name, value) = parse_header(name, value)?;
        headers.insert(name, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(CodexError::from)
}

fn build_subscription_client(api_key: &str, config: &CodexConfig) -> Option<SubscriptionClient> {
    if !config.enable_websocket {
        return None;
    }

    let mut params = serde_json::Map::new();
    params.insert("Authorization".to_string(), Value::String(api_key.to_string()));
    for (name, value) in &config.ws_headers {
        params.insert(name.clone(), Value::String(value.clone()));
    }

    let subscription_config = SubscriptionConfig {
        ws: WsConfig {
            ping_interval: KEEP_ALIVE_INTERVAL,
            ..WsConfig::default()
        },
        init_payload: Some(Value::Object(params)),
        ..SubscriptionConfig::default()
    };
    Some(SubscriptionClient::with_config(
        config.ws_endpoint.clone(),
        subscription_config,
    ))
}

fn parse_header(name: &str, value: &str) -> CodexResult<(HeaderName, HeaderValue)> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|err| CodexError::Header {
            message: format!("invalid header name {name:?}: {err}"),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|err| CodexError::Header {
        message: format!("invalid value for header {name:?}: {err}"),
    })?;
    Ok((header_name, header_value))
}

fn to_header_map(headers: &HashMap<String, String>) -> CodexResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let (name, value) = parse_header(name, value)?;
        map.insert(name, value);
    }
    Ok(map)
}

fn truncate_body(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 4096;
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > MAX_LEN {
        body.truncate(MAX_LEN);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::config::HeaderProvider;

    struct FixedProvider(HashMap<String, String>);

    #[async_trait]
    impl HeaderProvider for FixedProvider {
        async fn headers(&self) -> Option<HashMap<String, String>> {
            Some(self.0.clone())
        }
    }

    struct AbsentProvider;

    #[async_trait]
    impl HeaderProvider for AbsentProvider {
        async fn headers(&self) -> Option<HashMap<String, String>> {
            None
        }
    }

    struct NoopSink;

    impl SubscriptionSink<Value> for NoopSink {
        fn next(&mut self, _response: GraphqlResponse<Value>) {}
        fn error(&mut self, _error: CodexError) {}
        fn complete(&mut self) {}
    }

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = CodexClient::new("").expect_err("empty key must fail");
        assert!(matches!(err, CodexError::EmptyApiKey));
    }

    #[test]
    fn construction_respects_websocket_flag() {
        let enabled = CodexClient::new("k1").expect("client");
        assert!(enabled.subscriptions.is_some());

        let disabled =
            CodexClient::with_config("k1", ConfigUpdate::new().with_websocket(false))
                .expect("client");
        assert!(disabled.subscriptions.is_none());
    }

    #[tokio::test]
    async fn dynamic_headers_win_on_collision() {
        let client = CodexClient::with_config(
            "k1",
            ConfigUpdate::new()
                .with_websocket(false)
                .with_headers(map(&[("a", "1"), ("b", "2")]))
                .with_header_provider(FixedProvider(map(&[("b", "3"), ("c", "4")]))),
        )
        .expect("client");

        let headers = client.resolve_request_headers().await;
        assert_eq!(headers, map(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[tokio::test]
    async fn absent_provider_result_yields_static_headers() {
        let client = CodexClient::with_config(
            "k1",
            ConfigUpdate::new()
                .with_websocket(false)
                .with_headers(map(&[("a", "1")]))
                .with_header_provider(AbsentProvider),
        )
        .expect("client");

        let headers = client.resolve_request_headers().await;
        assert_eq!(headers, map(&[("a", "1")]));
    }

    #[tokio::test]
    async fn no_provider_yields_static_headers() {
        let client = CodexClient::with_config(
            "k1",
            ConfigUpdate::new()
                .with_websocket(false)
                .with_headers(map(&[("a", "1")])),
        )
        .expect("client");

        let headers = client.resolve_request_headers().await;
        assert_eq!(headers, map(&[("a", "1")]));
    }

    #[tokio::test]
    async fn subscribe_without_websocket_fails_fast() {
        let client =
            CodexClient::with_config("k1", ConfigUpdate::new().with_websocket(false))
                .expect("client");

        let err = client
            .subscribe("subscription S { tick }", Value::Null, NoopSink)
            .await
            .expect_err("must fail without websocket");
        assert!(matches!(err, CodexError::WebsocketDisabled));
    }

    #[test]
    fn update_config_rebuilds_websocket_handle() {
        let mut client = CodexClient::new("k1").expect("client");
        assert!(client.subscriptions.is_some());

        client
            .update_config(ConfigUpdate::new().with_websocket(false))
            .expect("update");
        assert!(client.subscriptions.is_none());

        client
            .update_config(ConfigUpdate::new().with_websocket(true))
            .expect("update");
        assert!(client.subscriptions.is_some());
    }

    #[test]
    fn dispose_without_websocket_is_a_noop() {
        let client =
            CodexClient::with_config("k1", ConfigUpdate::new().with_websocket(false))
                .expect("client");
        client.dispose();
        client.dispose();
    }
}
