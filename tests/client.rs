use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use codex_sdk::operations::{GetNetworks, GetNetworksData, Network, NoVariables};
use codex_sdk::{CodexClient, CodexError, ConfigUpdate, GraphqlOperation, HeaderProvider};

#[derive(Debug, serde::Serialize)]
struct AlertVars {
    id: String,
}

#[derive(Debug, PartialEq, serde::Deserialize)]
struct AlertData {
    #[serde(rename = "updateAlert")]
    update_alert: bool,
}

struct UpdateAlert;

impl GraphqlOperation for UpdateAlert {
    type Variables = AlertVars;
    type ResponseData = AlertData;

    const QUERY: &'static str = "mutation UpdateAlert($id: ID!) { updateAlert(id: $id) }";
    const OPERATION_NAME: &'static str = "UpdateAlert";
}

struct TenantProvider;

#[async_trait]
impl HeaderProvider for TenantProvider {
    async fn headers(&self) -> Option<HashMap<String, String>> {
        let mut headers = HashMap::new();
        headers.insert("x-tenant".to_string(), "dynamic".to_string());
        headers.insert("x-trace".to_string(), "trace-1".to_string());
        Some(headers)
    }
}

fn test_client(server: &MockServer) -> CodexClient {
    CodexClient::with_config(
        "k1",
        ConfigUpdate::new()
            .with_http_endpoint(server.uri())
            .with_websocket(false),
    )
    .expect("client")
}

#[tokio::test]
async fn query_sends_fixed_headers_and_body() {
    let server = MockServer::start().await;

    let expected_body = json!({
        "query": GetNetworks::QUERY,
        "operationName": GetNetworks::OPERATION_NAME,
        "variables": {},
    });

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "k1"))
        .and(header("x-operation-name", "query"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"getNetworks": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("query should succeed");

    assert!(response.is_ok());
    assert_eq!(
        response.data,
        Some(GetNetworksData {
            get_networks: vec![]
        })
    );
}

#[tokio::test]
async fn mutation_keeps_query_operation_header() {
    let server = MockServer::start().await;

    let expected_body = json!({
        "query": UpdateAlert::QUERY,
        "operationName": UpdateAlert::OPERATION_NAME,
        "variables": {"id": "alert-1"},
    });

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-operation-name", "query"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"updateAlert": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .mutation::<UpdateAlert>(AlertVars {
            id: "alert-1".to_string(),
        })
        .await
        .expect("mutation should succeed");

    assert_eq!(
        response.data,
        Some(AlertData { update_alert: true })
    );
}

#[tokio::test]
async fn dynamic_headers_override_static_on_the_wire() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-tenant", "dynamic"))
        .and(header("x-trace", "trace-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"getNetworks": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CodexClient::with_config(
        "k1",
        ConfigUpdate::new()
            .with_http_endpoint(server.uri())
            .with_websocket(false)
            .with_header("x-tenant", "static")
            .with_header_provider(TenantProvider),
    )
    .expect("client");

    client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("query should succeed");
}

#[tokio::test]
async fn get_networks_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"getNetworks": [{"id": "1", "name": "Ethereum"}]}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("query should succeed");

    assert_eq!(
        response.data,
        Some(GetNetworksData {
            get_networks: vec![Network {
                id: "1".to_string(),
                name: "Ethereum".to_string(),
            }]
        })
    );
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn send_defaults_missing_variables_to_empty_object() {
    let server = MockServer::start().await;

    let expected_body = json!({
        "query": "{ getNetworks { id name } }",
        "variables": {},
    });

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"getNetworks": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .send("{ getNetworks { id name } }", None)
        .await
        .expect("send should succeed");

    assert_eq!(response.data, Some(json!({"getNetworks": []})));
}

#[tokio::test]
async fn send_forwards_supplied_variables() {
    let server = MockServer::start().await;

    let expected_body = json!({
        "query": "query T($id: ID!) { token(id: $id) }",
        "variables": {"id": "t-1"},
    });

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"token": "t-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    client
        .send(
            "query T($id: ID!) { token(id: $id) }",
            Some(json!({"id": "t-1"})),
        )
        .await
        .expect("send should succeed");
}

#[tokio::test]
async fn graphql_error_envelope_is_returned_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "boom"}]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let response = client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("envelope should still parse");

    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "boom");
    assert!(!response.is_ok());
}

#[tokio::test]
async fn http_status_failures_surface_as_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect_err("500 must fail");

    match err {
        CodexError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_config_repoints_requests_and_keeps_prior_values() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    let body = json!({"data": {"getNetworks": []}});

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-team", "alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&first)
        .await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-team", "alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&second)
        .await;

    let mut client = CodexClient::with_config(
        "k1",
        ConfigUpdate::new()
            .with_http_endpoint(first.uri())
            .with_websocket(false)
            .with_header("x-team", "alpha"),
    )
    .expect("client");

    client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("first query");

    // Only the endpoint changes; the custom static header must survive.
    client
        .update_config(ConfigUpdate::new().with_http_endpoint(second.uri()))
        .expect("update");

    assert_eq!(client.config().http_endpoint, second.uri());
    assert!(!client.config().enable_websocket);

    client
        .query::<GetNetworks>(NoVariables::default())
        .await
        .expect("second query");
}
