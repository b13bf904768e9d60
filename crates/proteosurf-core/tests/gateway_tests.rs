//! Anthropic gateway wire tests
//!
//! These run against a local httptest server and pin down the request shape,
//! the retry policy, and the failure taxonomy.

use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;

use proteosurf_core::{
    AnthropicGateway, ContentBlock, GatewayConfig, GatewayError, Message, ModelGateway,
    StopReason, ToolDefinition,
};

fn test_config(server: &Server, max_retries: usize) -> GatewayConfig {
    GatewayConfig {
        api_key: Some("test-key".to_string()),
        base_url: Some(server.url_str("")),
        max_retries,
        ..Default::default()
    }
}

fn manifest() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: "fetch_structure".to_string(),
        description: "Download a PDB file".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {"pdb_id": {"type": "string"}},
            "required": ["pdb_id"]
        }),
    }]
}

#[tokio::test]
async fn happy_path_parses_text_and_tool_use() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/v1/messages"),
            request::headers(contains(("x-api-key", "test-key"))),
            request::headers(contains(("anthropic-version", "2023-06-01"))),
        ])
        .respond_with(json_encoded(json!({
            "content": [
                {"type": "text", "text": "Fetching 4LDJ now."},
                {"type": "tool_use", "id": "toolu_1", "name": "fetch_structure",
                 "input": {"pdb_id": "4LDJ"}}
            ],
            "stop_reason": "tool_use"
        }))),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 0)).unwrap();
    let response = gateway
        .complete(&[Message::user("show me KRAS G12C")], &manifest())
        .await
        .unwrap();

    assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    assert_eq!(response.content.len(), 2);
    assert_eq!(response.content[0], ContentBlock::text("Fetching 4LDJ now."));
    match &response.content[1] {
        ContentBlock::ToolRequest { id, name, arguments } => {
            assert_eq!(id, "toolu_1");
            assert_eq!(name, "fetch_structure");
            assert_eq!(arguments["pdb_id"], "4LDJ");
        }
        other => panic!("unexpected block: {:?}", other),
    }
}

#[tokio::test]
async fn completes_without_a_manifest() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages")).respond_with(
            json_encoded(json!({
                "content": [{"type": "text", "text": "hi"}],
                "stop_reason": "end_turn"
            })),
        ),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 0)).unwrap();
    let response = gateway.complete(&[Message::user("hi")], &[]).await.unwrap();
    assert!(response.is_end_turn());
}

#[tokio::test]
async fn retries_on_500_then_succeeds() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .times(2)
            .respond_with(httptest::cycle![
                status_code(500).body("overloaded"),
                json_encoded(json!({
                    "content": [{"type": "text", "text": "recovered"}],
                    "stop_reason": "end_turn"
                })),
            ]),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 1)).unwrap();
    let response = gateway.complete(&[Message::user("hi")], &[]).await.unwrap();
    assert_eq!(response.content, vec![ContentBlock::text("recovered")]);
}

#[tokio::test]
async fn retries_are_bounded() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .times(2)
            .respond_with(status_code(503).body("down")),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 1)).unwrap();
    let err = gateway.complete(&[Message::user("hi")], &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 503, .. }));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .times(1)
            .respond_with(status_code(400).body("bad request")),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 3)).unwrap();
    let err = gateway.complete(&[Message::user("hi")], &[]).await.unwrap_err();
    match err {
        GatewayError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad request");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn auth_failure_is_fatal() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .times(1)
            .respond_with(status_code(401).body("invalid x-api-key")),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 3)).unwrap();
    let err = gateway.complete(&[Message::user("hi")], &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Auth(_)));
}

#[tokio::test]
async fn malformed_body_is_a_protocol_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .respond_with(json_encoded(json!({"unexpected": "shape"}))),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 0)).unwrap();
    let err = gateway.complete(&[Message::user("hi")], &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Protocol(_)));
}

#[tokio::test]
async fn tool_result_in_model_output_is_a_protocol_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/v1/messages"))
            .respond_with(json_encoded(json!({
                "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "sneaky"}
                ],
                "stop_reason": "end_turn"
            }))),
    );

    let gateway = AnthropicGateway::new(test_config(&server, 0)).unwrap();
    let err = gateway.complete(&[Message::user("hi")], &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Protocol(_)));
}

#[test]
fn missing_api_key_is_a_config_error() {
    // Construct without key or env fallback
    let config = GatewayConfig {
        api_key: Some(String::new()),
        ..Default::default()
    };
    if std::env::var(proteosurf_core::config::API_KEY_ENV).is_ok() {
        // Environment provides a key; nothing to assert in this setup
        return;
    }
    let err = AnthropicGateway::new(config).unwrap_err();
    assert!(matches!(err, proteosurf_core::Error::Config(_)));
}
