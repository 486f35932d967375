use pushgate_core::push::{PushError, PushMessage, PushProvider};
use pushgate_fcm::{FcmProvider, ServiceAccountKey};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("fixtures/test-service-account.pem");
const SEND_PATH: &str = "/v1/projects/demo/messages:send";

fn key_for(server: &MockServer) -> ServiceAccountKey {
    ServiceAccountKey {
        project_id: "demo".into(),
        private_key: TEST_KEY.into(),
        client_email: "push@demo.iam.gserviceaccount.com".into(),
        token_uri: format!("{}/token", server.uri()),
    }
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn reports_per_token_outcomes_and_caches_access_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer ya29.test"))
        .and(body_partial_json(json!({"message": {"token": "good"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "projects/demo/messages/1"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({"message": {"token": "stale"}})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": {
            "code": 404,
            "status": "NOT_FOUND",
            "details": [{"errorCode": "UNREGISTERED"}]
        }})))
        .mount(&server)
        .await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let tokens = vec!["good".to_string(), "stale".to_string()];
    let msg = PushMessage::new("Hello", "World");

    let report = provider.send_multicast(&tokens, &msg).await.unwrap();
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.responses[0].token, "good");
    assert_eq!(report.responses[0].message_id.as_deref(), Some("projects/demo/messages/1"));
    assert_eq!(report.responses[1].error.as_deref(), Some("UNREGISTERED"));

    // Second call reuses the cached access token (token endpoint expects 1 call).
    let again = provider.send_multicast(&tokens, &msg).await.unwrap();
    assert_eq!(again.success_count, 1);
}

#[tokio::test]
async fn server_errors_without_delivery_are_transport_errors() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": {
            "code": 503,
            "status": "UNAVAILABLE"
        }})))
        .mount(&server)
        .await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let err = provider
        .send_multicast(&["a".to_string(), "b".to_string()], &PushMessage::new("t", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, PushError::Transport(_)));
}

#[tokio::test]
async fn refused_payload_is_message_error_not_dead_tokens() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {
            "code": 400,
            "status": "INVALID_ARGUMENT",
            "message": "Invalid data payload key: from",
            "details": [{"errorCode": "INVALID_ARGUMENT"}]
        }})))
        .expect(2)
        .mount(&server)
        .await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let msg = PushMessage::new("t", "b").with_data("from", "x");
    let err = provider
        .send_multicast(&["a".to_string(), "b".to_string()], &msg)
        .await
        .unwrap_err();
    match err {
        PushError::InvalidMessage(detail) => assert!(detail.contains("from"), "{detail}"),
        other => panic!("expected InvalidMessage, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_argument_on_token_field_is_per_token_failure() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {
            "code": 400,
            "status": "INVALID_ARGUMENT",
            "details": [
                {"errorCode": "INVALID_ARGUMENT"},
                {"fieldViolations": [{"field": "message.token", "description": "Invalid registration token"}]}
            ]
        }})))
        .mount(&server)
        .await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let report = provider
        .send_multicast(&["garbage".to_string()], &PushMessage::new("t", "b"))
        .await
        .unwrap();
    assert!(report.all_failed());
    assert_eq!(report.responses[0].error.as_deref(), Some("INVALID_ARGUMENT"));
}

#[tokio::test]
async fn rejected_token_exchange_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let err = provider
        .send_multicast(&["a".to_string()], &PushMessage::new("t", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, PushError::Auth(_)));
}

#[tokio::test]
async fn empty_token_set_makes_no_requests() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 0).await;

    let provider = FcmProvider::with_endpoint(&key_for(&server), &server.uri()).unwrap();
    let report = provider
        .send_multicast(&[], &PushMessage::new("t", "b"))
        .await
        .unwrap();
    assert_eq!(report.success_count + report.failure_count, 0);
}

#[test]
fn malformed_private_key_is_rejected_up_front() {
    let key = ServiceAccountKey {
        project_id: "demo".into(),
        private_key: "not a key".into(),
        client_email: "push@demo.iam.gserviceaccount.com".into(),
        token_uri: "http://localhost/token".into(),
    };
    let err = FcmProvider::new(&key).unwrap_err();
    assert!(matches!(err, PushError::Credentials(_)));
}
