//! Integration tests for the PIN pairing session manager against a mock
//! plex.tv

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mediarr_core::pin_session::{PinAuthError, PinSessionManager};
use mediarr_core::PinAuthConfig;

fn manager_for(server: &MockServer) -> PinSessionManager {
    PinSessionManager::new(PinAuthConfig {
        plex_base_url: server.uri(),
        ..Default::default()
    })
}

async fn mount_create_pin(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/pins"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 123,
            "code": "WXYZ",
            "authToken": null,
            "expiresAt": "2099-01-01T00:00:00Z",
        })))
        .mount(server)
        .await;
}

fn pin_body(auth_token: serde_json::Value) -> serde_json::Value {
    json!({
        "id": 123,
        "code": "WXYZ",
        "authToken": auth_token,
        "expiresAt": "2099-01-01T00:00:00Z",
    })
}

#[tokio::test]
async fn test_initiate_returns_pin_and_qr_payload() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    assert_eq!(start.pin_id, 123);
    assert_eq!(start.pin_code, "WXYZ");
    assert!(start.qr_url.contains("code=WXYZ"));
    assert!(start.qr_url.contains(&start.client_identifier));
    assert!(start.expires_at.is_some());
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn test_initiate_failure_propagates_classified_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/pins"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let err = manager.initiate().await.unwrap_err();

    assert!(matches!(err, PinAuthError::Provider(_)));
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn test_poll_pending_keeps_session_alive() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pins/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pin_body(json!(null))))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    let poll = manager.poll(&start.client_identifier, 123).await.unwrap();
    assert!(!poll.authenticated);
    assert!(poll.token.is_none());
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn test_poll_success_is_single_use() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pins/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pin_body(json!("tok-1"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/user"))
        .and(header("X-Plex-Token", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "uuid": "u-7",
            "username": "someone",
            "email": "someone@example.com",
        })))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    let poll = manager.poll(&start.client_identifier, 123).await.unwrap();
    assert!(poll.authenticated);
    assert_eq!(poll.token.as_deref(), Some("tok-1"));
    assert_eq!(poll.user.unwrap().username, "someone");
    assert_eq!(manager.session_count(), 0);

    // the session was consumed; a second poll has nothing to find
    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::SessionInvalid));
}

#[tokio::test]
async fn test_poll_with_wrong_pin_id_is_invalid_but_keeps_session() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    let err = manager.poll(&start.client_identifier, 999).await.unwrap_err();
    assert!(matches!(err, PinAuthError::SessionInvalid));
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn test_poll_provider_failure_reports_pending() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;
    // a non-retryable provider hiccup must not surface as an error
    Mock::given(method("GET"))
        .and(path("/api/v2/pins/123"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    let poll = manager.poll(&start.client_identifier, 123).await.unwrap();
    assert!(!poll.authenticated);
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn test_poll_upstream_pin_gone_expires_session() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pins/123"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::Expired));
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn test_attempt_cap_deletes_session() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pins/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pin_body(json!(null))))
        .mount(&server)
        .await;

    let manager = PinSessionManager::new(PinAuthConfig {
        plex_base_url: server.uri(),
        max_attempts: 2,
        ..Default::default()
    });
    let start = manager.initiate().await.unwrap();

    for _ in 0..2 {
        let poll = manager.poll(&start.client_identifier, 123).await.unwrap();
        assert!(!poll.authenticated);
    }
    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::AttemptsExceeded));

    // the session is gone, not merely capped
    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::SessionInvalid));
}

#[tokio::test]
async fn test_ttl_deletes_session_on_poll() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = PinSessionManager::new(PinAuthConfig {
        plex_base_url: server.uri(),
        session_ttl_seconds: 1,
        ..Default::default()
    });
    let start = manager.initiate().await.unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;

    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::Expired));
    assert_eq!(manager.session_count(), 0);
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = manager_for(&server);
    let start = manager.initiate().await.unwrap();

    assert!(manager.cancel(&start.client_identifier));
    assert!(!manager.cancel(&start.client_identifier));

    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::SessionInvalid));
}

#[tokio::test]
async fn test_sweeper_removes_abandoned_sessions() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = PinSessionManager::new(PinAuthConfig {
        plex_base_url: server.uri(),
        session_ttl_seconds: 1,
        sweep_interval_seconds: 1,
        ..Default::default()
    });
    let start = manager.initiate().await.unwrap();
    manager.start_sweeper();

    // nobody polls; the sweep alone must reclaim the session
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(manager.session_count(), 0);

    let err = manager.poll(&start.client_identifier, 123).await.unwrap_err();
    assert!(matches!(err, PinAuthError::SessionInvalid));
    manager.stop_sweeper();
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_collide() {
    let server = MockServer::start().await;
    mount_create_pin(&server).await;

    let manager = manager_for(&server);
    let first = manager.initiate().await.unwrap();
    let second = manager.initiate().await.unwrap();

    // each handshake gets its own identifier and session
    assert_ne!(first.client_identifier, second.client_identifier);
    assert_eq!(manager.session_count(), 2);

    assert!(manager.cancel(&first.client_identifier));
    assert_eq!(manager.session_count(), 1);
}
