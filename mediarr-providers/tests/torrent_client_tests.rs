//! Integration tests for the download-client backends against a mock server

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mediarr_providers::torrent::{
    AddTorrentOptions, CanonicalTorrentState, QbittorrentClient, TorrentFilter,
    TransmissionClient,
};
use mediarr_providers::{
    Credential, ErrorKind, ProviderConnectionConfig, RetryPolicy, TorrentClient,
};

fn fast_retry(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_factor: 2.0,
        jitter: false,
    }
}

fn config(base_url: &str) -> ProviderConnectionConfig {
    ProviderConnectionConfig::new(base_url, Credential::username_password("admin", "adminadmin"))
        .unwrap()
        .with_retry(fast_retry(0))
}

fn qbt_torrent(state: &str) -> serde_json::Value {
    json!({
        "hash": "8c212779b4abde7c6bc608063a0d008b7e40ce32",
        "name": "Some.Show.S01.1080p",
        "state": state,
        "progress": 0.42,
        "size": 2_000_000_000i64,
        "downloaded": 840_000_000i64,
        "uploaded": 12_000_000i64,
        "dlspeed": 1_048_576,
        "upspeed": 65_536,
        "eta": 1_200,
        "category": "tv",
        "tags": "mediarr",
        "save_path": "/downloads/tv",
        "added_on": 1_700_000_000,
        "ratio": 0.014,
    })
}

async fn mount_qbt_login(server: &MockServer, expected_logins: u64) {
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .and(body_string_contains("username=admin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "SID=abc123; HttpOnly; SameSite=Strict; path=/")
                .set_body_string("Ok."),
        )
        .expect(expected_logins)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_qbittorrent_login_once_and_reuse_cookie() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .and(header("Cookie", "SID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([qbt_torrent("pausedDL")])))
        .expect(2)
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let first = client.get_torrents(&TorrentFilter::default()).await.unwrap();
    let second = client.get_torrents(&TorrentFilter::default()).await.unwrap();

    // native "pausedDL" comes back canonical
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].state, CanonicalTorrentState::Paused);
    assert_eq!(first[0].native_state, "pausedDL");
    assert_eq!(first[0].category.as_deref(), Some("tv"));
    assert_eq!(second.len(), 1);
    // login mock expectation (1) proves the cookie was reused
}

#[tokio::test]
async fn test_qbittorrent_relogins_after_403() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 2).await;
    // the first listing is rejected with a stale-session 403
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .and(header("Cookie", "SID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([qbt_torrent("uploading")])))
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let torrents = client.get_torrents(&TorrentFilter::default()).await.unwrap();

    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0].state, CanonicalTorrentState::Seeding);
}

#[tokio::test]
async fn test_qbittorrent_bad_credentials() {
    let server = MockServer::start().await;
    // qBittorrent reports bad credentials as 200 with no cookie
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Fails."))
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let err = client
        .get_torrents(&TorrentFilter::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AuthFailed);
    assert_eq!(
        err.to_string(),
        "Authentication failed. Please check your credentials."
    );

    let result = client.test_connection().await;
    assert!(!result.connected);
}

#[tokio::test]
async fn test_qbittorrent_test_connection_reads_version() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/app/version"))
        .and(header("Cookie", "SID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v4.6.5"))
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let result = client.test_connection().await;

    assert!(result.connected);
    assert_eq!(result.version.as_deref(), Some("v4.6.5"));
}

#[tokio::test]
async fn test_qbittorrent_add_torrent_is_fire_and_forget() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/torrents/add"))
        .and(body_string_contains("urls=magnet%3A"))
        .and(body_string_contains("category=tv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ok."))
        .expect(1)
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    client
        .add_torrent(&AddTorrentOptions {
            urls: vec!["magnet:?xt=urn:btih:8c212779b4abde7c".to_string()],
            category: Some("tv".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_qbittorrent_lifecycle_fires() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 1).await;
    for endpoint in ["pause", "resume", "recheck", "delete", "setCategory"] {
        Mock::given(method("POST"))
            .and(path(format!("/api/v2/torrents/{endpoint}")))
            .and(body_string_contains("hashes="))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let hash = "8c212779b4abde7c6bc608063a0d008b7e40ce32";
    client.pause_torrent(hash).await.unwrap();
    client.resume_torrent(hash).await.unwrap();
    client.recheck_torrent(hash).await.unwrap();
    client.delete_torrent(hash, true).await.unwrap();
    client.set_category(hash, "movies").await.unwrap();
}

#[tokio::test]
async fn test_transmission_replays_session_id_after_409() {
    let server = MockServer::start().await;
    // first contact: the CSRF 409 carrying the session id
    Mock::given(method("POST"))
        .and(path("/transmission/rpc"))
        .respond_with(
            ResponseTemplate::new(409).insert_header("X-Transmission-Session-Id", "sess-1"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transmission/rpc"))
        .and(header("X-Transmission-Session-Id", "sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "arguments": {
                "torrents": [{
                    "hashString": "deadbeef",
                    "name": "debian.iso",
                    "status": 6,
                    "percentDone": 1.0,
                    "totalSize": 700_000_000i64,
                    "uploadRatio": 2.5,
                }],
            },
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = TransmissionClient::new(config(&server.uri())).unwrap();
    let torrents = client.get_torrents(&TorrentFilter::default()).await.unwrap();

    assert_eq!(torrents.len(), 1);
    assert_eq!(torrents[0].state, CanonicalTorrentState::Seeding);
    assert_eq!(torrents[0].native_state, "seeding");

    // the session id is cached, so the next call skips the handshake
    let again = client.get_torrents(&TorrentFilter::default()).await.unwrap();
    assert_eq!(again.len(), 1);
}

#[tokio::test]
async fn test_transmission_rpc_failure_has_stable_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transmission/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "unrecognized method: torrent-get",
            "arguments": {},
        })))
        .mount(&server)
        .await;

    let client = TransmissionClient::new(config(&server.uri())).unwrap();
    let err = client
        .get_torrents(&TorrentFilter::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "The download client rejected the request.");
    // the upstream result string is retained as the cause, not the message
    assert!(err.cause.is_some());
}

#[tokio::test]
async fn test_transmission_test_connection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transmission/rpc"))
        .and(body_string_contains("session-get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "arguments": { "version": "4.0.5", "rpc-version": 17 },
        })))
        .mount(&server)
        .await;

    let client = TransmissionClient::new(config(&server.uri())).unwrap();
    let result = client.test_connection().await;

    assert!(result.connected);
    assert_eq!(result.version.as_deref(), Some("4.0.5"));
    let details = result.details.unwrap();
    assert_eq!(details.get("rpcVersion").map(String::as_str), Some("17"));
}

#[tokio::test]
async fn test_canonical_filter_applies_across_backends() {
    let server = MockServer::start().await;
    mount_qbt_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            qbt_torrent("pausedDL"),
            {
                "hash": "f00dbabe",
                "name": "Other",
                "state": "downloading",
                "progress": 0.1,
                "size": 1000,
            },
        ])))
        .mount(&server)
        .await;

    let client = QbittorrentClient::new(config(&server.uri())).unwrap();
    let filter = TorrentFilter {
        states: vec![CanonicalTorrentState::Paused],
        ..Default::default()
    };
    let torrents = client.get_torrents(&filter).await.unwrap();

    assert_eq!(torrents.len(), 1);
    assert!(torrents[0].state.is_paused());
}
