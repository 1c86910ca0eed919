//! Wire-level tests for the HTTP SoundCloud client against a mock server.

use fangate::soundcloud::http::{HttpSoundCloudClient, SoundCloudConfig};
use fangate::soundcloud::{SoundCloudApi, SoundCloudError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpSoundCloudClient {
    let config = SoundCloudConfig::new("test-client".to_string(), "test-secret".to_string())
        .with_bases(server.uri(), server.uri());
    HttpSoundCloudClient::new(config)
}

#[tokio::test]
async fn exchange_code_posts_form_and_parses_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code_verifier=the-verifier"))
        .and(body_string_contains("client_id=test-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "refresh_token": "refresh",
            "expires_in": 3600,
            "scope": "non-expiring"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let token = client
        .exchange_code("the-code", "https://gate.example.com/callback", "the-verifier")
        .await
        .unwrap();

    assert_eq!(token.access_token, "issued-token");
    assert_eq!(token.expires_in, Some(3600));
}

#[tokio::test]
async fn exchange_code_failure_surfaces_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .exchange_code("stale-code", "https://gate.example.com/callback", "v")
        .await
        .unwrap_err();

    match err {
        SoundCloudError::OAuth(message) => assert!(message.contains("400")),
        other => panic!("expected OAuth error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_profile_sends_oauth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "OAuth access-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9001,
            "username": "fan",
            "permalink_url": "https://soundcloud.com/fan"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let profile = client.get_profile("access-123").await.unwrap();

    assert_eq!(profile.id, 9001);
    assert_eq!(profile.username, "fan");
}

#[tokio::test]
async fn repost_rejection_is_a_failed_action_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reposts/tracks/42"))
        .respond_with(ResponseTemplate::new(403).set_body_string("already reposted"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.create_repost("access-123", 42).await.unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("403"));
}

#[tokio::test]
async fn follow_uses_put_on_followings() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me/followings/7"))
        .and(header("Authorization", "OAuth access-123"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.create_follow("access-123", 7).await.unwrap();

    assert!(result.success);
}

#[tokio::test]
async fn post_comment_includes_timestamp_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tracks/42/comments"))
        .and(body_string_contains("\"timestamp\":90000"))
        .and(body_string_contains("great drop"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 555 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = client
        .post_comment("access-123", 42, "great drop", Some(90_000))
        .await
        .unwrap();

    assert_eq!(id, 555);
}

#[tokio::test]
async fn track_info_reports_duration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tracks/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "duration": 240000
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let track = client.get_track_info("access-123", 42).await.unwrap();

    assert_eq!(track.duration, 240_000);
}

#[tokio::test]
async fn purchase_link_update_sends_track_payload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tracks/42"))
        .and(body_string_contains("purchase_url"))
        .and(body_string_contains("Buy now"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .update_purchase_link("access-123", 42, "https://shop.example.com/track", Some("Buy now"))
        .await
        .unwrap();

    assert!(result.success);
}
