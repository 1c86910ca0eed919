//! Test utilities for database and gate access testing.
//!
//! Provides in-memory SQLite databases with migrations applied, fixture
//! builders for gates and submissions, and a scriptable SoundCloud client.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use fangate::models::{gate, submission};
use fangate::repositories::submission::NewSubmission;
use fangate::repositories::{GateRepository, SubmissionRepository};
use fangate::soundcloud::{
    ActionResult, Profile, SoundCloudApi, SoundCloudError, TokenResponse, TrackInfo,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool is capped at a single connection so every handle in a test sees
/// the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database and returns an Arc.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Builds a gate model with sensible defaults; `configure` tweaks fields.
pub fn gate_fixture(configure: impl FnOnce(&mut gate::Model)) -> gate::Model {
    let now = Utc::now();
    let mut gate = gate::Model {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        slug: format!("gate-{}", Uuid::new_v4()),
        title: "Test Gate".to_string(),
        file_url: "https://cdn.example.com/track.wav".to_string(),
        active: true,
        expires_at: None,
        max_downloads: None,
        require_email: true,
        require_repost: false,
        require_follow: false,
        require_connect: false,
        require_profile_click: false,
        track_id: Some(42),
        target_user_id: Some(7),
        buy_link_url: None,
        buy_link_title: None,
        pixel_config: None,
        download_count: 0,
        created_at: now,
        updated_at: now,
    };
    configure(&mut gate);
    gate
}

/// Inserts a gate built from [`gate_fixture`].
pub async fn create_gate(
    db: &Arc<DatabaseConnection>,
    configure: impl FnOnce(&mut gate::Model),
) -> Result<gate::Model> {
    let gates = GateRepository::new(Arc::clone(db));
    Ok(gates.create(gate_fixture(configure)).await?)
}

/// Inserts a submission for `gate_id` with the email flag already satisfied.
pub async fn create_submission(
    db: &Arc<DatabaseConnection>,
    gate_id: Uuid,
) -> Result<submission::Model> {
    let submissions = SubmissionRepository::new(Arc::clone(db));
    Ok(submissions
        .create(NewSubmission {
            gate_id,
            email: "fan@example.com".to_string(),
            comment_text: None,
            ip_address: Some("203.0.113.9".to_string()),
            user_agent: Some("test-agent/1.0".to_string()),
            email_verified: true,
        })
        .await?)
}

/// Scriptable SoundCloud client for integration tests.
///
/// Succeeds everything by default; individual behaviors are toggled per test.
pub struct MockSoundCloud {
    pub fail_exchange: AtomicBool,
    pub fail_repost: AtomicBool,
    pub fail_follow: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl Default for MockSoundCloud {
    fn default() -> Self {
        Self {
            fail_exchange: AtomicBool::new(false),
            fail_repost: AtomicBool::new(false),
            fail_follow: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockSoundCloud {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SoundCloudApi for MockSoundCloud {
    fn build_authorize_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<Url, SoundCloudError> {
        let mut url = Url::parse("https://secure.soundcloud.com/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("client_id", "test-client")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<TokenResponse, SoundCloudError> {
        self.record("exchange_code");
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(SoundCloudError::OAuth("invalid_grant".to_string()));
        }
        Ok(TokenResponse {
            access_token: "test-access-token".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
        })
    }

    async fn get_profile(&self, _access_token: &str) -> Result<Profile, SoundCloudError> {
        self.record("get_profile");
        Ok(Profile {
            id: 9001,
            username: "fan".to_string(),
            permalink_url: None,
        })
    }

    async fn create_repost(
        &self,
        _access_token: &str,
        _track_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.record("create_repost");
        if self.fail_repost.load(Ordering::SeqCst) {
            return Ok(ActionResult::failed("repost rejected"));
        }
        Ok(ActionResult::ok())
    }

    async fn create_favorite(
        &self,
        _access_token: &str,
        _track_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.record("create_favorite");
        Ok(ActionResult::ok())
    }

    async fn create_follow(
        &self,
        _access_token: &str,
        _user_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.record("create_follow");
        if self.fail_follow.load(Ordering::SeqCst) {
            return Ok(ActionResult::failed("follow rejected"));
        }
        Ok(ActionResult::ok())
    }

    async fn post_comment(
        &self,
        _access_token: &str,
        _track_id: i64,
        _body: &str,
        _timestamp_ms: Option<i64>,
    ) -> Result<i64, SoundCloudError> {
        self.record("post_comment");
        Ok(12345)
    }

    async fn get_track_info(
        &self,
        _access_token: &str,
        track_id: i64,
    ) -> Result<TrackInfo, SoundCloudError> {
        self.record("get_track_info");
        Ok(TrackInfo {
            id: track_id,
            duration: 180_000,
        })
    }

    async fn update_purchase_link(
        &self,
        _access_token: &str,
        _track_id: i64,
        _url: &str,
        _title: Option<&str>,
    ) -> Result<ActionResult, SoundCloudError> {
        self.record("update_purchase_link");
        Ok(ActionResult::ok())
    }
}
