//! reqwest-backed SoundCloud client
//!
//! Speaks the SoundCloud public API: `secure.soundcloud.com` for the OAuth
//! endpoints and `api.soundcloud.com` for resource calls. Base URLs are
//! configurable so tests can point the client at a mock server.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{
    ActionResult, Profile, SoundCloudApi, SoundCloudError, TokenResponse, TrackInfo,
};

const DEFAULT_OAUTH_BASE: &str = "https://secure.soundcloud.com";
const DEFAULT_API_BASE: &str = "https://api.soundcloud.com";

/// SoundCloud OAuth application credentials and endpoint configuration
#[derive(Debug, Clone)]
pub struct SoundCloudConfig {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_base: String,
    pub api_base: String,
}

impl SoundCloudConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_bases(mut self, oauth_base: String, api_base: String) -> Self {
        self.oauth_base = oauth_base;
        self.api_base = api_base;
        self
    }
}

/// HTTP implementation of [`SoundCloudApi`]
#[derive(Clone)]
pub struct HttpSoundCloudClient {
    config: SoundCloudConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: i64,
}

impl HttpSoundCloudClient {
    pub fn new(config: SoundCloudConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn auth_header(token: &str) -> String {
        format!("OAuth {}", token)
    }

    /// Map a non-success response into a structured API error.
    async fn api_error(response: reqwest::Response) -> SoundCloudError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        SoundCloudError::Api { status, message }
    }

    /// Issue a write that only reports success or failure.
    async fn write_action(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<ActionResult, SoundCloudError> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(ActionResult::ok())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Ok(ActionResult::failed(format!(
                "SoundCloud returned {}: {}",
                status, message
            )))
        }
    }
}

#[async_trait]
impl SoundCloudApi for HttpSoundCloudClient {
    fn build_authorize_url(
        &self,
        state: &str,
        redirect_uri: &str,
        code_challenge: &str,
    ) -> Result<Url, SoundCloudError> {
        let mut url = Url::parse(&format!("{}/authorize", self.config.oauth_base))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");

        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, SoundCloudError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
            ("code", code),
        ];

        let response = self
            .http
            .post(format!("{}/oauth/token", self.config.oauth_base))
            .header("Accept", "application/json; charset=utf-8")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SoundCloudError::OAuth(format!(
                "token endpoint returned {}: {}",
                status, message
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SoundCloudError::MalformedResponse(e.to_string()))?;

        debug!(scope = ?token.scope, "exchanged authorization code");
        Ok(token)
    }

    async fn get_profile(&self, access_token: &str) -> Result<Profile, SoundCloudError> {
        let response = self
            .http
            .get(format!("{}/me", self.config.api_base))
            .header("Authorization", Self::auth_header(access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| SoundCloudError::MalformedResponse(e.to_string()))
    }

    async fn create_repost(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.write_action(
            self.http
                .post(format!(
                    "{}/reposts/tracks/{}",
                    self.config.api_base, track_id
                ))
                .header("Authorization", Self::auth_header(access_token)),
        )
        .await
    }

    async fn create_favorite(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.write_action(
            self.http
                .post(format!("{}/likes/tracks/{}", self.config.api_base, track_id))
                .header("Authorization", Self::auth_header(access_token)),
        )
        .await
    }

    async fn create_follow(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> Result<ActionResult, SoundCloudError> {
        self.write_action(
            self.http
                .put(format!(
                    "{}/me/followings/{}",
                    self.config.api_base, user_id
                ))
                .header("Authorization", Self::auth_header(access_token)),
        )
        .await
    }

    async fn post_comment(
        &self,
        access_token: &str,
        track_id: i64,
        body: &str,
        timestamp_ms: Option<i64>,
    ) -> Result<i64, SoundCloudError> {
        let mut comment = json!({ "body": body });
        if let Some(ts) = timestamp_ms {
            comment["timestamp"] = json!(ts);
        }

        let response = self
            .http
            .post(format!(
                "{}/tracks/{}/comments",
                self.config.api_base, track_id
            ))
            .header("Authorization", Self::auth_header(access_token))
            .json(&json!({ "comment": comment }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let created: CommentResponse = response
            .json()
            .await
            .map_err(|e| SoundCloudError::MalformedResponse(e.to_string()))?;

        Ok(created.id)
    }

    async fn get_track_info(
        &self,
        access_token: &str,
        track_id: i64,
    ) -> Result<TrackInfo, SoundCloudError> {
        let response = self
            .http
            .get(format!("{}/tracks/{}", self.config.api_base, track_id))
            .header("Authorization", Self::auth_header(access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| SoundCloudError::MalformedResponse(e.to_string()))
    }

    async fn update_purchase_link(
        &self,
        access_token: &str,
        track_id: i64,
        url: &str,
        title: Option<&str>,
    ) -> Result<ActionResult, SoundCloudError> {
        let mut track = json!({ "purchase_url": url });
        if let Some(title) = title {
            track["purchase_title"] = json!(title);
        }

        self.write_action(
            self.http
                .put(format!("{}/tracks/{}", self.config.api_base, track_id))
                .header("Authorization", Self::auth_header(access_token))
                .json(&json!({ "track": track })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_pkce_and_state() {
        let client = HttpSoundCloudClient::new(SoundCloudConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
        ));

        let url = client
            .build_authorize_url("the-state", "https://gate.example.com/callback", "the-challenge")
            .unwrap();

        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("secure.soundcloud.com"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("state".to_string(), "the-state".to_string())));
        assert!(pairs.contains(&("code_challenge".to_string(), "the-challenge".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
    }
}
