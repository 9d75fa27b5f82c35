//! API client for communicating with the cyberread REST backend.
//!
//! This module provides the `ApiClient` struct: a thin JSON transport plus the
//! `/auth/*` endpoints the session manager drives directly. Everything else
//! goes through `Gateway`, which attaches the session credential.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::models::{Identity, ProfileRequest};

use super::ApiError;

/// Successful login or registration: `{token, user}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: Identity,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdentityEnvelope {
    Wrapped { user: Identity },
    Bare(Identity),
}

impl IdentityEnvelope {
    fn into_identity(self) -> Identity {
        match self {
            IdentityEnvelope::Wrapped { user } => user,
            IdentityEnvelope::Bare(user) => user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct PasswordChanged {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    #[serde(rename = "currentPassword")]
    current_password: &'a str,
    #[serde(rename = "newPassword")]
    new_password: &'a str,
}

/// API client for the cyberread backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request against `path`, attaching the bearer credential if given.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode its JSON body. An empty body decodes as
    /// JSON `null`, so `Option<T>` and `IgnoredAny` accept it.
    pub async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, path = %path, "Sending request");

        let response = self.client.execute(request).await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} {}: {}", method, path, e))
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Auth endpoints =====

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let body = LoginRequest { email, password };
        self.execute(self.request(Method::POST, "/auth/login", None).json(&body))
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, ApiError> {
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        self.execute(self.request(Method::POST, "/auth/register", None).json(&body))
            .await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.execute::<IgnoredAny>(self.request(Method::POST, "/auth/logout", Some(token)))
            .await?;
        Ok(())
    }

    /// Validate a token and fetch the identity it belongs to.
    pub async fn current_user(&self, token: &str) -> Result<Identity, ApiError> {
        let envelope: IdentityEnvelope = self
            .execute(self.request(Method::GET, "/auth/me", Some(token)))
            .await?;
        let identity = envelope.into_identity();
        if identity.is_blank() {
            return Err(ApiError::InvalidResponse(
                "Identity response carried no user".to_string(),
            ));
        }
        Ok(identity)
    }

    pub async fn refresh_token(&self, token: &str) -> Result<String, ApiError> {
        let response: TokenResponse = self
            .execute(self.request(Method::POST, "/auth/refresh-token", Some(token)))
            .await?;
        if response.token.is_empty() {
            return Err(ApiError::InvalidResponse("Refresh returned an empty token".to_string()));
        }
        Ok(response.token)
    }

    pub async fn update_profile(
        &self,
        token: &str,
        profile: &ProfileRequest,
    ) -> Result<Identity, ApiError> {
        let envelope: IdentityEnvelope = self
            .execute(self.request(Method::PUT, "/auth/profile", Some(token)).json(profile))
            .await?;
        Ok(envelope.into_identity())
    }

    /// Returns the rotated token when the backend issues one.
    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<Option<String>, ApiError> {
        let body = ChangePasswordRequest {
            current_password,
            new_password,
        };
        let response: Option<PasswordChanged> = self
            .execute(self.request(Method::PUT, "/auth/change-password", Some(token)).json(&body))
            .await?;
        Ok(response.and_then(|r| r.token).filter(|t| !t.is_empty()))
    }

    pub async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        self.execute::<IgnoredAny>(self.request(Method::DELETE, "/auth/account", Some(token)))
            .await?;
        Ok(())
    }
}
