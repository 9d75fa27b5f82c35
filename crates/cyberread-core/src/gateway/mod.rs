//! Authenticated access to the backend.
//!
//! Every request made through `Gateway` carries the session's current
//! credential. A 401 is handled here, once, for all callers: one refresh
//! attempt, one replay. If either fails, the session is ended and the
//! caller gets `AuthError::Authentication`.

mod admin;
mod articles;
mod bookmarks;
mod tips;

use reqwest::{Method, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionManager;
use crate::error::AuthError;

#[derive(Clone)]
pub struct Gateway {
    session: SessionManager,
}

impl Gateway {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request built by `build`, which is called again with the new
    /// credential if a replay is needed.
    pub async fn send<T, F>(&self, build: F) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        F: Fn(&ApiClient, Option<&str>) -> RequestBuilder,
    {
        let api = self.session.api();
        let token = self.session.token();

        match api.execute::<T>(build(api, token.as_deref())).await {
            Err(ApiError::Unauthorized) => {}
            other => return other.map_err(AuthError::from),
        }

        let Some(stale) = token else {
            debug!("Unauthenticated request rejected");
            self.session.invalidate();
            return Err(AuthError::not_logged_in());
        };

        debug!("Credential rejected, attempting refresh");
        let fresh = match self.session.refresh_token().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.session.invalidate_token(&stale);
                return Err(AuthError::session_expired());
            }
        };

        match api.execute::<T>(build(api, Some(&fresh))).await {
            Ok(value) => Ok(value),
            Err(ApiError::Unauthorized) => {
                warn!("Refreshed credential rejected, ending session");
                self.session.invalidate_token(&fresh);
                Err(AuthError::session_expired())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        self.send(|api, token| api.request(Method::GET, path, token))
            .await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(|api, token| api.request(Method::GET, path, token).query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T, AuthError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(|api, token| {
            let request = api.request(Method::POST, path, token);
            match body {
                Some(body) => request.json(body),
                None => request,
            }
        })
        .await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        self.send(|api, token| api.request(Method::PUT, path, token))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), AuthError> {
        self.send::<IgnoredAny, _>(|api, token| api.request(Method::DELETE, path, token))
            .await?;
        Ok(())
    }
}
