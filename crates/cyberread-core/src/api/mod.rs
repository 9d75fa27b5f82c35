//! REST API client module for the cyberread backend.
//!
//! This module provides the `ApiClient` for talking HTTP/JSON to the backend
//! and `ApiError`, which classifies failed responses by status code.
//!
//! The backend uses bearer token authentication; tokens are obtained from
//! `/auth/login` or `/auth/register` and validated with `/auth/me`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthPayload};
pub use error::ApiError;
