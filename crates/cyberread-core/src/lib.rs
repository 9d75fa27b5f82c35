//! Core library for cyberread.
//!
//! This crate provides everything a front end needs to talk to the
//! cyberread article platform:
//!
//! - `SessionManager`: owns the authenticated identity, the bearer token and
//!   the inactivity timer, persisting them across restarts
//! - `Gateway`: authenticated requests with a single refresh-and-replay on
//!   credential rejection
//! - `ApiClient`: raw HTTP/JSON transport to the REST backend
//! - Domain models for articles, bookmarks, security tips and admin data
//! - Markdown editing helpers used by the article editor

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod markdown;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{ActivitySignal, AuthState, SessionData, SessionManager};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, SessionSettings};
pub use error::AuthError;
pub use gateway::Gateway;
pub use models::{Identity, ProfileUpdate};
