//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, registration, logout, restore and profile
//!   updates, with inactivity expiry
//! - `SessionStore`: whole-record persistence of `token`, `user` and
//!   `lastActive` (file-backed or in-memory)
//! - `MonitorHandle`: the scoped background task running the periodic
//!   expiry check
//!
//! Sessions expire after 30 minutes without user activity.

pub mod manager;
pub mod monitor;
pub mod session;
pub mod store;

pub use manager::SessionManager;
pub use monitor::{MonitorHandle, TickOutcome};
pub use session::{ActivitySignal, AuthState, SessionData};
pub use store::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};
