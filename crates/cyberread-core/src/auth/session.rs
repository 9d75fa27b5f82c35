use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::Identity;

use super::store::PersistedSession;

/// An authenticated session: credential, identity and last activity.
///
/// Token and identity live in one struct, so a half-logged-in state cannot
/// be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub token: String,
    pub user: Identity,
    pub last_active: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: Identity, token: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user,
            last_active: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_active > timeout
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>, timeout: Duration) -> Duration {
        (self.last_active + timeout) - now
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>, timeout: Duration) -> i64 {
        self.time_until_expiry(now, timeout).num_minutes().max(0)
    }

    pub fn to_record(&self) -> PersistedSession {
        PersistedSession {
            token: Some(self.token.clone()),
            user: Some(self.user.clone()),
            last_active: Some(self.last_active.timestamp_millis()),
        }
    }

    /// Rebuild a session from a persisted record. Returns `None` unless both
    /// token and user are present. A missing timestamp counts as "now"
    /// (never written by an older client), an unparseable one as the epoch.
    pub fn from_record(record: PersistedSession, now: DateTime<Utc>) -> Option<Self> {
        let token = record.token.filter(|t| !t.is_empty())?;
        let user = record.user?;
        let last_active = match record.last_active {
            Some(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .unwrap_or_default(),
            None => now,
        };
        Some(Self {
            token,
            user,
            last_active,
        })
    }
}

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(Identity),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&Identity> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            AuthState::Unauthenticated => None,
        }
    }
}

/// Interaction signals that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
    Touch,
}

impl ActivitySignal {
    pub const ALL: [ActivitySignal; 5] = [
        ActivitySignal::PointerMove,
        ActivitySignal::KeyPress,
        ActivitySignal::Click,
        ActivitySignal::Scroll,
        ActivitySignal::Touch,
    ];
}
