//! The session manager: sole owner of the authenticated session.
//!
//! Two states, `Unauthenticated` and `Authenticated`. Every transition
//! changes the in-memory state, writes (or clears) the persisted record and
//! publishes the new `AuthState` under one lock acquisition, so the last
//! transition to finish is the one that sticks. The lock is never held
//! across a network call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::api::{ApiClient, ApiError, AuthPayload};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionSettings;
use crate::error::AuthError;
use crate::models::{Identity, ProfileRequest, ProfileUpdate};

use super::monitor::{MonitorHandle, TickOutcome};
use super::session::{ActivitySignal, AuthState, SessionData};
use super::store::SessionStore;

/// Handle to the session manager. Clone is cheap and every clone refers to
/// the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    state: Mutex<State>,
    events: watch::Sender<AuthState>,
}

#[derive(Default)]
struct State {
    session: Option<SessionData>,
    /// When `last_active` was last written to the store
    persisted_at: Option<DateTime<Utc>>,
    /// `last_active` moved since the last write
    dirty: bool,
    monitor: Option<MonitorHandle>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn SessionStore>, settings: SessionSettings) -> Self {
        Self::with_clock(api, store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: ApiClient,
        store: Arc<dyn SessionStore>,
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                clock,
                settings,
                state: Mutex::new(State::default()),
                events,
            }),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resolve the persisted session at startup. A record that is missing,
    /// incomplete, expired or rejected by `/auth/me` is cleared as a whole.
    pub async fn restore(&self) -> AuthState {
        let record = match self.inner.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No persisted session");
                return self.state();
            }
            Err(e) => {
                warn!(error = %e, "Persisted session unreadable, clearing");
                self.invalidate_token("");
                return self.state();
            }
        };

        let now = self.now();
        let Some(persisted) = SessionData::from_record(record, now) else {
            warn!("Persisted session incomplete, clearing");
            self.invalidate_token("");
            return self.state();
        };

        if persisted.is_expired_at(now, self.inner.settings.inactivity_timeout) {
            info!(last_active = %persisted.last_active, "Persisted session expired");
            self.invalidate_token(&persisted.token);
            return self.state();
        }

        match self.inner.api.current_user(&persisted.token).await {
            Ok(identity) => {
                let mut user = persisted.user;
                user.absorb(identity);
                let restored = SessionData::new(user, persisted.token, self.now());
                match self.establish(restored) {
                    Ok(user) => info!(user = %user.username, "Session restored"),
                    Err(e) => {
                        warn!(error = %e, "Failed to persist restored session");
                    }
                }
            }
            Err(e) => {
                info!(error = %e, "Session validation failed, clearing");
                self.invalidate_token(&persisted.token);
            }
        }
        self.state()
    }

    /// Record a session from a completed authentication exchange. Calling it
    /// while authenticated replaces the session.
    pub fn login(&self, identity: Identity, token: impl Into<String>) -> Result<(), AuthError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AuthError::validation("Missing credential"));
        }
        let user = self.establish(SessionData::new(identity, token, self.now()))?;
        info!(user = %user.username, "Logged in");
        Ok(())
    }

    /// Exchange email and password for a session.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let payload = self.exchange(email, password).await?;
        let user = payload.user.clone();
        self.login(payload.user, payload.token)?;
        Ok(user)
    }

    /// Like `authenticate`, but only admins get a session.
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let payload = self.exchange(email, password).await?;
        if !payload.user.is_admin {
            warn!(user = %payload.user.username, "Admin login refused for non-admin");
            return Err(AuthError::Authentication(
                "Access denied. Admin privileges required.".to_string(),
            ));
        }
        let user = payload.user.clone();
        self.login(payload.user, payload.token)?;
        Ok(user)
    }

    async fn exchange(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::validation("Please fill in all fields"));
        }
        self.inner
            .api
            .login(email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => {
                    AuthError::Authentication("Invalid email or password.".to_string())
                }
                other => other.into(),
            })
    }

    /// Create an account and log into it. Backend validation errors are
    /// returned as-is and leave the state untouched.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let (username, email) = (username.trim(), email.trim());
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::validation("Please fill in all fields"));
        }
        let payload = self.inner.api.register(username, email, password).await?;
        let user = payload.user.clone();
        self.login(payload.user, payload.token)?;
        Ok(user)
    }

    /// Log out. The local session is always cleared, whatever happens to
    /// the remote call.
    pub async fn logout(&self) {
        let token = self.inner.state.lock().session.as_ref().map(|s| s.token.clone());

        if let Some(token) = token {
            let remote = self.inner.api.logout(&token);
            match tokio::time::timeout(self.inner.settings.logout_timeout, remote).await {
                Ok(Ok(())) => debug!("Remote logout acknowledged"),
                Ok(Err(e)) => warn!(error = %e, "Remote logout failed, clearing local session anyway"),
                Err(_) => warn!("Remote logout timed out, clearing local session anyway"),
            }
        }

        let mut guard = self.inner.state.lock();
        self.destroy_locked(&mut guard, "logout");
    }

    /// Destroy the session without contacting the backend.
    pub fn invalidate(&self) {
        let mut guard = self.inner.state.lock();
        self.destroy_locked(&mut guard, "credential rejected");
    }

    /// Destroy the session only if it still uses `token` (or there is none).
    /// A rejection of an old credential must not end a newer session.
    pub(crate) fn invalidate_token(&self, token: &str) {
        let mut guard = self.inner.state.lock();
        let current = guard.session.as_ref().map(|s| s.token.as_str());
        if current.is_none() || current == Some(token) {
            self.destroy_locked(&mut guard, "credential rejected");
        } else {
            debug!("Ignoring rejection of a superseded credential");
        }
    }

    /// Stop background work at process exit, flushing any deferred activity
    /// timestamp. The session itself stays persisted.
    pub fn shutdown(&self) {
        let now = self.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if let Some(monitor) = state.monitor.take() {
            monitor.stop();
        }
        if state.dirty {
            self.flush_locked(state, now);
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.live(|_| ()).is_some()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.live(|s| s.user.clone())
    }

    /// The bearer credential, if a live session exists.
    pub fn token(&self) -> Option<String> {
        self.live(|s| s.token.clone())
    }

    pub fn state(&self) -> AuthState {
        match self.current_user() {
            Some(user) => AuthState::Authenticated(user),
            None => AuthState::Unauthenticated,
        }
    }

    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.live(|s| s.last_active)
    }

    pub fn minutes_until_expiry(&self) -> Option<i64> {
        let now = self.now();
        let timeout = self.inner.settings.inactivity_timeout;
        self.live(|s| s.minutes_until_expiry(now, timeout))
    }

    /// Receive every state change. Replaces reloading the whole front end
    /// on login and logout.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.events.subscribe()
    }

    /// Apply `f` to the session if one exists and has not expired.
    fn live<T>(&self, f: impl FnOnce(&SessionData) -> T) -> Option<T> {
        let now = self.now();
        let timeout = self.inner.settings.inactivity_timeout;
        let state = self.inner.state.lock();
        state
            .session
            .as_ref()
            .filter(|s| !s.is_expired_at(now, timeout))
            .map(f)
    }

    // =========================================================================
    // Activity and expiry
    // =========================================================================

    /// Note one user interaction. The timestamp is persisted at most once
    /// per `activity_write_interval`; later writes wait for the monitor.
    pub fn record_activity(&self, signal: ActivitySignal) {
        let now = self.now();
        let settings = self.inner.settings;
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let expired = match state.session.as_ref() {
            Some(session) => session.is_expired_at(now, settings.inactivity_timeout),
            None => return,
        };
        if expired {
            info!("Activity after inactivity timeout, ending session");
            self.destroy_locked(state, "inactivity");
            return;
        }

        if let Some(session) = state.session.as_mut() {
            session.last_active = now;
        }
        trace!(?signal, "User activity");

        let due = state
            .persisted_at
            .map_or(true, |at| now - at >= settings.activity_write_interval);
        if due {
            self.flush_locked(state, now);
        } else {
            state.dirty = true;
        }
    }

    /// The periodic check. Ends the session if it has been inactive too
    /// long and returns whether it did; otherwise flushes deferred activity.
    pub fn check_expiry(&self) -> bool {
        let now = self.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let expired = match state.session.as_ref() {
            Some(session) => session.is_expired_at(now, self.inner.settings.inactivity_timeout),
            None => return false,
        };
        if expired {
            info!("Session expired after inactivity");
            self.destroy_locked(state, "inactivity");
            return true;
        }
        if state.dirty {
            self.flush_locked(state, now);
        }
        false
    }

    fn has_session(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    // =========================================================================
    // Credential and profile
    // =========================================================================

    /// Trade the current credential for a new one.
    pub async fn refresh_token(&self) -> Result<String, AuthError> {
        let stale = self.token().ok_or_else(AuthError::not_logged_in)?;
        let fresh = self.inner.api.refresh_token(&stale).await?;
        self.replace_token(&stale, fresh)
            .ok_or_else(AuthError::session_expired)
    }

    /// Update profile fields. Fields left as `None` keep their current value.
    pub async fn update_identity(&self, update: ProfileUpdate) -> Result<Identity, AuthError> {
        let (token, current) = self
            .live(|s| (s.token.clone(), s.user.clone()))
            .ok_or_else(AuthError::not_logged_in)?;

        let request = current.profile_request(&update);
        let returned = self
            .inner
            .api
            .update_profile(&token, &request)
            .await
            .map_err(|e| self.rejected(&token, e))?;

        let now = self.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let Some(session) = state.session.as_mut().filter(|s| s.user.id == current.id) else {
            return Err(AuthError::session_expired());
        };

        session.user.absorb(requested_identity(&request));
        session.user.absorb(returned);
        let user = session.user.clone();
        info!(user = %user.username, "Profile updated");

        self.flush_locked(state, now);
        self.inner
            .events
            .send_replace(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Change the password. If the backend rotates the credential, the new
    /// one replaces the old.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        if current.is_empty() || new.is_empty() {
            return Err(AuthError::validation("Please fill in all fields"));
        }
        let token = self.token().ok_or_else(AuthError::not_logged_in)?;
        let rotated = self
            .inner
            .api
            .change_password(&token, current, new)
            .await
            .map_err(|e| self.rejected(&token, e))?;

        if let Some(fresh) = rotated {
            self.replace_token(&token, fresh);
        }
        info!("Password changed");
        Ok(())
    }

    /// Irreversibly delete the account, then end the session.
    pub async fn delete_account(&self) -> Result<(), AuthError> {
        let token = self.token().ok_or_else(AuthError::not_logged_in)?;
        self.inner
            .api
            .delete_account(&token)
            .await
            .map_err(|e| self.rejected(&token, e))?;

        let mut guard = self.inner.state.lock();
        self.destroy_locked(&mut guard, "account deleted");
        Ok(())
    }

    /// Classify a failure of a call made with `token`; a rejected
    /// credential ends the session.
    fn rejected(&self, token: &str, err: ApiError) -> AuthError {
        if err.is_unauthorized() {
            self.invalidate_token(token);
            AuthError::session_expired()
        } else {
            err.into()
        }
    }

    /// Swap `stale` for `fresh` if the session still holds `stale`. Returns
    /// the credential now in effect.
    fn replace_token(&self, stale: &str, fresh: String) -> Option<String> {
        let now = self.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let session = state.session.as_mut()?;
        if session.token != stale {
            debug!("Credential already replaced");
            return Some(session.token.clone());
        }
        session.token = fresh.clone();
        debug!("Credential replaced");
        self.flush_locked(state, now);
        Some(fresh)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn establish(&self, session: SessionData) -> Result<Identity, AuthError> {
        let now = self.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        self.inner
            .store
            .save(&session.to_record())
            .map_err(|e| AuthError::Storage(format!("{:#}", e)))?;

        let user = session.user.clone();
        state.session = Some(session);
        state.persisted_at = Some(now);
        state.dirty = false;

        let running = state.monitor.as_ref().is_some_and(|m| !m.is_finished());
        if !running {
            state.monitor = self.spawn_monitor();
        }

        self.inner
            .events
            .send_replace(AuthState::Authenticated(user.clone()));
        Ok(user)
    }

    fn destroy_locked(&self, state: &mut State, reason: &'static str) {
        let ended = state.session.take();
        state.persisted_at = None;
        state.dirty = false;
        if let Some(monitor) = state.monitor.take() {
            monitor.stop();
        }

        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.inner.events.send_replace(AuthState::Unauthenticated);

        if let Some(session) = ended {
            info!(user = %session.user.username, reason, "Session ended");
        }
    }

    fn flush_locked(&self, state: &mut State, now: DateTime<Utc>) {
        let Some(session) = state.session.as_ref() else {
            return;
        };
        match self.inner.store.save(&session.to_record()) {
            Ok(()) => {
                state.persisted_at = Some(now);
                state.dirty = false;
            }
            Err(e) => warn!(error = %e, "Failed to persist session"),
        }
    }

    fn spawn_monitor(&self) -> Option<MonitorHandle> {
        let weak = Arc::downgrade(&self.inner);
        MonitorHandle::spawn(self.inner.settings.expiry_check_interval, move || {
            let Some(inner) = weak.upgrade() else {
                return TickOutcome::Stop;
            };
            let manager = SessionManager { inner };
            if manager.check_expiry() || !manager.has_session() {
                TickOutcome::Stop
            } else {
                TickOutcome::Continue
            }
        })
    }
}

fn requested_identity(request: &ProfileRequest) -> Identity {
    Identity {
        username: request.username.clone(),
        email: request.email.clone(),
        bio: request.bio.clone(),
        profile_picture: request.profile_picture.clone(),
        ..Identity::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{MemorySessionStore, PersistedSession};
    use crate::clock::ManualClock;
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    /// Nothing listens here; these tests never reach the network.
    const UNREACHABLE: &str = "http://127.0.0.1:9/api";

    fn manager() -> (SessionManager, Arc<MemorySessionStore>, Arc<ManualClock>) {
        let store = Arc::new(MemorySessionStore::new());
        let clock = Arc::new(ManualClock::default());
        let api = ApiClient::new(UNREACHABLE, StdDuration::from_millis(200)).unwrap();
        let manager =
            SessionManager::with_clock(api, store.clone(), SessionSettings::default(), clock.clone());
        (manager, store, clock)
    }

    fn alice() -> Identity {
        Identity::new("u1", "alice", "a@x.com")
    }

    #[test]
    fn test_login_records_and_persists() {
        let (manager, store, clock) = manager();
        manager.login(alice(), "tok123").unwrap();

        assert!(manager.is_authenticated());
        assert_eq!(manager.current_user(), Some(alice()));
        assert_eq!(manager.token().as_deref(), Some("tok123"));

        let record = store.snapshot().unwrap();
        assert_eq!(record.token.as_deref(), Some("tok123"));
        assert_eq!(record.user, Some(alice()));
        assert_eq!(record.last_active, Some(clock.now().timestamp_millis()));
    }

    #[test]
    fn test_login_rejects_empty_token() {
        let (manager, store, _) = manager();
        assert!(matches!(manager.login(alice(), "  "), Err(AuthError::Validation(_))));
        assert!(!manager.is_authenticated());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_login_twice_replaces_session() {
        let (manager, store, _) = manager();
        manager.login(alice(), "tok1").unwrap();
        manager.login(Identity::new("u2", "bob", "b@x.com"), "tok2").unwrap();

        assert_eq!(manager.current_user().unwrap().username, "bob");
        assert_eq!(store.snapshot().unwrap().token.as_deref(), Some("tok2"));
    }

    #[test]
    fn test_expiry_after_31_idle_minutes() {
        let (manager, store, clock) = manager();
        manager.login(alice(), "tok123").unwrap();

        clock.advance(Duration::minutes(29));
        assert!(!manager.check_expiry());
        assert!(manager.is_authenticated());

        clock.advance(Duration::minutes(2));
        assert!(!manager.is_authenticated());
        assert!(manager.check_expiry());
        assert!(store.snapshot().is_none());
        assert!(!manager.check_expiry());
    }

    #[test]
    fn test_activity_keeps_session_alive() {
        let (manager, _, clock) = manager();
        manager.login(alice(), "tok123").unwrap();

        for _ in 0..3 {
            clock.advance(Duration::minutes(20));
            manager.record_activity(ActivitySignal::KeyPress);
        }
        assert!(!manager.check_expiry());
        assert!(manager.is_authenticated());
    }

    #[test]
    fn test_activity_writes_are_rate_limited() {
        let (manager, store, clock) = manager();
        manager.login(alice(), "tok123").unwrap();
        let login_ms = store.snapshot().unwrap().last_active;

        clock.advance(Duration::seconds(1));
        manager.record_activity(ActivitySignal::PointerMove);
        assert_eq!(store.snapshot().unwrap().last_active, login_ms);

        clock.advance(Duration::seconds(1));
        manager.record_activity(ActivitySignal::Scroll);
        assert_eq!(store.snapshot().unwrap().last_active, login_ms);

        // The periodic check flushes what was deferred
        assert!(!manager.check_expiry());
        assert_eq!(
            store.snapshot().unwrap().last_active,
            Some(clock.now().timestamp_millis())
        );

        clock.advance(Duration::seconds(6));
        manager.record_activity(ActivitySignal::Click);
        assert_eq!(
            store.snapshot().unwrap().last_active,
            Some(clock.now().timestamp_millis())
        );
    }

    #[test]
    fn test_activity_ignored_when_logged_out() {
        let (manager, store, _) = manager();
        for signal in ActivitySignal::ALL {
            manager.record_activity(signal);
        }
        assert!(store.snapshot().is_none());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_activity_cannot_revive_expired_session() {
        let (manager, store, clock) = manager();
        manager.login(alice(), "tok123").unwrap();
        clock.advance(Duration::minutes(45));

        manager.record_activity(ActivitySignal::Touch);
        assert!(!manager.is_authenticated());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_invalidate_token_spares_newer_session() {
        let (manager, _, _) = manager();
        manager.login(alice(), "tok-new").unwrap();

        manager.invalidate_token("tok-old");
        assert!(manager.is_authenticated());

        manager.invalidate_token("tok-new");
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let (manager, _, _) = manager();
        let rx = manager.subscribe();
        assert_eq!(*rx.borrow(), AuthState::Unauthenticated);

        manager.login(alice(), "tok123").unwrap();
        assert_eq!(*rx.borrow(), AuthState::Authenticated(alice()));

        manager.invalidate();
        assert_eq!(*rx.borrow(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_restore_clears_incomplete_record() {
        let store = Arc::new(MemorySessionStore::with_record(PersistedSession {
            token: Some("tok123".to_string()),
            user: None,
            last_active: Some(Utc::now().timestamp_millis()),
        }));
        let api = ApiClient::new(UNREACHABLE, StdDuration::from_millis(200)).unwrap();
        let manager = SessionManager::new(api, store.clone(), SessionSettings::default());

        assert_eq!(manager.restore().await, AuthState::Unauthenticated);
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_logout_survives_unreachable_backend() {
        let (manager, store, _) = manager();
        manager.login(alice(), "tok123").unwrap();

        manager.logout().await;
        assert!(!manager.is_authenticated());
        assert!(store.snapshot().is_none());

        manager.logout().await;
        assert!(!manager.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_expires_idle_session() {
        let (manager, store, clock) = manager();
        manager.login(alice(), "tok123").unwrap();

        clock.advance(Duration::minutes(31));
        tokio::time::sleep(StdDuration::from_secs(61)).await;

        assert!(!manager.has_session());
        assert!(store.snapshot().is_none());
    }
}
