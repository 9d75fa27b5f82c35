//! The authenticated user's identity and profile updates.

use serde::{Deserialize, Serialize};

/// A user identity as returned by the auth endpoints.
///
/// The backend sends either `id`, `_id`, or both. On ingest `id` is filled
/// from whichever is present; on output both keys are written so older
/// persisted records stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IdentityWire", into = "IdentityWire")]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// An identity with neither id nor username carries nothing usable.
    pub fn is_blank(&self) -> bool {
        self.id.is_empty() && self.username.is_empty()
    }

    /// Merge a server-returned identity into this one. Empty strings and
    /// missing optionals in `other` never erase what we already know.
    pub fn absorb(&mut self, other: Identity) {
        if !other.id.is_empty() {
            self.id = other.id;
        }
        if !other.username.is_empty() {
            self.username = other.username;
        }
        if !other.email.is_empty() {
            self.email = other.email;
        }
        if other.bio.is_some() {
            self.bio = other.bio;
        }
        if other.profile_picture.is_some() {
            self.profile_picture = other.profile_picture;
        }
        self.is_admin = self.is_admin || other.is_admin;
    }

    /// Build the full profile payload: fields present in `update` win,
    /// the rest come from the current identity.
    pub fn profile_request(&self, update: &ProfileUpdate) -> ProfileRequest {
        ProfileRequest {
            username: update.username.clone().unwrap_or_else(|| self.username.clone()),
            email: update.email.clone().unwrap_or_else(|| self.email.clone()),
            bio: update.bio.clone().or_else(|| self.bio.clone()),
            profile_picture: update
                .profile_picture
                .clone()
                .or_else(|| self.profile_picture.clone()),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IdentityWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    legacy_id: Option<String>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(rename = "profilePicture", default, skip_serializing_if = "Option::is_none")]
    profile_picture: Option<String>,
    #[serde(rename = "isAdmin", default)]
    is_admin: bool,
}

impl From<IdentityWire> for Identity {
    fn from(wire: IdentityWire) -> Self {
        let id = wire
            .id
            .filter(|id| !id.is_empty())
            .or(wire.legacy_id)
            .unwrap_or_default();
        Self {
            id,
            username: wire.username,
            email: wire.email,
            bio: wire.bio,
            profile_picture: wire.profile_picture,
            is_admin: wire.is_admin,
        }
    }
}

impl From<Identity> for IdentityWire {
    fn from(identity: Identity) -> Self {
        let id = (!identity.id.is_empty()).then_some(identity.id);
        Self {
            legacy_id: id.clone(),
            id,
            username: identity.username,
            email: identity.email,
            bio: identity.bio,
            profile_picture: identity.profile_picture,
            is_admin: identity.is_admin,
        }
    }
}

/// Partial profile edit. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
    }
}

/// Body of `PUT /auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRequest {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}
