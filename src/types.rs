//! Core data model for the RSVP server.
//!
//! Events and users are open records: a handful of typed fields the server
//! manages (`id`, `rsvps`, `email`) plus arbitrary caller-supplied fields
//! captured through `#[serde(flatten)]`. Both collections are persisted as
//! whole JSON arrays under a single store key each.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store key under which the full events collection is persisted.
pub const EVENTS_KEY: &str = "events";

/// Store key under which the full users collection is persisted.
pub const USERS_KEY: &str = "users";

/// Prefix for generated event identifiers.
pub const EVENT_ID_PREFIX: &str = "evt_";

/// The role a bearer credential resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Returns the lowercase name used in API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Returns the identifier prefix applied to users created by this role.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Admin => "admin_",
            Self::User => "user_",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event record.
///
/// The identifier and the RSVP list are owned by the server; everything else
/// (title, date, location, ...) is supplied by the caller and passed through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Generated at creation (`evt_` + epoch milliseconds), never reassigned.
    pub id: String,

    /// RSVP entries, opaque to the server. Initialized empty at creation;
    /// clients update it wholesale via PUT.
    #[serde(default)]
    pub rsvps: Vec<Value>,

    /// Arbitrary caller-supplied fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    /// Builds a new event from caller-supplied fields, assigning a fresh
    /// time-based identifier and an empty RSVP list.
    pub fn create(fields: Map<String, Value>) -> Self {
        Self {
            id: format!("{}{}", EVENT_ID_PREFIX, Utc::now().timestamp_millis()),
            rsvps: Vec::new(),
            fields,
        }
    }

    /// Shallow-merges caller-supplied updates onto this event.
    ///
    /// Updated keys win on collision; keys unique to either side are kept.
    /// The identifier is assigned at creation and never reassigned, so an
    /// `id` key in the updates is ignored. An `rsvps` key replaces the RSVP
    /// list wholesale and must be a JSON array.
    pub fn apply_updates(&mut self, updates: Map<String, Value>) -> Result<(), serde_json::Error> {
        for (key, value) in updates {
            match key.as_str() {
                "id" => {}
                "rsvps" => self.rsvps = serde_json::from_value(value)?,
                _ => {
                    self.fields.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

/// Caller-supplied body for event creation. All fields are open.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Generated at creation (role prefix + epoch milliseconds).
    pub id: String,

    /// Unique across the collection, compared case-insensitively.
    pub email: String,

    /// Arbitrary caller-supplied fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    /// Builds a new user from a registration body, assigning an identifier
    /// prefixed by the creating caller's role.
    pub fn create(new_user: NewUser, role: Role) -> Self {
        Self {
            id: format!("{}{}", role.id_prefix(), Utc::now().timestamp_millis()),
            email: new_user.email,
            fields: new_user.fields,
        }
    }

    /// Returns `true` if this user's email matches `other` case-insensitively.
    pub fn email_matches(&self, other: &str) -> bool {
        self.email.to_lowercase() == other.to_lowercase()
    }
}

/// Caller-supplied body for user registration.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
