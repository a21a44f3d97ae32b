//! Session record and its persisted schema

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::decoder::{DecodeError, DecodedFields, Field, RowRecord, Shape};
use crate::error::SessionError;
use crate::row::SqlType;

/// Random bytes behind a session token (43 URL-safe characters)
pub const TOKEN_BYTES: usize = 32;

/// Random bytes behind a CSRF token (22 URL-safe characters)
pub const CSRF_BYTES: usize = 16;

/// Default session lifetime: 7 days
pub const DEFAULT_LIFETIME_SECS: i64 = 604_800;

/// Fixed table and column names of the relational backend
///
/// The token column is expected to carry a unique index; creating the table
/// is left to the application's migrations.
pub mod schema {
    /// Sessions table
    pub const TABLE: &str = "_db_sessions";

    // Column names
    pub const ID: &str = "id";
    pub const TOKEN: &str = "token";
    pub const CSRF: &str = "csrf";
    pub const DATA: &str = "data";
    pub const EXPIRES: &str = "expires";
    pub const USER_ID: &str = "user_id";

    /// All columns in insert order
    pub const COLUMNS: [&str; 6] = [ID, TOKEN, CSRF, DATA, EXPIRES, USER_ID];
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a new session token
pub fn generate_token() -> String {
    random_url_safe(TOKEN_BYTES)
}

/// Generate a new CSRF token
pub fn generate_csrf() -> String {
    random_url_safe(CSRF_BYTES)
}

/// One stored session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Stable record id, never reused
    pub id: Uuid,
    /// Opaque lookup key handed to the client
    pub token: String,
    /// Anti-forgery token, rotated with `set_csrf`
    pub csrf: String,
    /// Pre-serialized application payload; the store never looks inside
    pub data: Option<Vec<u8>>,
    /// Logically dead once this instant has passed
    pub expires: DateTime<Utc>,
    /// `None` for anonymous sessions
    pub user_id: Option<Uuid>,
}

impl SessionRecord {
    /// Build a record from create inputs, assigning a fresh id and token
    pub fn new(session: NewSession) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: generate_token(),
            csrf: session.csrf,
            data: session.data,
            expires: session.expires,
            user_id: session.user_id,
        }
    }

    /// Whether `expires` lies strictly before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }

    /// Whether the session is expired right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Apply the fields set in `update`, leaving the rest untouched
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(data) = update.data {
            self.data = Some(data);
        }
        if let Some(expires) = update.expires {
            self.expires = expires;
        }
        if let Some(user_id) = update.user_id {
            self.user_id = Some(user_id);
        }
    }

    /// Deserialize the payload as JSON
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<Option<T>, SessionError> {
        match &self.data {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }
}

/// Serialize a payload for [`SessionRecord::data`]
pub fn encode_data<T: Serialize>(value: &T) -> Result<Vec<u8>, SessionError> {
    Ok(serde_json::to_vec(value)?)
}

impl RowRecord for SessionRecord {
    const SHAPE: Shape = Shape::Keyed(&[
        Field::required("id", schema::ID, SqlType::Uuid),
        Field::required("token", schema::TOKEN, SqlType::Text),
        Field::required("csrf", schema::CSRF, SqlType::Text),
        Field::optional("data", schema::DATA, SqlType::Bytes),
        Field::required("expires", schema::EXPIRES, SqlType::Timestamp),
        Field::optional("user_id", schema::USER_ID, SqlType::Uuid),
    ]);

    fn from_fields(mut fields: DecodedFields) -> Result<Self, DecodeError> {
        Ok(Self {
            id: fields.take("id")?,
            token: fields.take("token")?,
            csrf: fields.take("csrf")?,
            data: fields.take_optional("data")?,
            expires: fields.take("expires")?,
            user_id: fields.take_optional("user_id")?,
        })
    }
}

/// Projection used by CSRF lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CsrfRow {
    pub csrf: String,
}

impl RowRecord for CsrfRow {
    const SHAPE: Shape = Shape::Keyed(&[Field::required("csrf", schema::CSRF, SqlType::Text)]);

    fn from_fields(mut fields: DecodedFields) -> Result<Self, DecodeError> {
        Ok(Self {
            csrf: fields.take("csrf")?,
        })
    }
}

/// Caller-supplied inputs for creating a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Initial CSRF token (default: random)
    pub csrf: String,
    /// Pre-serialized payload (default: none)
    pub data: Option<Vec<u8>>,
    /// Absolute expiry (default: 7 days from now)
    pub expires: DateTime<Utc>,
    /// Bound user (default: anonymous)
    pub user_id: Option<Uuid>,
}

impl Default for NewSession {
    fn default() -> Self {
        Self::expiring_at(Utc::now() + Duration::seconds(DEFAULT_LIFETIME_SECS))
    }
}

impl NewSession {
    /// Anonymous session with a random CSRF token and no payload
    pub fn expiring_at(expires: DateTime<Utc>) -> Self {
        Self {
            csrf: generate_csrf(),
            data: None,
            expires,
            user_id: None,
        }
    }

    /// Set the initial CSRF token
    pub fn with_csrf<S: Into<String>>(mut self, csrf: S) -> Self {
        self.csrf = csrf.into();
        self
    }

    /// Set the pre-serialized payload
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Bind the new session to a user
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Partial update; every `None` leaves the stored field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    /// Replacement payload
    pub data: Option<Vec<u8>>,
    /// New expiry, e.g. when renewing a session
    pub expires: Option<DateTime<Utc>>,
    /// User to bind; use `set_user_id` to unbind
    pub user_id: Option<Uuid>,
}

impl SessionUpdate {
    /// An update that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Move the expiry
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Bind the session to a user
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// True when applying this update would change nothing
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.expires.is_none() && self.user_id.is_none()
    }
}
