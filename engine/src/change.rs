//! Change records submitted by clients.
//!
//! A change is a full-document upsert or a delete of a single record. Clients
//! send them loosely typed JSON; [`ChangeRecord::from_value`] is the one place
//! where that JSON is checked and coerced into a typed change.

use crate::{error::Result, ClientId, Error, RecordId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Client id used when a change does not name its origin.
pub const DEFAULT_CLIENT_ID: &str = "client";

/// Version assumed when a change does not carry one.
pub const DEFAULT_VERSION: Version = 1;

/// Kind of mutation carried by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Create or fully replace the record
    Upsert,
    /// Tombstone the record
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Upsert => "upsert",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upsert" => Ok(ChangeType::Upsert),
            "delete" => Ok(ChangeType::Delete),
            other => Err(Error::UnknownChangeType(other.to_string())),
        }
    }
}

/// A single client-originated mutation.
///
/// `timestamp` is the client's clock in milliseconds. It orders changes and
/// breaks ties; it is never trusted for anything beyond last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Identity of the record being changed
    pub id: RecordId,
    /// Upsert or delete
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Full replacement document (upserts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    /// Client-side version of the record
    pub version: Version,
    /// Originating client
    pub client_id: ClientId,
    /// Client timestamp in milliseconds
    pub timestamp: Timestamp,
}

impl ChangeRecord {
    /// Create an upsert change.
    pub fn upsert(
        id: impl Into<RecordId>,
        doc: Value,
        version: Version,
        client_id: impl Into<ClientId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            change_type: ChangeType::Upsert,
            doc: Some(doc),
            version,
            client_id: client_id.into(),
            timestamp,
        }
    }

    /// Create a delete change.
    pub fn delete(
        id: impl Into<RecordId>,
        version: Version,
        client_id: impl Into<ClientId>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            change_type: ChangeType::Delete,
            doc: None,
            version,
            client_id: client_id.into(),
            timestamp,
        }
    }

    /// Asset URL carried by the document, if any.
    pub fn url(&self) -> Option<&str> {
        match self.change_type {
            ChangeType::Upsert => self.doc.as_ref()?.get("url")?.as_str(),
            ChangeType::Delete => None,
        }
    }

    /// Check the invariants every applied change must hold.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::EmptyRecordId);
        }
        if self.timestamp < 0 {
            return Err(Error::invalid("timestamp", "must not be negative"));
        }
        if self.change_type == ChangeType::Upsert {
            match &self.doc {
                Some(Value::Object(_)) => {}
                Some(_) => return Err(Error::invalid("doc", "expected an object")),
                None => return Err(Error::MissingDocument),
            }
        }
        Ok(())
    }

    /// Parse a change from loosely typed JSON.
    ///
    /// Coercion rules:
    /// - `id`: string, or a number rendered as a string; must be non-empty
    /// - `type`: `"upsert"` or `"delete"`, defaults to upsert
    /// - `doc`: object, required for upserts, dropped for deletes
    /// - `version`: non-negative integer, defaults to [`DEFAULT_VERSION`]
    /// - `clientId`: string, defaults to [`DEFAULT_CLIENT_ID`] when absent or empty
    /// - `timestamp`: non-negative integer milliseconds, defaults to `now`
    pub fn from_value(value: &Value, now: Timestamp) -> Result<Self> {
        let obj = value.as_object().ok_or(Error::NotAnObject)?;
        let field = |name: &str| obj.get(name).filter(|v| !v.is_null());

        let id = match field("id") {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(Error::invalid("id", "expected a string")),
        };

        let change_type = match field("type") {
            None => ChangeType::Upsert,
            Some(Value::String(s)) => s.parse()?,
            Some(_) => return Err(Error::invalid("type", "expected a string")),
        };

        let doc = match change_type {
            ChangeType::Upsert => field("doc").cloned(),
            ChangeType::Delete => None,
        };

        let version = match field("version") {
            None => DEFAULT_VERSION,
            Some(v) => non_negative_integer(v)
                .ok_or_else(|| Error::invalid("version", "expected a non-negative integer"))?,
        };

        let client_id = match field("clientId") {
            None => DEFAULT_CLIENT_ID.to_string(),
            Some(Value::String(s)) if s.is_empty() => DEFAULT_CLIENT_ID.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(Error::invalid("clientId", "expected a string")),
        };

        let timestamp = match field("timestamp") {
            None => now,
            Some(v) => non_negative_integer(v)
                .and_then(|ts| Timestamp::try_from(ts).ok())
                .ok_or_else(|| {
                    Error::invalid("timestamp", "expected non-negative integer milliseconds")
                })?,
        };

        let change = Self {
            id,
            change_type,
            doc,
            version,
            client_id,
            timestamp,
        };
        change.validate()?;
        Ok(change)
    }
}

/// Accepts `3` and `3.0`, rejects `-1`, `2.5` and non-numbers.
fn non_negative_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}
