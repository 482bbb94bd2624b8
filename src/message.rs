//! Wire contracts for the isolation boundary.
//!
//! Requests and responses cross the boundary as JSON; both shapes carry the
//! correlation id that ties a reply back to its originating request. The
//! schema is closed: unrecognized actions still parse (so the dispatcher can
//! answer them with an error response) but are rejected at dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A single result row: column name mapped to a JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Opaque correlation id tying one request to its response.
///
/// Generated as a UUIDv4, which makes ids unique among currently-pending
/// requests (and in practice, globally).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a fresh correlation id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Action code carried by a request.
///
/// `Other` preserves unknown wire values so they reach the dispatcher, which
/// answers them with `"Unknown action"` instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Initialize the storage engine and open the database handle.
    #[serde(rename = "init")]
    Init,
    /// Execute a SQL statement against the open handle.
    #[serde(rename = "exec")]
    Exec,
    /// Any action code the protocol does not define.
    #[serde(untagged)]
    Other(String),
}

/// A request sent from the coordinator to the executor.
///
/// Immutable once created; consumed exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id, echoed back in the response.
    pub id: RequestId,
    /// What the executor should do.
    pub action: Action,
    /// Statement text; present only for `exec`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl Request {
    /// Builds an `init` request.
    #[must_use]
    pub const fn init(id: RequestId) -> Self {
        Self {
            id,
            action: Action::Init,
            sql: None,
        }
    }

    /// Builds an `exec` request for the given statement.
    pub fn exec(id: RequestId, sql: impl Into<String>) -> Self {
        Self {
            id,
            action: Action::Exec,
            sql: Some(sql.into()),
        }
    }
}

/// A response sent from the executor back to the coordinator.
///
/// Exactly one of `result` and `error` is present; the constructors are the
/// only way responses are built, which enforces that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the originating request.
    pub id: RequestId,
    /// Payload on success: a row array for `exec`, an ack string for `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure text on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Builds a success response carrying `result`.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failure response carrying `error`.
    pub fn failure(id: RequestId, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Splits the response into its id and settlement outcome.
    ///
    /// An `error` field wins over `result` if a malformed message somehow
    /// carries both.
    #[must_use]
    pub fn into_settlement(self) -> (RequestId, std::result::Result<Value, String>) {
        let outcome = match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        };
        (self.id, outcome)
    }
}
