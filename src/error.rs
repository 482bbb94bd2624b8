//! Error types for SQL bridge operations.
//!
//! This module provides the error hierarchy using `thiserror` for both sides
//! of the isolation boundary: the coordinator-side bridge and the
//! executor-side dispatch and backend selection.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for all bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Coordinator-side transport errors.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Executor-side dispatch and statement errors.
    #[error("{0}")]
    Executor(#[from] ExecutorError),

    /// Durable-backend probing errors (non-fatal; reported via fallback).
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An error string carried back across the boundary in a response.
    ///
    /// The executor serializes its failures to plain text; on the
    /// coordinator side they surface through this variant.
    #[error("{0}")]
    Remote(String),
}

/// Coordinator-side errors raised by the RPC bridge itself.
///
/// These cover the transport to the executor, never SQL semantics.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The executor's inbound channel is closed (thread gone or shut down).
    #[error("executor unavailable: channel closed")]
    ExecutorUnavailable,

    /// The reply channel was dropped before a response was settled.
    #[error("reply channel dropped before settlement")]
    ReplyDropped,

    /// The executor thread could not be spawned.
    #[error("failed to spawn executor thread: {0}")]
    SpawnFailed(String),

    /// A request could not be serialized for transport.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// A correlation id was registered while still pending.
    ///
    /// Violates the at-most-one-outstanding-callback-per-id invariant.
    #[error("correlation id already pending: {id}")]
    IdAlreadyPending {
        /// The offending correlation id.
        id: String,
    },
}

/// Executor-side errors converted into error responses at the dispatch
/// boundary.
///
/// Display strings are the wire-visible error text, so the fixed messages
/// (`Unknown action`, `SQLite not initialized`, `Database not opened`) must
/// not change.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The storage engine was never initialized.
    #[error("SQLite not initialized")]
    NotInitialized,

    /// No database handle is open (defensive; unreachable when the state
    /// machine is respected).
    #[error("Database not opened")]
    DatabaseNotOpened,

    /// `init` received while the executor is already `Ready`.
    #[error("already initialized")]
    AlreadyInitialized,

    /// `init` or `exec` received after `close`.
    #[error("executor closed")]
    Closed,

    /// The request carried an action code the dispatcher does not know.
    #[error("Unknown action")]
    UnknownAction,

    /// An `exec` request arrived without a SQL payload.
    #[error("exec request missing sql")]
    MissingSql,

    /// The database handle could not be opened.
    #[error("failed to open database: {0}")]
    OpenFailed(String),

    /// A statement failed inside the engine (malformed SQL, constraint
    /// violation). Carries the engine's message verbatim.
    #[error("{0}")]
    Statement(String),
}

/// Errors from durable-backend mount and verification probes.
///
/// These never propagate out of initialization; the backend selector logs
/// them and falls back to transient storage.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The durable location could not be mounted (directory creation failed).
    #[error("failed to mount durable backend at {path}: {reason}")]
    MountFailed {
        /// Durable directory that failed to mount.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The mounted backend failed its read/write verification probe.
    #[error("durable backend verification failed at {path}: {reason}")]
    VerifyFailed {
        /// Durable directory that failed verification.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },
}

impl From<rusqlite::Error> for ExecutorError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Statement(err.to_string())
    }
}
