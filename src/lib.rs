//! # sql-bridge
//!
//! Correlated async SQL bridge to an isolated `SQLite` executor.
//!
//! A coordinating (async) context issues SQL statements through
//! [`SqlBridge`]; the statements run inside an isolated executor that
//! exclusively owns the database handle. The two sides communicate only via
//! serialized JSON messages tied together by correlation ids, so replies may
//! arrive in any order and still settle the right caller.
//!
//! ## Features
//!
//! - **RPC Bridge**: correlation ids, a pending-operation table, settle-by-id
//! - **Backend Fallback**: durable file-backed storage when a data directory
//!   is usable, transparent fallback to in-memory storage when it is not
//! - **Single-Owner Handle**: one long-lived connection, opened once,
//!   executed against many times, closed exactly once on shutdown

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod backend;
pub mod bridge;
pub mod error;
pub mod executor;
pub mod message;

// Re-export commonly used types at crate root
pub use error::{BridgeError, Error, ExecutorError, Result};

// Re-export backend types
pub use backend::{Backend, BackendConfig, DEFAULT_DB_NAME};

// Re-export bridge and executor types
pub use bridge::SqlBridge;
pub use executor::{Executor, INIT_ACK};

// Re-export wire contracts
pub use message::{Action, Request, RequestId, Response, Row};
