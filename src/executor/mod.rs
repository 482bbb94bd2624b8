//! The isolated executor that owns the database handle.
//!
//! The executor lives on its own thread and is the only code that ever
//! touches the `rusqlite::Connection`. It moves through a small lifecycle
//! (`Uninitialized -> Ready -> Closed`, with initialization transient in
//! between), dispatches incoming requests one at a time in arrival order, and
//! converts every failure into an error response so the message loop can
//! never crash.

use crate::backend::{self, Backend, BackendConfig};
use crate::error::ExecutorError;
use crate::message::{Action, Request, Response, Row};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Number, Value};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

/// Acknowledgement string returned by a successful `init`.
pub const INIT_ACK: &str = "SQLite initialized";

/// Executor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    Closed,
}

/// Owns the single database handle for the lifetime of the isolated context.
///
/// All statement execution is serialized through this one instance; the
/// coordinator never sees the handle.
pub struct Executor {
    config: BackendConfig,
    state: State,
    backend: Option<Backend>,
    handle: Option<Connection>,
}

impl Executor {
    /// Creates an executor in the `Uninitialized` state.
    #[must_use]
    pub const fn new(config: BackendConfig) -> Self {
        Self {
            config,
            state: State::Uninitialized,
            backend: None,
            handle: None,
        }
    }

    /// Returns the backend selected during initialization, if any.
    #[must_use]
    pub const fn backend(&self) -> Option<Backend> {
        self.backend
    }

    /// Returns whether the executor is ready to execute statements.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready)
    }

    /// Initializes the storage engine: selects a backend and opens the
    /// handle.
    ///
    /// Valid only from `Uninitialized`. Backend fallback is not a failure;
    /// only a handle that will not open is. On failure the executor stays
    /// `Uninitialized` so a retry is permitted.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::AlreadyInitialized`] or
    /// [`ExecutorError::Closed`] when called in the wrong state, and
    /// [`ExecutorError::OpenFailed`] when the handle cannot be opened.
    pub fn init(&mut self) -> std::result::Result<&'static str, ExecutorError> {
        match self.state {
            State::Ready => return Err(ExecutorError::AlreadyInitialized),
            State::Closed => return Err(ExecutorError::Closed),
            State::Uninitialized => {}
        }

        let selected = backend::select(&self.config);
        let conn = backend::open(&self.config, selected)?;

        self.backend = Some(selected);
        self.handle = Some(conn);
        self.state = State::Ready;
        info!(backend = ?selected, "executor ready");
        Ok(INIT_ACK)
    }

    /// Runs one statement against the open handle and collects its rows in
    /// order.
    ///
    /// A statement failure surfaces the engine's message but leaves the
    /// handle open and the executor `Ready`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::NotInitialized`] before `init`,
    /// [`ExecutorError::Closed`] after `close`,
    /// [`ExecutorError::DatabaseNotOpened`] if the handle is absent
    /// (defensive), and [`ExecutorError::Statement`] on engine errors.
    pub fn exec(&mut self, sql: &str) -> std::result::Result<Vec<Row>, ExecutorError> {
        match self.state {
            State::Uninitialized => return Err(ExecutorError::NotInitialized),
            State::Closed => return Err(ExecutorError::Closed),
            State::Ready => {}
        }

        let conn = self.handle.as_ref().ok_or(ExecutorError::DatabaseNotOpened)?;
        collect_rows(conn, sql)
    }

    /// Closes the database handle, exactly once.
    ///
    /// Callable from any state and idempotent: closing twice or before
    /// `init` is a no-op, never an error.
    pub fn close(&mut self) {
        if let Some(conn) = self.handle.take() {
            if let Err((_conn, err)) = conn.close() {
                debug!(%err, "database close reported an error");
            }
        }
        self.state = State::Closed;
    }

    /// Dispatches one request, converting any failure into an error
    /// response.
    ///
    /// Unknown actions and malformed requests never alter state.
    pub fn dispatch(&mut self, request: Request) -> Response {
        let Request { id, action, sql } = request;

        let outcome = match action {
            Action::Init => self
                .init()
                .map(|ack| Value::String(ack.to_string())),
            Action::Exec => match sql {
                Some(sql) => self.exec(&sql).map(|rows| {
                    Value::Array(rows.into_iter().map(Value::Object).collect())
                }),
                None => Err(ExecutorError::MissingSql),
            },
            Action::Other(code) => {
                debug!(action = %code, "unknown action");
                Err(ExecutorError::UnknownAction)
            }
        };

        match outcome {
            Ok(result) => Response::success(id, result),
            Err(err) => Response::failure(id, err.to_string()),
        }
    }

    /// The executor's message loop.
    ///
    /// Processes serialized requests in arrival order until the inbound
    /// channel closes, then closes the handle. Malformed inbound messages
    /// are dropped; they carry no id to answer.
    pub fn run(mut self, mut inbound: UnboundedReceiver<String>, outbound: UnboundedSender<String>) {
        while let Some(raw) = inbound.blocking_recv() {
            let request: Request = match serde_json::from_str(&raw) {
                Ok(request) => request,
                Err(err) => {
                    debug!(%err, "dropping malformed request");
                    continue;
                }
            };

            let response = self.dispatch(request);
            match serde_json::to_string(&response) {
                Ok(raw) => {
                    // Coordinator gone; nothing left to answer.
                    if outbound.send(raw).is_err() {
                        break;
                    }
                }
                Err(err) => error!(%err, "failed to serialize response"),
            }
        }
        self.close();
    }
}

/// Executes `sql` and collects every result row as a JSON object.
fn collect_rows(conn: &Connection, sql: &str) -> std::result::Result<Vec<Row>, ExecutorError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Row::new();
        for (index, name) in columns.iter().enumerate() {
            object.insert(name.clone(), json_value(row.get_ref(index)?));
        }
        out.push(object);
    }
    Ok(out)
}

/// Maps a SQLite value to its JSON representation.
fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        // NaN and infinity have no JSON form.
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
    }
}
