//! Coordinator-side RPC bridge.
//!
//! [`SqlBridge`] is the only way application code reaches the isolated
//! executor. Every operation is assigned a fresh correlation id, registered
//! in the pending table, serialized to JSON, and posted across the boundary;
//! a background reader task settles callers by id as replies arrive, in
//! whatever order the executor produces them.
//!
//! There is deliberately no cancellation and no timeout: once sent, a
//! request runs to completion or failure, and callers decide whether to
//! retry.

mod pending;

use crate::backend::BackendConfig;
use crate::error::{BridgeError, Error, Result};
use crate::executor::Executor;
use crate::message::{Request, RequestId, Response, Row};
use pending::PendingTable;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::debug;

/// Handle to an isolated SQL executor.
///
/// Cheap operations (`init`, `execute_sql`) may be issued concurrently; each
/// settles independently by its own correlation id. Dropping the bridge (or
/// calling [`SqlBridge::shutdown`]) closes the boundary channel, which makes
/// the executor close its database handle and exit.
///
/// # Examples
///
/// ```no_run
/// use sql_bridge::{BackendConfig, SqlBridge};
///
/// # async fn demo() -> sql_bridge::Result<()> {
/// let bridge = SqlBridge::connect(BackendConfig::transient())?;
/// bridge.init().await?;
/// let rows = bridge.execute_sql("SELECT 1 AS one").await?;
/// assert_eq!(rows.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct SqlBridge {
    outbound: Option<mpsc::UnboundedSender<String>>,
    pending: Arc<PendingTable>,
    executor_thread: Option<thread::JoinHandle<()>>,
}

impl SqlBridge {
    /// Spawns the executor thread and the reply-reader task.
    ///
    /// Must be called from within a Tokio runtime (the reader is a spawned
    /// task). The executor starts `Uninitialized`; call
    /// [`SqlBridge::init`] before executing statements.
    ///
    /// # Errors
    ///
    /// Returns an error if the executor thread cannot be spawned.
    pub fn connect(config: BackendConfig) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        let executor = Executor::new(config);
        let executor_thread = thread::Builder::new()
            .name("sql-executor".to_string())
            .spawn(move || executor.run(request_rx, reply_tx))
            .map_err(|e| BridgeError::SpawnFailed(e.to_string()))?;

        let pending = Arc::new(PendingTable::new());
        tokio::spawn(read_replies(reply_rx, Arc::clone(&pending)));

        Ok(Self {
            outbound: Some(request_tx),
            pending,
            executor_thread: Some(executor_thread),
        })
    }

    /// Initializes the executor's storage engine.
    ///
    /// Resolves to the engine's acknowledgement string. Backend fallback to
    /// transient storage is transparent here; only a handle that will not
    /// open surfaces as an error, and a retry is permitted.
    ///
    /// # Errors
    ///
    /// Returns the executor's failure reason, or a transport error if the
    /// executor is gone.
    pub async fn init(&self) -> Result<String> {
        let value = self.send(Request::init(RequestId::fresh())).await?;
        match value {
            Value::String(ack) => Ok(ack),
            other => Ok(other.to_string()),
        }
    }

    /// Executes one SQL statement and resolves to its ordered result rows.
    ///
    /// Zero rows is a normal outcome for non-query statements. A statement
    /// failure rejects only this call; the executor stays usable.
    ///
    /// # Errors
    ///
    /// Returns the engine's error text for failed statements, or a
    /// transport error if the executor is gone.
    pub async fn execute_sql(&self, sql: &str) -> Result<Vec<Row>> {
        let value = self.send(Request::exec(RequestId::fresh(), sql)).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::Remote(format!("malformed result payload: {e}")))
    }

    /// Number of requests currently awaiting a reply.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Sends one request across the boundary and awaits its settlement.
    ///
    /// Exactly one message is posted per call, and exactly one settlement
    /// removes the pending entry.
    async fn send(&self, request: Request) -> Result<Value> {
        let id = request.id.clone();
        let receiver = self.pending.register(&id)?;

        let raw = match serde_json::to_string(&request) {
            Ok(raw) => raw,
            Err(e) => {
                self.pending.discard(&id);
                return Err(BridgeError::Encode(e.to_string()).into());
            }
        };

        let posted = self
            .outbound
            .as_ref()
            .is_some_and(|outbound| outbound.send(raw).is_ok());
        if !posted {
            self.pending.discard(&id);
            return Err(BridgeError::ExecutorUnavailable.into());
        }

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(BridgeError::ReplyDropped.into()),
        }
    }

    /// Shuts the bridge down, closing the executor's database handle.
    ///
    /// Equivalent to dropping the bridge, but joins the executor thread so
    /// the handle is known to be closed on return.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Closing the request channel ends the executor loop, which closes
        // the database handle on its way out.
        self.outbound.take();
        if let Some(handle) = self.executor_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SqlBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Drains the executor's replies, settling pending callers by id.
///
/// Malformed or unmatched replies are dropped without effect; there is no
/// pending caller to notify, and the condition is not fatal.
async fn read_replies(mut inbound: mpsc::UnboundedReceiver<String>, pending: Arc<PendingTable>) {
    while let Some(raw) = inbound.recv().await {
        let response: Response = match serde_json::from_str(&raw) {
            Ok(response) => response,
            Err(err) => {
                debug!(%err, "dropping malformed reply");
                continue;
            }
        };

        let (id, outcome) = response.into_settlement();
        if !pending.settle(&id, outcome.map_err(Error::Remote)) {
            debug!(%id, "dropping reply with no pending request");
        }
    }
}
