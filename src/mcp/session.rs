//! Session registry for MCP clients
//!
//! Sessions are created by `initialize`, resumed by echoing the
//! `Mcp-Session-Id` value, and destroyed when the transport closes. Closed ids
//! are retired and never handed out again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{GatewayError, Result};

/// Session identifier
pub type SessionId = String;

/// Capacity of each session's server-push channel
const PUSH_CHANNEL_CAPACITY: usize = 64;

/// Client identity reported in `initialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A live client session
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    client: Mutex<Option<ClientInfo>>,
    /// Server-push channel feeding the session's SSE stream
    tx: broadcast::Sender<Value>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        let (tx, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        Self {
            id,
            created_at: Utc::now(),
            client: Mutex::new(None),
            tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn client(&self) -> Option<ClientInfo> {
        self.client.lock().clone()
    }

    pub fn set_client(&self, info: ClientInfo) {
        *self.client.lock() = Some(info);
    }

    /// Push a JSON-RPC notification to any attached stream
    pub fn notify(&self, message: Value) {
        // No subscribers is fine: the client simply has no stream open
        let _ = self.tx.send(message);
    }

    /// Attach to the server-push channel
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("client", &self.client())
            .finish()
    }
}

type IdSource = Box<dyn Fn() -> SessionId + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    live: HashMap<SessionId, Arc<Session>>,
    retired: HashSet<SessionId>,
}

/// Maps session ids to live sessions
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
    id_source: IdSource,
}

impl SessionRegistry {
    /// Create a registry issuing UUID v4 ids
    pub fn new() -> Self {
        Self::with_id_source(|| Uuid::new_v4().to_string())
    }

    /// Create a registry with a custom id generator
    pub fn with_id_source(source: impl Fn() -> SessionId + Send + Sync + 'static) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            id_source: Box::new(source),
        }
    }

    /// Resume the session named by `requested`, or create one when no id was
    /// sent and the message is an initialization request
    pub fn open(&self, requested: Option<&str>, initialize: bool) -> Result<Arc<Session>> {
        match requested {
            Some(id) => self.lookup(id),
            None if initialize => Ok(self.create()),
            None => Err(GatewayError::InvalidSession(None)),
        }
    }

    /// Find a live session
    pub fn lookup(&self, id: &str) -> Result<Arc<Session>> {
        self.state
            .read()
            .live
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidSession(Some(id.to_string())))
    }

    /// Remove a session and retire its id. Returns whether it was live.
    pub fn close(&self, id: &str) -> bool {
        let mut state = self.state.write();
        match state.live.remove(id) {
            Some(session) => {
                state.retired.insert(id.to_string());
                let age = Utc::now() - session.created_at();
                tracing::info!("Session closed: {} (open {}s)", id, age.num_seconds());
                true
            }
            None => false,
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.state.read().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create(&self) -> Arc<Session> {
        // Generation, collision check and insert happen under one write lock
        let mut state = self.state.write();
        let id = loop {
            let candidate = (self.id_source)();
            if !state.live.contains_key(&candidate) && !state.retired.contains(&candidate) {
                break candidate;
            }
            tracing::warn!("Discarding session id already in use: {}", candidate);
        };
        let session = Arc::new(Session::new(id.clone()));
        state.live.insert(id, session.clone());
        tracing::info!("New session initialized: {}", session.id());
        session
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
