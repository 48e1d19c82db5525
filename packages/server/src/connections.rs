//! Live notification connections.
//!
//! Each open event stream registers a bounded channel under its user ID.
//! The manager is owned by [`crate::AppState`] and passed by reference;
//! there is no global registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;

/// Capacity of each connection's channel. Events for a connection that
/// falls this far behind are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// Identifies one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

/// A server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event name.
    pub event: String,
    /// Single-line payload (JSON).
    pub data: String,
}

impl ServerEvent {
    /// Creates a named event with a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be serialized.
    pub fn json(event: &str, payload: &impl serde::Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Encodes the event in `text/event-stream` framing.
    #[must_use]
    pub fn to_frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
}

/// Registry of open event streams keyed by user ID.
#[derive(Default)]
pub struct ConnectionManager {
    next_id: AtomicU64,
    connections: RwLock<BTreeMap<String, Vec<Connection>>>,
}

impl ConnectionManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection for `user_id` and returns the receiving end.
    pub fn register(&self, user_id: &str) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_default()
            .push(Connection { id, sender });

        log::debug!("Registered connection {id:?} for user {user_id}");
        (id, receiver)
    }

    /// Removes a connection. Returns whether it was registered.
    pub fn unregister(&self, user_id: &str, id: ConnectionId) -> bool {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(user_connections) = connections.get_mut(user_id) else {
            return false;
        };

        let before = user_connections.len();
        user_connections.retain(|c| c.id != id);
        let removed = user_connections.len() < before;

        if user_connections.is_empty() {
            connections.remove(user_id);
        }

        if removed {
            log::debug!("Unregistered connection {id:?} for user {user_id}");
        }
        removed
    }

    /// Delivers `event` to every open connection of `user_id`.
    ///
    /// Returns how many connections accepted it. Closed connections are
    /// pruned.
    pub fn send_to(&self, user_id: &str, event: &ServerEvent) -> usize {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(user_connections) = connections.get_mut(user_id) else {
            return 0;
        };

        let delivered = deliver(user_id, user_connections, event);

        if user_connections.is_empty() {
            connections.remove(user_id);
        }
        delivered
    }

    /// Delivers `event` to every open connection.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let delivered = connections
            .iter_mut()
            .map(|(user_id, user_connections)| deliver(user_id, user_connections, event))
            .sum();

        connections.retain(|_, user_connections| !user_connections.is_empty());
        delivered
    }

    /// Number of open connections across all users.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }
}

fn deliver(user_id: &str, connections: &mut Vec<Connection>, event: &ServerEvent) -> usize {
    let mut delivered = 0;

    connections.retain(|connection| match connection.sender.try_send(event.clone()) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            log::warn!(
                "Connection {:?} of user {user_id} is lagging, dropping {} event",
                connection.id,
                event.event
            );
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });

    delivered
}

/// Unregisters a connection when dropped, so a stream that ends for any
/// reason (client disconnect included) leaves nothing behind.
pub struct ConnectionGuard {
    manager: Arc<ConnectionManager>,
    user_id: String,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Ties `id` of `user_id` to the guard's lifetime.
    #[must_use]
    pub const fn new(manager: Arc<ConnectionManager>, user_id: String, id: ConnectionId) -> Self {
        Self {
            manager,
            user_id,
            id,
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.user_id, self.id);
    }
}
