//! Subscription groups and fan-out of new uploads.
//!
//! Each realtime connection owns a bounded outbound queue. The notifier
//! keeps one group per session id mapping connection ids to their queue
//! senders. Joining a group and queueing the catch-up snapshot happen under
//! the same group lock that `publish` takes, so a record appended to the
//! registry is either in the snapshot or pushed afterwards, never lost.
//!
//! A member whose queue is full is dropped from its group and told to go
//! away through its eviction signal; on reconnect it gets a fresh snapshot.
//!
//! Lock order is groups, then registry. `SessionRegistry::append_image`
//! only takes the registry lock, so the two never deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::protocol::ServerEvent;
use crate::session::{ImageRecord, SessionRegistry};

pub type ConnectionId = Uuid;

/// Events queued per connection before it counts as too slow
pub const OUTBOUND_CAPACITY: usize = 256;

#[derive(Clone)]
struct Member {
    tx: Sender<ServerEvent>,
    evicted: Arc<Notify>,
}

#[derive(Default)]
struct Groups {
    by_session: HashMap<String, HashMap<ConnectionId, Member>>,
    membership: HashMap<ConnectionId, String>,
}

impl Groups {
    fn remove(&mut self, id: ConnectionId) -> Option<String> {
        let session_id = self.membership.remove(&id)?;
        if let Some(members) = self.by_session.get_mut(&session_id) {
            members.remove(&id);
            if members.is_empty() {
                self.by_session.remove(&session_id);
            }
        }
        Some(session_id)
    }
}

struct Inner {
    registry: Arc<SessionRegistry>,
    groups: Mutex<Groups>,
}

/// Pushes newly uploaded images to the desktop clients of a session.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

impl Notifier {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                groups: Mutex::new(Groups::default()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.inner.registry
    }

    /// Register a new realtime connection. Events for it arrive on the
    /// returned receiver; dropping the `Connection` leaves its group.
    pub fn connect(&self) -> (Connection, Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let connection = Connection {
            id: Uuid::new_v4(),
            member: Member {
                tx,
                evicted: Arc::new(Notify::new()),
            },
            notifier: self.clone(),
        };
        (connection, rx)
    }

    /// Join `session_id`'s group and queue the `init` snapshot, atomically
    /// with respect to `publish`.
    ///
    /// A connection is in at most one group; joining another session moves it.
    pub fn subscribe(&self, connection: &Connection, session_id: &str) {
        let mut groups = self.inner.groups.lock();

        if let Some(previous) = groups.remove(connection.id) {
            debug!(connection = %connection.id, from = %previous, to = %session_id, "connection switched session");
        }

        let snapshot = self.inner.registry.open_session(session_id);
        let count = snapshot.len();
        match connection.member.tx.try_send(ServerEvent::init(snapshot)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection = %connection.id, session = %session_id, "outbound queue full, evicting");
                connection.member.evicted.notify_one();
                return;
            }
            // receiver already gone, nothing to register
            Err(TrySendError::Closed(_)) => return,
        }

        groups
            .by_session
            .entry(session_id.to_string())
            .or_default()
            .insert(connection.id, connection.member.clone());
        groups
            .membership
            .insert(connection.id, session_id.to_string());

        debug!(connection = %connection.id, session = %session_id, images = count, "subscribed");
    }

    /// Queue a `new_image` event for every current member of the group.
    ///
    /// Must only be called after the record was appended to the registry.
    /// Members whose receiver is closed or whose queue is full are dropped
    /// from the group; full ones are also signalled to disconnect.
    /// Returns the number of connections the event was queued for.
    pub fn publish(&self, session_id: &str, record: &ImageRecord) -> usize {
        let mut groups = self.inner.groups.lock();

        let Some(members) = groups.by_session.get(session_id) else {
            trace!(session = %session_id, "publish with no subscribers");
            return 0;
        };

        let event = ServerEvent::new_image(record.clone());
        let mut delivered = 0;
        let mut dropped = Vec::new();
        for (id, member) in members {
            match member.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %id, session = %session_id, "outbound queue full, evicting");
                    member.evicted.notify_one();
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => dropped.push(*id),
            }
        }

        for id in dropped {
            groups.remove(id);
        }

        debug!(session = %session_id, image = %record.id, delivered, "published");
        delivered
    }

    /// Remove a connection from whatever group it belongs to.
    pub fn unsubscribe_all(&self, id: ConnectionId) {
        if let Some(session_id) = self.inner.groups.lock().remove(id) {
            debug!(connection = %id, session = %session_id, "unsubscribed");
        }
    }

    pub fn group_size(&self, session_id: &str) -> usize {
        self.inner
            .groups
            .lock()
            .by_session
            .get(session_id)
            .map_or(0, HashMap::len)
    }

    /// Connections currently subscribed to any session
    pub fn subscriber_count(&self) -> usize {
        self.inner.groups.lock().membership.len()
    }

    pub fn session_of(&self, id: ConnectionId) -> Option<String> {
        self.inner.groups.lock().membership.get(&id).cloned()
    }
}

/// Handle for one realtime connection.
///
/// Dropping it removes the connection from its group, so cleanup runs
/// however the socket task ends.
pub struct Connection {
    id: ConnectionId,
    member: Member,
    notifier: Notifier,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for this connection only. Fails if the queue is
    /// full or the receiver is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.member.tx.try_send(event).is_ok()
    }

    /// Resolves once the notifier dropped this connection for not keeping
    /// up. The socket should then be closed.
    pub async fn evicted(&self) {
        self.member.evicted.notified().await;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.notifier.unsubscribe_all(self.id);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}
