//! Live connection registry and notification fan-out

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::shared::{Notification, Notifier, UserId};

/// Per-connection queue depth; a client this far behind starts losing pushes
const CONNECTION_BUFFER: usize = 64;

type Sessions = HashMap<UserId, HashMap<Uuid, mpsc::Sender<Notification>>>;

/// A registered connection and its notification stream
pub struct Connection {
    pub id: Uuid,
    pub user_id: UserId,
    pub receiver: mpsc::Receiver<Notification>,
}

/// Registry of live realtime connections, several per user
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<Sessions>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user: &UserId) -> Connection {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.entry(user.clone()).or_default().insert(id, tx);
        info!(
            "Realtime connection {} opened for {} ({} open)",
            id,
            user,
            sessions[user].len()
        );
        Connection {
            id,
            user_id: user.clone(),
            receiver: rx,
        }
    }

    pub async fn unregister(&self, user: &UserId, connection_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(connections) = sessions.get_mut(user) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                sessions.remove(user);
            }
        }
        info!("Realtime connection {} closed for {}", connection_id, user);
    }

    pub async fn is_online(&self, user: &UserId) -> bool {
        self.sessions.read().await.contains_key(user)
    }

    /// Number of users with at least one connection
    pub async fn online_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.values().map(HashMap::len).sum()
    }
}

fn deliver(sessions: &Sessions, user: &UserId, notification: &Notification) {
    let Some(connections) = sessions.get(user) else {
        debug!("{} is offline, dropping {}", user, notification.event_type());
        return;
    };
    for (id, tx) in connections {
        if let Err(e) = tx.try_send(notification.clone()) {
            warn!("Dropping {} for connection {}: {}", notification.event_type(), id, e);
        }
    }
}

impl Notifier for SessionRegistry {
    fn notify(&self, user: &UserId, notification: Notification) {
        match self.sessions.try_read() {
            Ok(sessions) => deliver(&sessions, user, &notification),
            Err(_) => {
                // A register/unregister holds the lock; deliver once it is released
                let sessions = self.sessions.clone();
                let user = user.clone();
                tokio::spawn(async move {
                    deliver(&*sessions.read().await, &user, &notification);
                });
            }
        }
    }
}
