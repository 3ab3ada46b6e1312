use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use herald_core::ports::{Notifier, NotifyError};
use herald_types::events::Event;
use herald_types::models::UserId;

type Listeners = HashMap<Uuid, mpsc::UnboundedSender<Event>>;

/// Tracks every live stream connection and routes events to their user.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id -> sender).
    /// A user may have several connections open at once.
    user_channels: RwLock<HashMap<UserId, Listeners>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`. Returns (conn_id, receiver).
    pub async fn register(&self, user_id: UserId) -> (Uuid, mpsc::UnboundedReceiver<Event>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(conn_id, tx);
        debug!(%user_id, %conn_id, "Stream listener registered");
        (conn_id, rx)
    }

    /// Remove one connection of `user_id`.
    pub async fn unregister(&self, user_id: UserId, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some(listeners) = channels.get_mut(&user_id) {
            listeners.remove(&conn_id);
            if listeners.is_empty() {
                channels.remove(&user_id);
            }
        }
        debug!(%user_id, %conn_id, "Stream listener unregistered");
    }

    /// Number of open connections of `user_id`.
    pub async fn connection_count(&self, user_id: UserId) -> usize {
        self.inner
            .user_channels
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    /// Send an event to every connection of `user_id`. Connections whose
    /// receiver is gone are pruned; returns how many were.
    pub async fn send_to_user(&self, user_id: UserId, event: Event) -> usize {
        let closed: Vec<Uuid> = {
            let channels = self.inner.user_channels.read().await;
            let Some(listeners) = channels.get(&user_id) else {
                return 0;
            };
            listeners
                .iter()
                .filter(|(_, tx)| tx.send(event.clone()).is_err())
                .map(|(conn_id, _)| *conn_id)
                .collect()
        };

        if !closed.is_empty() {
            info!(%user_id, count = closed.len(), "Pruning closed stream listeners");
            for conn_id in &closed {
                self.unregister(user_id, *conn_id).await;
            }
        }
        closed.len()
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn notify(&self, user_id: UserId, event: Event) -> Result<(), NotifyError> {
        match self.send_to_user(user_id, event).await {
            0 => Ok(()),
            dropped => Err(NotifyError::Undelivered { user_id, dropped }),
        }
    }
}
