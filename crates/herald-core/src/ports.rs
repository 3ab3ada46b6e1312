//! Contracts the message core needs from storage and live delivery.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use herald_types::events::Event;
use herald_types::models::{Application, ApplicationId, Message, MessageId, NewMessage, UserId};

/// Result type for repository operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Any failure of the underlying store. Absence of a row is never a
/// `StorageError`; lookups return `None` or an empty list instead.
#[derive(Debug, Clone, Error)]
#[error("storage failure: {0}")]
pub struct StorageError(Arc<dyn Error + Send + Sync>);

impl StorageError {
    /// Wraps a backend error.
    pub fn new(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(Arc::from(err.into()))
    }
}

/// Message and application persistence.
///
/// Every `*_since` query returns at most `limit` rows ordered by descending
/// id, restricted to ids strictly below `since`. A `since` of zero means no
/// bound, i.e. start at the newest message.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn messages_by_application(&self, app_id: ApplicationId) -> StorageResult<Vec<Message>>;

    async fn messages_by_application_since(
        &self,
        app_id: ApplicationId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>>;

    async fn messages_by_user(&self, user_id: UserId) -> StorageResult<Vec<Message>>;

    async fn messages_by_user_since(
        &self,
        user_id: UserId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>>;

    async fn message_by_id(&self, id: MessageId) -> StorageResult<Option<Message>>;

    async fn application_by_id(&self, id: ApplicationId) -> StorageResult<Option<Application>>;

    async fn application_by_token(&self, token: &str) -> StorageResult<Option<Application>>;

    async fn delete_message_by_id(&self, id: MessageId) -> StorageResult<()>;

    async fn delete_messages_by_application(&self, app_id: ApplicationId) -> StorageResult<()>;

    async fn delete_messages_by_user(&self, user_id: UserId) -> StorageResult<()>;

    /// Persists the message and returns it with its assigned id.
    async fn create_message(&self, message: NewMessage) -> StorageResult<Message>;
}

/// Failure to hand an event to a user's live listeners.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Some listeners had gone away and did not receive the event.
    #[error("{dropped} listener(s) of user {user_id} did not receive the event")]
    Undelivered { user_id: UserId, dropped: usize },

    /// The transport itself failed. The in-process `Dispatcher` never
    /// reports this; it is for notifiers that deliver over a fallible
    /// channel such as a broker or a remote push service.
    #[error("notification transport failure: {0}")]
    Transport(String),
}

/// Delivery of events to every live listener of a user.
///
/// Delivery is best effort. Callers log a returned error and carry on; it
/// never fails the surrounding operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, event: Event) -> Result<(), NotifyError>;
}
