//! Message lifecycle: listing, creation and deletion, each paired with a
//! notification to the owner's live listeners.
//!
//! Creation persists first and notifies only once the message is stored.
//! Deletion snapshots the affected messages, notifies, and only then deletes,
//! because the messages cannot be read back afterwards.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use herald_types::api::CreateMessageRequest;
use herald_types::events::Event;
use herald_types::models::{ApplicationId, Message, MessageId, NewMessage, UserId};

use crate::error::{ServiceError, ServiceResult, ValidationError};
use crate::guard::{authorize_application, authorize_message};
use crate::paging::{Page, PageScope, PagingParams, fetch_page};
use crate::ports::{MessageRepository, Notifier, StorageResult};

/// Coordinates the repository and the notifier for every message operation.
pub struct MessageService<R, N>
where
    R: MessageRepository,
    N: Notifier,
{
    repository: Arc<R>,
    notifier: Arc<N>,
}

impl<R, N> Clone for MessageService<R, N>
where
    R: MessageRepository,
    N: Notifier,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<R, N> MessageService<R, N>
where
    R: MessageRepository,
    N: Notifier,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Pages through every message the user can see.
    pub async fn list_messages(&self, user_id: UserId, params: PagingParams) -> ServiceResult<Page> {
        Ok(fetch_page(&*self.repository, PageScope::User(user_id), params).await?)
    }

    /// Pages through the messages of one of the user's applications.
    pub async fn list_application_messages(
        &self,
        user_id: UserId,
        app_id: ApplicationId,
        params: PagingParams,
    ) -> ServiceResult<Page> {
        authorize_application(&*self.repository, user_id, app_id).await?;
        Ok(fetch_page(&*self.repository, PageScope::Application(app_id), params).await?)
    }

    /// Stores a message posted by the application holding `token` and pushes
    /// it to the application owner.
    ///
    /// A blank title is replaced by the application name.
    pub async fn create_message(
        &self,
        token: &str,
        request: CreateMessageRequest,
    ) -> ServiceResult<Message> {
        if request.message.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let application = self
            .repository
            .application_by_token(token)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        let new_message = NewMessage {
            application_id: application.id,
            title: resolve_title(request.title, &application.name),
            message: request.message,
            priority: request.priority.unwrap_or(0),
            extras: request.extras,
            date: Utc::now(),
        };

        let stored = self.repository.create_message(new_message).await?;
        info!(
            message_id = %stored.id,
            app_id = %application.id,
            "Message created"
        );

        self.notify(application.user_id, Event::created(stored.clone())).await;
        Ok(stored)
    }

    /// Deletes one message of the acting user.
    pub async fn delete_message(&self, user_id: UserId, message_id: MessageId) -> ServiceResult<()> {
        let message = authorize_message(&*self.repository, user_id, message_id).await?;

        self.notify_deleted(user_id, vec![message]).await;
        let result = self.repository.delete_message_by_id(message_id).await;
        finish_delete(result, 1, "message")
    }

    /// Deletes every message of one of the acting user's applications.
    pub async fn delete_application_messages(
        &self,
        user_id: UserId,
        app_id: ApplicationId,
    ) -> ServiceResult<()> {
        authorize_application(&*self.repository, user_id, app_id).await?;
        let messages = self.repository.messages_by_application(app_id).await?;
        let count = messages.len();

        self.notify_deleted(user_id, messages).await;
        let result = self.repository.delete_messages_by_application(app_id).await;
        finish_delete(result, count, "application")
    }

    /// Deletes every message of the acting user.
    pub async fn delete_all_messages(&self, user_id: UserId) -> ServiceResult<()> {
        let messages = self.repository.messages_by_user(user_id).await?;
        let count = messages.len();

        self.notify_deleted(user_id, messages).await;
        let result = self.repository.delete_messages_by_user(user_id).await;
        finish_delete(result, count, "user")
    }

    /// First phase of every delete: announce the snapshot to listeners.
    async fn notify_deleted(&self, user_id: UserId, messages: Vec<Message>) {
        self.notify(user_id, Event::deleted(messages)).await;
    }

    async fn notify(&self, user_id: UserId, event: Event) {
        let kind = event.kind();
        match self.notifier.notify(user_id, event).await {
            Ok(()) => debug!(%user_id, kind, "Event delivered"),
            Err(err) => warn!(%user_id, kind, "Event delivery failed: {}", err),
        }
    }
}

/// Second phase outcome. The deletion event has already gone out, so a
/// failure here is reported but cannot be taken back.
fn finish_delete(result: StorageResult<()>, count: usize, scope: &str) -> ServiceResult<()> {
    match result {
        Ok(()) => {
            info!(count, scope, "Messages deleted");
            Ok(())
        }
        Err(err) => {
            error!(count, scope, "Delete failed after deletion event was sent: {}", err);
            Err(err.into())
        }
    }
}

/// Picks the stored title: the requested one unless blank, else the
/// application name.
pub fn resolve_title(requested: Option<String>, application_name: &str) -> String {
    match requested {
        Some(title) if !title.trim().is_empty() => title,
        _ => application_name.to_string(),
    }
}
