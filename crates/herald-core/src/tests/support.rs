//! Test doubles shared by the core test suites.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use herald_types::events::Event;
use herald_types::models::{Application, ApplicationId, Message, MessageId, NewMessage, UserId};

use crate::memory::InMemoryRepository;
use crate::ports::{MessageRepository, Notifier, NotifyError, StorageError, StorageResult};

/// One observable side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Notify(UserId, Event),
    Create(ApplicationId),
    Delete(&'static str),
}

pub type Journal = Arc<Mutex<Vec<Call>>>;

pub fn calls(journal: &Journal) -> Vec<Call> {
    journal.lock().unwrap().clone()
}

/// Notifier that records every event and can be told to fail.
pub struct RecordingNotifier {
    journal: Journal,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new(journal: Journal) -> Self {
        Self { journal, fail: false }
    }

    pub fn failing(journal: Journal) -> Self {
        Self { journal, fail: true }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: UserId, event: Event) -> Result<(), NotifyError> {
        self.journal.lock().unwrap().push(Call::Notify(user_id, event));
        if self.fail {
            return Err(NotifyError::Transport("socket closed".into()));
        }
        Ok(())
    }
}

/// In-memory repository that journals mutations and fails the operations
/// named in `failing`.
pub struct JournalingRepository {
    pub inner: InMemoryRepository,
    journal: Journal,
    failing: HashSet<&'static str>,
}

impl JournalingRepository {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            journal,
            failing: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    fn check(&self, operation: &'static str) -> StorageResult<()> {
        if self.failing.contains(operation) {
            return Err(StorageError::new(format!("{operation}: disk I/O error")));
        }
        Ok(())
    }

    fn record_delete(&self, operation: &'static str) -> StorageResult<()> {
        self.check(operation)?;
        self.journal.lock().unwrap().push(Call::Delete(operation));
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for JournalingRepository {
    async fn messages_by_application(&self, app_id: ApplicationId) -> StorageResult<Vec<Message>> {
        self.check("messages_by_application")?;
        self.inner.messages_by_application(app_id).await
    }

    async fn messages_by_application_since(
        &self,
        app_id: ApplicationId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        self.check("messages_by_application_since")?;
        self.inner.messages_by_application_since(app_id, limit, since).await
    }

    async fn messages_by_user(&self, user_id: UserId) -> StorageResult<Vec<Message>> {
        self.check("messages_by_user")?;
        self.inner.messages_by_user(user_id).await
    }

    async fn messages_by_user_since(
        &self,
        user_id: UserId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        self.check("messages_by_user_since")?;
        self.inner.messages_by_user_since(user_id, limit, since).await
    }

    async fn message_by_id(&self, id: MessageId) -> StorageResult<Option<Message>> {
        self.check("message_by_id")?;
        self.inner.message_by_id(id).await
    }

    async fn application_by_id(&self, id: ApplicationId) -> StorageResult<Option<Application>> {
        self.check("application_by_id")?;
        self.inner.application_by_id(id).await
    }

    async fn application_by_token(&self, token: &str) -> StorageResult<Option<Application>> {
        self.check("application_by_token")?;
        self.inner.application_by_token(token).await
    }

    async fn delete_message_by_id(&self, id: MessageId) -> StorageResult<()> {
        self.record_delete("delete_message_by_id")?;
        self.inner.delete_message_by_id(id).await
    }

    async fn delete_messages_by_application(&self, app_id: ApplicationId) -> StorageResult<()> {
        self.record_delete("delete_messages_by_application")?;
        self.inner.delete_messages_by_application(app_id).await
    }

    async fn delete_messages_by_user(&self, user_id: UserId) -> StorageResult<()> {
        self.record_delete("delete_messages_by_user")?;
        self.inner.delete_messages_by_user(user_id).await
    }

    async fn create_message(&self, message: NewMessage) -> StorageResult<Message> {
        self.check("create_message")?;
        self.journal
            .lock()
            .unwrap()
            .push(Call::Create(message.application_id));
        self.inner.create_message(message).await
    }
}

/// Stores a message with the given title directly, bypassing the service.
pub async fn seed<R: MessageRepository>(repository: &R, app_id: ApplicationId, title: &str) -> Message {
    repository
        .create_message(NewMessage {
            application_id: app_id,
            title: title.to_string(),
            message: format!("body of {title}"),
            priority: 0,
            extras: None,
            date: Utc::now(),
        })
        .await
        .unwrap()
}

/// A bare message with a fixed id, for pure paging tests.
pub fn message(id: i64) -> Message {
    Message {
        id: MessageId(id),
        application_id: ApplicationId(1),
        title: format!("message {id}"),
        message: String::new(),
        priority: 0,
        extras: None,
        date: Utc::now(),
    }
}
