//! In-memory repository for tests and local experiments.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use herald_types::models::{Application, ApplicationId, Message, MessageId, NewMessage, UserId};

use crate::ports::{MessageRepository, StorageError, StorageResult};

/// Thread-safe in-memory store. Message ids come from a counter that only
/// moves forward, so deleted ids are never handed out again.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    applications: HashMap<ApplicationId, Application>,
    messages: BTreeMap<MessageId, Message>,
    last_application_id: i64,
    last_message_id: i64,
}

impl State {
    fn application_ids_of(&self, user_id: UserId) -> Vec<ApplicationId> {
        self.applications
            .values()
            .filter(|app| app.is_owned_by(user_id))
            .map(|app| app.id)
            .collect()
    }

    /// Messages matching `keep`, newest first.
    fn newest_first(&self, keep: impl Fn(&Message) -> bool) -> impl Iterator<Item = &Message> {
        self.messages.values().rev().filter(move |&m| keep(m))
    }
}

fn below(since: MessageId, id: MessageId) -> bool {
    since.get() == 0 || id < since
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an application for `user_id`.
    pub fn add_application(&self, user_id: UserId, name: &str, token: &str) -> StorageResult<Application> {
        let mut state = self.write()?;
        state.last_application_id += 1;
        let application = Application {
            id: ApplicationId(state.last_application_id),
            user_id,
            name: name.to_string(),
            description: String::new(),
            token: token.to_string(),
        };
        state.applications.insert(application.id, application.clone());
        Ok(application)
    }

    /// Number of stored messages.
    pub fn message_count(&self) -> StorageResult<usize> {
        Ok(self.read()?.messages.len())
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|err| StorageError::new(err.to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|err| StorageError::new(err.to_string()))
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository {
    async fn messages_by_application(&self, app_id: ApplicationId) -> StorageResult<Vec<Message>> {
        let state = self.read()?;
        Ok(state
            .newest_first(|m| m.application_id == app_id)
            .cloned()
            .collect())
    }

    async fn messages_by_application_since(
        &self,
        app_id: ApplicationId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        let state = self.read()?;
        Ok(state
            .newest_first(|m| m.application_id == app_id && below(since, m.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn messages_by_user(&self, user_id: UserId) -> StorageResult<Vec<Message>> {
        let state = self.read()?;
        let app_ids = state.application_ids_of(user_id);
        Ok(state
            .newest_first(|m| app_ids.contains(&m.application_id))
            .cloned()
            .collect())
    }

    async fn messages_by_user_since(
        &self,
        user_id: UserId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        let state = self.read()?;
        let app_ids = state.application_ids_of(user_id);
        Ok(state
            .newest_first(|m| app_ids.contains(&m.application_id) && below(since, m.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn message_by_id(&self, id: MessageId) -> StorageResult<Option<Message>> {
        Ok(self.read()?.messages.get(&id).cloned())
    }

    async fn application_by_id(&self, id: ApplicationId) -> StorageResult<Option<Application>> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    async fn application_by_token(&self, token: &str) -> StorageResult<Option<Application>> {
        let state = self.read()?;
        Ok(state
            .applications
            .values()
            .find(|app| app.token == token)
            .cloned())
    }

    async fn delete_message_by_id(&self, id: MessageId) -> StorageResult<()> {
        self.write()?.messages.remove(&id);
        Ok(())
    }

    async fn delete_messages_by_application(&self, app_id: ApplicationId) -> StorageResult<()> {
        self.write()?
            .messages
            .retain(|_, m| m.application_id != app_id);
        Ok(())
    }

    async fn delete_messages_by_user(&self, user_id: UserId) -> StorageResult<()> {
        let mut state = self.write()?;
        let app_ids = state.application_ids_of(user_id);
        state
            .messages
            .retain(|_, m| !app_ids.contains(&m.application_id));
        Ok(())
    }

    async fn create_message(&self, message: NewMessage) -> StorageResult<Message> {
        let mut state = self.write()?;
        if !state.applications.contains_key(&message.application_id) {
            return Err(StorageError::new(format!(
                "application {} does not exist",
                message.application_id
            )));
        }

        state.last_message_id += 1;
        let stored = message.into_stored(MessageId(state.last_message_id));
        state.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
