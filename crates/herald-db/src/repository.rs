//! [`MessageRepository`] backed by the SQLite [`Database`].
//!
//! Every call runs on the blocking pool so the async runtime never waits on
//! the connection lock or disk I/O.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, warn};

use herald_core::ports::{MessageRepository, StorageError, StorageResult};
use herald_types::models::{
    Application, ApplicationId, Extras, Message, MessageId, NewMessage, UserId,
};

use crate::Database;
use crate::models::{ApplicationRow, MessageRow};
use crate::queries::MessageFilter;

#[derive(Clone)]
pub struct SqliteRepository {
    db: Arc<Database>,
}

impl SqliteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StorageError::new(e)
            })?
            .map_err(StorageError::new)
    }
}

#[async_trait]
impl MessageRepository for SqliteRepository {
    async fn messages_by_application(&self, app_id: ApplicationId) -> StorageResult<Vec<Message>> {
        let rows = self
            .blocking(move |db| db.get_messages(MessageFilter::Application(app_id.get())))
            .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn messages_by_application_since(
        &self,
        app_id: ApplicationId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        let rows = self
            .blocking(move |db| {
                db.get_messages_since(MessageFilter::Application(app_id.get()), limit, since.get())
            })
            .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn messages_by_user(&self, user_id: UserId) -> StorageResult<Vec<Message>> {
        let rows = self
            .blocking(move |db| db.get_messages(MessageFilter::User(user_id.get())))
            .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn messages_by_user_since(
        &self,
        user_id: UserId,
        limit: usize,
        since: MessageId,
    ) -> StorageResult<Vec<Message>> {
        let rows = self
            .blocking(move |db| db.get_messages_since(MessageFilter::User(user_id.get()), limit, since.get()))
            .await?;
        rows.into_iter().map(message_from_row).collect()
    }

    async fn message_by_id(&self, id: MessageId) -> StorageResult<Option<Message>> {
        let row = self.blocking(move |db| db.get_message_by_id(id.get())).await?;
        row.map(message_from_row).transpose()
    }

    async fn application_by_id(&self, id: ApplicationId) -> StorageResult<Option<Application>> {
        let row = self.blocking(move |db| db.get_application_by_id(id.get())).await?;
        Ok(row.map(application_from_row))
    }

    async fn application_by_token(&self, token: &str) -> StorageResult<Option<Application>> {
        let token = token.to_string();
        let row = self
            .blocking(move |db| db.get_application_by_token(&token))
            .await?;
        Ok(row.map(application_from_row))
    }

    async fn delete_message_by_id(&self, id: MessageId) -> StorageResult<()> {
        self.blocking(move |db| db.delete_message_by_id(id.get())).await?;
        Ok(())
    }

    async fn delete_messages_by_application(&self, app_id: ApplicationId) -> StorageResult<()> {
        self.blocking(move |db| db.delete_messages(MessageFilter::Application(app_id.get())))
            .await?;
        Ok(())
    }

    async fn delete_messages_by_user(&self, user_id: UserId) -> StorageResult<()> {
        self.blocking(move |db| db.delete_messages(MessageFilter::User(user_id.get())))
            .await?;
        Ok(())
    }

    async fn create_message(&self, message: NewMessage) -> StorageResult<Message> {
        let extras = message
            .extras
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(StorageError::new)?;
        let created_at = message.date.to_rfc3339_opts(SecondsFormat::AutoSi, true);

        let app_id = message.application_id.get();
        let title = message.title.clone();
        let body = message.message.clone();
        let priority = message.priority;
        let id = self
            .blocking(move |db| {
                db.insert_message(app_id, &title, &body, priority, extras.as_deref(), &created_at)
            })
            .await?;

        Ok(message.into_stored(MessageId(id)))
    }
}

fn application_from_row(row: ApplicationRow) -> Application {
    Application {
        id: ApplicationId(row.id),
        user_id: UserId(row.user_id),
        name: row.name,
        description: row.description,
        token: row.token,
    }
}

/// Converts a stored row. Unreadable extras are dropped with a warning; an
/// unreadable date fails the read, since no substitute date is truthful.
fn message_from_row(row: MessageRow) -> StorageResult<Message> {
    let extras = row.extras.as_deref().and_then(|raw| {
        serde_json::from_str::<Extras>(raw)
            .map_err(|e| warn!("Corrupt extras on message '{}': {}", row.id, e))
            .ok()
    });

    let date = row.created_at.parse::<DateTime<Utc>>().map_err(|e| {
        error!("Corrupt created_at '{}' on message '{}': {}", row.created_at, row.id, e);
        StorageError::new(e)
    })?;

    Ok(Message {
        id: MessageId(row.id),
        application_id: ApplicationId(row.application_id),
        title: row.title,
        message: row.message,
        priority: row.priority,
        extras,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    struct Store {
        db: Arc<Database>,
        repository: SqliteRepository,
    }

    #[fixture]
    fn store() -> Store {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Store {
            repository: SqliteRepository::new(Arc::clone(&db)),
            db,
        }
    }

    fn new_message(app_id: i64, title: &str) -> NewMessage {
        NewMessage {
            application_id: ApplicationId(app_id),
            title: title.to_string(),
            message: format!("{title} body"),
            priority: 2,
            extras: None,
            date: Utc::now(),
        }
    }

    async fn seed(store: &Store, app_id: i64, count: usize) -> Vec<Message> {
        let mut stored = Vec::new();
        for n in 0..count {
            stored.push(
                store
                    .repository
                    .create_message(new_message(app_id, &format!("#{n}")))
                    .await
                    .unwrap(),
            );
        }
        stored
    }

    fn ids(messages: &[Message]) -> Vec<i64> {
        messages.iter().map(|m| m.id.get()).collect()
    }

    #[rstest]
    #[tokio::test]
    async fn created_message_round_trips(store: Store) {
        let app = store.db.create_application(7, "Weather Bot", "", "Aweather").unwrap();
        let mut extras = Extras::new();
        extras.insert("client::display".into(), serde_json::json!({"contentType": "text/markdown"}));
        let mut draft = new_message(app.id, "Storm");
        draft.extras = Some(extras);

        let stored = store.repository.create_message(draft).await.unwrap();
        let fetched = store.repository.message_by_id(stored.id).await.unwrap();

        assert_eq!(fetched, Some(stored));
    }

    #[rstest]
    #[tokio::test]
    async fn message_for_missing_application_is_a_storage_error(store: Store) {
        let result = store.repository.create_message(new_message(42, "orphan")).await;
        assert!(result.is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn lookups_of_missing_rows_are_none(store: Store) {
        assert_eq!(store.repository.message_by_id(MessageId(1)).await.unwrap(), None);
        assert_eq!(store.repository.application_by_id(ApplicationId(1)).await.unwrap(), None);
        assert_eq!(store.repository.application_by_token("Anope").await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn resolves_application_by_token_with_owner(store: Store) {
        let row = store.db.create_application(7, "Backups", "nightly", "Abackups").unwrap();

        let app = store
            .repository
            .application_by_token("Abackups")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(app.id, ApplicationId(row.id));
        assert_eq!(app.user_id, UserId(7));
        assert_eq!(app.description, "nightly");
    }

    #[rstest]
    #[tokio::test]
    async fn since_queries_are_newest_first_and_bounded(store: Store) {
        let app = store.db.create_application(1, "CI", "", "Aci").unwrap();
        seed(&store, app.id, 5).await;

        let newest = store
            .repository
            .messages_by_application_since(ApplicationId(app.id), 3, MessageId(0))
            .await
            .unwrap();
        assert_eq!(ids(&newest), vec![5, 4, 3]);

        let older = store
            .repository
            .messages_by_user_since(UserId(1), 3, MessageId(4))
            .await
            .unwrap();
        assert_eq!(ids(&older), vec![3, 2, 1]);
    }

    #[rstest]
    #[tokio::test]
    async fn user_scope_spans_only_own_applications(store: Store) {
        let mine = store.db.create_application(1, "CI", "", "Aci").unwrap();
        let theirs = store.db.create_application(2, "Alarm", "", "Aalarm").unwrap();
        seed(&store, mine.id, 2).await;
        seed(&store, theirs.id, 1).await;
        seed(&store, mine.id, 1).await;

        let all = store.repository.messages_by_user(UserId(1)).await.unwrap();
        assert_eq!(ids(&all), vec![4, 2, 1]);
    }

    #[rstest]
    #[tokio::test]
    async fn deletes_are_scoped(store: Store) {
        let ci = store.db.create_application(1, "CI", "", "Aci").unwrap();
        let cron = store.db.create_application(1, "Cron", "", "Acron").unwrap();
        let alarm = store.db.create_application(2, "Alarm", "", "Aalarm").unwrap();
        let ci_messages = seed(&store, ci.id, 2).await;
        seed(&store, cron.id, 2).await;
        seed(&store, alarm.id, 2).await;

        store.repository.delete_message_by_id(ci_messages[0].id).await.unwrap();
        let ci_left = store
            .repository
            .messages_by_application(ApplicationId(ci.id))
            .await
            .unwrap();
        assert_eq!(ids(&ci_left), vec![2]);

        store
            .repository
            .delete_messages_by_application(ApplicationId(cron.id))
            .await
            .unwrap();
        assert_eq!(ids(&store.repository.messages_by_user(UserId(1)).await.unwrap()), vec![2]);

        store.repository.delete_messages_by_user(UserId(1)).await.unwrap();
        assert!(store.repository.messages_by_user(UserId(1)).await.unwrap().is_empty());
        assert_eq!(ids(&store.repository.messages_by_user(UserId(2)).await.unwrap()), vec![6, 5]);
    }

    #[rstest]
    #[tokio::test]
    async fn unreadable_date_fails_the_read(store: Store) {
        let app = store.db.create_application(1, "CI", "", "Aci").unwrap();
        let id = store
            .db
            .insert_message(app.id, "Build", "green", 0, None, "last tuesday")
            .unwrap();

        assert!(store.repository.message_by_id(MessageId(id)).await.is_err());
        assert!(store.repository.messages_by_user(UserId(1)).await.is_err());
        assert!(
            store
                .repository
                .messages_by_application_since(ApplicationId(app.id), 10, MessageId(0))
                .await
                .is_err()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn deleted_ids_are_never_reused(store: Store) {
        let app = store.db.create_application(1, "CI", "", "Aci").unwrap();
        let first = seed(&store, app.id, 3).await;
        store.repository.delete_messages_by_user(UserId(1)).await.unwrap();

        let next = seed(&store, app.id, 1).await;
        assert!(next[0].id > first[2].id);
    }
}
