use std::sync::Arc;

use herald_core::MessageService;
use herald_db::{Database, SqliteRepository};
use herald_gateway::Dispatcher;

pub type AppState = Arc<AppStateInner>;

/// The message service as wired for the server: SQLite storage, WebSocket fan-out.
pub type Messages = MessageService<SqliteRepository, Dispatcher>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub messages: Messages,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, jwt_secret: String) -> AppState {
        let repository = Arc::new(SqliteRepository::new(Arc::clone(&db)));
        let messages = MessageService::new(repository, Arc::new(dispatcher.clone()));
        Arc::new(Self {
            db,
            messages,
            dispatcher,
            jwt_secret,
        })
    }
}
