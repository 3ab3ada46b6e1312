//! Message pagination, ownership checks and the create/delete lifecycle of
//! the push server, written against storage and notification ports.

pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod memory;
pub mod paging;
pub mod ports;

#[cfg(test)]
mod tests;

pub use error::{NotFound, ServiceError, ServiceResult, ValidationError};
pub use lifecycle::MessageService;
pub use paging::{Page, PagingParams};
pub use ports::{MessageRepository, Notifier, NotifyError, StorageError, StorageResult};
