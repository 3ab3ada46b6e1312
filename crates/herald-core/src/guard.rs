//! Ownership checks for application- and message-scoped operations.
//!
//! A resource that exists but belongs to someone else is reported exactly
//! like one that does not exist.

use herald_types::models::{Application, ApplicationId, Message, MessageId, UserId};

use crate::error::{NotFound, ServiceResult};
use crate::ports::MessageRepository;

/// Keeps the application only if `user_id` owns it.
pub fn owned_by(application: Option<Application>, user_id: UserId) -> Option<Application> {
    application.filter(|app| app.is_owned_by(user_id))
}

/// Resolves an application the acting user owns.
pub async fn authorize_application<R>(
    repository: &R,
    user_id: UserId,
    app_id: ApplicationId,
) -> ServiceResult<Application>
where
    R: MessageRepository + ?Sized,
{
    let application = repository.application_by_id(app_id).await?;
    owned_by(application, user_id).ok_or_else(|| NotFound::Application.into())
}

/// Resolves a message whose application the acting user owns.
pub async fn authorize_message<R>(
    repository: &R,
    user_id: UserId,
    message_id: MessageId,
) -> ServiceResult<Message>
where
    R: MessageRepository + ?Sized,
{
    let Some(message) = repository.message_by_id(message_id).await? else {
        return Err(NotFound::Message.into());
    };

    let application = repository.application_by_id(message.application_id).await?;
    match owned_by(application, user_id) {
        Some(_) => Ok(message),
        None => Err(NotFound::Message.into()),
    }
}
