use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form JSON object attached to a message by the posting application.
pub type Extras = serde_json::Map<String, serde_json::Value>;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a user. Users own applications; authentication happens
    /// outside this crate and only the resolved id travels inward.
    UserId
);

id_type!(
    /// Identity of an application.
    ApplicationId
);

id_type!(
    /// Identity of a message. Strictly increasing in creation order and never
    /// reused, which is what lets it double as the pagination cursor.
    MessageId
);

/// A stored message. Serializes to the external view handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "appid")]
    pub application_id: ApplicationId,
    pub title: String,
    pub message: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<Extras>,
    pub date: DateTime<Utc>,
}

/// A message that has not been persisted yet. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub application_id: ApplicationId,
    pub title: String,
    pub message: String,
    pub priority: i32,
    pub extras: Option<Extras>,
    pub date: DateTime<Utc>,
}

impl NewMessage {
    /// Attaches the store-assigned id.
    pub fn into_stored(self, id: MessageId) -> Message {
        Message {
            id,
            application_id: self.application_id,
            title: self.title,
            message: self.message,
            priority: self.priority,
            extras: self.extras,
            date: self.date,
        }
    }
}

/// An application posts messages using its token. Every message it posts is
/// owned by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: ApplicationId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub token: String,
}

impl Application {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_to_external_view() {
        let message = Message {
            id: MessageId(7),
            application_id: ApplicationId(3),
            title: "Storm".into(),
            message: "Wind gusts up to 90km/h".into(),
            priority: 5,
            extras: None,
            date: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["appid"], 3);
        assert_eq!(json["title"], "Storm");
        assert!(json.get("extras").is_none());
    }

    #[test]
    fn application_hides_owner() {
        let app = Application {
            id: ApplicationId(1),
            user_id: UserId(9),
            name: "Weather Bot".into(),
            description: String::new(),
            token: "Aabc".into(),
        };

        let json = serde_json::to_value(&app).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(app.is_owned_by(UserId(9)));
        assert!(!app.is_owned_by(UserId(10)));
    }
}
