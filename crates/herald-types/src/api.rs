use serde::{Deserialize, Serialize};

use crate::models::{Extras, Message};

// -- Messages --

/// Body of `POST /message`, sent by an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub extras: Option<Extras>,
}

/// Paging metadata returned next to every message page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub size: usize,
    pub limit: u32,
    pub since: i64,
    /// Absolute URL of the next (older) page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedMessages {
    pub paging: Paging,
    pub messages: Vec<Message>,
}

// -- Applications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateApplicationRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: u16,
    pub error_description: String,
}
