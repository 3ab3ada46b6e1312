//! Cursor pagination over the append-only message log.
//!
//! Pages run newest to oldest. The cursor is a message id: the next page
//! holds messages with ids strictly below it. Nothing is kept between
//! requests; every page is derived from `limit`, `since` and the rows the
//! repository returns.

use herald_types::models::{ApplicationId, Message, MessageId, UserId};
use tracing::debug;

use crate::error::ValidationError;
use crate::ports::{MessageRepository, StorageResult};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 200;

/// Validated paging input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingParams {
    limit: u32,
    since: MessageId,
}

impl PagingParams {
    /// Validates raw query values. Missing values fall back to a limit of
    /// [`DEFAULT_LIMIT`] and a `since` of zero (newest first).
    pub fn new(limit: Option<i64>, since: Option<i64>) -> Result<Self, ValidationError> {
        let raw_limit = limit.unwrap_or(i64::from(DEFAULT_LIMIT));
        let limit = u32::try_from(raw_limit)
            .ok()
            .filter(|l| (MIN_LIMIT..=MAX_LIMIT).contains(l))
            .ok_or(ValidationError::LimitOutOfRange {
                got: raw_limit,
                min: MIN_LIMIT,
                max: MAX_LIMIT,
            })?;

        let since = since.unwrap_or(0);
        if since < 0 {
            return Err(ValidationError::NegativeSince(since));
        }

        Ok(Self {
            limit,
            since: MessageId(since),
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn since(&self) -> MessageId {
        self.since
    }

    /// Rows to ask the repository for: one more than the page holds, so a
    /// full page can tell whether anything older exists.
    pub fn lookahead(&self) -> usize {
        self.limit as usize + 1
    }
}

impl Default for PagingParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            since: MessageId(0),
        }
    }
}

/// One page of messages, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub messages: Vec<Message>,
    pub limit: u32,
    /// Cursor for the next older page; `None` on the last page.
    pub next: Option<MessageId>,
}

impl Page {
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    /// The `since` value a caller passes to fetch the following page, or 0
    /// when there is none.
    pub fn since(&self) -> i64 {
        self.next.map_or(0, MessageId::get)
    }
}

/// Turns a lookahead query result into a page.
///
/// `rows` must be ordered newest first, as returned for
/// [`PagingParams::lookahead`] rows. If more than `limit` rows are present
/// the surplus is dropped and the id of the oldest kept row becomes the next
/// cursor.
pub fn build_page(params: PagingParams, mut rows: Vec<Message>) -> Page {
    let limit = params.limit as usize;
    let next = if rows.len() > limit {
        rows.truncate(limit);
        rows.last().map(|m| m.id)
    } else {
        None
    };

    Page {
        messages: rows,
        limit: params.limit,
        next,
    }
}

/// Whose messages a page is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageScope {
    User(UserId),
    Application(ApplicationId),
}

/// Queries one lookahead page for `scope` and builds it.
pub async fn fetch_page<R>(repository: &R, scope: PageScope, params: PagingParams) -> StorageResult<Page>
where
    R: MessageRepository + ?Sized,
{
    let rows = match scope {
        PageScope::User(user_id) => {
            repository
                .messages_by_user_since(user_id, params.lookahead(), params.since())
                .await?
        }
        PageScope::Application(app_id) => {
            repository
                .messages_by_application_since(app_id, params.lookahead(), params.since())
                .await?
        }
    };

    let page = build_page(params, rows);
    debug!(
        ?scope,
        limit = params.limit(),
        since = %params.since(),
        size = page.size(),
        next = ?page.next,
        "Built message page"
    );
    Ok(page)
}
