use axum::{
    Extension, Json,
    extract::{
        OriginalUri, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, Uri, header},
    response::IntoResponse,
};
use serde::Deserialize;
use url::Url;

use herald_core::{Page, PagingParams, ValidationError};
use herald_types::api::{CreateMessageRequest, PagedMessages, Paging};
use herald_types::models::{ApplicationId, MessageId};

use crate::error::ApiError;
use crate::middleware::{AppToken, Claims};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PagingQuery {
    pub limit: Option<i64>,
    pub since: Option<i64>,
}

impl PagingQuery {
    fn into_params(query: Result<Query<Self>, QueryRejection>) -> Result<PagingParams, ApiError> {
        let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(PagingParams::new(query.limit, query.since)?)
    }
}

fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    let Path(raw) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(ValidationError::check_id(raw)?)
}

/// GET /message
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: Result<Query<PagingQuery>, QueryRejection>,
) -> Result<Json<PagedMessages>, ApiError> {
    let params = PagingQuery::into_params(query)?;
    let page = state.messages.list_messages(claims.user_id(), params).await?;
    Ok(Json(paged_response(page, &headers, &uri)))
}

/// GET /application/{id}/message
pub async fn get_application_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PagingQuery>, QueryRejection>,
) -> Result<Json<PagedMessages>, ApiError> {
    let app_id = ApplicationId(path_id(path)?);
    let params = PagingQuery::into_params(query)?;
    let page = state
        .messages
        .list_application_messages(claims.user_id(), app_id, params)
        .await?;
    Ok(Json(paged_response(page, &headers, &uri)))
}

/// POST /message, authenticated with an application token.
pub async fn create_message(
    State(state): State<AppState>,
    AppToken(token): AppToken,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let message = state.messages.create_message(&token, request).await?;
    Ok(Json(message))
}

/// DELETE /message/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let message_id = MessageId(path_id(path)?);
    state.messages.delete_message(claims.user_id(), message_id).await?;
    Ok(StatusCode::OK)
}

/// DELETE /application/{id}/message
pub async fn delete_application_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let app_id = ApplicationId(path_id(path)?);
    state
        .messages
        .delete_application_messages(claims.user_id(), app_id)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /message
pub async fn delete_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    state.messages.delete_all_messages(claims.user_id()).await?;
    Ok(StatusCode::OK)
}

fn paged_response(page: Page, headers: &HeaderMap, uri: &Uri) -> PagedMessages {
    let next = page
        .next
        .and_then(|since| next_page_url(headers, uri, page.limit, since));
    PagedMessages {
        paging: Paging {
            size: page.size(),
            limit: page.limit,
            since: page.since(),
            next,
        },
        messages: page.messages,
    }
}

/// Absolute URL of the following page: the request URL with `limit` and
/// `since` replaced, every other query parameter kept.
fn next_page_url(headers: &HeaderMap, uri: &Uri, limit: u32, since: MessageId) -> Option<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let mut url = Url::parse(&format!("{scheme}://{host}{path}")).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "limit" && key != "since")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("limit", &limit.to_string())
        .append_pair("since", &since.to_string());

    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        headers
    }

    #[test]
    fn next_url_replaces_paging_and_keeps_other_params() {
        let uri: Uri = "/message?limit=2&since=9&foo=bar".parse().unwrap();
        let next = next_page_url(&headers("push.example.com"), &uri, 2, MessageId(7));
        assert_eq!(
            next.as_deref(),
            Some("http://push.example.com/message?foo=bar&limit=2&since=7")
        );
    }

    #[test]
    fn next_url_honours_forwarded_scheme() {
        let mut headers = headers("push.example.com:8443");
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        let uri: Uri = "/application/3/message".parse().unwrap();

        let next = next_page_url(&headers, &uri, 100, MessageId(41));
        assert_eq!(
            next.as_deref(),
            Some("https://push.example.com:8443/application/3/message?limit=100&since=41")
        );
    }
}
