use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use herald_types::models::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying an application token on message creation.
pub const APP_TOKEN_HEADER: &str = "x-herald-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId(self.sub)
    }
}

/// Extract and validate a user JWT from the Authorization header.
///
/// Browsers cannot set headers on a WebSocket upgrade, so a `token` query
/// parameter is accepted as well.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| query_token(req.uri().query()))
        .ok_or(ApiError::Unauthorized("missing bearer token"))?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("invalid bearer token"))?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Application token presented by a publisher, taken from the
/// `X-Herald-Key` header or the `token` query parameter.
#[derive(Debug, Clone)]
pub struct AppToken(pub String);

impl<S> FromRequestParts<S> for AppToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(APP_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| query_token(parts.uri.query()))
            .filter(|token| !token.is_empty())
            .map(AppToken)
            .ok_or(ApiError::Unauthorized("missing application token"))
    }
}

fn query_token(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn app_token(req: Request<()>) -> Result<AppToken, ApiError> {
        let (mut parts, ()) = req.into_parts();
        AppToken::from_request_parts(&mut parts, &()).await
    }

    #[test]
    fn token_is_read_from_query() {
        assert_eq!(query_token(Some("limit=5&token=Aabc%2B1")), Some("Aabc+1".into()));
        assert_eq!(query_token(Some("limit=5")), None);
        assert_eq!(query_token(None), None);
    }

    #[tokio::test]
    async fn empty_key_header_falls_back_to_query_token() {
        let req = Request::builder()
            .uri("/message?token=Aweather")
            .header(APP_TOKEN_HEADER, "")
            .body(())
            .unwrap();

        let AppToken(token) = app_token(req).await.unwrap();
        assert_eq!(token, "Aweather");
    }

    #[tokio::test]
    async fn key_header_wins_over_query_token() {
        let req = Request::builder()
            .uri("/message?token=Aquery")
            .header(APP_TOKEN_HEADER, "Aheader")
            .body(())
            .unwrap();

        let AppToken(token) = app_token(req).await.unwrap();
        assert_eq!(token, "Aheader");
    }

    #[tokio::test]
    async fn missing_or_empty_tokens_are_rejected() {
        let bare = Request::builder().uri("/message").body(()).unwrap();
        assert!(matches!(app_token(bare).await, Err(ApiError::Unauthorized(_))));

        let empty = Request::builder()
            .uri("/message?token=")
            .header(APP_TOKEN_HEADER, "")
            .body(())
            .unwrap();
        assert!(matches!(app_token(empty).await, Err(ApiError::Unauthorized(_))));
    }
}
