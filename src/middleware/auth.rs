use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::{AppError, AppResult};

/// Cookie carrying the access token for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// The authenticated caller, stored in request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Middleware gating every catalog/engagement route.
///
/// Accepts the credential as either a bearer header or the `access_token`
/// cookie. Missing, malformed, expired and bad-signature tokens all produce
/// the same 401; callers learn nothing about which check failed.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = extract_token(&request).ok_or(AppError::Unauthorized)?;
    let user_id = state.signer.verify(&token)?;

    // Resolve the account up front so handlers get the username and email
    // without another lookup.
    let user = state
        .users
        .by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        email: user.email,
    });

    Ok(next.run(request).await)
}

fn extract_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        if let Some(token) = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
        {
            return Some(token.trim().to_string());
        }
    }

    request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, ACCESS_TOKEN_COOKIE))
}

/// Pulls one cookie's value out of a `Cookie:` header
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_finds_token() {
        let header = "theme=dark; access_token=abc.def.ghi; lang=en";
        assert_eq!(
            cookie_value(header, ACCESS_TOKEN_COOKIE),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn test_cookie_value_missing() {
        assert_eq!(cookie_value("theme=dark", ACCESS_TOKEN_COOKIE), None);
        assert_eq!(cookie_value("", ACCESS_TOKEN_COOKIE), None);
    }

    #[test]
    fn test_cookie_value_does_not_match_prefix_names() {
        let header = "access_token_old=zzz";
        assert_eq!(cookie_value(header, ACCESS_TOKEN_COOKIE), None);
    }
}
