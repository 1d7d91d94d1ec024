//! Session cookie plumbing and logout.

use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Redirect},
};
use std::sync::Arc;
use tracing::error;

use crate::session::{CurrentUser, Sessions};

const SESSION_COOKIE_NAME: &str = "doorman_session";

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed, cookie cleared, redirect to the index")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, sessions: Extension<Arc<Sessions>>) -> impl IntoResponse {
    if let Some(cookie_value) = extract_session_cookie(&headers) {
        if let Err(err) = sessions.destroy(&cookie_value).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(sessions.cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (response_headers, Redirect::to("/")).into_response()
}

/// Resolve the request's cookie to the current user.
///
/// A missing cookie is Anonymous; only store failures surface as 500.
pub(crate) async fn current_user(
    headers: &HeaderMap,
    sessions: &Sessions,
) -> Result<CurrentUser, StatusCode> {
    let Some(cookie_value) = extract_session_cookie(headers) else {
        return Ok(CurrentUser::Anonymous);
    };
    match sessions.resolve(&cookie_value).await {
        Ok(user) => Ok(user),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Build the `HttpOnly` session cookie.
///
/// No Max-Age: the cookie must not outlive the browser session; the
/// server-side record carries the TTL.
pub(crate) fn session_cookie(
    secure: bool,
    value: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == SESSION_COOKIE_NAME {
            return Some(val.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_has_expected_attributes() {
        let cookie = session_cookie(false, "token.sig").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("doorman_session=token.sig"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        // Browser-session cookie: no Max-Age on create
        assert!(!cookie.contains("Max-Age"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn session_cookie_secure_flag() {
        let cookie = session_cookie(true, "token.sig").unwrap();
        assert!(cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn clear_session_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("doorman_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn extract_session_cookie_finds_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; doorman_session=token.sig; more=2"),
        );
        assert_eq!(
            extract_session_cookie(&headers),
            Some("token.sig".to_string())
        );
    }

    #[test]
    fn extract_session_cookie_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_cookie(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(extract_session_cookie(&headers), None);
    }
}
