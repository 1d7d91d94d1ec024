use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::session::session_cookie;
use crate::auth::{AuthService, LoginOutcome};
use crate::session::Sessions;

#[derive(ToSchema, Deserialize, Debug)]
pub struct UserLogin {
    username: String,
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    id: i64,
    username: String,
    email: String,
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login entry point", content_type = "application/json"),
    ),
    tag = "auth"
)]
// Login gate redirect target; tells clients how to authenticate
pub async fn login_form() -> impl IntoResponse {
    Json(json!({
        "detail": "submit username and password to log in",
    }))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = UserLogin,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse, content_type = "application/json"),
        (status = 401, description = "Unauthorized"),
    ),
    tag = "auth"
)]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    sessions: Extension<Arc<Sessions>>,
    payload: Option<Json<UserLogin>>,
) -> impl IntoResponse {
    let user: UserLogin = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match auth.login(&user.username, &user.password).await {
        Ok(LoginOutcome::Authenticated(identity)) => {
            let cookie_value = match sessions.create(identity.id).await {
                Ok(value) => value,
                Err(err) => {
                    error!("Error creating session: {err:?}");

                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error creating session".to_string(),
                    )
                        .into_response();
                }
            };

            let mut headers = HeaderMap::new();
            match session_cookie(sessions.cookie_secure(), &cookie_value) {
                Ok(cookie) => {
                    headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Error building session cookie: {err}");

                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error creating session".to_string(),
                    )
                        .into_response();
                }
            }

            (
                StatusCode::OK,
                headers,
                Json(LoginResponse {
                    id: identity.id,
                    username: identity.username,
                    email: identity.email,
                }),
            )
                .into_response()
        }

        // Unknown user and wrong password look identical to the client
        Ok(LoginOutcome::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        )
            .into_response(),

        Err(err) => {
            error!("Error logging in: {err:?}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error logging in".to_string(),
            )
                .into_response()
        }
    }
}
