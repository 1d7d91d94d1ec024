use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::{AuthService, SignupOutcome};

#[derive(ToSchema, Deserialize, Debug)]
pub struct UserSignup {
    username: String,
    email: String,
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SignupResponse {
    id: i64,
    username: String,
    email: String,
}

#[utoipa::path(
    post,
    path = "/signup",
    request_body = UserSignup,
    responses(
        (status = 201, description = "Registration successful", body = SignupResponse, content_type = "application/json"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Username or email already exists"),
    ),
    tag = "auth"
)]
pub async fn signup(
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<UserSignup>>,
) -> impl IntoResponse {
    let user: UserSignup = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // No session is created here; the caller logs in separately.
    match auth.signup(&user.username, &user.email, &user.password).await {
        Ok(SignupOutcome::Created(identity)) => (
            StatusCode::CREATED,
            Json(SignupResponse {
                id: identity.id,
                username: identity.username,
                email: identity.email,
            }),
        )
            .into_response(),

        Ok(SignupOutcome::DuplicateUsername) => (
            StatusCode::CONFLICT,
            "Username already exists. Please choose a different one.".to_string(),
        )
            .into_response(),

        Ok(SignupOutcome::InvalidInput(reason)) => {
            (StatusCode::BAD_REQUEST, reason.to_string()).into_response()
        }

        Err(err) => {
            error!("Error creating user: {err:?}");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating user".to_string(),
            )
                .into_response()
        }
    }
}
