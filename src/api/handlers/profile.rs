use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::session::current_user;
use crate::session::{CurrentUser, Sessions};

#[derive(ToSchema, Serialize, Debug)]
pub struct ProfileResponse {
    id: i64,
    username: String,
    email: String,
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse, content_type = "application/json"),
        (status = 303, description = "Not logged in, redirect to the login entry point"),
    ),
    tag = "profile"
)]
// Login gate: anonymous requests are sent to /login
pub async fn profile(headers: HeaderMap, sessions: Extension<Arc<Sessions>>) -> impl IntoResponse {
    match current_user(&headers, &sessions).await {
        Ok(CurrentUser::Identified(identity)) => (
            StatusCode::OK,
            Json(ProfileResponse {
                id: identity.id,
                username: identity.username,
                email: identity.email,
            }),
        )
            .into_response(),

        Ok(CurrentUser::Anonymous) => Redirect::to("/login").into_response(),

        Err(status) => status.into_response(),
    }
}
