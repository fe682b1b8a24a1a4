//! Feedback endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::feedback::{CreateFeedback, Feedback, ReplyFeedback},
    AppState,
};

use super::AuthenticatedUser;

/// List feedback (all for administrators, own for members)
#[utoipa::path(
    get,
    path = "/feedback",
    tag = "feedback",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Feedback, newest first", body = Vec<Feedback>)
    )
)]
pub async fn list_feedback(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Feedback>>> {
    let feedback = state.services.feedback.list(&claims).await?;
    Ok(Json(feedback))
}

/// Send feedback
#[utoipa::path(
    post,
    path = "/feedback",
    tag = "feedback",
    security(("bearer_auth" = [])),
    request_body = CreateFeedback,
    responses(
        (status = 201, description = "Feedback recorded", body = Feedback),
        (status = 400, description = "Empty message", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateFeedback>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    request.validate()?;

    let feedback = state
        .services
        .feedback
        .submit(claims.user_id, &request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Reply to feedback
#[utoipa::path(
    post,
    path = "/feedback/{id}/reply",
    tag = "feedback",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Feedback ID")
    ),
    request_body = ReplyFeedback,
    responses(
        (status = 200, description = "Reply stored", body = Feedback),
        (status = 404, description = "Feedback not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reply_feedback(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ReplyFeedback>,
) -> AppResult<Json<Feedback>> {
    claims.require_admin()?;
    request.validate()?;

    let feedback = state.services.feedback.reply(id, &request.reply).await?;
    Ok(Json(feedback))
}

/// Delete feedback
#[utoipa::path(
    delete,
    path = "/feedback/{id}",
    tag = "feedback",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Feedback ID")
    ),
    responses(
        (status = 204, description = "Feedback deleted"),
        (status = 404, description = "Feedback not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_feedback(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.feedback.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
