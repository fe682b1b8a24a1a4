//! Loan workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::{LoanFilter, LoanQuery, LoanRequestOutcome, LoanStatus, LoanTransaction, LoanView},
    AppState,
};

use super::AuthenticatedUser;

/// Loan request body
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: i32,
}

/// Status change body
#[derive(Deserialize, ToSchema)]
pub struct UpdateLoanStatusRequest {
    /// Target status, e.g. "DISETUJUI" or "approved"
    pub status: String,
}

/// Request a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Request recorded, one copy reserved", body = LoanRequestOutcome),
        (status = 403, description = "Members only", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Out of stock or already requested", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanRequestOutcome>)> {
    claims.require_member()?;

    let outcome = state
        .services
        .loans
        .request_loan(claims.user_id, request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Own loan history, fines refreshed
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loans of the caller, newest first", body = Vec<LoanView>)
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanView>>> {
    let loans = state.services.loans.member_loans(claims.user_id).await?;
    Ok(Json(loans))
}

/// Cancel own pending request
#[utoipa::path(
    patch,
    path = "/loans/{id}/cancel",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Request canceled", body = LoanTransaction),
        (status = 404, description = "No such loan of the caller", body = crate::error::ErrorResponse),
        (status = 409, description = "Request already processed", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanTransaction>> {
    claims.require_member()?;

    let loan = state.services.loans.cancel_request(claims.user_id, id).await?;
    Ok(Json(loan))
}

/// List all loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = Vec<LoanView>),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanView>>> {
    claims.require_admin()?;

    let filter = LoanFilter::try_from(query)?;
    let loans = state.services.loans.list_loans(&filter).await?;
    Ok(Json(loans))
}

/// Loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanView),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.get_loan(&claims, id).await?;
    Ok(Json(loan))
}

/// Move a loan through its lifecycle
#[utoipa::path(
    patch,
    path = "/loans/{id}/status",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoanStatusRequest,
    responses(
        (status = 200, description = "Loan updated", body = LoanTransaction),
        (status = 400, description = "Unknown or invalid target status", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed from current status", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_loan_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateLoanStatusRequest>,
) -> AppResult<Json<LoanTransaction>> {
    claims.require_admin()?;

    let target: LoanStatus = request.status.parse().map_err(AppError::Validation)?;
    let loan = state.services.loans.update_status(id, target).await?;
    Ok(Json(loan))
}
