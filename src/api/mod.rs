//! API handlers for Pustaka REST endpoints

pub mod auth;
pub mod books;
pub mod feedback;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod reading;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        // Validate JWT token using the secret from configuration
        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Books (catalog)
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/random", get(books::random_books))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::request_loan))
        .route("/loans/mine", get(loans::my_loans))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/cancel", patch(loans::cancel_loan))
        .route("/loans/:id/status", patch(loans::update_loan_status))
        // Members
        .route("/members", get(members::list_members))
        .route("/members/:id", delete(members::delete_member))
        .route("/members/:id/role", put(members::update_role))
        // Ebook reading
        .route(
            "/ebook/progress",
            get(reading::get_progress).post(reading::save_progress),
        )
        .route("/ebook/history", get(reading::history))
        .route("/ebook/history/:id", delete(reading::delete_history))
        // Bookmarks
        .route("/bookmarks", get(reading::list_bookmarks).post(reading::add_bookmark))
        .route("/bookmarks/:book_id", delete(reading::remove_bookmark))
        .route("/bookmarks/:book_id/status", get(reading::bookmark_status))
        // Feedback
        .route("/feedback", get(feedback::list_feedback).post(feedback::submit_feedback))
        .route("/feedback/:id", delete(feedback::delete_feedback))
        .route("/feedback/:id/reply", post(feedback::reply_feedback))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
