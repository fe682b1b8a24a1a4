//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, feedback, health, loans, members, reading};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pustaka API",
        version = "0.3.0",
        description = "Library loans, catalog and ebook reading REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::change_password,
        // Books
        books::list_books,
        books::random_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Loans
        loans::request_loan,
        loans::my_loans,
        loans::cancel_loan,
        loans::list_loans,
        loans::get_loan,
        loans::update_loan_status,
        // Members
        members::list_members,
        members::update_role,
        members::delete_member,
        // Reading
        reading::get_progress,
        reading::save_progress,
        reading::history,
        reading::delete_history,
        reading::list_bookmarks,
        reading::add_bookmark,
        reading::remove_bookmark,
        reading::bookmark_status,
        // Feedback
        feedback::list_feedback,
        feedback::submit_feedback,
        feedback::reply_feedback,
        feedback::delete_feedback,
    ),
    components(
        schemas(
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::RegisterRequest,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            crate::models::user::ChangePasswordRequest,
            crate::models::user::UpdateRole,
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::BookType,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Loans
            loans::CreateLoanRequest,
            loans::UpdateLoanStatusRequest,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanTransaction,
            crate::models::loan::LoanView,
            crate::models::loan::LoanRequestOutcome,
            // Reading
            crate::models::reading::ReadingProgress,
            crate::models::reading::HistoryItem,
            crate::models::reading::SaveProgress,
            crate::models::reading::LastPage,
            crate::models::reading::AddBookmark,
            crate::models::reading::BookmarkedBook,
            crate::models::reading::BookmarkStatus,
            // Feedback
            crate::models::feedback::Feedback,
            crate::models::feedback::FeedbackStatus,
            crate::models::feedback::CreateFeedback,
            crate::models::feedback::ReplyFeedback,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog"),
        (name = "loans", description = "Loan workflow and fines"),
        (name = "members", description = "Member administration"),
        (name = "reading", description = "Ebook progress and bookmarks"),
        (name = "feedback", description = "Member feedback")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
