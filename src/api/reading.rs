//! Ebook reading and bookmark endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::reading::{
        AddBookmark, BookmarkStatus, BookmarkedBook, HistoryItem, LastPage, ProgressQuery,
        ReadingProgress, SaveProgress,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Last page read in a book
#[utoipa::path(
    get,
    path = "/ebook/progress",
    tag = "reading",
    security(("bearer_auth" = [])),
    params(ProgressQuery),
    responses(
        (status = 200, description = "Last page, 0 when never opened", body = LastPage)
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ProgressQuery>,
) -> AppResult<Json<LastPage>> {
    let page = state
        .services
        .reading
        .last_page(claims.user_id, query.book_id)
        .await?;
    Ok(Json(page))
}

/// Save the current page
#[utoipa::path(
    post,
    path = "/ebook/progress",
    tag = "reading",
    security(("bearer_auth" = [])),
    request_body = SaveProgress,
    responses(
        (status = 200, description = "Progress saved", body = ReadingProgress),
        (status = 400, description = "Negative page", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn save_progress(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<SaveProgress>,
) -> AppResult<Json<ReadingProgress>> {
    request.validate()?;

    let progress = state
        .services
        .reading
        .save_progress(claims.user_id, &request)
        .await?;
    Ok(Json(progress))
}

/// Reading history
#[utoipa::path(
    get,
    path = "/ebook/history",
    tag = "reading",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Most recently read first", body = Vec<HistoryItem>)
    )
)]
pub async fn history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<HistoryItem>>> {
    let items = state.services.reading.history(claims.user_id).await?;
    Ok(Json(items))
}

/// Remove a history entry
#[utoipa::path(
    delete,
    path = "/ebook/history/{id}",
    tag = "reading",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "History entry ID")
    ),
    responses(
        (status = 204, description = "Entry removed"),
        (status = 404, description = "No such entry of the caller", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .reading
        .delete_history(claims.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bookmarked books
#[utoipa::path(
    get,
    path = "/bookmarks",
    tag = "reading",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bookmarked books, newest first", body = Vec<BookmarkedBook>)
    )
)]
pub async fn list_bookmarks(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookmarkedBook>>> {
    let books = state.services.reading.bookmarks(claims.user_id).await?;
    Ok(Json(books))
}

/// Bookmark a book
#[utoipa::path(
    post,
    path = "/bookmarks",
    tag = "reading",
    security(("bearer_auth" = [])),
    request_body = AddBookmark,
    responses(
        (status = 200, description = "Book bookmarked", body = BookmarkStatus),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_bookmark(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AddBookmark>,
) -> AppResult<Json<BookmarkStatus>> {
    let status = state
        .services
        .reading
        .add_bookmark(claims.user_id, request.book_id)
        .await?;
    Ok(Json(status))
}

/// Remove a bookmark
#[utoipa::path(
    delete,
    path = "/bookmarks/{book_id}",
    tag = "reading",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Bookmark removed"),
        (status = 404, description = "Book was not bookmarked", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_bookmark(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .reading
        .remove_bookmark(claims.user_id, book_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether a book is bookmarked
#[utoipa::path(
    get,
    path = "/bookmarks/{book_id}/status",
    tag = "reading",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Bookmark status", body = BookmarkStatus)
    )
)]
pub async fn bookmark_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<BookmarkStatus>> {
    let status = state
        .services
        .reading
        .bookmark_status(claims.user_id, book_id)
        .await?;
    Ok(Json(status))
}
