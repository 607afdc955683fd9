//! Request handlers for the book resource.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::ACCEPT, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use bookstore_http::error::AppError;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use super::models::{Book, BookPatch, CreateBook, UpdateBook};
use super::store::{BookKey, BookStore, StoreError};
use super::view::ListingView;

const NOT_FOUND: &str = "Book not found";

/// Shared handler state
#[derive(Clone)]
pub struct BooksState {
    pub store: Arc<dyn BookStore>,
    pub view: Arc<ListingView>,
}

/// Success envelope for write operations
#[derive(Debug, Serialize)]
pub struct BookMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Book>,
}

/// Health probe response body
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => AppError::store_unavailable(message),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Parse a path segment into a store identifier.
pub fn parse_book_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::invalid_identifier("Invalid book ID"))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn patch_body(payload: Result<Json<UpdateBook>, JsonRejection>) -> Result<BookPatch, AppError> {
    json_body(payload)?
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))
}

fn render_listing(view: &ListingView, books: &[Book]) -> Result<Html<String>, AppError> {
    view.render(books)
        .map(Html)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to render listing")))
}

/// `GET /` listing page
pub async fn index(State(state): State<BooksState>) -> Result<Html<String>, AppError> {
    let books = state.store.list().await?;
    render_listing(&state.view, &books)
}

/// `GET /books`: JSON when the client asks for exactly `application/json`,
/// the listing page otherwise
pub async fn list_books(
    State(state): State<BooksState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let books = state.store.list().await?;

    let wants_json = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept == "application/json");

    if wants_json {
        Ok(Json(books).into_response())
    } else {
        Ok(render_listing(&state.view, &books)?.into_response())
    }
}

/// `POST /books`
pub async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<BookMessage>), AppError> {
    let candidate = json_body(payload)?
        .validate()
        .map_err(|missing| AppError::validation(missing.to_string()))?;

    let isbn_key = BookKey::Isbn(candidate.isbn.clone());
    if state.store.find(&isbn_key).await?.is_some() {
        return Err(AppError::conflict("A book with this ISBN already exists."));
    }

    let book = state.store.insert(candidate).await?;
    tracing::info!(id = %book.id, isbn = %book.isbn, "book created");

    Ok((
        StatusCode::CREATED,
        Json(BookMessage {
            message: format!("Book '{}' has been added.", book.title),
            book: Some(book),
        }),
    ))
}

/// `GET /books/{id}`
pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let key = BookKey::Id(parse_book_id(&id)?);
    fetch(state.store.as_ref(), &key).await
}

/// `GET /books/isbn/{isbn}`
pub async fn get_book_by_isbn(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, AppError> {
    fetch(state.store.as_ref(), &BookKey::Isbn(isbn)).await
}

async fn fetch(store: &dyn BookStore, key: &BookKey) -> Result<Json<Book>, AppError> {
    store
        .find(key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND))
}

/// `PUT /books/{id}`
pub async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<BookMessage>, AppError> {
    let patch = patch_body(payload)?;
    let key = BookKey::Id(parse_book_id(&id)?);
    apply_update(state.store.as_ref(), &key, &patch).await
}

/// `PUT /books/isbn/{isbn}`
pub async fn update_book_by_isbn(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<BookMessage>, AppError> {
    let patch = patch_body(payload)?;
    apply_update(state.store.as_ref(), &BookKey::Isbn(isbn), &patch).await
}

async fn apply_update(
    store: &dyn BookStore,
    key: &BookKey,
    patch: &BookPatch,
) -> Result<Json<BookMessage>, AppError> {
    let book = store
        .update(key, patch)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(%key, "book updated");

    Ok(Json(BookMessage {
        message: "Book updated successfully.".to_string(),
        book: Some(book),
    }))
}

/// `DELETE /books/{id}`
pub async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Json<BookMessage>, AppError> {
    let key = BookKey::Id(parse_book_id(&id)?);
    remove(state.store.as_ref(), &key).await
}

/// `DELETE /books/isbn/{isbn}`
pub async fn delete_book_by_isbn(
    State(state): State<BooksState>,
    Path(isbn): Path<String>,
) -> Result<Json<BookMessage>, AppError> {
    remove(state.store.as_ref(), &BookKey::Isbn(isbn)).await
}

async fn remove(store: &dyn BookStore, key: &BookKey) -> Result<Json<BookMessage>, AppError> {
    if !store.delete(key).await? {
        return Err(AppError::not_found(NOT_FOUND));
    }

    tracing::info!(%key, "book deleted");

    Ok(Json(BookMessage {
        message: "Book deleted successfully.".to_string(),
        book: None,
    }))
}

/// `GET /books/category/{category}`
pub async fn books_by_category(
    State(state): State<BooksState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.store.by_category(&category).await?))
}

/// `GET /books/author/{name}`
pub async fn books_by_author(
    State(state): State<BooksState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.store.by_author(&name).await?))
}

/// `GET /health`
pub async fn health_check(State(state): State<BooksState>) -> (StatusCode, Json<HealthStatus>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "healthy",
                database: "connected",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store health probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthStatus {
                    status: "unhealthy",
                    database: "disconnected",
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_book_id_accepts_hex_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_book_id(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn parse_book_id_rejects_malformed_input() {
        for raw in ["not-an-id", "", "65f0c0ffee", "zzzzzzzzzzzzzzzzzzzzzzzz"] {
            let err = parse_book_id(raw).unwrap_err();
            assert!(matches!(err, AppError::InvalidIdentifier { .. }), "{raw}");
        }
    }

    #[test]
    fn unavailable_store_maps_to_store_unavailable() {
        let err: AppError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, AppError::StoreUnavailable { .. }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
