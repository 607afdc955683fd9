//! End-to-end tests of the books HTTP surface against the in-memory store.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookstore_app::{
    app::build_registry,
    books::{
        models::{Book, BookPatch, NewBook},
        store::{BookKey, BookStore, InMemoryBookStore, MongoBookStore, StoreError, StoreResult},
    },
};
use bookstore_kernel::settings::DatabaseSettings;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemoryBookStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryBookStore::new());
        Self {
            router: router_for(store.clone()),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, "application/json");
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, text) = self.send(request).await;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, value)
    }

    async fn create(&self, body: Value) -> Value {
        let (status, response) = self.call(Method::POST, "/books", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{response}");
        response["book"].clone()
    }
}

fn router_for(store: Arc<dyn BookStore>) -> Router {
    let registry = build_registry(store).unwrap();
    bookstore_http::build_router(&registry)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri)
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Store whose every call stalls before failing, like a driver waiting out
/// server selection.
struct StallingStore {
    delay: Duration,
}

impl StallingStore {
    async fn fail<T>(&self) -> StoreResult<T> {
        tokio::time::sleep(self.delay).await;
        Err(StoreError::Unavailable(
            "no servers available after waiting".to_string(),
        ))
    }
}

#[async_trait]
impl BookStore for StallingStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        self.fail().await
    }

    async fn find(&self, _key: &BookKey) -> StoreResult<Option<Book>> {
        self.fail().await
    }

    async fn insert(&self, _book: NewBook) -> StoreResult<Book> {
        self.fail().await
    }

    async fn update(&self, _key: &BookKey, _patch: &BookPatch) -> StoreResult<Option<Book>> {
        self.fail().await
    }

    async fn delete(&self, _key: &BookKey) -> StoreResult<bool> {
        self.fail().await
    }

    async fn by_category(&self, _needle: &str) -> StoreResult<Vec<Book>> {
        self.fail().await
    }

    async fn by_author(&self, _needle: &str) -> StoreResult<Vec<Book>> {
        self.fail().await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.fail().await
    }
}

fn dune() -> Value {
    json!({
        "isbn": "978-1",
        "title": "Dune",
        "year": 1965,
        "price": 9.99,
        "page": 412,
        "category": "Fiction",
        "author": { "firstName": "Frank", "lastName": "Herbert" },
        "publisher": { "name": "Chilton Books", "location": "Philadelphia" }
    })
}

fn book(isbn: &str, category: &str, first_name: &str, last_name: &str) -> Value {
    json!({
        "isbn": isbn,
        "title": format!("Book {isbn}"),
        "year": 2000,
        "price": 12.0,
        "page": 300,
        "category": category,
        "author": { "firstName": first_name, "lastName": last_name }
    })
}

fn isbns(books: &Value) -> Vec<String> {
    let mut isbns: Vec<String> = books
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["isbn"].as_str().unwrap().to_string())
        .collect();
    isbns.sort();
    isbns
}

#[tokio::test]
async fn create_returns_record_with_generated_id() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::POST, "/books", Some(dune())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Book 'Dune' has been added.");

    let id = body["book"]["id"].as_str().unwrap();
    assert_eq!(id.len(), 24);
    assert_eq!(body["book"]["coverPhoto"], "");

    let (status, stored) = app.call(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["id"], id);
}

#[tokio::test]
async fn create_applies_optional_defaults() {
    let app = TestApp::new();

    let created = app.create(book("978-9", "Poetry", "", "")).await;
    assert_eq!(created["coverPhoto"], "");
    assert_eq!(created["publisher"], json!({}));
}

#[tokio::test]
async fn duplicate_isbn_is_rejected() {
    let app = TestApp::new();
    app.create(dune()).await;

    let (status, body) = app.call(Method::POST, "/books", Some(dune())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "A book with this ISBN already exists."}));
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn missing_required_field_is_rejected() {
    let app = TestApp::new();
    let mut body = dune();
    body.as_object_mut().unwrap().remove("title");

    let (status, response) = app.call(Method::POST, "/books", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "'title' is required");
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let app = TestApp::new();
    let mut body = dune();
    body["year"] = json!("nineteen sixty-five");

    let (status, response) = app.call(Method::POST, "/books", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn get_by_id_and_isbn_agree() {
    let app = TestApp::new();
    let created = app.create(dune()).await;
    let id = created["id"].as_str().unwrap();

    let (status, by_id) = app.call(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, by_isbn) = app.call(Method::GET, "/books/isbn/978-1", None).await;
    assert_eq!(status, StatusCode::OK);

    for found in [&by_id, &by_isbn] {
        assert_eq!(found["isbn"], "978-1");
        assert_eq!(found["title"], "Dune");
    }
}

#[tokio::test]
async fn unknown_isbn_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/books/isbn/000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Book not found"}));
}

#[tokio::test]
async fn malformed_id_is_invalid_identifier() {
    let app = TestApp::new();

    for method in [Method::GET, Method::DELETE] {
        let (status, body) = app.call(method, "/books/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid book ID"}));
    }

    let (status, body) = app
        .call(Method::PUT, "/books/not-an-id", Some(json!({"title": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid book ID"}));
}

#[tokio::test]
async fn well_formed_unknown_id_is_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .call(Method::GET, "/books/65f0c0ffee0000000000abcd", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_changes_only_allow_listed_fields() {
    let app = TestApp::new();
    let created = app.create(dune()).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/books/{id}"),
            Some(json!({"price": 14.5, "isbn": "000", "id": "abc", "rating": 5})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book updated successfully.");
    assert_eq!(body["book"]["price"], 14.5);
    assert_eq!(body["book"]["isbn"], "978-1");
    assert_eq!(body["book"]["id"], id);
    assert_eq!(body["book"]["title"], "Dune");
    assert!(body["book"].get("rating").is_none());
}

#[tokio::test]
async fn update_by_isbn_returns_post_update_state() {
    let app = TestApp::new();
    app.create(dune()).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/books/isbn/978-1",
            Some(json!({"author": {"firstName": "F.", "lastName": "Herbert"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["author"]["firstName"], "F.");

    let (_, fetched) = app.call(Method::GET, "/books/isbn/978-1", None).await;
    assert_eq!(fetched["author"]["firstName"], "F.");
}

#[tokio::test]
async fn update_without_recognized_fields_changes_nothing() {
    let app = TestApp::new();
    let created = app.create(dune()).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .call(Method::PUT, &format!("/books/{id}"), Some(json!({"isbn": "000"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No valid fields to update."}));

    let (_, fetched) = app.call(Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn update_unknown_book_is_not_found() {
    let app = TestApp::new();

    let (status, _) = app
        .call(Method::PUT, "/books/isbn/000", Some(json!({"title": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let app = TestApp::new();
    app.create(dune()).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/books/65f0c0ffee0000000000abcd",
            Some(json!({"title": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Book not found"}));
}

#[tokio::test]
async fn update_with_null_field_is_rejected_by_name() {
    let app = TestApp::new();
    let created = app.create(dune()).await;

    let (status, body) = app
        .call(
            Method::PUT,
            "/books/isbn/978-1",
            Some(json!({"coverPhoto": null})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "'coverPhoto' cannot be null"}));

    let (status, body) = app
        .call(
            Method::PUT,
            "/books/isbn/978-1",
            Some(json!({"title": null, "price": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "'title' cannot be null"}));

    let (_, fetched) = app.call(Method::GET, "/books/isbn/978-1", None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn delete_by_isbn_on_empty_store_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::DELETE, "/books/isbn/978-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Book not found"}));
}

#[tokio::test]
async fn delete_by_id_then_get_is_not_found() {
    let app = TestApp::new();
    let created = app.create(dune()).await;
    let uri = format!("/books/{}", created["id"].as_str().unwrap());

    let (status, body) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Book deleted successfully."}));

    let (status, _) = app.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_by_isbn_removes_one_record() {
    let app = TestApp::new();
    app.create(dune()).await;
    app.create(book("978-2", "Fiction", "Ursula", "Le Guin")).await;

    let (status, _) = app.call(Method::DELETE, "/books/isbn/978-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.len().await, 1);

    let (status, _) = app.call(Method::DELETE, "/books/isbn/978-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_filter_matches_case_insensitive_substring() {
    let app = TestApp::new();
    app.create(book("1", "Fiction", "A", "A")).await;
    app.create(book("2", "Science fiction", "B", "B")).await;
    app.create(book("3", "Biography", "C", "C")).await;

    let (status, body) = app.call(Method::GET, "/books/category/fic", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&body), vec!["1", "2"]);

    let (status, body) = app.call(Method::GET, "/books/category/poetry", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn author_filter_matches_first_or_last_name() {
    let app = TestApp::new();
    app.create(book("1", "Fiction", "Frank", "Herbert")).await;
    app.create(book("2", "Fiction", "Herbie", "Hancock")).await;
    app.create(book("3", "Fiction", "Ursula", "Le Guin")).await;

    let (status, body) = app.call(Method::GET, "/books/author/herb", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&body), vec!["1", "2"]);

    let (_, body) = app.call(Method::GET, "/books/author/GUIN", None).await;
    assert_eq!(isbns(&body), vec!["3"]);
}

#[tokio::test]
async fn list_books_honours_accept_header() {
    let app = TestApp::new();
    app.create(dune()).await;

    let (status, body) = app.call(Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(isbns(&body), vec!["978-1"]);

    let request = Request::get("/books")
        .header(header::ACCEPT, "text/html,application/json")
        .body(Body::empty())
        .unwrap();
    let (status, html) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<td>Dune</td>"));
}

#[tokio::test]
async fn index_renders_listing() {
    let app = TestApp::new();
    app.create(dune()).await;

    let (status, html) = app
        .send(Request::get("/").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Frank Herbert"));
}

#[tokio::test]
async fn health_reflects_store_reachability() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "database": "connected"}));

    app.store.set_unreachable(true);
    let (status, body) = app.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn store_outage_surfaces_as_server_error() {
    let app = TestApp::new();
    app.store.set_unreachable(true);

    let (status, body) = app.call(Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn slow_store_failure_still_reports_unhealthy_body() {
    let router = router_for(Arc::new(StallingStore {
        delay: Duration::from_millis(200),
    }));

    let (status, body) = get_json(router.clone(), "/health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no servers available"));

    let (status, body) = get_json(router, "/books").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no servers available"));
}

#[tokio::test]
async fn unreachable_mongo_reports_unhealthy_and_unavailable() {
    let settings = DatabaseSettings {
        uri: "mongodb://127.0.0.1:1".to_string(),
        server_selection_timeout_ms: 300,
        ..DatabaseSettings::default()
    };
    let database = bookstore_db::connect(&settings).await.unwrap();
    let router = router_for(Arc::new(MongoBookStore::new(database, &settings.collection)));

    let (status, body) = get_json(router.clone(), "/health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"], "disconnected");
    assert!(body["error"].as_str().unwrap().starts_with("store unavailable"));

    let (status, body) = get_json(router, "/books").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(!message.starts_with("database error"), "{message}");
    assert_ne!(message, "An internal server error occurred");
}

#[tokio::test]
async fn api_catalog_lists_every_endpoint() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Bookstore API");

    let endpoints = body["endpoints"].as_object().unwrap();
    assert_eq!(endpoints.len(), 13);
    assert_eq!(endpoints["GET /books/author/{name}"], "Filter by author");
    assert_eq!(endpoints["GET /health"], "Health check");
}

#[tokio::test]
async fn openapi_document_describes_books() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/books/{id}"]["put"].is_object());
    assert!(body["components"]["schemas"]["Book"].is_object());
}
