pub mod handlers;
pub mod models;
pub mod store;
pub mod view;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{routing::get, Router};
use bookstore_kernel::{InitCtx, Module};

use handlers::BooksState;
use store::BookStore;
use view::ListingView;

/// Endpoints served by the books module, as listed by `GET /api`
pub const ENDPOINTS: &[(&str, &str)] = &[
    ("GET /", "Home page with book list"),
    ("GET /books", "Get all books"),
    ("GET /books/{id}", "Get book by ID"),
    ("GET /books/isbn/{isbn}", "Get book by ISBN"),
    ("POST /books", "Add new book"),
    ("PUT /books/{id}", "Update book by ID"),
    ("PUT /books/isbn/{isbn}", "Update book by ISBN"),
    ("DELETE /books/{id}", "Delete book by ID"),
    ("DELETE /books/isbn/{isbn}", "Delete book by ISBN"),
    ("GET /books/category/{category}", "Filter by category"),
    ("GET /books/author/{name}", "Filter by author"),
    ("GET /health", "Health check"),
];

/// Book catalogue module
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> anyhow::Result<Self> {
        let view = ListingView::new().context("failed to load listing template")?;
        Ok(Self {
            state: BooksState {
                store,
                view: Arc::new(view),
            },
        })
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        // An unreachable store is reported by /health rather than blocking startup
        if let Err(e) = self.state.store.ping().await {
            tracing::warn!(module = self.name(), error = %e, "book store not reachable at startup");
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            collection = %ctx.settings.database.collection,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route(
                "/books",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/books/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .route(
                "/books/isbn/{isbn}",
                get(handlers::get_book_by_isbn)
                    .put(handlers::update_book_by_isbn)
                    .delete(handlers::delete_book_by_isbn),
            )
            .route(
                "/books/category/{category}",
                get(handlers::books_by_category),
            )
            .route("/books/author/{name}", get(handlers::books_by_author))
            .route("/health", get(handlers::health_check))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn endpoints(&self) -> Vec<(&'static str, &'static str)> {
        ENDPOINTS.to_vec()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn path_param(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book = serde_json::json!({ "$ref": "#/components/schemas/Book" });
    let books = serde_json::json!({ "type": "array", "items": book });
    let message = serde_json::json!({ "$ref": "#/components/schemas/BookMessage" });
    let update_body = serde_json::json!({
        "required": true,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookPatch" } } }
    });

    serde_json::json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All books (HTML unless Accept is application/json)", books.clone())
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateBook" } } }
                    },
                    "responses": {
                        "201": json_response("Book created", message.clone()),
                        "400": error_response("Missing field or duplicate ISBN")
                    }
                }
            },
            "/books/{id}": {
                "parameters": [path_param("id")],
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("The book", book.clone()),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book by id",
                    "tags": ["Books"],
                    "requestBody": update_body.clone(),
                    "responses": {
                        "200": json_response("Updated book", message.clone()),
                        "400": error_response("Invalid book ID or no valid fields"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book by id",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Book deleted", message.clone()),
                        "400": error_response("Invalid book ID"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/isbn/{isbn}": {
                "parameters": [path_param("isbn")],
                "get": {
                    "summary": "Get a book by ISBN",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("The book", book.clone()),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book by ISBN",
                    "tags": ["Books"],
                    "requestBody": update_body,
                    "responses": {
                        "200": json_response("Updated book", message.clone()),
                        "400": error_response("No valid fields"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book by ISBN",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Book deleted", message),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/books/category/{category}": {
                "parameters": [path_param("category")],
                "get": {
                    "summary": "Filter books by category substring",
                    "tags": ["Books"],
                    "responses": { "200": json_response("Matching books", books.clone()) }
                }
            },
            "/books/author/{name}": {
                "parameters": [path_param("name")],
                "get": {
                    "summary": "Filter books by author first or last name",
                    "tags": ["Books"],
                    "responses": { "200": json_response("Matching books", books) }
                }
            },
            "/health": {
                "get": {
                    "summary": "Store health check",
                    "tags": ["Health"],
                    "responses": {
                        "200": json_response("Store reachable", serde_json::json!({ "$ref": "#/components/schemas/HealthStatus" })),
                        "500": json_response("Store unreachable", serde_json::json!({ "$ref": "#/components/schemas/HealthStatus" }))
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Author": {
                    "type": "object",
                    "properties": {
                        "firstName": { "type": "string" },
                        "lastName": { "type": "string" }
                    }
                },
                "Publisher": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "location": { "type": "string" }
                    }
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Store-generated identifier" },
                        "isbn": { "type": "string" },
                        "title": { "type": "string" },
                        "year": { "type": "integer" },
                        "price": { "type": "number" },
                        "page": { "type": "integer" },
                        "category": { "type": "string" },
                        "coverPhoto": { "type": "string" },
                        "publisher": { "$ref": "#/components/schemas/Publisher" },
                        "author": { "$ref": "#/components/schemas/Author" }
                    },
                    "required": ["id", "isbn", "title"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "isbn": { "type": "string" },
                        "title": { "type": "string" },
                        "year": { "type": "integer" },
                        "price": { "type": "number" },
                        "page": { "type": "integer" },
                        "category": { "type": "string" },
                        "coverPhoto": { "type": "string" },
                        "publisher": { "$ref": "#/components/schemas/Publisher" },
                        "author": { "$ref": "#/components/schemas/Author" }
                    },
                    "required": ["isbn", "title", "year", "price", "page", "category"]
                },
                "BookPatch": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "year": { "type": "integer" },
                        "price": { "type": "number" },
                        "page": { "type": "integer" },
                        "category": { "type": "string" },
                        "coverPhoto": { "type": "string" },
                        "publisher": { "$ref": "#/components/schemas/Publisher" },
                        "author": { "$ref": "#/components/schemas/Author" }
                    }
                },
                "BookMessage": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" },
                        "book": { "$ref": "#/components/schemas/Book" }
                    },
                    "required": ["message"]
                },
                "HealthStatus": {
                    "type": "object",
                    "properties": {
                        "status": { "type": "string" },
                        "database": { "type": "string" },
                        "error": { "type": "string" }
                    },
                    "required": ["status", "database"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<dyn BookStore>) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(BooksModule::new(store)?))
}
