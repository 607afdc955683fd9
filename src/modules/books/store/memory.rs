use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{BookKey, BookStore, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookDocument, BookPatch, NewBook};

/// [`BookStore`] holding records in process memory.
///
/// Used for local development (`database.driver = "memory"`) and tests.
/// [`set_unreachable`](Self::set_unreachable) makes every call fail as if
/// the database had gone away.
#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    books: RwLock<Vec<BookDocument>>,
    unreachable: AtomicBool,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.read().await.is_empty()
    }

    fn check_reachable(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn filter<F>(&self, predicate: F) -> StoreResult<Vec<Book>>
    where
        F: Fn(&BookDocument) -> bool,
    {
        self.check_reachable()?;
        let books = self.books.read().await;
        Ok(books
            .iter()
            .filter(|document| predicate(document))
            .cloned()
            .map(Book::from)
            .collect())
    }
}

fn matches(key: &BookKey, document: &BookDocument) -> bool {
    match key {
        BookKey::Id(id) => document.id.as_ref() == Some(id),
        BookKey::Isbn(isbn) => &document.isbn == isbn,
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase()))
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        self.filter(|_| true).await
    }

    async fn find(&self, key: &BookKey) -> StoreResult<Option<Book>> {
        self.check_reachable()?;
        let books = self.books.read().await;
        Ok(books
            .iter()
            .find(|document| matches(key, document))
            .cloned()
            .map(Book::from))
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        self.check_reachable()?;
        let mut document = book.into_document();
        document.id = Some(ObjectId::new());

        self.books.write().await.push(document.clone());
        Ok(document.into())
    }

    async fn update(&self, key: &BookKey, patch: &BookPatch) -> StoreResult<Option<Book>> {
        self.check_reachable()?;
        let mut books = self.books.write().await;
        let Some(document) = books.iter_mut().find(|document| matches(key, document)) else {
            return Ok(None);
        };

        patch.apply(document);
        Ok(Some(document.clone().into()))
    }

    async fn delete(&self, key: &BookKey) -> StoreResult<bool> {
        self.check_reachable()?;
        let mut books = self.books.write().await;
        match books.iter().position(|document| matches(key, document)) {
            Some(index) => {
                books.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn by_category(&self, needle: &str) -> StoreResult<Vec<Book>> {
        self.filter(|document| contains_ignore_case(document.category.as_deref(), needle))
            .await
    }

    async fn by_author(&self, needle: &str) -> StoreResult<Vec<Book>> {
        self.filter(|document| {
            contains_ignore_case(document.author.first_name.as_deref(), needle)
                || contains_ignore_case(document.author.last_name.as_deref(), needle)
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_reachable()
    }
}
