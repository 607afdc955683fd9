use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_document, Document},
    options::ReturnDocument,
    Collection, Database,
};

use super::{BookKey, BookStore, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookDocument, BookPatch, NewBook};

/// [`BookStore`] backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoBookStore {
    database: Database,
    books: Collection<BookDocument>,
}

impl MongoBookStore {
    pub fn new(database: Database, collection: &str) -> Self {
        let books = database.collection::<BookDocument>(collection);
        Self { database, books }
    }

    async fn find_many(&self, filter: Document) -> StoreResult<Vec<Book>> {
        let cursor = self.books.find(filter).await?;
        let documents: Vec<BookDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Book::from).collect())
    }
}

fn key_filter(key: &BookKey) -> Document {
    match key {
        BookKey::Id(id) => doc! { "_id": *id },
        BookKey::Isbn(isbn) => doc! { "isbn": isbn.as_str() },
    }
}

/// Case-insensitive literal substring match.
fn contains_ignore_case(needle: &str) -> Document {
    doc! { "$regex": regex::escape(needle), "$options": "i" }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        self.find_many(doc! {}).await
    }

    async fn find(&self, key: &BookKey) -> StoreResult<Option<Book>> {
        let found = self.books.find_one(key_filter(key)).await?;
        Ok(found.map(Book::from))
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let mut document = book.into_document();
        let result = self.books.insert_one(&document).await?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::UnexpectedId(result.inserted_id.to_string()))?;
        document.id = Some(id);

        Ok(document.into())
    }

    async fn update(&self, key: &BookKey, patch: &BookPatch) -> StoreResult<Option<Book>> {
        let changes = to_document(patch)?;
        let updated = self
            .books
            .find_one_and_update(key_filter(key), doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Book::from))
    }

    async fn delete(&self, key: &BookKey) -> StoreResult<bool> {
        let result = self.books.delete_one(key_filter(key)).await?;
        Ok(result.deleted_count == 1)
    }

    async fn by_category(&self, needle: &str) -> StoreResult<Vec<Book>> {
        self.find_many(doc! { "category": contains_ignore_case(needle) })
            .await
    }

    async fn by_author(&self, needle: &str) -> StoreResult<Vec<Book>> {
        self.find_many(doc! {
            "$or": [
                { "author.firstName": contains_ignore_case(needle) },
                { "author.lastName": contains_ignore_case(needle) },
            ]
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        bookstore_db::ping(&self.database).await?;
        Ok(())
    }
}
