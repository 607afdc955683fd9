use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Publisher sub-object; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Author sub-object; searched by the author filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// A book as persisted in the `books` collection.
///
/// Scalars are optional so that documents written by other clients still
/// decode; records created through this service always carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cover_photo: String,
    #[serde(default)]
    pub publisher: Publisher,
    #[serde(default)]
    pub author: Author,
}

/// A book as returned to clients, with `id` rendered as a hex string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub page: Option<u32>,
    pub category: Option<String>,
    pub cover_photo: String,
    pub publisher: Publisher,
    pub author: Author,
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Self {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            isbn: document.isbn,
            title: document.title,
            year: document.year,
            price: document.price,
            page: document.page,
            category: document.category,
            cover_photo: document.cover_photo,
            publisher: document.publisher,
            author: document.author,
        }
    }
}

/// Raised when a create payload lacks a required field.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is required")]
pub struct MissingField(pub &'static str);

/// Request body for creating a book.
///
/// Every field is optional at the wire level so that a missing field is
/// reported by name instead of as a generic decode failure. Client supplied
/// `id`/`_id` keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub page: Option<u32>,
    pub category: Option<String>,
    pub cover_photo: Option<String>,
    pub publisher: Option<Publisher>,
    pub author: Option<Author>,
}

impl CreateBook {
    /// Check required fields in declaration order and apply defaults.
    ///
    /// A required field must be present and non-null; text fields must also
    /// be non-blank.
    pub fn validate(self) -> Result<NewBook, MissingField> {
        let isbn = required_text(self.isbn, "isbn")?;
        let title = required_text(self.title, "title")?;
        let year = self.year.ok_or(MissingField("year"))?;
        let price = self.price.ok_or(MissingField("price"))?;
        let page = self.page.ok_or(MissingField("page"))?;
        let category = required_text(self.category, "category")?;

        Ok(NewBook {
            isbn,
            title,
            year,
            price,
            page,
            category,
            cover_photo: self.cover_photo.unwrap_or_default(),
            publisher: self.publisher.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
        })
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, MissingField> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(MissingField(field)),
    }
}

/// A validated book ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub year: i32,
    pub price: f64,
    pub page: u32,
    pub category: String,
    pub cover_photo: String,
    pub publisher: Publisher,
    pub author: Author,
}

impl NewBook {
    pub fn into_document(self) -> BookDocument {
        BookDocument {
            id: None,
            isbn: self.isbn,
            title: self.title,
            year: Some(self.year),
            price: Some(self.price),
            page: Some(self.page),
            category: Some(self.category),
            cover_photo: self.cover_photo,
            publisher: self.publisher,
            author: self.author,
        }
    }
}

/// Partial update restricted to the mutable fields, ready to be applied.
///
/// `isbn` and `id` are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

/// Raised when an update body cannot become a [`BookPatch`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("'{0}' cannot be null")]
    NullField(&'static str),
    #[error("No valid fields to update.")]
    NoFields,
}

/// Request body for updating a book.
///
/// The outer `Option` records whether a key was sent at all and the inner
/// one whether it was `null`. Unknown keys are dropped during
/// deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub page: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub cover_photo: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub publisher: Option<Option<Publisher>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<Author>>,
}

/// Marks a key as supplied even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_null<T>(value: Option<Option<T>>, field: &'static str) -> Result<Option<T>, PatchError> {
    match value {
        Some(None) => Err(PatchError::NullField(field)),
        Some(Some(value)) => Ok(Some(value)),
        None => Ok(None),
    }
}

impl UpdateBook {
    /// Reject `null` values by field name, then require at least one field.
    pub fn validate(self) -> Result<BookPatch, PatchError> {
        let patch = BookPatch {
            title: non_null(self.title, "title")?,
            year: non_null(self.year, "year")?,
            price: non_null(self.price, "price")?,
            page: non_null(self.page, "page")?,
            category: non_null(self.category, "category")?,
            cover_photo: non_null(self.cover_photo, "coverPhoto")?,
            publisher: non_null(self.publisher, "publisher")?,
            author: non_null(self.author, "author")?,
        };
        if patch.is_empty() {
            return Err(PatchError::NoFields);
        }
        Ok(patch)
    }
}

impl BookPatch {
    /// True when no recognized field was supplied.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the supplied fields to a stored document.
    pub fn apply(&self, document: &mut BookDocument) {
        if let Some(title) = &self.title {
            document.title = title.clone();
        }
        if let Some(year) = self.year {
            document.year = Some(year);
        }
        if let Some(price) = self.price {
            document.price = Some(price);
        }
        if let Some(page) = self.page {
            document.page = Some(page);
        }
        if let Some(category) = &self.category {
            document.category = Some(category.clone());
        }
        if let Some(cover_photo) = &self.cover_photo {
            document.cover_photo = cover_photo.clone();
        }
        if let Some(publisher) = &self.publisher {
            document.publisher = publisher.clone();
        }
        if let Some(author) = &self.author {
            document.author = author.clone();
        }
    }
}
