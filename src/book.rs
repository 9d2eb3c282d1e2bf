use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::schema::Payload;

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema, ToSchema)]
pub struct Book {
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

/// Payload to create a book. Every field is required.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewBook {
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub amazon_url: String,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub author: String,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub language: String,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub pages: i32,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub publisher: String,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub title: String,
    #[validate(range(min = 0, max = 9999, message = "Must be between 0 and 9999"))]
    pub year: i32,
}

impl Payload for NewBook {}

impl From<NewBook> for Book {
    fn from(book: NewBook) -> Self {
        Book {
            isbn: book.isbn,
            amazon_url: book.amazon_url,
            author: book.author,
            language: book.language,
            pages: book.pages,
            publisher: book.publisher,
            title: book.title,
            year: book.year,
        }
    }
}

/// Payload to partially update a book.
///
/// Absent and `null` fields are left untouched. The isbn can never be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct BookUpdate {
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub amazon_url: Option<String>,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub author: Option<String>,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub language: Option<String>,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub pages: Option<i32>,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub publisher: Option<String>,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub title: Option<String>,
    #[validate(range(min = 0, max = 9999, message = "Must be between 0 and 9999"))]
    pub year: Option<i32>,
}

impl Payload for BookUpdate {
    const FORBIDDEN_FIELDS: &'static [&'static str] = &["isbn"];
}

impl BookUpdate {
    /// The columns to change, in column order.
    pub fn changes(&self) -> Vec<(&'static str, ColumnValue)> {
        columns([
            ("amazon_url", ColumnValue::text(&self.amazon_url)),
            ("author", ColumnValue::text(&self.author)),
            ("language", ColumnValue::text(&self.language)),
            ("pages", ColumnValue::integer(self.pages)),
            ("publisher", ColumnValue::text(&self.publisher)),
            ("title", ColumnValue::text(&self.title)),
            ("year", ColumnValue::integer(self.year)),
        ])
    }
}

/// Equality filters when listing books.
///
/// Only these columns can be filtered on. Any other query parameter is rejected.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema, IntoParams)]
#[serde(deny_unknown_fields)]
#[into_params(parameter_in = Query)]
pub struct BookFilter {
    pub author: Option<String>,
    pub language: Option<String>,
    pub pages: Option<i32>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
}

impl BookFilter {
    /// The `column = value` conditions, in column order.
    pub fn conditions(&self) -> Vec<(&'static str, ColumnValue)> {
        columns([
            ("author", ColumnValue::text(&self.author)),
            ("language", ColumnValue::text(&self.language)),
            ("pages", ColumnValue::integer(self.pages)),
            ("publisher", ColumnValue::text(&self.publisher)),
            ("title", ColumnValue::text(&self.title)),
            ("year", ColumnValue::integer(self.year)),
        ])
    }
}

/// A value bound to a column of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    Text(String),
    Integer(i32),
}

impl ColumnValue {
    fn text(value: &Option<String>) -> Option<Self> {
        value.clone().map(ColumnValue::Text)
    }

    fn integer(value: Option<i32>) -> Option<Self> {
        value.map(ColumnValue::Integer)
    }
}

fn columns<const N: usize>(
    values: [(&'static str, Option<ColumnValue>); N],
) -> Vec<(&'static str, ColumnValue)> {
    values
        .into_iter()
        .filter_map(|(column, value)| value.map(|value| (column, value)))
        .collect()
}
