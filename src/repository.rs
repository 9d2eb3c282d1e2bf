use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use crate::book::{Book, BookFilter, BookUpdate, ColumnValue, NewBook};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS books (
    isbn TEXT PRIMARY KEY,
    amazon_url TEXT NOT NULL,
    author TEXT NOT NULL,
    language TEXT NOT NULL,
    pages INTEGER NOT NULL,
    publisher TEXT NOT NULL,
    title TEXT NOT NULL,
    year INTEGER NOT NULL
)";

#[derive(Debug, thiserror::Error)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(String),
    #[error("Book {0} already exists")]
    Conflict(String),
    #[error("Database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Single-statement access to the `books` table.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and creates the `books` table if missing.
    ///
    /// An in-memory database is held by a single connection that is never closed,
    /// otherwise every connection would see its own empty database.
    #[tracing::instrument(name = "connect_books", skip_all)]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, BookRepositoryError> {
        let options = SqliteConnectOptions::from_str(url)?;

        let pool_options = match url.contains(":memory:") {
            true => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
            false => SqlitePoolOptions::new().max_connections(max_connections),
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        tracing::debug!("Connected");

        Ok(Self::new(pool))
    }

    #[tracing::instrument(name = "find_all_books", skip(self))]
    pub async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, BookRepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM books"));

        for (index, (column, value)) in filter.conditions().into_iter().enumerate() {
            builder
                .push(if index == 0 { " WHERE " } else { " AND " })
                .push(column)
                .push(" = ");

            push_bind(&mut builder, value);
        }

        builder.push(" ORDER BY isbn");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        tracing::trace!(count = books.len(), "Found");

        Ok(books)
    }

    #[tracing::instrument(name = "find_one_book", skip(self))]
    pub async fn find_one(&self, isbn: &str) -> Result<Book, BookRepositoryError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_owned()))
    }

    #[tracing::instrument(name = "create_book", skip_all, fields(isbn = %book.isbn))]
    pub async fn create(&self, book: NewBook) -> Result<Book, BookRepositoryError> {
        let isbn = book.isbn.clone();
        let book = Book::from(book);

        sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(book.isbn)
        .bind(book.amazon_url)
        .bind(book.author)
        .bind(book.language)
        .bind(book.pages)
        .bind(book.publisher)
        .bind(book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let is_unique_violation = matches!(
                &err,
                sqlx::Error::Database(db_err) if db_err.is_unique_violation()
            );

            match is_unique_violation {
                true => BookRepositoryError::Conflict(isbn),
                false => BookRepositoryError::Database(err),
            }
        })
    }

    /// Changes the supplied fields only.
    ///
    /// An empty update returns the book as it is.
    #[tracing::instrument(name = "update_book", skip(self))]
    pub async fn update(&self, isbn: &str, update: &BookUpdate) -> Result<Book, BookRepositoryError> {
        let changes = update.changes();

        if changes.is_empty() {
            tracing::debug!("Nothing to update");

            return self.find_one(isbn).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE books SET ");

        for (index, (column, value)) in changes.into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }

            builder.push(column).push(" = ");

            push_bind(&mut builder, value);
        }

        builder
            .push(" WHERE isbn = ")
            .push_bind(isbn.to_owned())
            .push(format!(" RETURNING {COLUMNS}"));

        builder
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_owned()))
    }

    #[tracing::instrument(name = "remove_book", skip(self))]
    pub async fn remove(&self, isbn: &str) -> Result<(), BookRepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        match result.rows_affected() {
            0 => Err(BookRepositoryError::NotFound(isbn.to_owned())),
            _ => Ok(()),
        }
    }
}

fn push_bind(builder: &mut QueryBuilder<'_, Sqlite>, value: ColumnValue) {
    match value {
        ColumnValue::Text(value) => builder.push_bind(value),
        ColumnValue::Integer(value) => builder.push_bind(value),
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn in_memory() -> BookRepository {
        BookRepository::connect("sqlite::memory:", 1)
            .await
            .expect("In-memory database is not available")
    }

    pub(crate) fn new_book(isbn: &str) -> NewBook {
        NewBook {
            isbn: isbn.into(),
            amazon_url: "http://a.co/eobPtX2".into(),
            author: "Matthew Lane".into(),
            language: "english".into(),
            pages: 264,
            publisher: "Princeton University Press".into(),
            title: "Power-Up: Unlocking the Hidden Mathematics in Video Games".into(),
            year: 2017,
        }
    }

    #[tokio::test]
    async fn created_book_can_be_found() {
        let books = in_memory().await;

        let created = books.create(new_book("0691161518")).await.expect("Create failed");
        let found = books.find_one("0691161518").await.expect("Find failed");

        assert_eq!(created, Book::from(new_book("0691161518")));
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let books = in_memory().await;

        books.create(new_book("1")).await.expect("Create failed");
        let err = books.create(new_book("1")).await.expect_err("Duplicate was created");

        assert!(matches!(err, BookRepositoryError::Conflict(isbn) if isbn == "1"));
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let books = in_memory().await;

        let err = books.find_one("999").await.expect_err("Book was found");

        assert!(matches!(err, BookRepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn find_all_applies_filters() {
        let books = in_memory().await;

        books.create(new_book("1")).await.expect("Create failed");
        books
            .create(NewBook {
                year: 1999,
                language: "german".into(),
                ..new_book("2")
            })
            .await
            .expect("Create failed");

        let all = books.find_all(&BookFilter::default()).await.expect("Find failed");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].isbn, "1");

        let filter = BookFilter {
            year: Some(1999),
            language: Some("german".into()),
            ..Default::default()
        };
        let filtered = books.find_all(&filter).await.expect("Find failed");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].isbn, "2");

        let filter = BookFilter {
            author: Some("Nobody".into()),
            ..Default::default()
        };
        assert!(books.find_all(&filter).await.expect("Find failed").is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let books = in_memory().await;
        books.create(new_book("1")).await.expect("Create failed");

        let update = BookUpdate {
            title: Some("X".into()),
            pages: Some(10),
            ..Default::default()
        };
        let updated = books.update("1", &update).await.expect("Update failed");

        assert_eq!(
            updated,
            Book {
                title: "X".into(),
                pages: 10,
                ..Book::from(new_book("1"))
            }
        );
        assert_eq!(books.find_one("1").await.expect("Find failed"), updated);
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let books = in_memory().await;

        let update = BookUpdate {
            title: Some("X".into()),
            ..Default::default()
        };

        let err = books.update("1", &update).await.expect_err("Update succeeded");
        assert!(matches!(err, BookRepositoryError::NotFound(_)));

        let err = books
            .update("1", &BookUpdate::default())
            .await
            .expect_err("Empty update succeeded");
        assert!(matches!(err, BookRepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn removed_book_is_not_found() {
        let books = in_memory().await;
        books.create(new_book("1")).await.expect("Create failed");

        books.remove("1").await.expect("Remove failed");

        assert!(matches!(
            books.find_one("1").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            books.remove("1").await,
            Err(BookRepositoryError::NotFound(_))
        ));
    }
}
