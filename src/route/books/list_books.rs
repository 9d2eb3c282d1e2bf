use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    book::{Book, BookFilter},
    error::{ApiError, ErrorVerbosityProvider},
    extractor::query::ApiQuery,
    state::ApiState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}

impl IntoResponse for BooksResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Lists all books matching the query filters.
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookFilter),
    responses(
        (status = 200, description = "Matching books", body = BooksResponse),
        (status = 400, description = "Unknown or malformed filter", body = ApiErrorResponse),
    )
)]
pub async fn list_books(
    State(state): State<ApiState>,
    ApiQuery(filter): ApiQuery<BookFilter>,
) -> Result<BooksResponse, ApiError> {
    let books = state
        .books()
        .find_all(&filter)
        .await
        .map_err(|err| ApiError::from_repository_error(state.error_verbosity(), err))?;

    Ok(BooksResponse { books })
}
