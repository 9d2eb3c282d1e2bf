use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    book::{Book, NewBook},
    error::{ApiError, ErrorVerbosityProvider},
    extractor::validated::ValidatedJson,
    state::ApiState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBookResponse {
    pub book: Book,
}

impl IntoResponse for CreateBookResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

/// Creates a book from a full record.
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = NewBook,
    responses(
        (status = 201, description = "The created book", body = CreateBookResponse),
        (status = 400, description = "Body does not match the schema", body = ApiErrorResponse),
        (status = 409, description = "A book with this isbn already exists", body = ApiErrorResponse),
    )
)]
pub async fn create_book(
    State(state): State<ApiState>,
    ValidatedJson(new_book): ValidatedJson<NewBook>,
) -> Result<CreateBookResponse, ApiError> {
    let book = state
        .books()
        .create(new_book)
        .await
        .map_err(|err| ApiError::from_repository_error(state.error_verbosity(), err))?;

    tracing::info!(isbn = %book.isbn, "Book created");

    Ok(CreateBookResponse { book })
}
