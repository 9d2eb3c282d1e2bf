use axum::extract::State;

use crate::{
    book::BookUpdate,
    error::{ApiError, ErrorVerbosityProvider},
    extractor::{path::ApiPath, validated::ValidatedJson},
    state::ApiState,
};

use super::BookResponse;

/// Updates the supplied fields of a book. The isbn must not be sent.
#[utoipa::path(
    put,
    path = "/books/{isbn}",
    tag = "books",
    params(("isbn" = String, Path, description = "ISBN of the book")),
    request_body = BookUpdate,
    responses(
        (status = 200, description = "The updated book", body = BookResponse),
        (status = 400, description = "Body contains the isbn or does not match the schema", body = ApiErrorResponse),
        (status = 404, description = "No book with this isbn", body = ApiErrorResponse),
    )
)]
pub async fn update_book(
    State(state): State<ApiState>,
    ApiPath(isbn): ApiPath<String>,
    ValidatedJson(update): ValidatedJson<BookUpdate>,
) -> Result<BookResponse, ApiError> {
    let book = state
        .books()
        .update(&isbn, &update)
        .await
        .map_err(|err| ApiError::from_repository_error(state.error_verbosity(), err))?;

    Ok(BookResponse { book })
}
