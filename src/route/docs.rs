use axum::Router;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    book::{Book, BookUpdate, NewBook},
    error::{ApiErrorBody, ApiErrorResponse},
    state::ApiState,
};

use super::books::{
    create_book::{self, CreateBookResponse},
    delete_book::{self, DeleteBookResponse},
    get_book,
    list_books::{self, BooksResponse},
    update_book, BookResponse,
};

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_books::list_books,
        get_book::get_book,
        create_book::create_book,
        update_book::update_book,
        delete_book::delete_book,
    ),
    components(schemas(
        Book,
        NewBook,
        BookUpdate,
        BookResponse,
        BooksResponse,
        CreateBookResponse,
        DeleteBookResponse,
        ApiErrorResponse,
        ApiErrorBody,
    )),
    tags((name = "books", description = "Book management"))
)]
pub struct ApiDoc;

/// Serves the OpenAPI document with Swagger UI, Redoc and RapiDoc.
pub fn app() -> Router<ApiState> {
    Router::<ApiState>::new()
        .merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new(OPENAPI_JSON_PATH).path("/rapidoc"))
}
