use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::BookRepositoryError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ErrorVerbosity {
    /// Server returns the status code, the body only repeats it.
    StatusCode,
    /// Server returns the message and the status code.
    ///
    /// Violation lists are collapsed into a generic message.
    Message,
    /// Server returns the message, the status code and any available details
    /// (violation lists, error reasons and expected schemas).
    #[default]
    Full,
}

impl ErrorVerbosity {
    pub fn should_generate_message(&self) -> bool {
        matches!(self, ErrorVerbosity::Message | ErrorVerbosity::Full)
    }

    pub fn should_generate_error_reason(&self) -> bool {
        matches!(self, ErrorVerbosity::Full)
    }
}

pub trait ErrorVerbosityProvider {
    fn error_verbosity(&self) -> ErrorVerbosity;
}

/// Error message. Either a plain text or a list of violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(Cow<'static, str>),
    Violations(Vec<String>),
}

/// Response body of every error.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    /// A message or a list of violations, omitted with [`ErrorVerbosity::StatusCode`].
    #[schema(value_type = Object)]
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<ErrorMessage>,
    /// The HTTP status code.
    status: u16,
    /// Details about the failure, only set with [`ErrorVerbosity::Full`].
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    /// The expected schema as YAML, only set with [`ErrorVerbosity::Full`].
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_schema: Option<String>,
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        let status = error.status_code().as_u16();
        let message = match error.verbosity().should_generate_message() {
            true => Some(error.message()),
            false => None,
        };
        let (reason, expected_schema) = error.into_details();

        ApiErrorResponse {
            error: ApiErrorBody {
                message,
                status,
                reason,
                expected_schema,
            },
        }
    }
}

#[derive(Debug, From)]
/// API error
///
/// Every failure of a request ends up here and is rendered into an [`ApiErrorResponse`].
pub enum ApiError {
    /// Internal server error
    ///
    /// Returned when the storage fails or anything else unexpected happens.
    InternalServerError(InternalServerError),
    /// Query error
    ///
    /// Returned when the query parameters are not as expected.
    Query(QueryError),
    /// Body error
    ///
    /// Returned when the body is not a JSON object.
    Body(BodyError),
    /// Path error
    ///
    /// Returned when the path is not as expected.
    Path(PathError),
    /// Validation error
    ///
    /// Returned when the body does not conform to the schema.
    Validation(ValidationError),
    /// Bad request
    ///
    /// Returned when the body contains a field that must not be sent.
    BadRequest(BadRequestError),
    /// Not found error
    ///
    /// Returned when the requested resource or route does not exist.
    NotFound(NotFoundError),
    /// Conflict error
    ///
    /// Returned when a resource with the same identifier already exists.
    Conflict(ConflictError),
    /// Method not allowed
    MethodNotAllowed(MethodNotAllowedError),
}

impl ApiError {
    /// Maps a storage failure to the nearest error kind.
    pub fn from_repository_error(verbosity: ErrorVerbosity, err: BookRepositoryError) -> Self {
        match err {
            BookRepositoryError::NotFound(isbn) => NotFoundError::new(
                verbosity,
                format!("There is no book with an isbn '{isbn}'"),
            )
            .into(),
            BookRepositoryError::Conflict(isbn) => ConflictError::new(
                verbosity,
                format!("A book with an isbn '{isbn}' already exists"),
            )
            .into(),
            BookRepositoryError::Database(err) => {
                InternalServerError::from_generic_error(verbosity, err).into()
            }
        }
    }

    fn verbosity(&self) -> ErrorVerbosity {
        match self {
            ApiError::InternalServerError(err) => err.verbosity,
            ApiError::Query(err) => err.verbosity,
            ApiError::Body(err) => err.verbosity,
            ApiError::Path(err) => err.verbosity,
            ApiError::Validation(err) => err.verbosity,
            ApiError::BadRequest(err) => err.verbosity,
            ApiError::NotFound(err) => err.verbosity,
            ApiError::Conflict(err) => err.verbosity,
            ApiError::MethodNotAllowed(err) => err.verbosity,
        }
    }

    fn message(&self) -> ErrorMessage {
        let text = match self {
            ApiError::InternalServerError(_) => "An internal server error has occurred",
            ApiError::Query(_) => "Failed to parse query parameters",
            ApiError::Body(_) => "Failed to parse request body",
            ApiError::Path(_) => "Failed to parse path parameters",
            ApiError::Validation(err) => match &err.violations {
                Some(violations) => return ErrorMessage::Violations(violations.clone()),
                None => "Request body does not match the expected schema",
            },
            ApiError::BadRequest(err) => return ErrorMessage::Text(err.message.clone()),
            ApiError::NotFound(err) => return ErrorMessage::Text(err.message.clone()),
            ApiError::Conflict(err) => return ErrorMessage::Text(err.message.clone()),
            ApiError::MethodNotAllowed(_) => "Method not allowed",
        };

        ErrorMessage::Text(Cow::Borrowed(text))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Query(_)
            | ApiError::Body(_)
            | ApiError::Path(_)
            | ApiError::Validation(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Returns the reason and the expected schema, if any.
    fn into_details(self) -> (Option<String>, Option<String>) {
        match self {
            ApiError::InternalServerError(err) => (err.reason, None),
            ApiError::Query(err) => (err.query_error_reason, err.query_expected_schema),
            ApiError::Body(err) => (err.body_error_reason, err.body_expected_schema),
            ApiError::Path(err) => (err.path_error_reason, None),
            _ => (None, None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        (status_code, Json(ApiErrorResponse::from(self))).into_response()
    }
}

#[derive(Debug)]
pub struct InternalServerError {
    verbosity: ErrorVerbosity,
    reason: Option<String>,
}

impl InternalServerError {
    pub fn from_generic_error<E: Into<anyhow::Error>>(verbosity: ErrorVerbosity, err: E) -> Self {
        let err: anyhow::Error = err.into();
        let err = format!("{err:#}");
        tracing::error!(%err, "Internal server error");

        let reason = verbosity.should_generate_error_reason().then_some(err);

        InternalServerError { verbosity, reason }
    }
}

#[derive(Debug)]
pub struct QueryError {
    verbosity: ErrorVerbosity,
    query_error_reason: Option<String>,
    query_expected_schema: Option<String>,
}

impl QueryError {
    pub fn new(
        verbosity: ErrorVerbosity,
        query_error_reason: String,
        query_expected_schema: Option<String>,
    ) -> Self {
        let (query_error_reason, query_expected_schema) =
            match verbosity.should_generate_error_reason() {
                true => (Some(query_error_reason), query_expected_schema),
                false => (None, None),
            };

        QueryError {
            verbosity,
            query_error_reason,
            query_expected_schema,
        }
    }
}

#[derive(Debug)]
pub struct BodyError {
    verbosity: ErrorVerbosity,
    body_error_reason: Option<String>,
    body_expected_schema: Option<String>,
}

impl BodyError {
    pub fn new(
        verbosity: ErrorVerbosity,
        body_error_reason: String,
        body_expected_schema: Option<String>,
    ) -> Self {
        let (body_error_reason, body_expected_schema) =
            match verbosity.should_generate_error_reason() {
                true => (Some(body_error_reason), body_expected_schema),
                false => (None, None),
            };

        BodyError {
            verbosity,
            body_error_reason,
            body_expected_schema,
        }
    }
}

#[derive(Debug)]
pub struct PathError {
    verbosity: ErrorVerbosity,
    path_error_reason: Option<String>,
}

impl PathError {
    pub fn new(verbosity: ErrorVerbosity, path_error_reason: String) -> Self {
        let path_error_reason = verbosity
            .should_generate_error_reason()
            .then_some(path_error_reason);

        PathError {
            verbosity,
            path_error_reason,
        }
    }
}

#[derive(Debug)]
pub struct ValidationError {
    verbosity: ErrorVerbosity,
    violations: Option<Vec<String>>,
}

impl ValidationError {
    /// `violations` must not be empty.
    pub fn new(verbosity: ErrorVerbosity, violations: Vec<String>) -> Self {
        let violations = verbosity
            .should_generate_error_reason()
            .then_some(violations);

        ValidationError {
            verbosity,
            violations,
        }
    }

    pub fn from_validation_errors(
        verbosity: ErrorVerbosity,
        errors: validator::ValidationErrors,
    ) -> Self {
        Self::new(verbosity, crate::schema::field_violations(&errors))
    }
}

#[derive(Debug)]
pub struct BadRequestError {
    verbosity: ErrorVerbosity,
    message: Cow<'static, str>,
}

impl BadRequestError {
    pub fn new(verbosity: ErrorVerbosity, message: impl Into<Cow<'static, str>>) -> Self {
        BadRequestError {
            verbosity,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct NotFoundError {
    verbosity: ErrorVerbosity,
    message: Cow<'static, str>,
}

impl NotFoundError {
    pub fn new(verbosity: ErrorVerbosity, message: impl Into<Cow<'static, str>>) -> Self {
        NotFoundError {
            verbosity,
            message: message.into(),
        }
    }

    /// The requested route does not exist.
    pub fn route(verbosity: ErrorVerbosity) -> Self {
        Self::new(verbosity, "The requested resource was not found")
    }
}

#[derive(Debug)]
pub struct ConflictError {
    verbosity: ErrorVerbosity,
    message: Cow<'static, str>,
}

impl ConflictError {
    pub fn new(verbosity: ErrorVerbosity, message: impl Into<Cow<'static, str>>) -> Self {
        ConflictError {
            verbosity,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct MethodNotAllowedError {
    verbosity: ErrorVerbosity,
}

impl MethodNotAllowedError {
    pub fn new(verbosity: ErrorVerbosity) -> Self {
        MethodNotAllowedError { verbosity }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{json, Value};

    use super::*;

    async fn render(error: ApiError) -> (StatusCode, Option<Value>) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Body is not readable")
            .to_bytes();

        let body = (!bytes.is_empty())
            .then(|| serde_json::from_slice(&bytes).expect("Body is not JSON"));

        (status, body)
    }

    #[tokio::test]
    async fn bad_request_renders_message_and_status() {
        let error = BadRequestError::new(ErrorVerbosity::Full, "Not allowed").into();

        let (status, body) = render(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            Some(json!({"error": {"message": "Not allowed", "status": 400}}))
        );
    }

    #[tokio::test]
    async fn full_verbosity_lists_violations() {
        let violations = vec!["instance: \"isbn\" is a required property".to_string()];
        let error = ValidationError::new(ErrorVerbosity::Full, violations.clone()).into();

        let (status, body) = render(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.expect("Body is missing")["error"]["message"],
            json!(violations)
        );
    }

    #[tokio::test]
    async fn message_verbosity_hides_violations_and_reasons() {
        let error = ValidationError::new(ErrorVerbosity::Message, vec!["violation".into()]).into();
        let (_, body) = render(error).await;
        assert!(body.expect("Body is missing")["error"]["message"].is_string());

        let error =
            InternalServerError::from_generic_error(ErrorVerbosity::Message, anyhow::anyhow!("boom"))
                .into();
        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.expect("Body is missing")["error"].get("reason").is_none());
    }

    #[tokio::test]
    async fn status_code_verbosity_renders_only_the_status() {
        let error = NotFoundError::route(ErrorVerbosity::StatusCode).into();
        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Some(json!({"error": {"status": 404}})));

        let error = InternalServerError::from_generic_error(
            ErrorVerbosity::StatusCode,
            anyhow::anyhow!("boom"),
        )
        .into();
        let (status, body) = render(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, Some(json!({"error": {"status": 500}})));
    }

    #[tokio::test]
    async fn repository_errors_map_to_status_codes() {
        let verbosity = ErrorVerbosity::Full;

        let not_found =
            ApiError::from_repository_error(verbosity, BookRepositoryError::NotFound("1".into()));
        let conflict =
            ApiError::from_repository_error(verbosity, BookRepositoryError::Conflict("1".into()));
        let database = ApiError::from_repository_error(
            verbosity,
            BookRepositoryError::Database(sqlx::Error::RowNotFound),
        );

        assert_eq!(render(not_found).await.0, StatusCode::NOT_FOUND);
        assert_eq!(render(conflict).await.0, StatusCode::CONFLICT);

        let (status, body) = render(database).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.expect("Body is missing")["error"]["reason"].is_string());
    }
}
