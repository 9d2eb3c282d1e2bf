use axum::{
    async_trait,
    extract::{FromRequest, Json as AxumJson, Request},
};
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    error::{
        ApiError, BadRequestError, BodyError, ErrorVerbosity, ErrorVerbosityProvider,
        InternalServerError, ValidationError,
    },
    schema::{expected_schema, Payload, SchemaValidator},
};

/// Extracts the request body as JSON and validates it against the schema of `T`.
///
/// Checks run in order and the first failing one rejects the request:
///
/// 1. The body must be a JSON object, otherwise [`BodyError`].
/// 2. None of [`Payload::FORBIDDEN_FIELDS`] may be present, otherwise [`BadRequestError`].
/// 3. The body must match the structural JSON schema of `T`, otherwise [`ValidationError`].
/// 4. The field rules of `T` must hold, otherwise [`ValidationError`].
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Payload + Debug + Send,
    S: Send + Sync + ErrorVerbosityProvider,
{
    type Rejection = ApiError;

    #[tracing::instrument(name = "validated_json_extractor", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let verbosity = state.error_verbosity();

        let value = match AxumJson::<Value>::from_request(req, state).await {
            Ok(AxumJson(value)) => value,
            Err(json_rejection) => {
                tracing::warn!(rejection=?json_rejection, "Rejection");

                return Err(body_error::<T>(verbosity, json_rejection.body_text()));
            }
        };

        let Some(fields) = value.as_object() else {
            tracing::warn!("Rejection. Body is not a JSON object");

            return Err(body_error::<T>(
                verbosity,
                String::from("Expected a JSON object"),
            ));
        };

        if let Some(field) = T::forbidden_field(fields) {
            tracing::warn!(%field, "Rejection. Forbidden field");

            return Err(BadRequestError::new(verbosity, "Not allowed").into());
        }

        let validator = SchemaValidator::of::<T>()
            .map_err(|err| InternalServerError::from_generic_error(verbosity, err))?;

        let violations = validator.violations(&value);
        if !violations.is_empty() {
            tracing::warn!(?violations, "Schema violations");

            return Err(ValidationError::new(verbosity, violations).into());
        }

        let payload = serde_json::from_value::<T>(value).map_err(|err| {
            tracing::warn!(%err, "Rejection. Body does not deserialize");

            ValidationError::new(verbosity, vec![format!("instance: {err}")])
        })?;

        match payload.validate() {
            Ok(_) => {
                tracing::trace!(?payload, "Validated");

                Ok(ValidatedJson(payload))
            }
            Err(errors) => {
                tracing::warn!(?errors, "Validation errors");

                Err(ValidationError::from_validation_errors(verbosity, errors).into())
            }
        }
    }
}

fn body_error<T: Payload>(verbosity: ErrorVerbosity, body_error_reason: String) -> ApiError {
    if !verbosity.should_generate_error_reason() {
        return BodyError::new(verbosity, body_error_reason, None).into();
    }

    match expected_schema::<T>() {
        Ok(schema) => BodyError::new(verbosity, body_error_reason, Some(schema)).into(),
        Err(err) => InternalServerError::from_generic_error(verbosity, err).into(),
    }
}
