use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Error body shared by every JSON route.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorsResponse {
    #[schema(example = json!(["product name is required"]))]
    pub errors: Vec<String>,
}

// Anyhow error handling with axum
// https://github.com/tokio-rs/axum/blob/d3112a40d55f123bc5e65f995e2068e245f12055/examples/anyhow-error-response/src/main.rs
#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    BadRequest(Vec<String>),
    UnprocessableEntity(Vec<String>),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, errors) = match self {
            AppError::InternalServerError(error) => {
                error!("Internal Server Error: {:?}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["Internal Server Error".to_string()],
                )
            }
            AppError::BadRequest(errors) => (StatusCode::BAD_REQUEST, errors),
            AppError::UnprocessableEntity(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors),
        };
        (status, Json(ErrorsResponse { errors })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl AppError {
    pub fn bad_request(err: impl ToString) -> Self {
        Self::BadRequest(vec![err.to_string()])
    }

    pub fn unprocessable<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: ToString,
    {
        Self::UnprocessableEntity(errors.into_iter().map(|e| e.to_string()).collect())
    }
}
