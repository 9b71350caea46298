use super::app_error::{AppError, ErrorsResponse};
use super::state::HttpServerState;
use crate::datamodel::{IndicatorDocument, StatusUpdate, read_document_json, validate};
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use tracing::debug;

/// Register or refresh an indicator document.
///
/// The document is validated as a whole, every validation error is returned.
/// Registering the same product and labels again replaces the previous
/// document and resets its expiry.
#[utoipa::path(
    post,
    path = "/v1/register",
    tag = "Registry",
    request_body = IndicatorDocument,
    responses(
        (status = 200, description = "Document registered", body = Object),
        (status = 400, description = "Malformed document", body = ErrorsResponse),
        (status = 422, description = "Invalid document", body = ErrorsResponse),
    )
)]
pub async fn register(
    State(state): State<HttpServerState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    let body = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let mut document = read_document_json(&body).map_err(AppError::bad_request)?;

    let errors = validate(&document);
    if !errors.is_empty() {
        return Err(AppError::unprocessable(errors));
    }

    document.uid = document.uid();
    for indicator in document.spec.indicators.iter_mut() {
        indicator.status = None;
    }
    debug!(uid = %document.uid, product = %document.product_name(), "registered document");
    state.document_store.upsert(document);

    Ok(Json(json!({})))
}

/// List the registered documents, with the last known status of each indicator.
#[utoipa::path(
    get,
    path = "/v1/indicator-documents",
    tag = "Registry",
    responses(
        (status = 200, description = "Registered documents", body = Vec<IndicatorDocument>)
    )
)]
pub async fn list_documents(
    State(state): State<HttpServerState>,
) -> Result<Json<Vec<IndicatorDocument>>, AppError> {
    let documents = state
        .document_store
        .all()
        .into_iter()
        .map(|mut document| {
            let uid = document.uid();
            for indicator in document.spec.indicators.iter_mut() {
                indicator.status = state.status_store.status_for(&uid, &indicator.name).ok();
            }
            document.uid = uid;
            document
        })
        .collect();

    Ok(Json(documents))
}

/// Record the status of several indicators of one document.
#[utoipa::path(
    post,
    path = "/v1/indicator-documents/{uid}/bulk_status",
    tag = "Registry",
    request_body = Vec<StatusUpdate>,
    params(
        ("uid" = String, Path, description = "Document identifier"),
    ),
    responses(
        (status = 200, description = "Statuses recorded", body = Object),
        (status = 400, description = "Malformed body", body = ErrorsResponse),
    )
)]
pub async fn bulk_status(
    State(state): State<HttpServerState>,
    Path(uid): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    let body = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let updates: Vec<StatusUpdate> = serde_json::from_slice(&body)
        .map_err(|error| AppError::bad_request(format!("could not unmarshal statuses: {}", error)))?;

    for update in updates {
        state
            .status_store
            .update_status(&uid, &update.name, Some(update.status));
    }

    Ok(Json(json!({})))
}
