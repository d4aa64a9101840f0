use axum::{
    body::Bytes,
    extract::{
        Path, State,
        rejection::{BytesRejection, PathRejection},
    },
    http::StatusCode,
    response::Response,
};
use record_store::{Fields, RecordId, fields_from_json};
use serde_json::Value;
use tracing::field::Empty;
use tracing::{Span, debug, info, instrument, warn};

use crate::AppState;
use crate::envelope::{ApiError, Envelope, json_response};

/// Parses the `{id}` path segment.
///
/// Anything that is not an integer is a bad request. A negative or
/// oversized integer is well formed but can never name a record.
pub fn parse_record_id(raw: &str) -> Result<RecordId, ApiError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix(|c: char| c == '-' || c == '+')
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::invalid_id());
    }
    trimmed
        .parse::<RecordId>()
        .map_err(|_| ApiError::record_not_found(trimmed))
}

/// Resolves the `{id}` segment, turning extractor rejections (for example a
/// percent-encoded segment that is not UTF-8) into the same 400 as any other
/// malformed id.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<RecordId, ApiError> {
    let Path(raw_id) = path.map_err(|e| {
        debug!(error = %e, "Rejected id segment");
        ApiError::invalid_id()
    })?;
    Span::current().record("raw_id", raw_id.as_str());
    parse_record_id(&raw_id)
}

fn parse_fields(body: Result<Bytes, BytesRejection>) -> Result<Fields, ApiError> {
    let body = body.map_err(|e| {
        warn!(error = %e, "Failed to read request body");
        ApiError::invalid_body(e.body_text())
    })?;
    Span::current().record("payload_size_bytes", body.len());

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Invalid JSON payload");
        ApiError::invalid_json()
    })?;
    Ok(fields_from_json(payload)?)
}

#[instrument(skip(state), fields(count = Empty))]
pub async fn list_records(State(state): State<AppState>) -> Response {
    let records = state.store.list_all();
    Span::current().record("count", records.len());

    let count = records.len();
    json_response(StatusCode::OK, &Envelope::data(records).with_count(count))
}

#[instrument(skip(state, path), fields(raw_id = Empty))]
pub async fn get_record(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path)?;
    let record = state.store.get(id)?;
    Ok(json_response(StatusCode::OK, &Envelope::data(record)))
}

#[instrument(skip(state, body), fields(payload_size_bytes = Empty, id = Empty))]
pub async fn create_record(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let fields = parse_fields(body)?;
    let record = state.store.insert(fields);
    state.metrics.records_added(1);

    Span::current().record("id", record.id);
    info!(id = record.id, "Record created");

    Ok(json_response(
        StatusCode::CREATED,
        &Envelope::data(record).with_message("Record created successfully"),
    ))
}

#[instrument(skip(state, path, body), fields(raw_id = Empty, payload_size_bytes = Empty))]
pub async fn update_record(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path)?;

    // An unknown id wins over a bad body.
    let fields = match parse_fields(body) {
        Ok(fields) => fields,
        Err(_) if !state.store.contains(id) => return Err(ApiError::record_not_found(id)),
        Err(e) => return Err(e),
    };

    let record = state.store.update(id, fields)?;
    info!(id, "Record updated");

    Ok(json_response(
        StatusCode::OK,
        &Envelope::data(record).with_message("Record updated successfully"),
    ))
}

#[instrument(skip(state, path), fields(raw_id = Empty))]
pub async fn delete_record(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(path)?;
    state.store.delete(id)?;
    state.metrics.record_removed();
    info!(id, "Record deleted");

    Ok(json_response(
        StatusCode::OK,
        &Envelope::message_only(format!("Record {id} deleted successfully")),
    ))
}

pub async fn route_not_found() -> ApiError {
    debug!("No route matched");
    ApiError::endpoint_not_found()
}
