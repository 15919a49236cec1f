use crate::api::state::ApiState;
use crate::client::connection::CONTENT_TYPE_CBOR;
use crate::service::dispatcher::execute_envelope;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{debug, error};
use std::sync::Arc;

/// POST `/`: the UCAN envelope endpoint. Decodable envelopes always come
/// back 200 with per-invocation receipts; only envelope-level decoding
/// failures are non-2xx.
pub async fn handle_ucan(State(state): State<Arc<ApiState>>, body: Bytes) -> Response {
    match execute_envelope(&state.service, &body).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, CONTENT_TYPE_CBOR)], bytes).into_response(),
        Err(err @ stow_core::UploadError::EnvelopeDecode(_)) => {
            debug!("rejecting undecodable envelope: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err) => {
            error!("envelope execution failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
