use crate::api::state::ApiState;
use crate::client::connection::CONTENT_TYPE_CBOR;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use log::{debug, error};
use std::sync::Arc;
use stow_core::state::StateStore as _;
use stow_core::ucan::Envelope;

/// GET `/receipt/:cid`: look up the stored receipt by task CID and return
/// it as a self-contained envelope with every attached block.
pub async fn handle_receipt(State(state): State<Arc<ApiState>>, Path(cid): Path<String>) -> Response {
    let stored = match state.service.state().get_receipt(&cid) {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            debug!("receipt not found task={}", cid);
            return (StatusCode::NOT_FOUND, "receipt not found").into_response();
        }
        Err(err) => {
            error!("receipt lookup failed task={} error={}", cid, err);
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let mut envelope = Envelope::new();
    envelope.add_receipt(stored.task.clone(), &stored.receipt);
    envelope.attach(&stored.blocks);
    match envelope.encode() {
        Ok(bytes) => ([(header::CONTENT_TYPE, CONTENT_TYPE_CBOR)], bytes).into_response(),
        Err(err) => {
            error!("receipt envelope encode failed task={} error={}", cid, err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
