use crate::api::state::{ApiState, SERVICE_NAME, SERVICE_VERSION};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::trace;
use std::sync::Arc;

pub async fn handle_info(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "did": state.service.signer().did().to_string(),
        "version": SERVICE_VERSION,
    }))
}

pub async fn handle_health() -> impl IntoResponse {
    trace!("health check: ok");
    Json(serde_json::json!({
        "status": "healthy",
    }))
}

/// DID document for `did:web` resolution, so peers can verify UCANs signed
/// by this service against its published key.
pub async fn handle_did_document(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let signer = state.service.signer();
    let did = signer.did().to_string();
    let key_id = format!("{}#key-1", did);
    let mut key_multibase = vec![0xed, 0x01];
    key_multibase.extend_from_slice(&signer.verifying_key().to_bytes());

    Json(serde_json::json!({
        "@context": ["https://www.w3.org/ns/did/v1"],
        "id": did,
        "verificationMethod": [{
            "id": key_id,
            "type": "Ed25519VerificationKey2020",
            "controller": did,
            "publicKeyMultibase": format!("f{}", hex::encode(key_multibase)),
        }],
        "authentication": [key_id],
        "assertionMethod": [key_id],
    }))
}
