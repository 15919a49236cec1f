use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use rand::RngCore;

pub const CORRELATION_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct CorrelationId(pub String);

/// Assign every request a correlation id, honoring one supplied by the
/// caller, and echo it on the response.
pub async fn correlation_middleware(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(generate_id);
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

fn generate_id() -> String {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
