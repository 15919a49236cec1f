use log::debug;
use std::time::Duration;
use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::{Envelope, Invocation, Receipt};
use url::Url;

pub const CONTENT_TYPE_CBOR: &str = "application/cbor";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One UCAN-over-HTTP peer: invocations go out as execution-request
/// envelopes, receipts come back in the response envelope. The underlying
/// reqwest client pools connections and is safe for concurrent use.
pub struct UcanConnection {
    endpoint: Url,
    http: reqwest::Client,
}

impl UcanConnection {
    pub fn new(endpoint: Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Execute an invocation and return its receipt, blocks attached. The
    /// receipt's `out` is returned as-is; unwrapping success or failure is
    /// the caller's concern.
    pub async fn execute(&self, invocation: &Invocation) -> Result<Receipt> {
        let operation = invocation
            .capability()
            .map(|capability| capability.can.clone())
            .unwrap_or_else(|_| "ucan".to_string());
        let envelope = Envelope::execution_request(std::slice::from_ref(invocation));
        let body = envelope.encode()?;
        debug!(
            "executing invocation ability={} audience={} endpoint={} body_size={}",
            operation,
            invocation.audience(),
            self.endpoint,
            body.len()
        );

        let response = self
            .http
            .post(self.endpoint.as_str())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_CBOR)
            .body(body)
            .send()
            .await
            .map_err(|err| UploadError::upstream(&operation, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::upstream(&operation, format!("unexpected status {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| UploadError::upstream(&operation, err.to_string()))?;

        let envelope = Envelope::decode(&bytes)
            .map_err(|err| UploadError::upstream(&operation, err.to_string()))?;
        let receipt_link = envelope
            .receipt_link_for(invocation.link())
            .ok_or_else(|| UploadError::ReceiptMissing { invocation: invocation.link().to_string() })?;
        Receipt::read(receipt_link, envelope.blocks())
    }
}
