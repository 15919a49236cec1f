use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::Did;
use url::Url;

// libp2p protobuf framing for an ed25519 public key: field 1 (key type)
// = Ed25519, field 2 (data) = 32 key bytes.
const ED25519_PROTOBUF_PREFIX: [u8; 4] = [0x08, 0x01, 0x12, 0x20];
const IDENTITY_MULTIHASH_CODE: u8 = 0x00;

/// Derive a storage node's peer identifier from its DID. Only works for
/// ed25519 `did:key` nodes; the peer id is the identity multihash of the
/// protobuf-framed public key, rendered multibase base16.
pub fn peer_id_for_did(did: &Did) -> Result<String> {
    let key = did
        .public_key()
        .ok_or_else(|| UploadError::InvalidDid(format!("cannot derive peer id from {}", did)))?;
    let mut framed = Vec::with_capacity(ED25519_PROTOBUF_PREFIX.len() + key.len());
    framed.extend_from_slice(&ED25519_PROTOBUF_PREFIX);
    framed.extend_from_slice(&key);

    let mut multihash = Vec::with_capacity(2 + framed.len());
    multihash.push(IDENTITY_MULTIHASH_CODE);
    multihash.push(framed.len() as u8);
    multihash.extend_from_slice(&framed);
    Ok(format!("f{}", hex::encode(multihash)))
}

/// The two provider multiaddrs published per accept: one template for blob
/// retrieval, one for claim retrieval. The path templates are
/// percent-encoded and keep their literal `{blobCID}` / `{claim}`
/// placeholders for the indexer to fill in.
pub fn provider_addresses(endpoint: &Url, peer_id: &str) -> (String, String) {
    let host = endpoint.host_str().unwrap_or("localhost");
    let port = endpoint.port_or_known_default().unwrap_or(80);
    let blob = format!(
        "/dns4/{}/tcp/{}/http/p2p/{}/http-path/piece%2F%7BblobCID%7D",
        host, port, peer_id
    );
    let claim = format!(
        "/dns4/{}/tcp/{}/http/p2p/{}/http-path/claim%2F%7Bclaim%7D",
        host, port, peer_id
    );
    (blob, claim)
}
