use stow_core::foundation::Result;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PIRI_ENDPOINT_ENV: &str = "PIRI_ENDPOINT";
pub const PIRI_DID_ENV: &str = "PIRI_DID";
pub const INDEXER_ENDPOINT_ENV: &str = "INDEXER_ENDPOINT";
pub const INDEXER_DID_ENV: &str = "INDEXER_DID";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const KEY_FILE_ENV: &str = "KEY_FILE";
pub const SERVICE_DID_ENV: &str = "SERVICE_DID";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DYNAMODB_ENDPOINT_ENV: &str = "DYNAMODB_ENDPOINT";
pub const DYNAMODB_REGION_ENV: &str = "DYNAMODB_REGION";
pub const DYNAMODB_PROVIDER_TABLE_ENV: &str = "DYNAMODB_PROVIDER_TABLE";
pub const DYNAMODB_ALLOCATIONS_TABLE_ENV: &str = "DYNAMODB_ALLOCATIONS_TABLE";
pub const DYNAMODB_RECEIPTS_TABLE_ENV: &str = "DYNAMODB_RECEIPTS_TABLE";

/// Service configuration, loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of the storage node uploads are routed to.
    pub piri_endpoint: String,
    /// DID of the storage node; when set, a provider record is seeded at startup.
    pub piri_did: String,
    pub indexer_endpoint: String,
    /// DID of the indexer; derived from the endpoint hostname when blank.
    pub indexer_did: String,
    /// Base64-encoded ed25519 seed for the service identity.
    pub private_key: String,
    /// PEM key file path; takes precedence over `private_key`.
    pub key_file: String,
    /// did:web alias presented as the service issuer.
    pub service_did: String,
    pub log_level: String,
    /// Recognized for deployments with a durable backend; the in-memory
    /// store ignores them.
    pub dynamodb_endpoint: String,
    pub dynamodb_region: String,
    pub dynamodb_provider_table: String,
    pub dynamodb_allocations_table: String,
    pub dynamodb_receipts_table: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let port = env_trimmed(PORT_ENV)
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Self {
            host: env_or(HOST_ENV, "0.0.0.0"),
            port,
            piri_endpoint: env_or(PIRI_ENDPOINT_ENV, "http://piri:3000"),
            piri_did: env_or(PIRI_DID_ENV, ""),
            indexer_endpoint: env_or(INDEXER_ENDPOINT_ENV, "http://indexer:9000"),
            indexer_did: env_or(INDEXER_DID_ENV, ""),
            private_key: env_or(PRIVATE_KEY_ENV, ""),
            key_file: env_or(KEY_FILE_ENV, ""),
            service_did: env_or(SERVICE_DID_ENV, ""),
            log_level: env_or(LOG_LEVEL_ENV, "info"),
            dynamodb_endpoint: env_or(DYNAMODB_ENDPOINT_ENV, "http://dynamodb-local:8000"),
            dynamodb_region: env_or(DYNAMODB_REGION_ENV, "us-west-1"),
            dynamodb_provider_table: env_or(DYNAMODB_PROVIDER_TABLE_ENV, "delegator-provider-info"),
            dynamodb_allocations_table: env_or(DYNAMODB_ALLOCATIONS_TABLE_ENV, "upload-allocations"),
            dynamodb_receipts_table: env_or(DYNAMODB_RECEIPTS_TABLE_ENV, "upload-receipts"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn env_or(key: &str, default: &str) -> String {
    env_trimmed(key).unwrap_or_else(|| default.to_string())
}
