use clap::{Parser, Subcommand};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use stow_core::foundation::{Result, UploadError};
use stow_core::state::{MemoryStateStore, ProviderInfo, StateStore};
use stow_core::ucan::{Did, UcanSigner};
use stow_service::api::{run_server, ApiState};
use stow_service::client::IndexerClient;
use stow_service::config::Config;
use stow_service::service::Service;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "stow-service")]
#[command(about = "Content-addressed upload coordination service", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); LOG_LEVEL overrides.
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the upload service
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {}", err);
            std::process::exit(1);
        }
    };
    init_logging(&config, &cli.log_level);

    let result = match cli.command {
        Command::Serve => serve(config).await,
    };
    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

impl Cli {
    fn parse_args() -> Self {
        Self::parse()
    }
}

fn init_logging(config: &Config, cli_level: &str) {
    let level = if config.log_level.is_empty() { cli_level } else { &config.log_level };
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

async fn serve(config: Config) -> Result<()> {
    let signer = load_identity(&config)?;
    info!("service identity did={}", signer.did());

    let state: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    seed_provider(&config, &state)?;

    let indexer = build_indexer(&config, &signer);
    let service = Arc::new(Service::new(signer, state, indexer));

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .map_err(|err| UploadError::ConfigError(format!("bind address {}: {}", config.bind_addr(), err)))?;
    info!(
        "starting upload service addr={} piri_endpoint={} indexer_endpoint={}",
        addr, config.piri_endpoint, config.indexer_endpoint
    );
    run_server(addr, Arc::new(ApiState::new(service))).await
}

/// Service identity: the PEM key file wins over the base64 key; without
/// either a fresh key is generated. `SERVICE_DID` wraps the key in a
/// did:web alias so UCANs addressed to the did:web are accepted.
fn load_identity(config: &Config) -> Result<UcanSigner> {
    let mut signer = if !config.key_file.is_empty() {
        let signer = UcanSigner::from_pem_file(&config.key_file)?;
        info!("service identity loaded from key file {}", config.key_file);
        signer
    } else if !config.private_key.is_empty() {
        UcanSigner::from_base64(&config.private_key)?
    } else {
        warn!("no PRIVATE_KEY or KEY_FILE configured; generating a throwaway identity");
        UcanSigner::generate()
    };

    if !config.service_did.is_empty() {
        let alias: Did = config
            .service_did
            .parse()
            .map_err(|err: UploadError| UploadError::ConfigError(format!("SERVICE_DID: {}", err)))?;
        signer = signer.with_web_alias(alias);
    }
    Ok(signer)
}

fn seed_provider(config: &Config, state: &Arc<dyn StateStore>) -> Result<()> {
    if config.piri_did.is_empty() {
        warn!("PIRI_DID not configured; provider table starts empty");
        return Ok(());
    }
    state.put_provider(
        &config.piri_did,
        ProviderInfo {
            did: config.piri_did.clone(),
            endpoint: config.piri_endpoint.clone(),
            delegation: None,
        },
    )?;
    info!("seeded storage provider did={} endpoint={}", config.piri_did, config.piri_endpoint);
    Ok(())
}

fn build_indexer(config: &Config, signer: &UcanSigner) -> Option<IndexerClient> {
    if config.indexer_endpoint.is_empty() {
        return None;
    }
    let endpoint = match Url::parse(&config.indexer_endpoint) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            warn!("failed to parse indexer endpoint {}: {}", config.indexer_endpoint, err);
            return None;
        }
    };
    let indexer_did: Did = if !config.indexer_did.is_empty() {
        match config.indexer_did.parse::<Did>() {
            Ok(did) => did,
            Err(err) => {
                warn!("failed to parse indexer DID {}: {}", config.indexer_did, err);
                return None;
            }
        }
    } else {
        // Derive from the endpoint hostname when not configured explicitly.
        match endpoint.host_str() {
            Some(host) => Did::web(host),
            None => {
                warn!("indexer endpoint {} has no host; skipping indexer client", config.indexer_endpoint);
                return None;
            }
        }
    };

    info!("created indexer client endpoint={} did={}", config.indexer_endpoint, indexer_did);
    Some(IndexerClient::new(endpoint, indexer_did, signer.clone()))
}
