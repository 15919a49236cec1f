use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_cbor::Value;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use stow_core::capability::blob::{
    AcceptCaveats, AcceptOk, AllocateCaveats, AllocateOk, ACCEPT_ABILITY, ALLOCATE_ABILITY,
};
use stow_core::capability::{decode_caveats, encode_caveats, UploadAddress};
use stow_core::state::{MemoryStateStore, ProviderInfo, StateStore};
use stow_core::ucan::{
    BlockMap, Capability, Cid, Delegation, Did, Effects, Envelope, Invocation, OutResult, Receipt, UcanSigner,
};
use stow_service::api::{build_router, ApiState};
use stow_service::client::{IndexerClient, UcanConnection};
use stow_service::service::Service;
use url::Url;

pub const LOCATION_ABILITY: &str = "assert/location";

struct NodeInner {
    allocate_requests: Vec<AllocateCaveats>,
    accept_requests: Vec<AcceptCaveats>,
    claims: HashMap<String, Delegation>,
    upload_url: Option<String>,
}

/// In-process storage node speaking the UCAN envelope protocol: answers
/// `blob/allocate` with an upload address and `blob/accept` with a
/// location-claim delegation, recording every request for assertions.
pub struct MockStorageNode {
    signer: UcanSigner,
    inner: Mutex<NodeInner>,
}

impl MockStorageNode {
    pub fn new() -> Self {
        Self {
            signer: UcanSigner::generate(),
            inner: Mutex::new(NodeInner {
                allocate_requests: Vec::new(),
                accept_requests: Vec::new(),
                claims: HashMap::new(),
                upload_url: Some("http://piri/upload/abc".to_string()),
            }),
        }
    }

    pub fn did(&self) -> Did {
        self.signer.did()
    }

    pub fn allocate_count(&self) -> usize {
        self.inner.lock().expect("node lock").allocate_requests.len()
    }

    pub fn accept_count(&self) -> usize {
        self.inner.lock().expect("node lock").accept_requests.len()
    }

    pub fn accept_requests(&self) -> Vec<AcceptCaveats> {
        self.inner.lock().expect("node lock").accept_requests.clone()
    }

    /// Link of the location claim issued for a digest, once accepted.
    pub fn claim_link(&self, digest_hex: &str) -> Option<Cid> {
        self.inner
            .lock()
            .expect("node lock")
            .claims
            .get(digest_hex)
            .map(|claim| claim.link().clone())
    }

    fn allocate_receipt(&self, invocation: &Invocation, capability: &Capability) -> Receipt {
        let caveats: AllocateCaveats =
            decode_caveats(ALLOCATE_ABILITY, &capability.nb).expect("allocate caveats");
        let mut inner = self.inner.lock().expect("node lock");
        let address = inner.upload_url.clone().map(|url| UploadAddress {
            url,
            headers: BTreeMap::new(),
            expires: None,
        });
        let ok = AllocateOk { size: caveats.blob.size, address };
        inner.allocate_requests.push(caveats);
        Receipt::issue(
            &self.signer,
            invocation.link().clone(),
            OutResult::ok(encode_caveats(ALLOCATE_ABILITY, &ok).expect("allocate ok")),
            Effects::default(),
            BlockMap::new(),
        )
        .expect("allocate receipt")
    }

    fn accept_receipt(&self, invocation: &Invocation, capability: &Capability) -> Receipt {
        let caveats: AcceptCaveats = decode_caveats(ACCEPT_ABILITY, &capability.nb).expect("accept caveats");
        let digest_hex = caveats.blob.digest_hex();
        let mut inner = self.inner.lock().expect("node lock");
        // same digest, same claim: accept is idempotent
        let claim = inner
            .claims
            .entry(digest_hex)
            .or_insert_with(|| {
                let mut nb = BTreeMap::new();
                nb.insert(Value::Text("space".to_string()), Value::Text(caveats.space.clone()));
                Delegation::build(&self.signer, self.signer.did())
                    .capability(Capability::new(
                        LOCATION_ABILITY,
                        self.signer.did().to_string(),
                        Value::Map(nb),
                    ))
                    .issue()
                    .expect("location claim")
            })
            .clone();
        inner.accept_requests.push(caveats);

        let ok = AcceptOk { site: claim.link().clone() };
        Receipt::issue(
            &self.signer,
            invocation.link().clone(),
            OutResult::ok(encode_caveats(ACCEPT_ABILITY, &ok).expect("accept ok")),
            Effects::default(),
            claim.export(),
        )
        .expect("accept receipt")
    }
}

async fn handle_node(State(node): State<Arc<MockStorageNode>>, body: Bytes) -> Response {
    let request = Envelope::decode(&body).expect("node request envelope");
    let mut response = Envelope::new();
    for link in &request.invocations {
        let invocation = Invocation::read(link, request.blocks()).expect("node invocation");
        let capability = invocation.capability().expect("node capability").clone();
        let receipt = match capability.can.as_str() {
            ALLOCATE_ABILITY => node.allocate_receipt(&invocation, &capability),
            ACCEPT_ABILITY => node.accept_receipt(&invocation, &capability),
            other => panic!("mock node got unexpected ability {}", other),
        };
        response.add_receipt(link.clone(), &receipt);
    }
    let bytes = response.encode().expect("node response envelope");
    ([(header::CONTENT_TYPE, "application/cbor")], bytes).into_response()
}

/// One invocation as seen by the mock indexer, with the envelope block set
/// it arrived in so proof chains can be inspected.
#[derive(Clone)]
pub struct RecordedInvocation {
    pub ability: String,
    pub with: String,
    pub nb: Value,
    pub facts: BTreeMap<String, Value>,
    pub proofs: Vec<Cid>,
    pub blocks: BlockMap,
}

/// In-process indexer: acknowledges every invocation and records it.
pub struct MockIndexer {
    signer: UcanSigner,
    recorded: Mutex<Vec<RecordedInvocation>>,
}

impl MockIndexer {
    pub fn new() -> Self {
        Self { signer: UcanSigner::generate(), recorded: Mutex::new(Vec::new()) }
    }

    pub fn did(&self) -> Did {
        self.signer.did()
    }

    pub fn recorded(&self) -> Vec<RecordedInvocation> {
        self.recorded.lock().expect("indexer lock").clone()
    }

    pub fn recorded_by_ability(&self, ability: &str) -> Vec<RecordedInvocation> {
        self.recorded()
            .into_iter()
            .filter(|entry| entry.ability == ability)
            .collect()
    }
}

async fn handle_indexer(State(indexer): State<Arc<MockIndexer>>, body: Bytes) -> Response {
    let request = Envelope::decode(&body).expect("indexer request envelope");
    let mut response = Envelope::new();
    for link in &request.invocations {
        let invocation = Invocation::read(link, request.blocks()).expect("indexer invocation");
        let capability = invocation.capability().expect("indexer capability").clone();
        indexer.recorded.lock().expect("indexer lock").push(RecordedInvocation {
            ability: capability.can.clone(),
            with: capability.with.clone(),
            nb: capability.nb.clone(),
            facts: invocation.facts().clone(),
            proofs: invocation.as_delegation().proofs().to_vec(),
            blocks: request.blocks().clone(),
        });
        let receipt = Receipt::issue(
            &indexer.signer,
            invocation.link().clone(),
            OutResult::ok_empty(),
            Effects::default(),
            BlockMap::new(),
        )
        .expect("indexer receipt");
        response.add_receipt(link.clone(), &receipt);
    }
    let bytes = response.encode().expect("indexer response envelope");
    ([(header::CONTENT_TYPE, "application/cbor")], bytes).into_response()
}

async fn spawn_router(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    Url::parse(&format!("http://{}", addr)).expect("url")
}

/// A full in-process deployment: the service under test plus its mock
/// storage node and indexer, each on an ephemeral port.
pub struct TestHarness {
    pub node: Arc<MockStorageNode>,
    pub indexer: Arc<MockIndexer>,
    pub state: Arc<MemoryStateStore>,
    pub service_url: Url,
    pub service_did: Did,
}

impl TestHarness {
    pub async fn start() -> Self {
        Self::start_configured(true).await
    }

    /// `seed_provider = false` leaves the provider table empty.
    pub async fn start_configured(seed_provider: bool) -> Self {
        let node = Arc::new(MockStorageNode::new());
        let node_url = spawn_router(
            Router::new().route("/", post(handle_node)).with_state(node.clone()),
        )
        .await;

        let indexer = Arc::new(MockIndexer::new());
        let indexer_url = spawn_router(
            Router::new().route("/", post(handle_indexer)).with_state(indexer.clone()),
        )
        .await;

        let signer = UcanSigner::generate();
        let service_did = signer.did();
        let state = Arc::new(MemoryStateStore::new());
        if seed_provider {
            state
                .put_provider(
                    &node.did().to_string(),
                    ProviderInfo {
                        did: node.did().to_string(),
                        endpoint: node_url.to_string(),
                        delegation: None,
                    },
                )
                .expect("seed provider");
        }

        let indexer_client = IndexerClient::new(indexer_url, indexer.did(), signer.clone());
        let store: Arc<dyn StateStore> = state.clone();
        let service = Arc::new(Service::new(signer, store, Some(indexer_client)));
        let service_url =
            spawn_router(build_router(Arc::new(ApiState::new(service)))).await;

        Self { node, indexer, state, service_url, service_did }
    }

    /// Execute one invocation against the service and return its receipt
    /// with the full response block set attached.
    pub async fn execute(&self, invocation: &Invocation) -> Receipt {
        UcanConnection::new(self.service_url.clone())
            .execute(invocation)
            .await
            .expect("execute invocation")
    }

    /// GET /receipt/:cid, decoded. `None` on 404.
    pub async fn fetch_receipt(&self, task: &Cid) -> Option<Receipt> {
        let url = format!("{}receipt/{}", self.service_url, task);
        let response = reqwest::get(&url).await.expect("receipt request");
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return None;
        }
        assert!(response.status().is_success(), "unexpected status {}", response.status());
        let bytes = response.bytes().await.expect("receipt body");
        let envelope = Envelope::decode(&bytes).expect("receipt envelope");
        let link = envelope.receipt_link_for(task).expect("receipt link for task").clone();
        Some(Receipt::read(&link, envelope.blocks()).expect("read receipt"))
    }
}
