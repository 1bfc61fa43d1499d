use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use relayprobe::clients::blob::{AzureBlobConnector, BlobConnector, BlobContainer};
use relayprobe::engine::Engine;
use relayprobe::engine::interpreter::Interpreter;
use relayprobe::handlers::{HandlerRegistry, HandlerSettings, InboundRequest};

const ETAG: &str = "\"0x8DC0FFEE\"";

/// In-memory stand-in for a blob service account at `/acct`.
#[derive(Default)]
struct FakeAccount {
    containers: HashSet<String>,
    blobs: HashMap<(String, String), Vec<u8>>,
    blob_types: Vec<String>,
}

type Shared = Arc<Mutex<FakeAccount>>;

async fn blob_service(
    State(account): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = uri.query().unwrap_or_default().to_string();
    if !query.split('&').any(|p| p == "sig=x") {
        return (StatusCode::FORBIDDEN, "AuthenticationFailed").into_response();
    }
    let segments: Vec<String> = uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();

    let mut account = account.lock().unwrap();
    match (method, segments.as_slice()) {
        (Method::PUT, [_, container]) if query.contains("restype=container") => {
            if container == "locked" {
                return (StatusCode::FORBIDDEN, "AuthorizationFailure").into_response();
            }
            if account.containers.insert(container.clone()) {
                StatusCode::CREATED.into_response()
            } else {
                (StatusCode::CONFLICT, "ContainerAlreadyExists").into_response()
            }
        }
        (Method::PUT, [_, container, blob]) => {
            let kind = headers
                .get("x-ms-blob-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            account.blob_types.push(kind.clone());
            if kind != "BlockBlob" {
                return (StatusCode::BAD_REQUEST, "InvalidBlobType").into_response();
            }
            account
                .blobs
                .insert((container.clone(), blob.clone()), body.to_vec());
            (StatusCode::CREATED, [(header::ETAG, ETAG)]).into_response()
        }
        (Method::GET, [_, container, blob]) => {
            match account.blobs.get(&(container.clone(), blob.clone())) {
                Some(data) => data.clone().into_response(),
                None => (StatusCode::NOT_FOUND, "BlobNotFound").into_response(),
            }
        }
        (Method::DELETE, [_, container, blob]) => {
            match account.blobs.remove(&(container.clone(), blob.clone())) {
                Some(_) => StatusCode::ACCEPTED.into_response(),
                None => (StatusCode::NOT_FOUND, "BlobNotFound").into_response(),
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn spawn_account() -> (String, Shared) {
    let account = Shared::default();
    let app = Router::new()
        .fallback(blob_service)
        .with_state(Arc::clone(&account));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/acct?sig=x"), account)
}

fn open(endpoint: &str, container: &str) -> Box<dyn BlobContainer> {
    AzureBlobConnector::new(Duration::from_secs(2))
        .unwrap()
        .open(endpoint, container)
        .unwrap()
}

#[tokio::test]
async fn ensure_exists_accepts_created_and_conflict() {
    let (endpoint, account) = spawn_account().await;
    let container = open(&endpoint, "logs");

    container.ensure_exists().await.unwrap();
    container.ensure_exists().await.unwrap();
    assert!(account.lock().unwrap().containers.contains("logs"));
}

#[tokio::test]
async fn put_sends_a_block_blob_and_returns_the_etag() {
    let (endpoint, account) = spawn_account().await;
    let container = open(&endpoint, "logs");
    container.ensure_exists().await.unwrap();

    let etag = container.put("probe.txt", b"hello".to_vec()).await.unwrap();
    assert_eq!(etag, ETAG);
    assert_eq!(account.lock().unwrap().blob_types, vec!["BlockBlob"]);
    assert_eq!(container.get("probe.txt").await.unwrap(), b"hello");
}

#[tokio::test]
async fn delete_tolerates_a_missing_blob() {
    let (endpoint, _account) = spawn_account().await;
    let container = open(&endpoint, "logs");

    container.delete("never-written.txt").await.unwrap();
}

#[tokio::test]
async fn service_errors_carry_status_and_body() {
    let (endpoint, _account) = spawn_account().await;

    let err = open(&endpoint, "locked").ensure_exists().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "blob store error: create container returned 403 Forbidden: AuthorizationFailure"
    );

    let err = open(&endpoint, "logs").get("absent.txt").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "blob store error: download returned 404 Not Found: BlobNotFound"
    );
}

#[tokio::test]
async fn missing_sas_is_refused_by_the_service() {
    let (endpoint, _account) = spawn_account().await;
    let unsigned = endpoint.trim_end_matches("?sig=x");

    let err = open(unsigned, "logs").ensure_exists().await.unwrap_err();
    assert!(err.to_string().contains("403 Forbidden: AuthenticationFailed"));
}

#[tokio::test]
async fn blob_verb_writes_then_reads_through_the_service() {
    let (endpoint, _account) = spawn_account().await;
    let registry = HandlerRegistry::builtin(&HandlerSettings::default()).unwrap();
    let engine = Interpreter::new(Arc::new(registry), Duration::from_secs(10));
    let script = format!(
        "BLOB PUT logs probe.txt {endpoint} \"hello blob\"\nBLOB GET logs probe.txt {endpoint}"
    );

    let transcript = engine.run(&script, &InboundRequest::default()).await;

    assert!(transcript.contains(&format!("Wrote {ETAG}")));
    assert!(transcript.contains("\nhello blob\n"));
    assert!(!transcript.contains("ERROR"));
}
