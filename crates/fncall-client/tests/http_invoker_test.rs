//! HTTP Invoker Integration Tests
//!
//! These tests run the invoker against a local hyper server to verify:
//! - Request shape: method, path, headers and body
//! - Retry on rate limiting and server errors
//! - Timeouts against a slow function, releasing the connection
//! - Network errors when nothing is listening
//!
//! All test URLs use `http://127.0.0.1:PORT`.

use fncall_client::{ApiError, BackoffPolicy, ErrorKind, InvocationRequest, InvokeOptions, Invoker};
use fncall_common::auth::{NoSession, Session, SessionProvider, StaticSessionProvider};
use fncall_common::ClientConfig;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What the test server saw for one request.
#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Bytes,
}

/// What the test server answers to the n-th request (0-indexed).
struct Canned {
    status: StatusCode,
    retry_after: Option<&'static str>,
    body: &'static str,
    delay: Option<Duration>,
}

impl Canned {
    fn new(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            retry_after: None,
            body,
            delay: None,
        }
    }
}

type Script = Arc<dyn Fn(usize) -> Canned + Send + Sync>;

/// Test function host that runs on a separate task
struct TestFunctionServer {
    addr: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestFunctionServer {
    /// Starts a new test server on a random port
    async fn start(script: impl Fn(usize) -> Canned + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script: Script = Arc::new(script);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let script = script.clone();
                        let recorded = recorded.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                handle(req, script.clone(), recorded.clone())
                            });

                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}/functions/v1", self.addr)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestFunctionServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle(
    req: Request<Incoming>,
    script: Script,
    recorded: Arc<Mutex<Vec<Recorded>>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (authorization, content_type) = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (header("authorization"), header("content-type"))
    };
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await?.to_bytes();

    let index = {
        let mut recorded = recorded.lock().unwrap();
        recorded.push(Recorded {
            method,
            path,
            authorization,
            content_type,
            body,
        });
        recorded.len() - 1
    };

    let canned = script(index);
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = Response::builder()
        .status(canned.status)
        .header("Content-Type", "application/json");
    if let Some(retry_after) = canned.retry_after {
        response = response.header("Retry-After", retry_after);
    }
    Ok(response
        .body(Full::new(Bytes::from_static(canned.body.as_bytes())))
        .unwrap())
}

fn invoker(base_url: &str, sessions: Arc<dyn SessionProvider>) -> Invoker {
    let config = ClientConfig::new(base_url, "anon-key").unwrap();
    // Keep real-time waits short
    Invoker::new(config, sessions).with_backoff(BackoffPolicy {
        exponential_base: Duration::from_millis(10),
        timeout_delay: Duration::from_millis(10),
        ..BackoffPolicy::default()
    })
}

// ============================================================================
// Request Shape Tests
// ============================================================================

#[tokio::test]
async fn test_anonymous_call_request_shape() {
    let server =
        TestFunctionServer::start(|_| Canned::new(StatusCode::OK, r#"{"results": []}"#)).await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let result: Value = invoker
        .invoke_anonymous("rag-search", &json!({"query": "rust"}), None)
        .await
        .unwrap();
    assert_eq!(result, json!({"results": []}));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/functions/v1/rag-search");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer anon-key"));
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        serde_json::from_slice::<Value>(&requests[0].body).unwrap(),
        json!({"query": "rust"})
    );
}

#[tokio::test]
async fn test_authenticated_call_sends_access_token() {
    let server = TestFunctionServer::start(|_| Canned::new(StatusCode::OK, "{}")).await;
    let sessions = Arc::new(StaticSessionProvider::new(Session::new("user-token")));
    let invoker = invoker(&server.base_url(), sessions);

    let _: Value = invoker
        .invoke_authenticated("export-user-data", &json!({}))
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer user-token")
    );
}

#[tokio::test]
async fn test_authenticated_without_session_never_connects() {
    let server = TestFunctionServer::start(|_| Canned::new(StatusCode::OK, "{}")).await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let err = invoker
        .invoke_authenticated::<Value, _>("export-user-data", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::from_kind(ErrorKind::AuthError, false));
    assert!(server.requests().is_empty());
}

// ============================================================================
// Retry Logic Tests
// ============================================================================

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = TestFunctionServer::start(|n| {
        if n == 0 {
            Canned {
                retry_after: Some("0"),
                ..Canned::new(StatusCode::TOO_MANY_REQUESTS, "")
            }
        } else {
            Canned::new(StatusCode::OK, r#"{"ok": true}"#)
        }
    })
    .await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let result: Value = invoker
        .invoke_anonymous("rag-search", &json!({"query": "x"}), None)
        .await
        .unwrap();
    assert_eq!(result, json!({"ok": true}));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = TestFunctionServer::start(|_| {
        Canned::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": {"code": "GENERATION_FAILED", "message": "model overloaded"}}"#,
        )
    })
    .await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let err = invoker
        .invoke_anonymous::<Value, _>("generate-podcast", &json!({}), None)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::from_kind(ErrorKind::GenerationFailed, true));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = TestFunctionServer::start(|_| {
        Canned::new(StatusCode::BAD_REQUEST, r#"{"error": "Source not found"}"#)
    })
    .await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let err = invoker
        .invoke_anonymous::<Value, _>("process-source", &json!({"id": 1}), None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorKind::Unknown);
    assert_eq!(err.message, "Source not found");
    assert!(!err.retryable);
    assert_eq!(server.requests().len(), 1);
}

// ============================================================================
// Timeout and Network Tests
// ============================================================================

#[tokio::test]
async fn test_slow_function_times_out() {
    let server = TestFunctionServer::start(|_| Canned {
        delay: Some(Duration::from_secs(5)),
        ..Canned::new(StatusCode::OK, "{}")
    })
    .await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let options = InvokeOptions::new(1, Duration::from_millis(50));
    let started = std::time::Instant::now();
    let err = invoker
        .invoke_anonymous::<Value, _>("generate-podcast", &json!({}), Some(options))
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::from_kind(ErrorKind::Timeout, true));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_timed_out_request_closes_connection() {
    use tokio::io::AsyncReadExt;

    // Reads the request, never answers, and reports when the client hangs up
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(());
    });

    let invoker = invoker(&format!("http://{}", addr), Arc::new(NoSession));
    let request = InvocationRequest::new("generate-podcast", &json!({}))
        .unwrap()
        .with_options(InvokeOptions::new(1, Duration::from_millis(100)));

    let err = invoker.invoke(&request).await.unwrap_err();
    assert_eq!(err.code, ErrorKind::Timeout);

    tokio::time::timeout(Duration::from_secs(2), closed_rx)
        .await
        .expect("connection still open after the deadline")
        .unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let invoker = invoker(&format!("http://{}", addr), Arc::new(NoSession));
    let request = InvocationRequest::new("rag-search", &json!({}))
        .unwrap()
        .with_options(InvokeOptions::new(2, Duration::from_secs(1)));

    let err = invoker.invoke(&request).await.unwrap_err();
    assert_eq!(err, ApiError::from_kind(ErrorKind::NetworkError, true));
}

#[tokio::test]
async fn test_concurrent_invocations() {
    let server = TestFunctionServer::start(|_| Canned::new(StatusCode::OK, r#"{"ok": 1}"#)).await;
    let invoker = invoker(&server.base_url(), Arc::new(NoSession));

    let tasks = (0..8)
        .map(|i| {
            let invoker = invoker.clone();
            tokio::spawn(async move {
                invoker
                    .invoke_anonymous::<Value, _>("rag-search", &json!({"index": i}), None)
                    .await
            })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), json!({"ok": 1}));
    }
    assert_eq!(server.requests().len(), 8);
}
