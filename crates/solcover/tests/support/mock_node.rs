use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const CLIENT_VERSION: &str = "EthereumJS TestRPC/v2.13.2/ethereum-js";

pub fn accounts() -> Vec<String> {
    vec![
        "0x627306090abab3a6e1400e9345bc60c78a8bef57".to_string(),
        "0xf17f52151ebef6c7334fad080c5704d77216b732".to_string(),
    ]
}

/// A JSON-RPC node answering `eth_accounts` and `web3_clientVersion`
#[derive(Debug)]
pub struct MockNode {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockNode {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock node");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(AtomicUsize::new(0));

        let app = Router::new().route(
            "/",
            post({
                let counter = Arc::clone(&requests);
                move |Json(request): Json<Value>| async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(respond(&request))
                }
            }),
        );
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock node stopped: {e}");
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn respond(request: &Value) -> Value {
    let id = request["id"].clone();
    match request["method"].as_str() {
        Some("eth_accounts") => json!({"jsonrpc": "2.0", "id": id, "result": accounts()}),
        Some("web3_clientVersion") => {
            json!({"jsonrpc": "2.0", "id": id, "result": CLIENT_VERSION})
        }
        _ => json!({"jsonrpc": "2.0", "id": id,
                    "error": {"code": -32601, "message": "Method not found"}}),
    }
}
