//! Webhook stand-in for the end-to-end tests
//!
//! Keeps the JSON body and content type of each request and answers with a
//! status that can change between requests, optionally after a delay.
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU16, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};

#[derive(Debug, Clone)]
pub struct Request {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Request {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("webhook received invalid JSON")
    }
}

#[derive(Debug)]
struct Webhook {
    status: AtomicU16,
    delay: Duration,
    requests: Mutex<Vec<Request>>,
}

pub struct MockApi {
    addr: SocketAddr,
    webhook: Arc<Webhook>,
    server: JoinHandle<()>,
}

impl MockApi {
    pub async fn start(status: u16) -> Self {
        Self::start_delayed(status, Duration::ZERO).await
    }

    /// Answer every request with `status`, but only after `delay`
    pub async fn start_delayed(status: u16, delay: Duration) -> Self {
        let webhook = Arc::new(Webhook {
            status: AtomicU16::new(status),
            delay,
            requests: Mutex::new(Vec::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook");
        let addr = listener.local_addr().expect("Failed to get webhook address");

        let router = Router::new()
            .route("/report_email", post(report))
            .with_state(Arc::clone(&webhook));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            webhook,
            server,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/report_email", self.addr)
    }

    pub fn set_status(&self, status: u16) {
        self.webhook.status.store(status, Ordering::SeqCst);
    }

    /// Requests seen so far, once there are `count` of them or `timeout` passed
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Request> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let requests = self.webhook.requests.lock().await.clone();
            if requests.len() >= count || tokio::time::Instant::now() >= deadline {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn shutdown(self) {
        self.server.abort();
    }
}

async fn report(
    State(webhook): State<Arc<Webhook>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    webhook.requests.lock().await.push(Request {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string),
        body,
    });

    tokio::time::sleep(webhook.delay).await;

    StatusCode::from_u16(webhook.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
