#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};

use stargazer_core::StatusSource;
use stargazer_server::build_app;
use stargazer_server::state::AppState;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Serve the status router for `status` on an ephemeral port.
    pub async fn new(status: Arc<dyn StatusSource>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_app(AppState::new(status));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// GitHub stand-in that serves a scripted sequence of counts. The last count
/// repeats once the script runs out.
#[derive(Default)]
pub struct FakeGitHub {
    counts: Mutex<VecDeque<u64>>,
    pub fetches: AtomicUsize,
    pub stars: AtomicUsize,
}

impl FakeGitHub {
    pub fn with_counts(counts: &[u64]) -> Arc<Self> {
        Arc::new(Self {
            counts: Mutex::new(counts.iter().copied().collect()),
            ..Self::default()
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn stars(&self) -> usize {
        self.stars.load(Ordering::SeqCst)
    }

    pub async fn spawn(self: &Arc<Self>) -> SocketAddr {
        let app = Router::new()
            .route("/repos/{owner}/{repo}", get(repo))
            .route("/user/starred/{owner}/{repo}", put(star))
            .with_state(Arc::clone(self));
        spawn(app).await
    }
}

async fn repo(State(github): State<Arc<FakeGitHub>>) -> Json<serde_json::Value> {
    github.fetches.fetch_add(1, Ordering::SeqCst);
    let count = {
        let mut counts = github.counts.lock().unwrap();
        if counts.len() > 1 {
            counts.pop_front().unwrap_or_default()
        } else {
            counts.front().copied().unwrap_or_default()
        }
    };
    Json(serde_json::json!({ "full_name": "owner/repo", "stargazers_count": count }))
}

async fn star(State(github): State<Arc<FakeGitHub>>) -> StatusCode {
    github.stars.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

/// Twilio stand-in that records every message body it accepts.
#[derive(Default)]
pub struct FakeTwilio {
    bodies: Mutex<Vec<String>>,
}

impl FakeTwilio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }

    pub async fn spawn(self: &Arc<Self>) -> SocketAddr {
        let app = Router::new()
            .route("/Accounts/{sid}/Messages.json", post(message))
            .with_state(Arc::clone(self));
        spawn(app).await
    }
}

async fn message(
    State(twilio): State<Arc<FakeTwilio>>,
    Path(_sid): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let body = form.get("Body").cloned().unwrap_or_default();
    let to = form.get("To").cloned().unwrap_or_default();
    twilio.bodies.lock().unwrap().push(body);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "sid": "SM1", "status": "queued", "to": to })),
    )
}
