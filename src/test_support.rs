//! Fixtures shared by the unit tests.

use axum::{Router, body::Body, http::HeaderMap, http::StatusCode, routing::post};
use bytes::Bytes;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::Config;
use crate::proxy::{self, AppState};

/// In-memory databases live per connection, so the pool holds exactly one.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

/// Removes a test database file and its sidecars when dropped.
pub struct DbFile(PathBuf);

impl Drop for DbFile {
    fn drop(&mut self) {
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

/// File-backed pool opened the same way `main` opens the real database.
pub async fn file_pool(max_connections: u32) -> (SqlitePool, DbFile) {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "counter_proxy_test_{}_{}.db",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    let file = DbFile(path.clone());

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    crate::db::init_db(&pool).await.unwrap();
    (pool, file)
}

pub async fn test_state(siliconflow_key: Option<&str>, siliconflow_url: &str) -> Arc<AppState> {
    Arc::new(AppState {
        config: Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            siliconflow_key: siliconflow_key.map(str::to_string),
            siliconflow_url: siliconflow_url.to_string(),
            upstream_timeout: Duration::from_secs(5),
        },
        db: memory_pool().await,
        client: proxy::create_client(),
    })
}

/// Stand-in for the inference API that records what it was sent.
pub struct FakeUpstream {
    pub url: String,
    hits: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

impl FakeUpstream {
    pub async fn spawn(status: StatusCode, body: &'static str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(Mutex::new(None));
        let last_auth = Arc::new(Mutex::new(None));

        let app = {
            let hits = hits.clone();
            let last_body = last_body.clone();
            let last_auth = last_auth.clone();
            Router::new().route(
                "/v1/chat/completions",
                post(move |headers: HeaderMap, received: Bytes| {
                    let hits = hits.clone();
                    let last_body = last_body.clone();
                    let last_auth = last_auth.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        *last_body.lock().unwrap() = serde_json::from_slice(&received).ok();
                        *last_auth.lock().unwrap() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        (status, body)
                    }
                }),
            )
        };

        let addr = serve_local(app).await;

        Self {
            url: format!("http://{}/v1/chat/completions", addr),
            hits,
            last_body,
            last_auth,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().unwrap().clone()
    }
}

/// Upstream whose body is fed chunk by chunk from the test.
///
/// The body ends when `chunks` is dropped. `send` starts failing once the
/// server has dropped the body, i.e. after the proxy side hung up.
pub struct StreamingUpstream {
    pub url: String,
    pub chunks: mpsc::Sender<Result<Bytes, Infallible>>,
}

impl StreamingUpstream {
    pub async fn spawn() -> Self {
        let (chunks, rx) = mpsc::channel(8);
        let body = Arc::new(Mutex::new(Some(rx)));

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move {
                    let rx = body
                        .lock()
                        .unwrap()
                        .take()
                        .expect("streaming upstream serves a single request");
                    Body::from_stream(ReceiverStream::new(rx))
                }
            }),
        );
        let addr = serve_local(app).await;

        Self {
            url: format!("http://{}/v1/chat/completions", addr),
            chunks,
        }
    }
}

async fn serve_local(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
