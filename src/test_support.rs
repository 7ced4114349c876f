//! In-process stand-ins for the query backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::app::App;
use crate::config::Settings;

pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A URL with nothing listening behind it.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Backend that counts requests, records the last body, and holds every
/// response until `release` is notified.
#[derive(Clone, Default)]
pub struct GatedBackend {
    pub hits: Arc<AtomicUsize>,
    pub last_body: Arc<std::sync::Mutex<Option<Value>>>,
    pub release: Arc<Notify>,
}

impl GatedBackend {
    pub async fn start(&self, status: StatusCode, reply: Value) -> String {
        let state = self.clone();
        let router = Router::new().route(
            "/query",
            post(move |Json(body): Json<Value>| {
                let state = state.clone();
                let reply = reply.clone();
                async move {
                    state.hits.fetch_add(1, Ordering::SeqCst);
                    *state.last_body.lock().unwrap() = Some(body);
                    state.release.notified().await;
                    (status, Json(reply))
                }
            }),
        );
        serve(router).await
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn answering_backend(answer: &str) -> String {
    let reply = json!({ "answer": answer });
    serve(Router::new().route("/query", post(move || async move { Json(reply) }))).await
}

pub fn app_for(base_url: &str) -> App {
    App::new(&Settings {
        base_url: base_url.to_string(),
        model_index: 0,
        log_file: std::env::temp_dir().join("consult-test.log"),
    })
}

/// Polls until the in-flight query resolves.
pub async fn settle(app: &mut App) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while app.query_task.is_some() {
            app.poll_query_task().await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("query did not resolve in time");
}
