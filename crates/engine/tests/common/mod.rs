//! Local stand-in for the listing API.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::Value;

use propsearch_common::config::{Credentials, SystemConfig};
use propsearch_engine::listing::ListingClient;

/// One request as the listing API saw it.
#[derive(Clone, Debug)]
pub struct Captured {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone)]
struct Mock {
    status: StatusCode,
    body: String,
    delay: Duration,
    seen: Arc<Mutex<Vec<Captured>>>,
}

pub struct MockUpstream {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    /// Serve `body` with `status` for every request.
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_delayed(status, body, Duration::ZERO).await
    }

    /// Like [`MockUpstream::start`], but hold every response for `delay`.
    pub async fn start_delayed(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mock = Mock {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            delay,
            seen: Arc::clone(&seen),
        };

        let app = Router::new().fallback(respond).with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/prod/public", addr),
            seen,
        }
    }

    pub async fn json(body: Value) -> Self {
        Self::start(200, body.to_string()).await
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.seen.lock().unwrap().clone()
    }

    pub fn client(&self) -> ListingClient {
        self.client_with(|_| {})
    }

    pub fn client_with(&self, tweak: impl FnOnce(&mut SystemConfig)) -> ListingClient {
        let mut system = SystemConfig::default();
        system.upstream.base_url = self.base_url.clone();
        tweak(&mut system);
        ListingClient::new(&system, Credentials::new("test-key", "shopprop")).unwrap()
    }
}

async fn respond(
    State(mock): State<Mock>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    mock.seen.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }
    (
        mock.status,
        [(header::CONTENT_TYPE, "application/json")],
        mock.body.clone(),
    )
}
