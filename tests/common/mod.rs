//! Axum fake for the Gmail API.
//!
//! Serves canned JSON per (method, path) on a random local port and records
//! every request it receives.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use tokio::net::TcpListener;

const NO_ROUTE: &str = r#"{"error": {"code": 404, "message": "no route"}}"#;

#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    status: u16,
    body: String,
}

impl Route {
    pub fn get(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    pub fn post(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct Shared {
    routes: Vec<Route>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct FakeServer {
    pub base: String,
    shared: Arc<Shared>,
}

impl FakeServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let shared = Arc::new(Shared {
            routes,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            shared,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }
}

async fn respond(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let route = shared
        .routes
        .iter()
        .find(|r| r.method == method && r.path == uri.path());
    let (status, reply) = match route {
        Some(r) => (
            StatusCode::from_u16(r.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            r.body.clone(),
        ),
        None => (StatusCode::NOT_FOUND, NO_ROUTE.to_string()),
    };

    shared.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        target: uri.to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    (status, [(header::CONTENT_TYPE, "application/json")], reply)
}
