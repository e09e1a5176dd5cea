//! One request in, one response out. No retries at this layer or above it.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{ApiResult, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self { Self { method: Method::Get, path: path.into(), query: Vec::new(), body: None } }
    pub fn post(path: impl Into<String>, body: Value) -> Self { Self { method: Method::Post, path: path.into(), query: Vec::new(), body: Some(body) } }
    pub fn put(path: impl Into<String>, body: Value) -> Self { Self { method: Method::Put, path: path.into(), query: Vec::new(), body: Some(body) } }
    pub fn delete(path: impl Into<String>) -> Self { Self { method: Method::Delete, path: path.into(), query: Vec::new(), body: None } }

    /// Append a query pair; `None` values are skipped.
    pub fn param(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(v) = value { self.query.push((key.to_string(), v.to_string())); }
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one attempt. Only `ClientError::Network` is expected here;
    /// status and body interpretation belongs to the caller.
    async fn send(&self, req: &ApiRequest, bearer: Option<&str>) -> ApiResult<RawResponse>;
}

// --- reqwest ---

pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("techfeed/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { client, base: base_url.trim_end_matches('/').to_string() })
    }

    fn url_for(&self, req: &ApiRequest) -> ApiResult<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base, req.path))
            .map_err(|e| ClientError::validation(format!("bad request path {}: {e}", req.path)))?;
        if !req.query.is_empty() {
            url.query_pairs_mut().extend_pairs(req.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: &ApiRequest, bearer: Option<&str>) -> ApiResult<RawResponse> {
        let url = self.url_for(req)?;
        let mut builder = match req.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(token) = bearer { builder = builder.bearer_auth(token); }
        if let Some(body) = &req.body { builder = builder.json(body); }
        let resp = builder.send().await.map_err(|e| ClientError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| ClientError::Network(e.to_string()))?;
        debug!(method = req.method.as_str(), path = %req.path, status, "response");
        Ok(RawResponse { status, body })
    }
}

// --- in-memory ---

#[derive(Debug, Clone)]
pub enum Reply {
    Json { status: u16, body: Value, delay: Option<Duration> },
    Raw { status: u16, body: String },
    NetworkDown,
}

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// Scripted transport for tests and offline runs. Replies are queued per
/// (method, path); the last queued reply for a route keeps answering.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<ApiRequest>>,
    bearers: Mutex<Vec<Option<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self { Self::default() }

    pub fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(r) => r.replies.push_back(reply),
            None => routes.push(Route { method, path: path.to_string(), replies: VecDeque::from([reply]) }),
        }
        self
    }

    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.push(method, path, Reply::Json { status: 200, body, delay: None })
    }

    pub fn ok_after(&self, method: Method, path: &str, delay: Duration, body: Value) -> &Self {
        self.push(method, path, Reply::Json { status: 200, body, delay: Some(delay) })
    }

    pub fn status(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.push(method, path, Reply::Json { status, body, delay: None })
    }

    pub fn down(&self, method: Method, path: &str) -> &Self { self.push(method, path, Reply::NetworkDown) }

    pub fn requests(&self) -> Vec<ApiRequest> { self.log.lock().unwrap_or_else(|e| e.into_inner()).clone() }

    /// Bearer token sent with each request, in request order.
    pub fn bearers(&self) -> Vec<Option<String>> { self.bearers.lock().unwrap_or_else(|e| e.into_inner()).clone() }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method && r.path == path).count()
    }

    fn next_reply(&self, req: &ApiRequest) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let route = routes.iter_mut().find(|r| r.method == req.method && r.path == req.path)?;
        if route.replies.len() > 1 { route.replies.pop_front() } else { route.replies.front().cloned() }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, req: &ApiRequest, bearer: Option<&str>) -> ApiResult<RawResponse> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(req.clone());
        self.bearers.lock().unwrap_or_else(|e| e.into_inner()).push(bearer.map(str::to_string));
        match self.next_reply(req) {
            Some(Reply::Json { status, body, delay }) => {
                if let Some(d) = delay { tokio::time::sleep(d).await; }
                Ok(RawResponse { status, body: body.to_string() })
            }
            Some(Reply::Raw { status, body }) => Ok(RawResponse { status, body }),
            Some(Reply::NetworkDown) => Err(ClientError::Network("connection refused".into())),
            None => Ok(RawResponse { status: 404, body: r#"{"error":"no route"}"#.into() }),
        }
    }
}
