//! Scripted transport for testing.
//!
//! Responses are registered per method and target. Registrations for the same
//! target are consumed in order; the last remaining one is reused, so a poll
//! sequence like `processing, processing, completed` keeps answering
//! `completed` afterwards.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{QueryError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Response(ApiResponse),
    Failure(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    /// Exact query to match; `None` matches any query.
    query: Option<Vec<(String, String)>>,
    reply: Reply,
}

impl Route {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.path == request.path
            && self.query.as_ref().map_or(true, |q| *q == request.query)
    }
}

#[derive(Debug, Default)]
struct MockState {
    routes: Vec<Route>,
    requests: Vec<ApiRequest>,
}

/// Transport that replays registered responses and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a mock with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a JSON response.
    ///
    /// `target` is a path relative to the API root, optionally followed by a
    /// query string (`/queries/j/s/results?offset=0&pageSize=500`). Without a
    /// query string any query matches.
    pub fn respond(
        self,
        method: Method,
        target: &str,
        status: u16,
        body: serde_json::Value,
    ) -> Self {
        let body = serde_json::to_vec(&body).unwrap_or_default();
        self.respond_raw(method, target, status, body)
    }

    /// Registers a response with a raw body.
    pub fn respond_raw(
        self,
        method: Method,
        target: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.push(
            method,
            target,
            Reply::Response(ApiResponse {
                status,
                body: body.into(),
            }),
        )
    }

    /// Registers a transport-level failure (no response received).
    pub fn fail(self, method: Method, target: &str, message: impl Into<String>) -> Self {
        self.push(method, target, Reply::Failure(message.into()))
    }

    /// Returns all requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Counts received requests for a method and path.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn push(self, method: Method, target: &str, reply: Reply) -> Self {
        let (path, query) = split_target(target);
        self.lock().routes.push(Route {
            method,
            path,
            query,
            reply,
        });
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn split_target(target: &str) -> (String, Option<Vec<(String, String)>>) {
    match target.split_once('?') {
        None => (target.to_string(), None),
        Some((path, query)) => {
            let pairs = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| match p.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (p.to_string(), String::new()),
                })
                .collect();
            (path.to_string(), Some(pairs))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let mut matching = state
            .routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(request))
            .map(|(i, _)| i);

        let Some(first) = matching.next() else {
            return Err(QueryError::service(format!(
                "No mock response registered for {} {}",
                request.method, request.path
            )));
        };
        let reply = if matching.next().is_some() {
            state.routes.remove(first).reply
        } else {
            state.routes[first].reply.clone()
        };

        match reply {
            Reply::Response(response) => Ok(response),
            Reply::Failure(message) => Err(QueryError::service(message)),
        }
    }
}
