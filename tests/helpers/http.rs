// ABOUTME: HTTP testing harness for exercising the assembled router in-process
// ABOUTME: Builds requests with auth material attached and captures status, headers, and body
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vigil Agent Contributors

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde::Serialize;
use tower::ServiceExt;

/// Request builder that drives the router through `oneshot`, no listener
/// involved.
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
    peer: Option<SocketAddr>,
}

impl TestRequest {
    /// Start a GET request.
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Start a POST request.
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
            // The router is assembled with connect-info make-service, so
            // oneshot requests must carry a peer address themselves.
            peer: Some("127.0.0.1:40000".parse().expect("test peer address")),
        }
    }

    /// Add an arbitrary header.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Attach a bearer access token.
    pub fn bearer(self, token: &str) -> Self {
        let value = format!("Bearer {token}");
        self.header(header::AUTHORIZATION.as_str(), &value)
    }

    /// Attach the pre-shared client key header.
    pub fn client_key(self, key: &str) -> Self {
        self.header("x-client-key", key)
    }

    /// Pretend the connection came from this peer address.
    pub fn from_peer(mut self, addr: &str) -> Self {
        self.peer = Some(addr.parse().expect("peer address"));
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize>(mut self, data: &T) -> Self {
        self.body = Some(serde_json::to_string(data).expect("serialize request body"));
        self.headers.push((
            header::CONTENT_TYPE.as_str().to_owned(),
            "application/json".to_owned(),
        ));
        self
    }

    /// Execute against the router and read the full body.
    pub async fn send(self, app: Router) -> TestResponse {
        let response = app
            .oneshot(self.into_request())
            .await
            .expect("execute request");
        TestResponse::read(response).await
    }

    /// Execute against the router but only wait for the first body chunk.
    ///
    /// The metric stream never ends, so reading the full body would hang.
    pub async fn send_stream(self, app: Router) -> TestResponse {
        let response = app
            .oneshot(self.into_request())
            .await
            .expect("execute request");
        TestResponse::read_first_chunk(response).await
    }

    fn into_request(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        let mut request = builder
            .body(Body::from(self.body.unwrap_or_default()))
            .expect("build request");
        if let Some(peer) = self.peer {
            request.extensions_mut().insert(ConnectInfo(peer));
        }
        request
    }
}

/// Captured response: status, headers, and an eagerly-read body.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    async fn read(response: axum::http::Response<Body>) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body")
            .to_vec();
        Self {
            status,
            headers,
            body,
        }
    }

    async fn read_first_chunk(response: axum::http::Response<Body>) -> Self {
        use futures_util::StreamExt;

        let status = response.status();
        let headers = response.headers().clone();
        let mut chunks = response.into_body().into_data_stream();
        let body = tokio::time::timeout(std::time::Duration::from_secs(5), chunks.next())
            .await
            .ok()
            .flatten()
            .and_then(Result::ok)
            .map(|data| data.to_vec())
            .unwrap_or_default();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code as u16 for terse assertions.
    pub const fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// A response header as a string, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body parsed as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> T {
        serde_json::from_slice(&self.body).expect("deserialize response body")
    }

    /// The body as text.
    pub fn text(self) -> String {
        String::from_utf8(self.body).expect("decode response body")
    }

    /// Assert the status and pass the response along.
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "expected status {expected}, got {} with body {:?}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }
}
