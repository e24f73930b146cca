// This file is part of the terraform-provider-influxdb project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Client for the subset of the InfluxDB 2.x HTTP API managed by the provider
//!
//! Only buckets, authorizations and the health endpoint are covered.
//! Every call is a single request: no retry, no pagination.

mod authorization;
mod bucket;

use reqwest::{header::AUTHORIZATION, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

pub use authorization::{
    Authorization, AuthorizationPostRequest, AuthorizationStatus, AuthorizationUpdateRequest,
    Permission, PermissionAction, PermissionResource, RESOURCE_TYPES,
};
pub use bucket::{Bucket, PatchBucketRequest, PostBucketRequest, RetentionRule};

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base URL error: {0}")]
    BaseUrl(#[source] url::ParseError),

    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    #[error("invalid object ID `{0}`")]
    InvalidId(String),

    #[error("failed to send {method} {path} request: {source}")]
    RequestSend {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse JSON response: {0}")]
    Json(#[source] reqwest::Error),

    #[error("failed to read the API response: {0}")]
    Text(#[source] reqwest::Error),

    #[error("server responded with error [{code}]: {message}")]
    Api { code: StatusCode, message: String },
}

impl Error {
    /// Check if the server answered that the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { code, .. } if *code == StatusCode::NOT_FOUND)
    }

    pub(crate) fn not_found<S: Into<String>>(message: S) -> Self {
        Error::Api {
            code: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    async fn from_response(resp: Response) -> Self {
        let code = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => return Error::Text(err),
        };
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(ApiErrorBody {
                message: Some(message),
                ..
            }) if !message.is_empty() => message,
            Ok(ApiErrorBody {
                code: Some(kind), ..
            }) => kind,
            _ if body.is_empty() => code.canonical_reason().unwrap_or("").to_owned(),
            _ => body,
        };
        Error::Api { code, message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error payload returned by InfluxDB on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Answer of the `/health` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl Health {
    pub fn is_pass(&self) -> bool {
        self.status == "pass"
    }
}

/// InfluxDB 2.x client
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL of the server, always ending with a `/` so that joins keep any path prefix
    base_url: Url,
    /// Token sent as `Authorization: Token <token>` on each request
    auth_token: Option<Secret<String>>,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new [`Client`] targeting `host`
    pub fn new(host: &str) -> Result<Self> {
        let mut base_url = Url::parse(host).map_err(Error::BaseUrl)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            auth_token: None,
            http_client: reqwest::Client::new(),
        })
    }

    /// Set the token that will be sent with each request to the server
    pub fn with_auth_token<S: Into<String>>(mut self, auth_token: S) -> Self {
        self.auth_token = Some(Secret::new(auth_token.into()));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a request to the `GET /health` API
    pub async fn health(&self) -> Result<Health> {
        let url = self.url("health")?;
        self.json(Method::GET, url, StatusCode::OK, |req| req).await
    }

    /// URL of `path`, relative to the base URL (no leading `/`)
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// URL of the object `id` inside the `collection` path
    ///
    /// `id` is percent-encoded as a single path segment.
    pub(crate) fn object_url(&self, collection: &str, id: &str) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(Error::InvalidId(id.to_owned()));
        }
        let mut url = self.url(collection)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidId(id.to_owned()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Send a request and check that the answer has the `expected` status code
    pub(crate) async fn send<F>(
        &self,
        method: Method,
        url: Url,
        expected: StatusCode,
        build: F,
    ) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let path = url.path().to_owned();

        tracing::debug!(%method, %url, "InfluxDB request");

        let mut req = self.http_client.request(method.clone(), url);
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Token {}", token.expose_secret()));
        }
        let resp = build(req)
            .send()
            .await
            .map_err(|source| Error::RequestSend {
                method: method.clone(),
                path: path.clone(),
                source,
            })?;

        if resp.status() == expected {
            Ok(resp)
        } else {
            let err = Error::from_response(resp).await;
            tracing::debug!(%method, %path, error = %err, "InfluxDB request failed");
            Err(err)
        }
    }

    /// Send a request and decode its JSON answer
    pub(crate) async fn json<T, F>(
        &self,
        method: Method,
        url: Url,
        expected: StatusCode,
        build: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        self.send(method, url, expected, build)
            .await?
            .json()
            .await
            .map_err(Error::Json)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use reqwest::StatusCode;

    use super::{Client, Error};

    #[test]
    fn base_url_keeps_path_prefix() {
        let client = Client::new("http://localhost:8086/influx").expect("create client");
        assert_eq!(client.base_url().as_str(), "http://localhost:8086/influx/");
        assert_eq!(
            client
                .base_url()
                .join("api/v2/buckets")
                .expect("join")
                .as_str(),
            "http://localhost:8086/influx/api/v2/buckets"
        );
    }

    #[test]
    fn object_url_encodes_id() {
        let client = Client::new("http://localhost:8086/influx").expect("create client");
        let url = client
            .object_url("api/v2/authorizations", "../buckets/x?y#z")
            .expect("object url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8086/influx/api/v2/authorizations/..%2Fbuckets%2Fx%3Fy%23z"
        );
        assert!(matches!(
            client.object_url("api/v2/buckets", ".."),
            Err(Error::InvalidId(_))
        ));
        assert!(matches!(
            client.object_url("api/v2/buckets", ""),
            Err(Error::InvalidId(_))
        ));
    }

    #[test]
    fn invalid_base_url() {
        assert!(matches!(Client::new("not a url"), Err(Error::BaseUrl(_))));
    }

    #[tokio::test]
    async fn health_sends_token() {
        let token = "super-secret-token";
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/health")
            .match_header("Authorization", format!("Token {token}").as_str())
            .with_status(200)
            .with_body(
                r#"{
                    "name": "influxdb",
                    "message": "ready for queries and writes",
                    "status": "pass",
                    "checks": [],
                    "version": "v2.7.1",
                    "commit": "407fa622e9"
                }"#,
            )
            .create_async()
            .await;

        let client = Client::new(&mock_server.url())
            .expect("create client")
            .with_auth_token(token);
        let health = client.health().await.expect("health request");

        mock.assert_async().await;
        assert!(health.is_pass());
        assert_eq!(health.version.as_deref(), Some("v2.7.1"));
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/health")
            .with_status(401)
            .with_body(r#"{"code": "unauthorized", "message": "unauthorized access"}"#)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        let err = client.health().await.expect_err("health must fail");

        mock.assert_async().await;
        match err {
            Error::Api { code, message } => {
                assert_eq!(code, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "unauthorized access");
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[tokio::test]
    async fn api_error_falls_back_to_body() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/health")
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        let err = client.health().await.expect_err("health must fail");

        mock.assert_async().await;
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "server responded with error [503 Service Unavailable]: service unavailable"
        );
    }
}
