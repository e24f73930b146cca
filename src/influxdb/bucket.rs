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

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Client, Error, Result};

const BUCKETS_PATH: &str = "api/v2/buckets";

/// Bucket as returned by `/api/v2/buckets`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rp: Option<String>,
    #[serde(rename = "type", default = "Bucket::default_type")]
    pub bucket_type: String,
    #[serde(default)]
    pub retention_rules: Vec<RetentionRule>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Bucket {
    fn default_type() -> String {
        "user".to_owned()
    }
}

/// Rule to expire or retain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRule {
    #[serde(rename = "type", default = "RetentionRule::default_type")]
    pub rule_type: String,
    /// Duration in seconds for how long data will be kept, 0 means infinite
    pub every_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_group_duration_seconds: Option<i64>,
}

impl RetentionRule {
    pub fn expire(every_seconds: i64, shard_group_duration_seconds: Option<i64>) -> Self {
        Self {
            rule_type: Self::default_type(),
            every_seconds,
            shard_group_duration_seconds,
        }
    }

    fn default_type() -> String {
        "expire".to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBucketRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub retention_rules: Vec<RetentionRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatchBucketRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_rules: Option<Vec<RetentionRule>>,
}

impl PatchBucketRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.retention_rules.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct Buckets {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

impl Client {
    /// Make a request to the `POST /api/v2/buckets` API
    pub async fn create_bucket(&self, request: &PostBucketRequest) -> Result<Bucket> {
        self.json(Method::POST, self.url(BUCKETS_PATH)?, StatusCode::CREATED, |req| {
            req.json(request)
        })
        .await
    }

    /// Make a request to the `GET /api/v2/buckets/{id}` API
    pub async fn find_bucket_by_id(&self, id: &str) -> Result<Bucket> {
        let url = self.object_url(BUCKETS_PATH, id)?;
        self.json(Method::GET, url, StatusCode::OK, |req| req)
            .await
    }

    /// Make a request to the `GET /api/v2/buckets?name=...` API and keep the first match
    pub async fn find_bucket_by_name(&self, name: &str, org_id: Option<&str>) -> Result<Bucket> {
        let buckets: Buckets = self
            .json(Method::GET, self.url(BUCKETS_PATH)?, StatusCode::OK, |req| {
                let req = req.query(&[("name", name)]);
                match org_id {
                    Some(org_id) => req.query(&[("orgID", org_id)]),
                    None => req,
                }
            })
            .await?;
        buckets
            .buckets
            .into_iter()
            .find(|bucket| bucket.name == name)
            .ok_or_else(|| Error::not_found(format!("bucket '{name}' not found")))
    }

    /// Make a request to the `PATCH /api/v2/buckets/{id}` API
    pub async fn update_bucket(&self, id: &str, request: &PatchBucketRequest) -> Result<Bucket> {
        let url = self.object_url(BUCKETS_PATH, id)?;
        self.json(Method::PATCH, url, StatusCode::OK, |req| req.json(request))
            .await
    }

    /// Make a request to the `DELETE /api/v2/buckets/{id}` API
    pub async fn delete_bucket(&self, id: &str) -> Result<()> {
        let url = self.object_url(BUCKETS_PATH, id)?;
        self.send(Method::DELETE, url, StatusCode::NO_CONTENT, |req| req)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;
    use time::macros::datetime;

    use crate::influxdb::{Client, PatchBucketRequest, PostBucketRequest, RetentionRule};

    const BUCKET: &str = r#"{
        "id": "0a1b2c3d4e5f6789",
        "orgID": "9f8e7d6c5b4a3210",
        "type": "user",
        "name": "telemetry",
        "description": "raw sensor data",
        "retentionRules": [
            {"type": "expire", "everySeconds": 86400, "shardGroupDurationSeconds": 3600}
        ],
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-02T11:30:00.5Z",
        "links": {"self": "/api/v2/buckets/0a1b2c3d4e5f6789"},
        "labels": []
    }"#;

    #[tokio::test]
    async fn create_bucket() {
        let token = "super-secret-token";
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("POST", "/api/v2/buckets")
            .match_header("Authorization", format!("Token {token}").as_str())
            .match_body(Matcher::Json(json!({
                "orgID": "9f8e7d6c5b4a3210",
                "name": "telemetry",
                "description": "raw sensor data",
                "retentionRules": [
                    {"type": "expire", "everySeconds": 86400, "shardGroupDurationSeconds": 3600}
                ],
            })))
            .with_status(201)
            .with_body(BUCKET)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url())
            .expect("create client")
            .with_auth_token(token);
        let bucket = client
            .create_bucket(&PostBucketRequest {
                org_id: "9f8e7d6c5b4a3210".into(),
                name: "telemetry".into(),
                description: Some("raw sensor data".into()),
                retention_rules: vec![RetentionRule::expire(86400, Some(3600))],
            })
            .await
            .expect("create bucket");

        mock.assert_async().await;
        assert_eq!(bucket.id, "0a1b2c3d4e5f6789");
        assert_eq!(bucket.bucket_type, "user");
        assert_eq!(
            bucket.retention_rules,
            vec![RetentionRule::expire(86400, Some(3600))]
        );
        assert_eq!(bucket.created_at, Some(datetime!(2024-03-01 10:00:00 UTC)));
        assert_eq!(
            bucket.updated_at,
            Some(datetime!(2024-03-02 11:30:00.5 UTC))
        );
    }

    #[tokio::test]
    async fn find_bucket_by_id_not_found() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/api/v2/buckets/0a1b2c3d4e5f6789")
            .with_status(404)
            .with_body(r#"{"code": "not found", "message": "bucket not found"}"#)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        let err = client
            .find_bucket_by_id("0a1b2c3d4e5f6789")
            .await
            .expect_err("bucket must be missing");

        mock.assert_async().await;
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn find_bucket_by_name_with_org() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "telemetry".into()),
                Matcher::UrlEncoded("orgID".into(), "9f8e7d6c5b4a3210".into()),
            ]))
            .with_status(200)
            .with_body(format!(r#"{{"buckets": [{BUCKET}]}}"#))
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        let bucket = client
            .find_bucket_by_name("telemetry", Some("9f8e7d6c5b4a3210"))
            .await
            .expect("find bucket");

        mock.assert_async().await;
        assert_eq!(bucket.description.as_deref(), Some("raw sensor data"));
    }

    #[tokio::test]
    async fn find_bucket_by_name_empty_list() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "missing".into()))
            .with_status(200)
            .with_body(r#"{"buckets": []}"#)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        let err = client
            .find_bucket_by_name("missing", None)
            .await
            .expect_err("bucket must be missing");

        mock.assert_async().await;
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_bucket_only_sends_changes() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("PATCH", "/api/v2/buckets/0a1b2c3d4e5f6789")
            .match_body(Matcher::Json(json!({"name": "telemetry"})))
            .with_status(200)
            .with_body(BUCKET)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        client
            .update_bucket(
                "0a1b2c3d4e5f6789",
                &PatchBucketRequest {
                    name: Some("telemetry".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update bucket");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_bucket() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("DELETE", "/api/v2/buckets/0a1b2c3d4e5f6789")
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&mock_server.url()).expect("create client");
        client
            .delete_bucket("0a1b2c3d4e5f6789")
            .await
            .expect("delete bucket");

        mock.assert_async().await;
    }
}
