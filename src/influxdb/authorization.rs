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

use std::fmt::Display;

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Client, Result};

const AUTHORIZATIONS_PATH: &str = "api/v2/authorizations";

/// Resource types a permission can target
pub const RESOURCE_TYPES: &[&str] = &[
    "authorizations",
    "buckets",
    "dashboards",
    "orgs",
    "sources",
    "tasks",
    "telegrafs",
    "users",
    "variables",
    "scrapers",
    "secrets",
    "labels",
    "views",
    "documents",
    "notificationRules",
    "notificationEndpoints",
    "checks",
    "dbrp",
    "notebooks",
    "annotations",
    "remotes",
    "replications",
    "instance",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    #[default]
    Active,
    Inactive,
}

impl AuthorizationStatus {
    pub fn is_active(self) -> bool {
        self == AuthorizationStatus::Active
    }
}

impl From<bool> for AuthorizationStatus {
    fn from(active: bool) -> Self {
        if active {
            AuthorizationStatus::Active
        } else {
            AuthorizationStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    Read,
    Write,
}

impl PermissionAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "read" => Some(PermissionAction::Read),
            "write" => Some(PermissionAction::Write),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Read => "read",
            PermissionAction::Write => "write",
        }
    }
}

impl Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a permission
///
/// Without `id`, the permission applies to all the resources of that type.
/// Without `org_id`, it is not restricted to a single organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub action: PermissionAction,
    pub resource: PermissionResource,
}

/// Authorization as returned by `/api/v2/authorizations`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub status: AuthorizationStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "orgID")]
    pub org_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationPostRequest {
    #[serde(rename = "orgID")]
    pub org_id: String,
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: AuthorizationStatus,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AuthorizationUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthorizationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authorizations {
    #[serde(default)]
    authorizations: Vec<Authorization>,
}

impl Client {
    /// Make a request to the `POST /api/v2/authorizations` API
    pub async fn create_authorization(
        &self,
        request: &AuthorizationPostRequest,
    ) -> Result<Authorization> {
        self.json(
            Method::POST,
            self.url(AUTHORIZATIONS_PATH)?,
            StatusCode::CREATED,
            |req| req.json(request),
        )
        .await
    }

    /// Make a request to the `GET /api/v2/authorizations/{id}` API
    pub async fn find_authorization_by_id(&self, id: &str) -> Result<Authorization> {
        let url = self.object_url(AUTHORIZATIONS_PATH, id)?;
        self.json(Method::GET, url, StatusCode::OK, |req| req)
            .await
    }

    /// Make a request to the `GET /api/v2/authorizations` API
    pub async fn list_authorizations(&self, org_id: Option<&str>) -> Result<Vec<Authorization>> {
        let authorizations: Authorizations = self
            .json(Method::GET, self.url(AUTHORIZATIONS_PATH)?, StatusCode::OK, |req| {
                match org_id {
                    Some(org_id) => req.query(&[("orgID", org_id)]),
                    None => req,
                }
            })
            .await?;
        Ok(authorizations.authorizations)
    }

    /// Make a request to the `PATCH /api/v2/authorizations/{id}` API
    pub async fn update_authorization(
        &self,
        id: &str,
        request: &AuthorizationUpdateRequest,
    ) -> Result<Authorization> {
        let url = self.object_url(AUTHORIZATIONS_PATH, id)?;
        self.json(Method::PATCH, url, StatusCode::OK, |req| req.json(request))
            .await
    }

    /// Make a request to the `DELETE /api/v2/authorizations/{id}` API
    pub async fn delete_authorization(&self, id: &str) -> Result<()> {
        let url = self.object_url(AUTHORIZATIONS_PATH, id)?;
        self.send(Method::DELETE, url, StatusCode::NO_CONTENT, |req| req)
            .await?;
        Ok(())
    }
}
