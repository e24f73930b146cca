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

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Provider};

use crate::authorization::{AuthorizationDataSource, AuthorizationResource};
use crate::bucket::{BucketDataSource, BucketResource};
use crate::influxdb::Client;
use crate::utils::check_not_empty;

/// Configured client shared by all the resources and data sources
#[derive(Debug, Clone, Default)]
pub struct ProviderData {
    client: Arc<RwLock<Option<Client>>>,
}

impl ProviderData {
    /// Create a [`ProviderData`] that is already configured
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(RwLock::new(Some(client))),
        }
    }

    pub async fn set_client(&self, client: Client) {
        *self.client.write().await = Some(client);
    }

    /// Get the configured client
    ///
    /// Records an error if the provider has not been configured yet.
    pub async fn client(&self, diags: &mut Diagnostics) -> Option<Client> {
        let client = self.client.read().await.clone();
        if client.is_none() {
            diags.root_error(
                "Provider is not configured",
                "The InfluxDB provider must be configured before any resource or data source is used.",
            );
        }
        client
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderConfig<'a> {
    #[serde(borrow = "'a")]
    pub host: ValueString<'a>,
    pub token: ValueString<'a>,
}

#[derive(Debug, Default, Clone)]
pub struct InfluxdbProvider {
    data: ProviderData,
}

impl InfluxdbProvider {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }
}

fn validate_host(diags: &mut Diagnostics, host: &ValueString<'_>) {
    let Some(host) = host.as_deref_option() else {
        return;
    };
    if host.is_empty() {
        diags.error_short("`host` must not be empty", AttributePath::new("host"));
        return;
    }
    match Url::parse(host) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => (),
        Ok(url) => diags.error(
            "`host` must be an http or https URL",
            format!("Unsupported scheme `{}` in `{host}`", url.scheme()),
            AttributePath::new("host"),
        ),
        Err(err) => diags.error(
            "`host` is not a valid URL",
            format!("Could not parse `{host}`: {err}"),
            AttributePath::new("host"),
        ),
    }
}

#[async_trait]
impl Provider for InfluxdbProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("URL of the InfluxDB server, eg: http://localhost:8086"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "token" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("API token used to authenticate against the server"),
                        constraint: AttributeConstraint::Required,
                        sensitive: true,
                        ..Default::default()
                    },
                },
                description: Description::plain("Manage InfluxDB 2.x buckets and authorizations"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        validate_host(diags, &config.host);
        check_not_empty(diags, &config.token, "token", AttributePath::new("token"));

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let (Some(host), Some(token)) = (
            config.host.as_deref_option(),
            config.token.as_deref_option(),
        ) else {
            diags.root_error_short("`host` and `token` must be known to configure the provider");
            return None;
        };

        let client = match Client::new(host) {
            Ok(client) => client.with_auth_token(token),
            Err(err) => {
                diags.error(
                    "Invalid InfluxDB host",
                    err.to_string(),
                    AttributePath::new("host"),
                );
                return None;
            }
        };

        tracing::info!(%terraform_version, host = %client.base_url(), "Configuring InfluxDB provider");

        match client.health().await {
            Ok(health) if health.is_pass() => {
                tracing::debug!(version = ?health.version, "InfluxDB server is healthy");
            }
            Ok(health) => diags.root_warning(
                "InfluxDB server is not healthy",
                format!(
                    "Server `{}` reported status `{}`: {}",
                    client.base_url(),
                    health.status,
                    health.message.unwrap_or_default()
                ),
            ),
            Err(err) => diags.root_warning(
                "Could not reach the InfluxDB server",
                format!("Health check of `{}` failed: {err}", client.base_url()),
            ),
        }

        self.data.set_client(client).await;
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicResource>>> {
        Some(map! {
            "bucket" => BucketResource::new(self.data.clone()),
            "authorization" => AuthorizationResource::new(self.data.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::DynamicDataSource>>> {
        Some(map! {
            "bucket" => BucketDataSource::new(self.data.clone()),
            "authorization" => AuthorizationDataSource::new(self.data.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use mockito::Server;
    use tf_provider::value::{Value, ValueString};
    use tf_provider::{Diagnostics, Provider};

    use super::{InfluxdbProvider, ProviderConfig, ProviderData};

    fn config<'a>(host: &'a str, token: &'a str) -> ProviderConfig<'a> {
        ProviderConfig {
            host: Value::Value(Cow::from(host)),
            token: Value::Value(Cow::from(token)),
        }
    }

    #[tokio::test]
    async fn validate_host() {
        let provider = InfluxdbProvider::default();

        let mut diags = Diagnostics::default();
        assert!(provider
            .validate(&mut diags, config("http://localhost:8086", "token"))
            .await
            .is_some());
        assert!(diags.errors.is_empty());

        for host in ["", "localhost:8086", "ftp://localhost", "not a url"] {
            let mut diags = Diagnostics::default();
            assert!(
                provider.validate(&mut diags, config(host, "token")).await.is_none(),
                "{host} should be rejected"
            );
            assert_eq!(diags.errors.len(), 1);
        }
    }

    #[tokio::test]
    async fn validate_unknown_values() {
        let provider = InfluxdbProvider::default();
        let mut diags = Diagnostics::default();
        let config = ProviderConfig {
            host: ValueString::Unknown,
            token: ValueString::Unknown,
        };
        assert!(provider.validate(&mut diags, config).await.is_some());
    }

    #[tokio::test]
    async fn validate_empty_token() {
        let provider = InfluxdbProvider::default();
        let mut diags = Diagnostics::default();
        assert!(provider
            .validate(&mut diags, config("https://influx.example.com", ""))
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_provider() {
        let data = ProviderData::default();
        let mut diags = Diagnostics::default();
        assert!(data.client(&mut diags).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn configure_checks_health() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/health")
            .match_header("Authorization", "Token secret")
            .with_status(200)
            .with_body(r#"{"name": "influxdb", "status": "pass", "version": "v2.7.1"}"#)
            .create_async()
            .await;

        let data = ProviderData::default();
        let provider = InfluxdbProvider::new(data.clone());
        let url = mock_server.url();
        let mut diags = Diagnostics::default();
        assert!(provider
            .configure(&mut diags, "1.7.0".into(), config(&url, "secret"))
            .await
            .is_some());

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert!(diags.warnings.is_empty());
        assert!(data.client(&mut diags).await.is_some());
    }

    #[tokio::test]
    async fn configure_warns_on_unhealthy_server() {
        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("GET", "/health")
            .with_status(503)
            .with_body(r#"{"name": "influxdb", "status": "fail", "message": "not ready"}"#)
            .create_async()
            .await;

        let data = ProviderData::default();
        let provider = InfluxdbProvider::new(data.clone());
        let url = mock_server.url();
        let mut diags = Diagnostics::default();
        assert!(provider
            .configure(&mut diags, "1.7.0".into(), config(&url, "secret"))
            .await
            .is_some());

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(diags.warnings.len(), 1);
        assert!(data.client(&mut diags).await.is_some());
    }

    #[test]
    fn registry() {
        let provider = InfluxdbProvider::default();
        let mut diags = Diagnostics::default();
        let resources = provider.get_resources(&mut diags).expect("resources");
        let data_sources = provider.get_data_sources(&mut diags).expect("data sources");

        let mut names: Vec<_> = resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["authorization", "bucket"]);
        let mut names: Vec<_> = data_sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["authorization", "bucket"]);
    }
}
