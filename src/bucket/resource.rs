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

use std::borrow::Cow;

use async_trait::async_trait;

use tf_provider::schema::Schema;
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{AttributePath, Diagnostics, Resource};

use crate::provider::ProviderData;
use crate::utils::WithValidate;

use super::state::BucketState;

#[derive(Debug, Default)]
pub struct BucketResource {
    data: ProviderData,
}

impl BucketResource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Resource for BucketResource {
    type State<'a> = BucketState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(BucketState::resource_schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        config.validate(diags, AttributePath::default());

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some(id) = state.id.as_deref_option() else {
            diags.error_short("Bucket ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        match client.find_bucket_by_id(id).await {
            Ok(bucket) => Some((BucketState::from_bucket(bucket, &state), private_state)),
            Err(err) if err.is_not_found() => {
                diags.root_error(format!("No InfluxDB bucket with ID {id}"), err.to_string());
                None
            }
            Err(err) => {
                diags.root_error("Failed to read InfluxDB bucket", err.to_string());
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.created_at = Value::Unknown;
        state.updated_at = Value::Unknown;
        state.bucket_type = Value::Unknown;

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        let mut trigger_replace = Vec::new();

        if state.org_id != prior_state.org_id {
            trigger_replace.push(AttributePath::new("org_id"));
            state.id = Value::Unknown;
            state.created_at = Value::Unknown;
            state.updated_at = Value::Unknown;
            state.bucket_type = Value::Unknown;
        } else if state.differs_from(&prior_state) {
            state.updated_at = Value::Unknown;
        }

        Some((state, prior_private_state, trigger_replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(prior_private_state)
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.data.client(diags).await?;
        let request = planned_state.post_request();

        tracing::info!(name = %request.name, org_id = %request.org_id, "Creating InfluxDB bucket");

        match client.create_bucket(&request).await {
            Ok(bucket) => {
                tracing::info!(id = %bucket.id, "InfluxDB bucket created");
                Some((BucketState::from_bucket(bucket, &planned_state), private_state))
            }
            Err(err) => {
                diags.root_error("Failed to create InfluxDB bucket", err.to_string());
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let Some(id) = prior_state.id.as_deref_option() else {
            diags.error_short("Bucket ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;
        let request = planned_state.patch_request(&prior_state);

        let result = if request.is_empty() {
            client.find_bucket_by_id(id).await
        } else {
            tracing::info!(id, "Updating InfluxDB bucket");
            client.update_bucket(id, &request).await
        };

        match result {
            Ok(bucket) => Some((BucketState::from_bucket(bucket, &planned_state), private_state)),
            Err(err) => {
                diags.root_error("Failed to update InfluxDB bucket", err.to_string());
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let Some(id) = state.id.as_deref_option() else {
            diags.error_short("Bucket ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        tracing::info!(id, "Deleting InfluxDB bucket");

        match client.delete_bucket(id).await {
            Ok(()) => Some(()),
            Err(err) if err.is_not_found() => {
                diags.root_warning(
                    "InfluxDB bucket already deleted",
                    format!("No InfluxDB bucket with ID {id}, it has been removed from state."),
                );
                Some(())
            }
            Err(err) => {
                diags.root_error("Failed to delete InfluxDB bucket", err.to_string());
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = BucketState {
            id: Value::Value(Cow::Owned(id)),
            retention_rules: Value::Value(Vec::new()),
            ..Default::default()
        };
        self.read(diags, state, Default::default(), Default::default())
            .await
    }
}
