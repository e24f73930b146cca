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

use crate::influxdb::AuthorizationUpdateRequest;
use crate::provider::ProviderData;
use crate::utils::{same_elements, WithValidate};

use super::state::AuthorizationState;

#[derive(Debug, Default)]
pub struct AuthorizationResource {
    data: ProviderData,
}

impl AuthorizationResource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }
}

/// Attributes that cannot be updated in place
fn replaced_attributes(
    prior: &AuthorizationState<'_>,
    proposed: &AuthorizationState<'_>,
    config: &AuthorizationState<'_>,
) -> Vec<AttributePath> {
    let mut trigger_replace = Vec::new();

    if proposed.org_id != prior.org_id {
        trigger_replace.push(AttributePath::new("org_id"));
    }
    if proposed.description != prior.description {
        trigger_replace.push(AttributePath::new("description"));
    }
    let permissions_differ = match (&proposed.permissions, &prior.permissions) {
        (Value::Value(proposed), Value::Value(prior)) => !same_elements(proposed, prior),
        (proposed, prior) => proposed != prior,
    };
    if permissions_differ {
        trigger_replace.push(AttributePath::new("permissions"));
    }
    // A null user ID is filled by the server
    if config.user_id.is_value() && config.user_id != prior.user_id {
        trigger_replace.push(AttributePath::new("user_id"));
    }

    trigger_replace
}

#[async_trait]
impl Resource for AuthorizationResource {
    type State<'a> = AuthorizationState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AuthorizationState::resource_schema())
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
            diags.error_short("Authorization ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        match client.find_authorization_by_id(id).await {
            Ok(authorization) => Some((
                AuthorizationState::from_authorization(authorization, &state),
                private_state,
            )),
            Err(err) if err.is_not_found() => {
                diags.root_error(
                    format!("No InfluxDB authorization with ID {id}"),
                    err.to_string(),
                );
                None
            }
            Err(err) => {
                diags.root_error("Failed to read InfluxDB authorization", err.to_string());
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        if config_state.active.is_null() {
            state.active = Value::Value(true);
        }
        if config_state.user_id.is_null() {
            state.user_id = Value::Unknown;
        }
        state.id = Value::Unknown;
        state.token = Value::Unknown;
        state.created_at = Value::Unknown;
        state.updated_at = Value::Unknown;

        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        let mut state = proposed_state;
        if config_state.active.is_null() {
            state.active = Value::Value(true);
        }

        let trigger_replace = replaced_attributes(&prior_state, &state, &config_state);
        if !trigger_replace.is_empty() {
            if config_state.user_id.is_null() {
                state.user_id = Value::Unknown;
            }
            state.id = Value::Unknown;
            state.token = Value::Unknown;
            state.created_at = Value::Unknown;
            state.updated_at = Value::Unknown;
        } else if state.active != prior_state.active {
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

        tracing::info!(
            org_id = %request.org_id,
            permissions = request.permissions.len(),
            "Creating InfluxDB authorization"
        );

        match client.create_authorization(&request).await {
            Ok(authorization) => {
                tracing::info!(id = %authorization.id, "InfluxDB authorization created");
                Some((
                    AuthorizationState::from_authorization(authorization, &planned_state),
                    private_state,
                ))
            }
            Err(err) => {
                diags.root_error("Failed to create InfluxDB authorization", err.to_string());
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
            diags.error_short("Authorization ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        let status = planned_state.status();
        let result = if status == prior_state.status() {
            client.find_authorization_by_id(id).await
        } else {
            tracing::info!(id, ?status, "Updating InfluxDB authorization status");
            let request = AuthorizationUpdateRequest {
                status: Some(status),
                ..Default::default()
            };
            client.update_authorization(id, &request).await
        };

        match result {
            Ok(authorization) => Some((
                AuthorizationState::from_authorization(authorization, &planned_state),
                private_state,
            )),
            Err(err) => {
                diags.root_error("Failed to update InfluxDB authorization", err.to_string());
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
            diags.error_short("Authorization ID is not known", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        tracing::info!(id, "Deleting InfluxDB authorization");

        match client.delete_authorization(id).await {
            Ok(()) => Some(()),
            Err(err) if err.is_not_found() => {
                diags.root_warning(
                    "InfluxDB authorization already deleted",
                    format!("No InfluxDB authorization with ID {id}, it has been removed from state."),
                );
                Some(())
            }
            Err(err) => {
                diags.root_error("Failed to delete InfluxDB authorization", err.to_string());
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = AuthorizationState {
            id: Value::Value(Cow::Owned(id)),
            ..Default::default()
        };
        self.read(diags, state, Default::default(), Default::default())
            .await
    }
}
