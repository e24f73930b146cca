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

use async_trait::async_trait;

use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{AttributePath, DataSource, Diagnostics};

use crate::provider::ProviderData;

use super::state::AuthorizationState;

#[derive(Debug, Default)]
pub struct AuthorizationDataSource {
    data: ProviderData,
}

impl AuthorizationDataSource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl DataSource for AuthorizationDataSource {
    type State<'a> = AuthorizationState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(AuthorizationState::data_source_schema())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let Some(id) = config.id.as_deref_option() else {
            diags.error_short("`id` must be set", AttributePath::new("id"));
            return None;
        };
        let client = self.data.client(diags).await?;

        match client.find_authorization_by_id(id).await {
            Ok(authorization) => Some(AuthorizationState::from_authorization(
                authorization,
                &config,
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
}
