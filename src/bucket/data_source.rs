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

use super::state::BucketState;

#[derive(Debug, Default)]
pub struct BucketDataSource {
    data: ProviderData,
}

impl BucketDataSource {
    pub fn new(data: ProviderData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl DataSource for BucketDataSource {
    type State<'a> = BucketState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(BucketState::data_source_schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if config.id.is_value() && config.name.is_value() {
            diags.error(
                "`id` conflicts with `name`",
                "Only one of `id` or `name` can be set to look up a bucket.",
                AttributePath::new("name"),
            );
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.data.client(diags).await?;

        let result = match (config.id.as_deref_option(), config.name.as_deref_option()) {
            (Some(_), Some(_)) => {
                diags.root_error_short("`id` conflicts with `name`");
                return None;
            }
            (Some(id), None) => client.find_bucket_by_id(id).await,
            (None, Some(name)) => {
                client
                    .find_bucket_by_name(name, config.org_id.as_deref_option())
                    .await
            }
            (None, None) => {
                diags.root_error_short("Must set either id or name");
                return None;
            }
        };

        match result {
            Ok(bucket) => {
                if let Some(org_id) = config.org_id.as_deref_option() {
                    if bucket.org_id != org_id {
                        diags.error(
                            "InfluxDB bucket belongs to another organization",
                            format!(
                                "Bucket {} belongs to organization {}, not {org_id}",
                                bucket.id, bucket.org_id
                            ),
                            AttributePath::new("org_id"),
                        );
                        return None;
                    }
                }
                Some(BucketState::from_bucket(bucket, &config))
            }
            Err(err) => {
                diags.root_error("Failed to read InfluxDB bucket", err.to_string());
                None
            }
        }
    }
}
