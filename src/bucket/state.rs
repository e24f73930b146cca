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
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock, Schema,
};
use tf_provider::value::{Value, ValueList, ValueNumber, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::influxdb::{Bucket, PatchBucketRequest, PostBucketRequest, RetentionRule};
use crate::utils::{
    check_not_empty, description_value, known_string, same_elements, string_value,
    timestamp_value, WithValidate,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BucketState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub org_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub description: ValueString<'a>,
    pub retention_rules: ValueList<Value<RetentionRuleState>>,
    pub created_at: ValueString<'a>,
    pub updated_at: ValueString<'a>,
    #[serde(rename = "type")]
    pub bucket_type: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RetentionRuleState {
    pub every_seconds: ValueNumber,
    pub shard_group_duration_seconds: ValueNumber,
}

fn retention_rule_attributes(constraint: AttributeConstraint) -> HashMap<String, Attribute> {
    let shard_constraint = match constraint {
        AttributeConstraint::Computed => AttributeConstraint::Computed,
        _ => AttributeConstraint::Optional,
    };
    map! {
        "every_seconds" => Attribute {
            attr_type: AttributeType::Number,
            description: Description::plain(
                "Duration in seconds for how long data will be kept in the database. 0 means infinite.",
            ),
            constraint,
            ..Default::default()
        },
        "shard_group_duration_seconds" => Attribute {
            attr_type: AttributeType::Number,
            description: Description::plain("Shard duration measured in seconds"),
            constraint: shard_constraint,
            ..Default::default()
        },
    }
}

impl<'a> BucketState<'a> {
    pub fn resource_schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket ID"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "org_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the organization owning the bucket, changing it recreates the bucket"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket name"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the bucket"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "created_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket creation date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "updated_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Last bucket update date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "type" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket type, `user` or `system`"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "retention_rules" => NestedBlock::Set(Block {
                        attributes: retention_rule_attributes(AttributeConstraint::Required),
                        description: Description::plain(
                            "Rules to expire or retain data. No rules means data never expires.",
                        ),
                        ..Default::default()
                    }),
                },
                description: Description::plain("InfluxDB bucket"),
                deprecated: false,
            },
        }
    }

    pub fn data_source_schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket ID, conflicts with `name`"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket name, conflicts with `id`"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "org_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the organization owning the bucket, narrows a lookup by name"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the bucket"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "retention_rules" => Attribute {
                        attr_type: AttributeType::AttributeSet(retention_rule_attributes(
                            AttributeConstraint::Computed,
                        )),
                        description: Description::plain(
                            "Rules to expire or retain data. No rules means data never expires.",
                        ),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "created_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket creation date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "updated_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Last bucket update date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "type" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Bucket type, `user` or `system`"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                description: Description::plain("InfluxDB bucket data source"),
                ..Default::default()
            },
        }
    }

    /// Build the state from the bucket returned by the server
    ///
    /// `prior` is the state (or plan) the bucket has been read for.
    pub fn from_bucket(bucket: Bucket, prior: &BucketState<'_>) -> Self {
        Self {
            id: Value::Value(Cow::Owned(bucket.id)),
            org_id: Value::Value(Cow::Owned(bucket.org_id)),
            name: Value::Value(Cow::Owned(bucket.name)),
            description: description_value(bucket.description, &prior.description),
            retention_rules: retention_rules_value(bucket.retention_rules, &prior.retention_rules),
            created_at: timestamp_value(bucket.created_at),
            updated_at: timestamp_value(bucket.updated_at),
            bucket_type: string_value(Some(bucket.bucket_type)),
        }
    }

    pub fn retention_rules(&self) -> Vec<RetentionRule> {
        self.retention_rules
            .iter()
            .flatten()
            .filter_map(|rule| rule.as_ref_option())
            .map(|rule| {
                RetentionRule::expire(
                    rule.every_seconds.as_ref_option().copied().unwrap_or(0),
                    rule.shard_group_duration_seconds.as_ref_option().copied(),
                )
            })
            .collect()
    }

    pub fn post_request(&self) -> PostBucketRequest {
        PostBucketRequest {
            org_id: known_string(&self.org_id).unwrap_or_default(),
            name: known_string(&self.name).unwrap_or_default(),
            description: known_string(&self.description),
            retention_rules: self.retention_rules(),
        }
    }

    /// Request updating only what differs from `prior`
    pub fn patch_request(&self, prior: &BucketState<'_>) -> PatchBucketRequest {
        let mut request = PatchBucketRequest::default();
        if self.name.as_deref_option() != prior.name.as_deref_option() {
            request.name = known_string(&self.name);
        }
        if self.description.as_deref_option() != prior.description.as_deref_option() {
            // A null description is cleared with an empty one
            request.description = Some(known_string(&self.description).unwrap_or_default());
        }
        let rules = self.retention_rules();
        if !same_elements(&rules, &prior.retention_rules()) {
            request.retention_rules = Some(if rules.is_empty() {
                vec![RetentionRule::expire(0, None)]
            } else {
                rules
            });
        }
        request
    }

    /// Check if one of the updatable attributes differs from `prior`
    pub fn differs_from(&self, prior: &BucketState<'_>) -> bool {
        fn rules<'b>(state: &'b BucketState<'_>) -> &'b [Value<RetentionRuleState>] {
            state
                .retention_rules
                .as_ref_option()
                .map_or(&[][..], Vec::as_slice)
        }
        self.name != prior.name
            || self.description != prior.description
            || !same_elements(rules(self), rules(prior))
    }
}

/// Map the rules returned by the server while keeping the representation in `prior`
///
/// Without configured rules, InfluxDB reports an infinite retention rule that must not show in state.
/// Configured rules without shard duration keep it null, even though the server computes one.
fn retention_rules_value(
    rules: Vec<RetentionRule>,
    prior: &ValueList<Value<RetentionRuleState>>,
) -> ValueList<Value<RetentionRuleState>> {
    let prior: Vec<&RetentionRuleState> = prior
        .iter()
        .flatten()
        .filter_map(|rule| rule.as_ref_option())
        .collect();

    if prior.is_empty() && rules.iter().all(|rule| rule.every_seconds == 0) {
        return Value::Value(Vec::new());
    }

    Value::Value(
        rules
            .into_iter()
            .map(|rule| {
                let keep_null = prior.iter().any(|prior| {
                    prior.every_seconds.as_ref_option() == Some(&rule.every_seconds)
                        && prior.shard_group_duration_seconds.is_null()
                });
                Value::Value(RetentionRuleState {
                    every_seconds: Value::Value(rule.every_seconds),
                    shard_group_duration_seconds: if keep_null {
                        Value::Null
                    } else {
                        rule.shard_group_duration_seconds.into()
                    },
                })
            })
            .collect(),
    )
}

impl WithValidate for RetentionRuleState {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for (name, value) in [
            ("every_seconds", &self.every_seconds),
            ("shard_group_duration_seconds", &self.shard_group_duration_seconds),
        ] {
            if let Value::Value(seconds) = value {
                if *seconds < 0 {
                    diags.error(
                        format!("`{name}` must not be negative"),
                        format!("`{name}` is {seconds}, but durations must be positive or zero."),
                        attr_path.clone().attribute(name),
                    );
                }
            }
        }
    }
}

impl WithValidate for BucketState<'_> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_not_empty(diags, &self.name, "name", attr_path.clone().attribute("name"));
        check_not_empty(diags, &self.org_id, "org_id", attr_path.clone().attribute("org_id"));
        if let Value::Value(rules) = &self.retention_rules {
            if rules.len() > 1 {
                diags.error(
                    "At most one retention rule is supported",
                    format!(
                        "{} `retention_rules` blocks are configured, but InfluxDB keeps a single rule per bucket.",
                        rules.len()
                    ),
                    attr_path.clone().attribute("retention_rules"),
                );
            }
        }
        for (i, rule) in self.retention_rules.iter().flatten().enumerate() {
            if let Value::Value(rule) = rule {
                rule.validate(
                    diags,
                    attr_path.clone().attribute("retention_rules").index(i as i64),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use tf_provider::value::{Value, ValueList};
    use tf_provider::{AttributePath, Diagnostics};

    use crate::influxdb::RetentionRule;
    use crate::utils::WithValidate;

    use super::{retention_rules_value, BucketState, RetentionRuleState};

    fn rule(every: i64, shard: Option<i64>) -> Value<RetentionRuleState> {
        Value::Value(RetentionRuleState {
            every_seconds: Value::Value(every),
            shard_group_duration_seconds: shard.into(),
        })
    }

    #[test]
    fn infinite_rule_is_hidden() {
        let rules = retention_rules_value(vec![RetentionRule::expire(0, Some(604800))], &Value::Null);
        assert_eq!(rules, Value::Value(vec![]));

        let rules = retention_rules_value(vec![], &Value::Value(vec![]));
        assert_eq!(rules, Value::Value(vec![]));
    }

    #[test]
    fn configured_infinite_rule_is_kept() {
        let prior: ValueList<_> = Value::Value(vec![rule(0, Some(3600))]);
        let rules = retention_rules_value(vec![RetentionRule::expire(0, Some(3600))], &prior);
        assert_eq!(rules, prior);
    }

    #[test]
    fn unset_shard_duration_stays_null() {
        let prior: ValueList<_> = Value::Value(vec![rule(86400, None)]);
        let rules = retention_rules_value(vec![RetentionRule::expire(86400, Some(3600))], &prior);
        assert_eq!(rules, prior);

        let rules = retention_rules_value(vec![RetentionRule::expire(3600, Some(3600))], &prior);
        assert_eq!(rules, Value::Value(vec![rule(3600, Some(3600))]));
    }

    #[test]
    fn patch_only_changes() {
        let prior = BucketState {
            id: Value::Value(Cow::from("0a1b2c3d4e5f6789")),
            org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
            name: Value::Value(Cow::from("telemetry")),
            description: Value::Value(Cow::from("raw sensor data")),
            retention_rules: Value::Value(vec![rule(86400, None)]),
            ..Default::default()
        };

        let same = prior.clone();
        assert!(!same.differs_from(&prior));

        let renamed = BucketState {
            name: Value::Value(Cow::from("metrics")),
            ..prior.clone()
        };
        let request = renamed.patch_request(&prior);
        assert_eq!(request.name.as_deref(), Some("metrics"));
        assert_eq!(request.description, None);
        assert_eq!(request.retention_rules, None);

        let cleared = BucketState {
            description: Value::Null,
            retention_rules: Value::Value(vec![]),
            ..prior.clone()
        };
        let request = cleared.patch_request(&prior);
        assert_eq!(request.name, None);
        assert_eq!(request.description.as_deref(), Some(""));
        assert_eq!(
            request.retention_rules,
            Some(vec![RetentionRule::expire(0, None)])
        );
    }

    #[test]
    fn negative_durations_are_rejected() {
        let state = BucketState {
            name: Value::Value(Cow::from("")),
            org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
            retention_rules: Value::Value(vec![rule(-1, Some(-1))]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default());
        assert_eq!(diags.errors.len(), 3);
    }

    #[test]
    fn single_retention_rule() {
        let state = BucketState {
            name: Value::Value(Cow::from("telemetry")),
            org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
            retention_rules: Value::Value(vec![rule(86400, None)]),
            ..Default::default()
        };
        let mut diags = Diagnostics::default();
        state.validate(&mut diags, AttributePath::default());
        assert!(diags.errors.is_empty());

        let state = BucketState {
            retention_rules: Value::Value(vec![rule(86400, None), rule(0, None)]),
            ..state
        };
        state.validate(&mut diags, AttributePath::default());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(
            diags.errors[0].attribute,
            AttributePath::new("retention_rules")
        );
    }
}
