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
use tf_provider::value::{Value, ValueBool, ValueList, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::influxdb::{
    Authorization, AuthorizationPostRequest, AuthorizationStatus, Permission, PermissionAction,
    PermissionResource, RESOURCE_TYPES,
};
use crate::utils::{
    check_not_empty, description_value, known_string, string_value, timestamp_value,
    WithValidate,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthorizationState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub org_id: ValueString<'a>,
    pub permissions: ValueList<Value<PermissionState<'a>>>,
    pub description: ValueString<'a>,
    pub active: ValueBool,
    pub user_id: ValueString<'a>,
    pub token: ValueString<'a>,
    pub created_at: ValueString<'a>,
    pub updated_at: ValueString<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PermissionState<'a> {
    #[serde(borrow = "'a")]
    pub action: ValueString<'a>,
    pub resource: Value<PermissionResourceState<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PermissionResourceState<'a> {
    #[serde(borrow = "'a", rename = "type")]
    pub resource_type: ValueString<'a>,
    pub id: ValueString<'a>,
    pub org_id: ValueString<'a>,
}

fn permission_resource_attributes(computed: bool) -> HashMap<String, Attribute> {
    let (required, optional) = if computed {
        (AttributeConstraint::Computed, AttributeConstraint::Computed)
    } else {
        (AttributeConstraint::Required, AttributeConstraint::Optional)
    };
    map! {
        "type" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(format!(
                "Type of the resource, one of: {}",
                RESOURCE_TYPES.join(", ")
            )),
            constraint: required,
            ..Default::default()
        },
        "id" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain("ID of the resource, all the resources of that type when not set"),
            constraint: optional.clone(),
            ..Default::default()
        },
        "org_id" => Attribute {
            attr_type: AttributeType::String,
            description: Description::plain("ID of the organization owning the resource"),
            constraint: optional,
            ..Default::default()
        },
    }
}

fn action_attribute(constraint: AttributeConstraint) -> Attribute {
    Attribute {
        attr_type: AttributeType::String,
        description: Description::plain("Permission action, `read` or `write`"),
        constraint,
        ..Default::default()
    }
}

impl<'a> AuthorizationState<'a> {
    pub fn resource_schema() -> Schema {
        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Authorization ID"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "org_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the organization the authorization is scoped to, changing it recreates the authorization"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the token, changing it recreates the authorization"),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "active" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Whether the token is active, defaults to `true`"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "user_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the user owning the token, defaults to the user of the provider token"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "token" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("API token"),
                        constraint: AttributeConstraint::Computed,
                        sensitive: true,
                        ..Default::default()
                    },
                    "created_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Authorization creation date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "updated_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Last authorization update date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                blocks: map! {
                    "permissions" => NestedBlock::Set(Block {
                        attributes: map! {
                            "action" => action_attribute(AttributeConstraint::Required),
                        },
                        blocks: map! {
                            "resource" => NestedBlock::Single(Block {
                                attributes: permission_resource_attributes(false),
                                description: Description::plain("Resource the permission applies to"),
                                ..Default::default()
                            }),
                        },
                        description: Description::plain(
                            "Permissions granted by the token, at least one. Changing them recreates the authorization.",
                        ),
                        ..Default::default()
                    }),
                },
                description: Description::plain("InfluxDB authorization"),
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
                        description: Description::plain("Authorization ID"),
                        constraint: AttributeConstraint::Required,
                        ..Default::default()
                    },
                    "org_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the organization the authorization is scoped to"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "permissions" => Attribute {
                        attr_type: AttributeType::AttributeSet(map! {
                            "action" => action_attribute(AttributeConstraint::Computed),
                            "resource" => Attribute {
                                attr_type: AttributeType::AttributeSingle(permission_resource_attributes(true)),
                                description: Description::plain("Resource the permission applies to"),
                                constraint: AttributeConstraint::Computed,
                                ..Default::default()
                            },
                        }),
                        description: Description::plain("Permissions granted by the token"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "description" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Description of the token"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "active" => Attribute {
                        attr_type: AttributeType::Bool,
                        description: Description::plain("Whether the token is active"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "user_id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("ID of the user owning the token"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "token" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("API token"),
                        constraint: AttributeConstraint::Computed,
                        sensitive: true,
                        ..Default::default()
                    },
                    "created_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Authorization creation date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "updated_at" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("Last authorization update date"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                description: Description::plain("InfluxDB authorization data source"),
                ..Default::default()
            },
        }
    }

    /// Build the state from the authorization returned by the server
    ///
    /// `prior` is the state (or plan) the authorization has been read for.
    pub fn from_authorization(authorization: Authorization, prior: &AuthorizationState<'a>) -> Self {
        Self {
            id: Value::Value(Cow::Owned(authorization.id)),
            org_id: Value::Value(Cow::Owned(authorization.org_id)),
            permissions: permissions_value(authorization.permissions, &prior.permissions),
            description: description_value(authorization.description, &prior.description),
            active: Value::Value(authorization.status.is_active()),
            user_id: string_value(authorization.user_id),
            // Only the creation answers with the token on some servers
            token: match authorization.token {
                Some(token) => Value::Value(Cow::Owned(token)),
                None => prior.token.clone(),
            },
            created_at: timestamp_value(authorization.created_at),
            updated_at: timestamp_value(authorization.updated_at),
        }
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.active.as_ref_option().copied().unwrap_or(true).into()
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.permissions
            .iter()
            .flatten()
            .filter_map(|permission| permission.as_ref_option()?.to_permission())
            .collect()
    }

    pub fn post_request(&self) -> AuthorizationPostRequest {
        AuthorizationPostRequest {
            org_id: known_string(&self.org_id).unwrap_or_default(),
            user_id: known_string(&self.user_id),
            description: known_string(&self.description),
            status: self.status(),
            permissions: self.permissions(),
        }
    }
}

impl PermissionState<'_> {
    fn to_permission(&self) -> Option<Permission> {
        let resource = self.resource.as_ref_option()?;
        Some(Permission {
            action: PermissionAction::parse(self.action.as_deref_option()?)?,
            resource: PermissionResource {
                resource_type: known_string(&resource.resource_type)?,
                id: known_string(&resource.id),
                name: None,
                org_id: known_string(&resource.org_id),
                org: None,
            },
        })
    }

    /// Check if the server `permission` is the one described by `self`
    ///
    /// Attributes left null are filled by the server and are not compared.
    fn matches(&self, permission: &Permission) -> bool {
        let Value::Value(resource) = &self.resource else {
            return false;
        };
        let optional_matches = |value: &ValueString<'_>, remote: &Option<String>| match value {
            Value::Value(value) => remote.as_deref() == Some(&**value),
            _ => true,
        };
        self.action.as_deref_option() == Some(permission.action.as_str())
            && resource.resource_type.as_deref_option()
                == Some(permission.resource.resource_type.as_str())
            && optional_matches(&resource.id, &permission.resource.id)
            && optional_matches(&resource.org_id, &permission.resource.org_id)
    }
}

impl<'a> From<Permission> for PermissionState<'a> {
    fn from(permission: Permission) -> Self {
        Self {
            action: Value::Value(Cow::Borrowed(permission.action.as_str())),
            resource: Value::Value(PermissionResourceState {
                resource_type: Value::Value(Cow::Owned(permission.resource.resource_type)),
                id: string_value(permission.resource.id),
                org_id: string_value(permission.resource.org_id),
            }),
        }
    }
}

/// Map the permissions returned by the server
///
/// The prior representation is kept when each of its permissions matches a distinct server one.
fn permissions_value<'a>(
    permissions: Vec<Permission>,
    prior: &ValueList<Value<PermissionState<'a>>>,
) -> ValueList<Value<PermissionState<'a>>> {
    if let Value::Value(prior_permissions) = prior {
        if prior_permissions.len() == permissions.len() {
            let mut used = vec![false; permissions.len()];
            let all_match = prior_permissions.iter().all(|prior| {
                let Value::Value(prior) = prior else {
                    return false;
                };
                match (0..permissions.len()).find(|&i| !used[i] && prior.matches(&permissions[i])) {
                    Some(i) => {
                        used[i] = true;
                        true
                    }
                    None => false,
                }
            });
            if all_match {
                return prior.clone();
            }
        }
    }

    Value::Value(
        permissions
            .into_iter()
            .map(|permission| Value::Value(permission.into()))
            .collect(),
    )
}

impl WithValidate for PermissionState<'_> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(action) = &self.action {
            if PermissionAction::parse(action).is_none() {
                diags.error(
                    "Invalid permission action",
                    format!("`{action}` is not a valid action, expected `read` or `write`."),
                    attr_path.clone().attribute("action"),
                );
            }
        }

        let attr_path = attr_path.attribute("resource");
        match &self.resource {
            Value::Value(resource) => {
                if let Value::Value(resource_type) = &resource.resource_type {
                    if !RESOURCE_TYPES.contains(&&**resource_type) {
                        diags.error(
                            "Invalid permission resource type",
                            format!(
                                "`{resource_type}` is not a valid resource type, expected one of: {}.",
                                RESOURCE_TYPES.join(", ")
                            ),
                            attr_path.clone().attribute("type"),
                        );
                    }
                }
                check_not_empty(diags, &resource.id, "id", attr_path.clone().attribute("id"));
                check_not_empty(
                    diags,
                    &resource.org_id,
                    "org_id",
                    attr_path.attribute("org_id"),
                );
            }
            Value::Null => diags.error_short("Permission must have a `resource` block", attr_path),
            Value::Unknown => (),
        }
    }
}

impl WithValidate for AuthorizationState<'_> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        check_not_empty(diags, &self.org_id, "org_id", attr_path.clone().attribute("org_id"));
        check_not_empty(diags, &self.user_id, "user_id", attr_path.clone().attribute("user_id"));

        let permissions_path = attr_path.attribute("permissions");
        match &self.permissions {
            Value::Value(permissions) if !permissions.is_empty() => {
                for (i, permission) in permissions.iter().enumerate() {
                    if let Value::Value(permission) = permission {
                        permission.validate(diags, permissions_path.clone().index(i as i64));
                    }
                }
            }
            Value::Unknown => (),
            _ => diags.error(
                "Missing permissions",
                "An authorization must grant at least one permission.",
                permissions_path,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use tf_provider::value::Value;
    use tf_provider::{AttributePath, Diagnostics};

    use crate::influxdb::{Permission, PermissionAction, PermissionResource};
    use crate::utils::WithValidate;

    use super::{
        permissions_value, AuthorizationState, PermissionResourceState, PermissionState,
    };

    fn permission<'a>(action: &'a str, resource_type: &'a str) -> Value<PermissionState<'a>> {
        Value::Value(PermissionState {
            action: Value::Value(Cow::from(action)),
            resource: Value::Value(PermissionResourceState {
                resource_type: Value::Value(Cow::from(resource_type)),
                ..Default::default()
            }),
        })
    }

    fn remote(action: PermissionAction, resource_type: &str, org_id: &str) -> Permission {
        Permission {
            action,
            resource: PermissionResource {
                resource_type: resource_type.to_owned(),
                id: None,
                name: None,
                org_id: Some(org_id.to_owned()),
                org: Some("my-org".to_owned()),
            },
        }
    }

    #[test]
    fn prior_permissions_are_kept() {
        let prior = Value::Value(vec![
            permission("read", "buckets"),
            permission("write", "buckets"),
        ]);
        let permissions = permissions_value(
            vec![
                remote(PermissionAction::Write, "buckets", "9f8e7d6c5b4a3210"),
                remote(PermissionAction::Read, "buckets", "9f8e7d6c5b4a3210"),
            ],
            &prior,
        );
        assert_eq!(permissions, prior);
    }

    #[test]
    fn remote_permissions_replace_drift() {
        let prior = Value::Value(vec![permission("read", "buckets")]);
        let permissions = permissions_value(
            vec![remote(PermissionAction::Write, "buckets", "9f8e7d6c5b4a3210")],
            &prior,
        );
        assert_eq!(
            permissions,
            Value::Value(vec![Value::Value(PermissionState {
                action: Value::Value(Cow::from("write")),
                resource: Value::Value(PermissionResourceState {
                    resource_type: Value::Value(Cow::from("buckets")),
                    id: Value::Null,
                    org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
                }),
            })])
        );

        let prior = Value::Value(vec![permission("read", "buckets"), permission("read", "buckets")]);
        let permissions = permissions_value(
            vec![
                remote(PermissionAction::Read, "buckets", "9f8e7d6c5b4a3210"),
                remote(PermissionAction::Read, "orgs", "9f8e7d6c5b4a3210"),
            ],
            &prior,
        );
        assert_ne!(permissions, prior);
    }

    #[test]
    fn validate_permissions() {
        let mut diags = Diagnostics::default();
        let state = AuthorizationState {
            org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
            permissions: Value::Value(vec![
                permission("read", "buckets"),
                permission("delete", "buckets"),
                permission("write", "bucket"),
                Value::Value(PermissionState {
                    action: Value::Value(Cow::from("read")),
                    resource: Value::Null,
                }),
            ]),
            ..Default::default()
        };
        state.validate(&mut diags, AttributePath::default());
        assert_eq!(diags.errors.len(), 3);

        let mut diags = Diagnostics::default();
        let state = AuthorizationState {
            org_id: Value::Value(Cow::from("9f8e7d6c5b4a3210")),
            permissions: Value::Value(vec![]),
            ..Default::default()
        };
        state.validate(&mut diags, AttributePath::default());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn status_defaults_to_active() {
        let state = AuthorizationState::default();
        assert!(state.status().is_active());
        let state = AuthorizationState {
            active: Value::Value(false),
            ..Default::default()
        };
        assert!(!state.status().is_active());
    }
}
