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

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use tf_provider::value::{Value, ValueString};
use tf_provider::{AttributePath, Diagnostics};

pub(crate) trait WithValidate {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

/// Convert an optional API string into a Terraform value
pub(crate) fn string_value<'a>(value: Option<String>) -> ValueString<'a> {
    value.map(Cow::Owned).into()
}

/// Convert an API timestamp into a RFC 3339 Terraform value
pub(crate) fn timestamp_value<'a>(value: Option<OffsetDateTime>) -> ValueString<'a> {
    match value.map(|ts| ts.format(&Rfc3339)) {
        Some(Ok(ts)) => Value::Value(Cow::Owned(ts)),
        Some(Err(err)) => {
            tracing::warn!("Could not format timestamp: {err}");
            Value::Null
        }
        None => Value::Null,
    }
}

/// Convert an optional API description into a Terraform value
///
/// InfluxDB drops empty descriptions: an empty string already in state is kept as is.
pub(crate) fn description_value<'a>(
    value: Option<String>,
    prior: &ValueString<'_>,
) -> ValueString<'a> {
    match value {
        Some(description) if !description.is_empty() => Value::Value(Cow::Owned(description)),
        _ if prior.as_deref_option() == Some("") => Value::Value(Cow::Borrowed("")),
        _ => Value::Null,
    }
}

/// Known and non-null string, as an owned `String`
pub(crate) fn known_string(value: &ValueString<'_>) -> Option<String> {
    value.as_deref_option().map(str::to_owned)
}

/// Record an error if a known string value is empty
pub(crate) fn check_not_empty(
    diags: &mut Diagnostics,
    value: &ValueString<'_>,
    name: &'static str,
    attr_path: AttributePath,
) {
    if value.as_deref_option() == Some("") {
        diags.error_short(format!("`{name}` must not be empty"), attr_path);
    }
}

/// Compare two lists as multisets, ignoring the order of their elements
pub(crate) fn same_elements<T: PartialEq>(lhs: &[T], rhs: &[T]) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    let mut used = vec![false; rhs.len()];
    lhs.iter().all(|x| {
        match (0..rhs.len()).find(|&i| !used[i] && *x == rhs[i]) {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}
