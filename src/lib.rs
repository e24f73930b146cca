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

//! Terraform and OpenTofu provider for InfluxDB 2.x
//!
//! Exposes two resources and their data sources:
//! - `influxdb_bucket`: storage container with its retention rules,
//! - `influxdb_authorization`: API token scoped to an organization with a set of permissions.
//!
//! The provider is configured with the URL of the server (`host`) and an API token (`token`).

pub mod authorization;
pub mod bucket;
pub mod influxdb;
pub mod provider;
mod utils;

pub use provider::InfluxdbProvider;
