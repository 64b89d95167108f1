//! Arr-family response types
//!
//! Only the fields this layer actually consumes are modeled; everything
//! provider-versioned is passed through as raw JSON. Serde aliases tolerate
//! the PascalCase spellings some provider versions emit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(alias = "Version")]
    pub version: String,
    #[serde(alias = "AppName")]
    pub app_name: String,
    #[serde(alias = "InstanceName")]
    pub instance_name: String,
    #[serde(alias = "OsName")]
    pub os_name: String,
    #[serde(alias = "Branch")]
    pub branch: String,
    #[serde(alias = "RuntimeVersion")]
    pub runtime_version: String,
    #[serde(alias = "StartTime")]
    pub start_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthCheck {
    pub source: String,
    #[serde(rename = "type", alias = "Type")]
    pub kind: String,
    pub message: String,
    pub wiki_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub upgrade_allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolder {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub free_space: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

/// One page of the provider's log table. Records stay in the native shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogPage {
    pub page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub records: Vec<Value>,
}
