//! Raw, unresolved shape of a configuration document.
//!
//! These types mirror the JSON layout one-to-one. No placeholders are resolved
//! and no values are interpreted here; that happens in [`crate::parser`].

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigDocument {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub environments: Option<EnvironmentsNode>,
    #[serde(default)]
    pub mappers: Vec<MapperNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct EnvironmentsNode {
    pub default: Option<String>,
    #[serde(default)]
    pub environment: Vec<EnvironmentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct EnvironmentNode {
    pub id: String,
    pub transaction_manager: Option<FactoryNode>,
    pub data_source: Option<FactoryNode>,
}

/// `{ "type": ..., "properties": {...} }`, shared by transaction managers and data sources.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FactoryNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MapperNode {
    pub resource: Option<String>,
    pub url: Option<String>,
}

impl ConfigDocument {
    pub fn from_text(text: &str) -> sqlsession_core::Result<Self> {
        serde_json::from_str(text).map_err(|e| sqlsession_core::Error::Syntax {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })
    }
}
