//! Registry - Embedded AppSync data
//!
//! Default data source policy actions and the AppSync built-in SDL
//! declarations are compiled into the binary and parsed on first access.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded policy JSON (compiled into the binary)
const POLICY_FILE: &str = include_str!("../resources/policies.json");

/// Scalars and directives AppSync provides to every schema
pub const AWS_SDL_DECLARATIONS: &str = include_str!("../resources/aws_types.graphql");

/// Default policy for one data source type
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyDef {
    pub actions: Vec<String>,
    /// Actions granted on a secondary resource (e.g. the RDS secret)
    #[serde(default)]
    pub secret_actions: Vec<String>,
}

/// Root structure of resources/policies.json
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRegistry {
    pub service_principal: String,
    pub policy_version: String,
    pub data_sources: HashMap<String, PolicyDef>,
}

static REGISTRY: OnceLock<PolicyRegistry> = OnceLock::new();

/// Get the policy registry (loads from embedded JSON on first access)
pub fn get_policy_registry() -> &'static PolicyRegistry {
    REGISTRY.get_or_init(|| {
        serde_json::from_str(POLICY_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded policy JSON: {}", e))
    })
}

/// Default policy for a data source type (`AMAZON_DYNAMODB`, `AWS_LAMBDA`, ...)
pub fn get_default_policy(data_source_type: &str) -> Option<&'static PolicyDef> {
    get_policy_registry().data_sources.get(data_source_type)
}
