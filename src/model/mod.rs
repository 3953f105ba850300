//! Configuration model
//!
//! Two layers:
//!
//! - [`raw`] - the configuration as authored (shorthands, inline definitions,
//!   lists of maps)
//! - [`ApiConfiguration`] - the normalized form every compiler consumes:
//!   every cross reference is a plain name and every data source, pipeline
//!   function and API key is a top-level entry
//!
//! Values that may hold either a literal or an intrinsic function
//! (`{"Ref": ...}`, `{"Fn::GetAtt": ...}`) are kept as [`serde_json::Value`].

pub mod auth;
pub mod data_source;
pub mod raw;
pub mod waf;

pub use auth::*;
pub use data_source::*;
pub use raw::*;
pub use waf::*;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Shared blocks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    pub name: String,
    pub enabled: Option<bool>,
    pub certificate_arn: Option<Value>,
    pub hosted_zone_id: Option<Value>,
    pub hosted_zone_name: Option<String>,
    pub route53: Option<bool>,
    /// `false` when the domain is managed outside the stack
    pub use_cloud_formation: Option<bool>,
    pub retain: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub enabled: Option<bool>,
    /// `ALL`, `INFO`, `DEBUG`, `ERROR` or `NONE`
    pub level: String,
    pub exclude_verbose_content: Option<bool>,
    pub retention_in_days: Option<u32>,
    pub role_arn: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingConfig {
    pub enabled: Option<bool>,
    /// `FULL_REQUEST_CACHING` or `PER_RESOLVER_CACHING`
    pub behavior: String,
    pub at_rest_encryption: Option<bool>,
    pub transit_encryption: Option<bool>,
    pub ttl: Option<u32>,
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
}

/// Conflict detection and resolution for versioned data sources
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// `VERSION` (default) or `NONE`
    pub conflict_detection: Option<String>,
    /// `OPTIMISTIC_CONCURRENCY` (default), `AUTOMERGE` or `LAMBDA`
    pub conflict_handler: Option<String>,
    #[serde(flatten)]
    pub function: LambdaFunctionConfig,
}

/// Per-resolver caching override
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResolverCaching {
    Enabled(bool),
    Custom {
        ttl: Option<u32>,
        keys: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyConfig {
    pub name: String,
    pub description: Option<String>,
    pub expires_after: Option<DurationInput>,
    /// RFC 3339 timestamp
    pub expires_at: Option<String>,
    pub api_key_id: Option<String>,
    #[serde(default)]
    pub waf_rules: Vec<WafRuleInput>,
}

impl ApiKeyConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            expires_after: None,
            expires_at: None,
            api_key_id: None,
            waf_rules: Vec::new(),
        }
    }
}

/// `expiresAfter`: a bare number of hours or a `<n><unit>` string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationInput {
    Hours(u64),
    Text(String),
}

// ============================================================================
// Normalized configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverKind {
    Unit { data_source: String },
    /// Function names in evaluation order
    Pipeline { functions: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverDefinition {
    pub type_name: String,
    pub field: String,
    pub kind: ResolverKind,
    pub code: Option<String>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub max_batch_size: Option<u32>,
    pub sync: Option<SyncConfig>,
    pub substitutions: IndexMap<String, Value>,
    pub caching: Option<ResolverCaching>,
}

impl ResolverDefinition {
    /// `Type.field`
    pub fn path(&self) -> String {
        format!("{}.{}", self.type_name, self.field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFunctionDefinition {
    pub name: String,
    pub data_source: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub max_batch_size: Option<u32>,
    pub sync: Option<SyncConfig>,
    pub substitutions: IndexMap<String, Value>,
}

/// Fully expanded configuration; immutable once normalized
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfiguration {
    pub name: String,
    pub authentication: AuthProvider,
    pub additional_authentications: Vec<AuthProvider>,
    pub schema: Vec<String>,
    pub domain: Option<DomainConfig>,
    pub xray_enabled: bool,
    pub visibility: Option<String>,
    pub introspection: Option<bool>,
    pub query_depth_limit: Option<u32>,
    pub resolver_count_limit: Option<u32>,
    pub substitutions: IndexMap<String, Value>,
    pub environment: IndexMap<String, Value>,
    pub waf: Option<WafConfig>,
    pub tags: IndexMap<String, String>,
    pub caching: Option<CachingConfig>,
    pub api_keys: IndexMap<String, ApiKeyConfig>,
    pub logging: Option<LoggingConfig>,
    pub data_sources: IndexMap<String, DataSourceDefinition>,
    /// Keyed by `Type.field`
    pub resolvers: IndexMap<String, ResolverDefinition>,
    pub pipeline_functions: IndexMap<String, PipelineFunctionDefinition>,
}

impl ApiConfiguration {
    /// Primary provider first, then the additional ones
    pub fn auth_providers(&self) -> impl Iterator<Item = &AuthProvider> {
        std::iter::once(&self.authentication).chain(self.additional_authentications.iter())
    }

    pub fn has_auth(&self, auth_type: &str) -> bool {
        self.auth_providers().any(|p| p.auth_type() == auth_type)
    }

    pub fn has_data_source(&self, name: &str) -> bool {
        self.data_sources.contains_key(name)
    }

    pub fn has_pipeline_function(&self, name: &str) -> bool {
        self.pipeline_functions.contains_key(name)
    }

    /// TTL configured for the API cache, if any
    pub fn caching_ttl(&self) -> Option<u32> {
        self.caching.as_ref().and_then(|c| c.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolver_caching_shapes() {
        let enabled: ResolverCaching = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(enabled, ResolverCaching::Enabled(true));

        let custom: ResolverCaching =
            serde_json::from_value(json!({"ttl": 60, "keys": ["$context.identity.sub"]})).unwrap();
        assert_eq!(
            custom,
            ResolverCaching::Custom {
                ttl: Some(60),
                keys: Some(vec!["$context.identity.sub".to_string()])
            }
        );
    }

    #[test]
    fn test_duration_input_shapes() {
        let hours: DurationInput = serde_json::from_value(json!(48)).unwrap();
        assert_eq!(hours, DurationInput::Hours(48));
        let text: DurationInput = serde_json::from_value(json!("30d")).unwrap();
        assert_eq!(text, DurationInput::Text("30d".to_string()));
    }

    #[test]
    fn test_sync_config_reads_lambda_handler() {
        let sync: SyncConfig = serde_json::from_value(json!({
            "conflictHandler": "LAMBDA",
            "functionName": "conflicts"
        }))
        .unwrap();
        assert_eq!(sync.conflict_handler.as_deref(), Some("LAMBDA"));
        assert!(sync.conflict_detection.is_none());
        assert_eq!(sync.function.function_name.as_deref(), Some("conflicts"));
    }
}
