//! Authored configuration
//!
//! The shapes a user writes: maps may be split into lists of maps, and
//! data sources or pipeline functions may be embedded inline where a name
//! is expected. [`crate::normalize`] turns this into an
//! [`ApiConfiguration`](super::ApiConfiguration).

use super::auth::AuthProvider;
use super::waf::WafConfig;
use super::{
    ApiKeyConfig, CachingConfig, DataSourceType, DomainConfig, LoggingConfig, ResolverCaching,
    SyncConfig,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// Root of the `appSync` configuration block
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawApiConfig {
    pub name: String,
    pub authentication: AuthProvider,
    #[serde(default)]
    pub additional_authentications: Vec<AuthProvider>,
    pub schema: Option<OneOrMany<String>>,
    pub domain: Option<DomainConfig>,
    pub xray_enabled: Option<bool>,
    pub visibility: Option<String>,
    pub introspection: Option<bool>,
    pub query_depth_limit: Option<u32>,
    pub resolver_count_limit: Option<u32>,
    #[serde(default)]
    pub substitutions: IndexMap<String, Value>,
    #[serde(default)]
    pub environment: IndexMap<String, Value>,
    pub waf: Option<WafConfig>,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
    pub caching: Option<CachingConfig>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyInput>,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub data_sources: MapOrMaps<RawDataSource>,
    #[serde(default)]
    pub resolvers: MapOrMaps<ResolverInput>,
    #[serde(default)]
    pub pipeline_functions: MapOrMaps<PipelineFunctionInput>,
}

impl RawApiConfig {
    /// Parse a YAML (or JSON) document
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// A map, or a list of maps to be merged in order
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MapOrMaps<T> {
    Map(IndexMap<String, T>),
    Maps(Vec<IndexMap<String, T>>),
}

impl<T> Default for MapOrMaps<T> {
    fn default() -> Self {
        MapOrMaps::Map(IndexMap::new())
    }
}

impl<T> MapOrMaps<T> {
    /// Shallow-merge into one map; later entries win on key collision
    pub fn flatten(self) -> IndexMap<String, T> {
        match self {
            MapOrMaps::Map(map) => map,
            MapOrMaps::Maps(maps) => {
                let mut merged = IndexMap::new();
                for map in maps {
                    merged.extend(map);
                }
                merged
            }
        }
    }
}

/// Data source as written: `type` plus a type-specific `config` block
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataSource {
    #[serde(rename = "type")]
    pub kind: DataSourceType,
    pub description: Option<String>,
    pub config: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DataSourceRef {
    Named(String),
    Inline(Box<RawDataSource>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResolverKindName {
    Unit,
    Pipeline,
}

/// Resolver value: a bare data source name, or a full definition
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResolverInput {
    DataSource(String),
    Config(Box<ResolverConfigInput>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfigInput {
    pub kind: Option<ResolverKindName>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub field: Option<String>,
    pub data_source: Option<DataSourceRef>,
    pub functions: Option<Vec<FunctionRef>>,
    pub code: Option<String>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub max_batch_size: Option<u32>,
    pub sync: Option<SyncConfig>,
    #[serde(default)]
    pub substitutions: IndexMap<String, Value>,
    pub caching: Option<ResolverCaching>,
}

/// Pipeline function value: a bare data source name, or a full definition
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PipelineFunctionInput {
    DataSource(String),
    Config(Box<PipelineFunctionConfigInput>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFunctionConfigInput {
    pub data_source: DataSourceRef,
    pub description: Option<String>,
    pub code: Option<String>,
    pub request: Option<String>,
    pub response: Option<String>,
    pub max_batch_size: Option<u32>,
    pub sync: Option<SyncConfig>,
    #[serde(default)]
    pub substitutions: IndexMap<String, Value>,
}

/// Entry of a pipeline resolver's `functions` list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FunctionRef {
    Named(String),
    Inline(Box<PipelineFunctionConfigInput>),
}

/// API key: a bare name, or a full definition
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiKeyInput {
    Name(String),
    Config(ApiKeyConfig),
}
