//! Data source definitions
//!
//! One closed variant per backend type. Authored `config` blocks are
//! converted into the typed variant once, during normalization.

use super::auth::LambdaFunctionConfig;
use super::raw::RawDataSource;
use crate::error::{CompileError, Result, ValidationIssue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum DataSourceType {
    #[serde(rename = "AMAZON_DYNAMODB", alias = "DYNAMODB")]
    DynamoDb,
    #[serde(rename = "AWS_LAMBDA", alias = "LAMBDA")]
    Lambda,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "AMAZON_OPENSEARCH_SERVICE", alias = "OPENSEARCH")]
    OpenSearch,
    #[serde(rename = "RELATIONAL_DATABASE")]
    RelationalDatabase,
    #[serde(rename = "AMAZON_EVENTBRIDGE", alias = "EVENTBRIDGE")]
    EventBridge,
    #[serde(rename = "NONE")]
    None,
}

impl DataSourceType {
    /// Name emitted in the resource's `Type` property
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceType::DynamoDb => "AMAZON_DYNAMODB",
            DataSourceType::Lambda => "AWS_LAMBDA",
            DataSourceType::Http => "HTTP",
            DataSourceType::OpenSearch => "AMAZON_OPENSEARCH_SERVICE",
            DataSourceType::RelationalDatabase => "RELATIONAL_DATABASE",
            DataSourceType::EventBridge => "AMAZON_EVENTBRIDGE",
            DataSourceType::None => "NONE",
        }
    }
}

impl std::fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access-control settings shared by every data source type
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleConfig {
    pub service_role_arn: Option<Value>,
    pub iam_role_statements: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoDbConfig {
    pub table_name: Value,
    #[serde(default)]
    pub use_caller_credentials: bool,
    pub region: Option<Value>,
    #[serde(default)]
    pub versioned: bool,
    pub delta_sync_config: Option<DeltaSyncConfig>,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaSyncConfig {
    #[serde(rename = "baseTableTTL")]
    pub base_table_ttl: Option<u64>,
    #[serde(rename = "deltaSyncTableName")]
    pub delta_sync_table_name: String,
    #[serde(rename = "deltaSyncTableTTL")]
    pub delta_sync_table_ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LambdaDataSourceConfig {
    #[serde(flatten)]
    pub function: LambdaFunctionConfig,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    pub endpoint: Value,
    pub authorization_config: Option<HttpAuthorizationConfig>,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAuthorizationConfig {
    pub authorization_type: String,
    #[serde(default)]
    pub aws_iam_config: AwsIamConfig,
}

impl HttpAuthorizationConfig {
    /// Requests are signed with SigV4
    pub fn is_aws_iam(&self) -> bool {
        self.authorization_type == "AWS_IAM"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsIamConfig {
    pub signing_region: Option<Value>,
    pub signing_service_name: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSearchConfig {
    pub endpoint: Option<Value>,
    /// Logical id of a domain declared in the same template
    pub domain: Option<String>,
    pub region: Option<Value>,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationalDatabaseConfig {
    pub db_cluster_identifier: Value,
    pub database_name: Option<Value>,
    pub schema: Option<Value>,
    pub aws_secret_store_arn: Value,
    pub relational_database_source_type: Option<String>,
    pub region: Option<Value>,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBridgeConfig {
    pub event_bus_arn: Value,
    #[serde(flatten)]
    pub role: RoleConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceKind {
    DynamoDb(DynamoDbConfig),
    Lambda(LambdaDataSourceConfig),
    Http(HttpConfig),
    OpenSearch(OpenSearchConfig),
    RelationalDatabase(RelationalDatabaseConfig),
    EventBridge(EventBridgeConfig),
    /// Local resolver, no backend. May still carry role settings.
    None(RoleConfig),
}

/// A named, fully typed data source
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceDefinition {
    pub name: String,
    pub description: Option<String>,
    pub kind: DataSourceKind,
}

impl DataSourceDefinition {
    /// Type the authored `config` block according to the declared `type`
    pub fn from_raw(name: &str, raw: RawDataSource) -> Result<Self> {
        let path = format!("/dataSources/{}/config", name);
        let config = raw.config;
        let kind = match raw.kind {
            DataSourceType::DynamoDb => DataSourceKind::DynamoDb(typed(&path, config)?),
            DataSourceType::Lambda => DataSourceKind::Lambda(typed(&path, config)?),
            DataSourceType::Http => DataSourceKind::Http(typed(&path, config)?),
            DataSourceType::OpenSearch => DataSourceKind::OpenSearch(typed(&path, config)?),
            DataSourceType::RelationalDatabase => {
                DataSourceKind::RelationalDatabase(typed(&path, config)?)
            }
            DataSourceType::EventBridge => DataSourceKind::EventBridge(typed(&path, config)?),
            DataSourceType::None => match config {
                Some(value) => DataSourceKind::None(typed(&path, Some(value))?),
                None => DataSourceKind::None(RoleConfig::default()),
            },
        };

        Ok(Self {
            name: name.to_string(),
            description: raw.description,
            kind,
        })
    }

    pub fn data_source_type(&self) -> DataSourceType {
        match &self.kind {
            DataSourceKind::DynamoDb(_) => DataSourceType::DynamoDb,
            DataSourceKind::Lambda(_) => DataSourceType::Lambda,
            DataSourceKind::Http(_) => DataSourceType::Http,
            DataSourceKind::OpenSearch(_) => DataSourceType::OpenSearch,
            DataSourceKind::RelationalDatabase(_) => DataSourceType::RelationalDatabase,
            DataSourceKind::EventBridge(_) => DataSourceType::EventBridge,
            DataSourceKind::None(_) => DataSourceType::None,
        }
    }

    pub fn role(&self) -> &RoleConfig {
        match &self.kind {
            DataSourceKind::DynamoDb(c) => &c.role,
            DataSourceKind::Lambda(c) => &c.role,
            DataSourceKind::Http(c) => &c.role,
            DataSourceKind::OpenSearch(c) => &c.role,
            DataSourceKind::RelationalDatabase(c) => &c.role,
            DataSourceKind::EventBridge(c) => &c.role,
            DataSourceKind::None(role) => role,
        }
    }
}

fn typed<T: DeserializeOwned>(path: &str, config: Option<Value>) -> Result<T> {
    let config = config.ok_or_else(|| {
        CompileError::Validation(vec![ValidationIssue::new(path, "is required")])
    })?;
    serde_json::from_value(config)
        .map_err(|e| CompileError::Validation(vec![ValidationIssue::new(path, e.to_string())]))
}
