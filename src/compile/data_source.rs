//! Data sources
//!
//! One `AWS::AppSync::DataSource` per definition plus, unless a service
//! role ARN is given, a role holding either the explicit statements or the
//! least-privilege defaults for the data source type.

use super::api::assume_role_policy;
use super::ApiCompiler;
use crate::error::{CompileError, Result};
use crate::model::{
    DataSourceDefinition, DataSourceKind, DynamoDbConfig, HttpConfig, OpenSearchConfig,
    RelationalDatabaseConfig,
};
use crate::resource::intrinsic::{arn, get_att, join, reference, region_or_default, ACCOUNT_ID};
use crate::resource::{get_default_policy, get_policy_registry, Resource, ResourceGraph};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use tracing::debug;

fn opensearch_endpoint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://([a-z0-9-]+\.(\w{2}-[a-z]+-\d)\.es\.amazonaws\.com)$")
            .unwrap_or_else(|e| panic!("Invalid endpoint pattern: {}", e))
    })
}

impl ApiCompiler<'_> {
    pub fn compile_data_source(&mut self, ds: &DataSourceDefinition) -> Result<ResourceGraph> {
        let mut properties = Map::new();
        properties.insert("ApiId".into(), self.api_id());
        properties.insert("Name".into(), Value::from(ds.name.as_str()));
        properties.insert("Description".into(), json!(ds.description));
        properties.insert("Type".into(), Value::from(ds.data_source_type().as_str()));

        match &ds.kind {
            DataSourceKind::Lambda(config) => {
                let name = self.naming.data_source_function(&ds.name);
                let function_arn = self.lambda_arn(&config.function, &name)?;
                properties.insert("LambdaConfig".into(), json!({ "LambdaFunctionArn": function_arn }));
            }
            DataSourceKind::DynamoDb(config) => {
                properties.insert("DynamoDBConfig".into(), dynamodb_config(config));
            }
            DataSourceKind::OpenSearch(config) => {
                properties.insert("OpenSearchServiceConfig".into(), opensearch_config(config)?);
            }
            DataSourceKind::RelationalDatabase(config) => {
                properties.insert("RelationalDatabaseConfig".into(), relational_config(config));
            }
            DataSourceKind::Http(config) => {
                properties.insert("HttpConfig".into(), http_config(config));
            }
            DataSourceKind::EventBridge(config) => {
                properties.insert("EventBridgeConfig".into(), json!({ "EventBusArn": config.event_bus_arn }));
            }
            DataSourceKind::None(_) => {}
        }

        let mut graph = ResourceGraph::new();
        let role = match &ds.role().service_role_arn {
            Some(role_arn) => {
                properties.insert("ServiceRoleArn".into(), role_arn.clone());
                None
            }
            None => self.compile_data_source_role(ds)?,
        };

        if role.is_some() {
            let role_id = self.naming.data_source_role(&ds.name);
            properties.insert("ServiceRoleArn".into(), get_att(&role_id, "Arn"));
        }

        graph.insert(
            self.naming.data_source(&ds.name),
            Resource::new("AWS::AppSync::DataSource", Value::Object(properties)),
        )?;
        if let Some(role) = role {
            graph.insert(self.naming.data_source_role(&ds.name), role)?;
        }

        debug!("Compiled data source '{}' ({})", ds.name, ds.data_source_type());
        Ok(graph)
    }

    /// Role for a data source, or `None` when no statements apply
    fn compile_data_source_role(&mut self, ds: &DataSourceDefinition) -> Result<Option<Resource>> {
        if ds.role().service_role_arn.is_some() {
            return Ok(None);
        }

        if let DataSourceKind::Http(config) = &ds.kind {
            let signed = config
                .authorization_config
                .as_ref()
                .is_some_and(|auth| auth.is_aws_iam());
            if signed && config.role.iam_role_statements.is_none() {
                return Err(CompileError::ConfigShape(format!(
                    "{}: When using AWS_IAM signature, you must also specify the required iamRoleStatements",
                    ds.name
                )));
            }
        }

        let statements = match &ds.role().iam_role_statements {
            Some(statements) => statements.clone(),
            None => self.default_statements(ds)?,
        };
        if statements.is_empty() {
            return Ok(None);
        }

        let registry = get_policy_registry();
        Ok(Some(Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": assume_role_policy(),
                "Policies": [{
                    "PolicyName": format!("AppSync-Datasource-{}", ds.name),
                    "PolicyDocument": {
                        "Version": registry.policy_version,
                        "Statement": statements,
                    },
                }],
            }),
        )))
    }

    /// Least-privilege statements derived from the data source type
    fn default_statements(&mut self, ds: &DataSourceDefinition) -> Result<Vec<Value>> {
        let Some(policy) = get_default_policy(ds.data_source_type().as_str()) else {
            return Ok(Vec::new());
        };
        let actions = &policy.actions;

        let statements = match &ds.kind {
            DataSourceKind::Lambda(config) => {
                let name = self.naming.data_source_function(&ds.name);
                let function_arn = self.lambda_arn(&config.function, &name)?;
                vec![json!({
                    "Action": actions,
                    "Effect": "Allow",
                    "Resource": [function_arn.clone(), join(":", vec![function_arn, Value::from("*")])],
                })]
            }
            DataSourceKind::DynamoDb(config) => {
                let table_prefix = arn(
                    "dynamodb",
                    region_or_default(config.region.as_ref()),
                    vec![Value::from("table")],
                );
                vec![json!({
                    "Action": actions,
                    "Effect": "Allow",
                    "Resource": [
                        join("/", vec![table_prefix.clone(), config.table_name.clone()]),
                        join("/", vec![table_prefix, config.table_name.clone(), Value::from("*")]),
                    ],
                })]
            }
            DataSourceKind::RelationalDatabase(config) => {
                let cluster = cluster_arn(config);
                let secret = &config.aws_secret_store_arn;
                vec![
                    json!({
                        "Effect": "Allow",
                        "Action": actions,
                        "Resource": [cluster.clone(), join(":", vec![cluster, Value::from("*")])],
                    }),
                    json!({
                        "Effect": "Allow",
                        "Action": policy.secret_actions,
                        "Resource": [secret.clone(), join(":", vec![secret.clone(), Value::from("*")])],
                    }),
                ]
            }
            DataSourceKind::OpenSearch(config) => {
                let domain_arn = opensearch_arn(&ds.name, config)?;
                vec![json!({
                    "Action": actions,
                    "Effect": "Allow",
                    "Resource": [domain_arn],
                })]
            }
            DataSourceKind::EventBridge(config) => vec![json!({
                "Action": actions,
                "Effect": "Allow",
                "Resource": [config.event_bus_arn],
            })],
            DataSourceKind::Http(_) | DataSourceKind::None(_) => Vec::new(),
        };
        Ok(statements)
    }
}

fn dynamodb_config(config: &DynamoDbConfig) -> Value {
    let mut value = json!({
        "AwsRegion": region_or_default(config.region.as_ref()),
        "TableName": config.table_name,
        "UseCallerCredentials": config.use_caller_credentials,
    });
    if let (true, Some(delta)) = (config.versioned, &config.delta_sync_config) {
        value["Versioned"] = Value::Bool(true);
        value["DeltaSyncConfig"] = json!({
            "BaseTableTTL": delta.base_table_ttl.unwrap_or(43200),
            "DeltaSyncTableName": delta.delta_sync_table_name,
            "DeltaSyncTableTTL": delta.delta_sync_table_ttl.unwrap_or(1440),
        });
    }
    value
}

fn opensearch_config(config: &OpenSearchConfig) -> Result<Value> {
    let endpoint = match (&config.endpoint, &config.domain) {
        (Some(endpoint), None) => endpoint.clone(),
        (None, Some(domain)) => join(
            "",
            vec![Value::from("https://"), get_att(domain, "DomainEndpoint")],
        ),
        _ => {
            return Err(CompileError::ConfigShape(
                "Specify either endpoint or domain".to_string(),
            ))
        }
    };
    Ok(json!({
        "AwsRegion": region_or_default(config.region.as_ref()),
        "Endpoint": endpoint,
    }))
}

/// ARN the default OpenSearch statement is scoped to
fn opensearch_arn(name: &str, config: &OpenSearchConfig) -> Result<Value> {
    if let Some(Value::String(endpoint)) = &config.endpoint {
        let captures = opensearch_endpoint_regex().captures(endpoint).ok_or_else(|| {
            CompileError::ConfigShape(format!("Invalid AWS OpenSearch endpoint: '{}'", endpoint))
        })?;
        let host = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let region = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        return Ok(join(
            ":",
            vec![
                Value::from("arn"),
                Value::from("aws"),
                Value::from("es"),
                Value::from(region),
                reference(ACCOUNT_ID),
                Value::from(format!("domain/{}/*", host)),
            ],
        ));
    }
    if let Some(domain) = &config.domain {
        return Ok(join("/", vec![get_att(domain, "Arn"), Value::from("*")]));
    }
    Err(CompileError::ConfigShape(format!(
        "Could not determine the Arn for dataSource '{}'",
        name
    )))
}

fn cluster_arn(config: &RelationalDatabaseConfig) -> Value {
    arn(
        "rds",
        region_or_default(config.region.as_ref()),
        vec![Value::from("cluster"), config.db_cluster_identifier.clone()],
    )
}

fn relational_config(config: &RelationalDatabaseConfig) -> Value {
    json!({
        "RdsHttpEndpointConfig": {
            "AwsRegion": region_or_default(config.region.as_ref()),
            "DbClusterIdentifier": cluster_arn(config),
            "DatabaseName": config.database_name,
            "Schema": config.schema,
            "AwsSecretStoreArn": config.aws_secret_store_arn,
        },
        "RelationalDatabaseSourceType": config
            .relational_database_source_type
            .as_deref()
            .unwrap_or("RDS_HTTP_ENDPOINT"),
    })
}

fn http_config(config: &HttpConfig) -> Value {
    let mut value = json!({ "Endpoint": config.endpoint });
    if let Some(auth) = &config.authorization_config {
        value["AuthorizationConfig"] = json!({
            "AuthorizationType": auth.authorization_type,
            "AwsIamConfig": {
                "SigningRegion": region_or_default(auth.aws_iam_config.signing_region.as_ref()),
                "SigningServiceName": auth.aws_iam_config.signing_service_name,
            },
        });
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::CompileContext;
    use crate::fs::MemoryFs;
    use crate::model::{ApiConfiguration, RawApiConfig};
    use crate::normalize::normalize;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn api_config(data_sources: &str) -> ApiConfiguration {
        let yaml = format!(
            "name: api\nauthentication:\n  type: API_KEY\ndataSources:\n{}",
            data_sources
        );
        normalize(RawApiConfig::from_yaml(&yaml).unwrap()).unwrap()
    }

    fn compile_one(config: &ApiConfiguration, name: &str) -> (Result<ResourceGraph>, usize) {
        let fs = MemoryFs::new();
        let ctx = CompileContext::new(&fs, ".", Utc::now());
        let mut compiler = ApiCompiler::new(config, &ctx);
        let result = compiler.compile_data_source(&config.data_sources[name]);
        let functions = compiler.functions().len();
        (result, functions)
    }

    #[test]
    fn test_dynamodb_with_default_role() {
        let config = api_config(
            "  users:\n    type: AMAZON_DYNAMODB\n    config:\n      tableName: Users\n",
        );
        let (graph, _) = compile_one(&config, "users");
        let graph = graph.unwrap();
        assert_eq!(graph.logical_ids().collect::<Vec<_>>(), vec!["GraphQlDsusers", "GraphQlDsusersRole"]);

        let ds = graph.get("GraphQlDsusers").unwrap();
        assert_eq!(
            ds.properties,
            json!({
                "ApiId": {"Fn::GetAtt": ["GraphQlApi", "ApiId"]},
                "Name": "users",
                "Type": "AMAZON_DYNAMODB",
                "DynamoDBConfig": {
                    "AwsRegion": {"Ref": "AWS::Region"},
                    "TableName": "Users",
                    "UseCallerCredentials": false
                },
                "ServiceRoleArn": {"Fn::GetAtt": ["GraphQlDsusersRole", "Arn"]}
            })
        );

        let role = graph.get("GraphQlDsusersRole").unwrap();
        let statement = &role.properties["Policies"][0]["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"].as_array().unwrap().len(), 9);
        assert_eq!(
            statement["Resource"][1],
            json!({"Fn::Join": ["/", [
                {"Fn::Join": [":", ["arn", "aws", "dynamodb", {"Ref": "AWS::Region"}, {"Ref": "AWS::AccountId"}, "table"]]},
                "Users",
                "*"
            ]]})
        );
        assert_eq!(
            role.properties["Policies"][0]["PolicyName"],
            json!("AppSync-Datasource-users")
        );
    }

    #[test]
    fn test_delta_sync_requires_versioned() {
        let config = api_config(
            "  users:\n    type: AMAZON_DYNAMODB\n    config:\n      tableName: Users\n      versioned: true\n      deltaSyncConfig:\n        deltaSyncTableName: Changes\n",
        );
        let graph = compile_one(&config, "users").0.unwrap();
        let dynamo = &graph.get("GraphQlDsusers").unwrap().properties["DynamoDBConfig"];
        assert_eq!(dynamo["Versioned"], json!(true));
        assert_eq!(
            dynamo["DeltaSyncConfig"],
            json!({"BaseTableTTL": 43200, "DeltaSyncTableName": "Changes", "DeltaSyncTableTTL": 1440})
        );
    }

    #[test]
    fn test_service_role_arn_skips_role() {
        let config = api_config(
            "  users:\n    type: AMAZON_DYNAMODB\n    config:\n      tableName: Users\n      serviceRoleArn: arn:aws:iam::1:role/x\n",
        );
        let graph = compile_one(&config, "users").0.unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.get("GraphQlDsusers").unwrap().properties["ServiceRoleArn"],
            json!("arn:aws:iam::1:role/x")
        );
    }

    #[test]
    fn test_embedded_lambda_registers_one_function() {
        let config = api_config(
            "  resolver:\n    type: AWS_LAMBDA\n    config:\n      function:\n        handler: index.handler\n",
        );
        let (graph, functions) = compile_one(&config, "resolver");
        let graph = graph.unwrap();
        assert_eq!(functions, 1);
        assert_eq!(
            graph.get("GraphQlDsresolver").unwrap().properties["LambdaConfig"],
            json!({"LambdaFunctionArn": {"Fn::GetAtt": ["ResolverLambdaFunction", "Arn"]}})
        );
        let statement = &graph.get("GraphQlDsresolverRole").unwrap().properties["Policies"][0]
            ["PolicyDocument"]["Statement"][0];
        assert_eq!(statement["Action"], json!(["lambda:invokeFunction"]));
    }

    #[test]
    fn test_http_with_iam_signature_requires_statements() {
        let config = api_config(
            "  api:\n    type: HTTP\n    config:\n      endpoint: https://example.com\n      authorizationConfig:\n        authorizationType: AWS_IAM\n        awsIamConfig:\n          signingServiceName: states\n",
        );
        let err = compile_one(&config, "api").0.unwrap_err();
        assert_eq!(
            err.to_string(),
            "api: When using AWS_IAM signature, you must also specify the required iamRoleStatements"
        );
    }

    #[test]
    fn test_plain_http_has_no_role() {
        let config = api_config("  api:\n    type: HTTP\n    config:\n      endpoint: https://example.com\n");
        let graph = compile_one(&config, "api").0.unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get("GraphQlDsapi").unwrap().property("ServiceRoleArn").is_none());
    }

    #[test]
    fn test_opensearch_endpoint_and_domain() {
        let config = api_config(
            "  search:\n    type: AMAZON_OPENSEARCH_SERVICE\n    config:\n      endpoint: https://search-posts.eu-west-1.es.amazonaws.com\n",
        );
        let graph = compile_one(&config, "search").0.unwrap();
        let statement = &graph.get("GraphQlDssearchRole").unwrap().properties["Policies"][0]
            ["PolicyDocument"]["Statement"][0];
        assert_eq!(
            statement["Resource"],
            json!([{"Fn::Join": [":", [
                "arn", "aws", "es", "eu-west-1", {"Ref": "AWS::AccountId"},
                "domain/search-posts.eu-west-1.es.amazonaws.com/*"
            ]]}])
        );

        let config = api_config("  search:\n    type: AMAZON_OPENSEARCH_SERVICE\n    config:\n      domain: PostsDomain\n");
        let graph = compile_one(&config, "search").0.unwrap();
        assert_eq!(
            graph.get("GraphQlDssearch").unwrap().properties["OpenSearchServiceConfig"]["Endpoint"],
            json!({"Fn::Join": ["", ["https://", {"Fn::GetAtt": ["PostsDomain", "DomainEndpoint"]}]]})
        );
    }

    #[test]
    fn test_opensearch_errors() {
        let config = api_config(
            "  search:\n    type: AMAZON_OPENSEARCH_SERVICE\n    config:\n      endpoint: http://localhost:9200\n",
        );
        let err = compile_one(&config, "search").0.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid AWS OpenSearch endpoint: 'http://localhost:9200'"
        );

        let config = api_config("  search:\n    type: AMAZON_OPENSEARCH_SERVICE\n    config: {}\n");
        let err = compile_one(&config, "search").0.unwrap_err();
        assert_eq!(err.to_string(), "Specify either endpoint or domain");

        let config = api_config(
            "  search:\n    type: AMAZON_OPENSEARCH_SERVICE\n    config:\n      endpoint: https://search-posts.eu-west-1.es.amazonaws.com\n      domain: PostsDomain\n",
        );
        let err = compile_one(&config, "search").0.unwrap_err();
        assert!(matches!(err, CompileError::ConfigShape(_)));
        assert_eq!(err.to_string(), "Specify either endpoint or domain");
    }

    #[test]
    fn test_relational_database_statements() {
        let config = api_config(
            "  db:\n    type: RELATIONAL_DATABASE\n    config:\n      dbClusterIdentifier: main\n      awsSecretStoreArn: arn:secret\n      databaseName: app\n",
        );
        let graph = compile_one(&config, "db").0.unwrap();
        let ds = graph.get("GraphQlDsdb").unwrap();
        assert_eq!(
            ds.properties["RelationalDatabaseConfig"]["RelationalDatabaseSourceType"],
            json!("RDS_HTTP_ENDPOINT")
        );
        let statements = &graph.get("GraphQlDsdbRole").unwrap().properties["Policies"][0]
            ["PolicyDocument"]["Statement"];
        assert_eq!(statements[0]["Action"].as_array().unwrap().len(), 6);
        assert_eq!(statements[1]["Action"], json!(["secretsmanager:GetSecretValue"]));
        assert_eq!(
            statements[1]["Resource"],
            json!(["arn:secret", {"Fn::Join": [":", ["arn:secret", "*"]]}])
        );
    }

    #[test]
    fn test_none_has_no_role() {
        let config = api_config("  local:\n    type: NONE\n");
        let graph = compile_one(&config, "local").0.unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.get("GraphQlDslocal").unwrap().properties["Type"],
            json!("NONE")
        );
    }
}
