//! End-to-end compile runs
//!
//! Configurations are written to a temporary service directory and compiled
//! through the public pipeline with the disk-backed file system.

use appsync_compiler::fs::LocalFs;
use appsync_compiler::{compile_str, CompileContext, CompileError, CompiledApi};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 10, 14, 37, 12).unwrap()
}

fn start_of_hour() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 10, 14, 0, 0).unwrap()
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn compile_in(dir: &Path, config: &str) -> Result<CompiledApi, CompileError> {
    let fs = LocalFs;
    let ctx = CompileContext::new(&fs, dir, now());
    compile_str(config, &ctx)
}

const USERS_CONFIG: &str = r#"
name: users-api
authentication:
  type: AWS_IAM
dataSources:
  users:
    type: AMAZON_DYNAMODB
    config:
      tableName: Users
resolvers:
  Query.getUser:
    dataSource: users
    request: templates/getUser.request.vtl
    response: templates/getUser.response.vtl
"#;

fn users_service() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { getUser: ID }\n");
    write(
        dir.path(),
        "templates/getUser.request.vtl",
        "{\"version\": \"2017-02-28\", \"operation\": \"GetItem\"}",
    );
    write(dir.path(), "templates/getUser.response.vtl", "$util.toJson($ctx.result)");
    dir
}

#[test]
fn test_single_dynamodb_resolver_scenario() {
    let dir = users_service();
    let compiled = compile_in(dir.path(), USERS_CONFIG).unwrap();
    let graph = &compiled.resources;

    assert_eq!(
        graph.logical_ids().collect::<Vec<_>>(),
        vec![
            "GraphQlApi",
            "GraphQlSchema",
            "GraphQlDsusers",
            "GraphQlDsusersRole",
            "GraphQlResolverQuerygetUser",
        ]
    );
    assert!(compiled.functions.is_empty());

    let ds = graph.get("GraphQlDsusers").unwrap();
    assert_eq!(ds.kind, "AWS::AppSync::DataSource");
    assert_eq!(ds.properties["DynamoDBConfig"]["TableName"], json!("Users"));

    let role = graph.get("GraphQlDsusersRole").unwrap();
    assert_eq!(role.kind, "AWS::IAM::Role");
    let resources = &role.properties["Policies"][0]["PolicyDocument"]["Statement"][0]["Resource"];
    assert!(resources.to_string().contains("\"Users\""));

    let resolver = graph.get("GraphQlResolverQuerygetUser").unwrap();
    assert_eq!(resolver.kind, "AWS::AppSync::Resolver");
    assert_eq!(resolver.properties["Kind"], json!("UNIT"));
    assert_eq!(resolver.properties["TypeName"], json!("Query"));
    assert_eq!(resolver.properties["FieldName"], json!("getUser"));
    assert_eq!(
        resolver.properties["DataSourceName"],
        json!({"Fn::GetAtt": ["GraphQlDsusers", "Name"]})
    );
    assert_eq!(
        resolver.properties["ResponseMappingTemplate"],
        json!("$util.toJson($ctx.result)")
    );

    assert_eq!(
        graph.get("GraphQlSchema").unwrap().properties["Definition"],
        json!("type Query { getUser: ID }\n")
    );
}

#[test]
fn test_compiling_twice_is_identical() {
    let dir = users_service();
    let first = compile_in(dir.path(), USERS_CONFIG).unwrap();
    let second = compile_in(dir.path(), USERS_CONFIG).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_unknown_data_source_is_named() {
    let dir = users_service();
    let config = USERS_CONFIG.replace("dataSource: users", "dataSource: accounts");
    let err = compile_in(dir.path(), &config).unwrap_err();
    assert!(matches!(&err, CompileError::UnknownDataSource { name, .. } if name == "accounts"));
    assert_eq!(
        err.to_string(),
        "Resolver 'Query.getUser' references unknown DataSource 'accounts'"
    );
}

#[test]
fn test_missing_template_names_the_path() {
    let dir = users_service();
    std::fs::remove_file(dir.path().join("templates/getUser.request.vtl")).unwrap();
    let err = compile_in(dir.path(), USERS_CONFIG).unwrap_err();
    let CompileError::MissingFile { path, .. } = err else {
        panic!("expected a missing file error, got {err}");
    };
    assert!(path.ends_with("templates/getUser.request.vtl"));
}

#[test]
fn test_pipeline_resolver_keeps_function_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { feed: [ID] }");
    let config = r#"
name: feed
authentication:
  type: AWS_IAM
dataSources:
  store:
    type: NONE
pipelineFunctions:
  load:
    dataSource: store
  authorize:
    dataSource: store
  enrich:
    dataSource: store
resolvers:
  Query.feed:
    functions:
      - enrich
      - load
      - authorize
"#;
    let compiled = compile_in(dir.path(), config).unwrap();
    let resolver = compiled.resources.get("GraphQlResolverQueryfeed").unwrap();
    assert_eq!(resolver.properties["Kind"], json!("PIPELINE"));
    assert_eq!(
        resolver.properties["PipelineConfig"]["Functions"],
        json!([
            {"Fn::GetAtt": ["GraphQlFunctionConfigurationenrich", "FunctionId"]},
            {"Fn::GetAtt": ["GraphQlFunctionConfigurationload", "FunctionId"]},
            {"Fn::GetAtt": ["GraphQlFunctionConfigurationauthorize", "FunctionId"]}
        ])
    );
}

#[test]
fn test_api_key_expiry_rounding() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int }");
    let config = r#"
name: keys
authentication:
  type: API_KEY
apiKeys:
  - name: daily
    expiresAfter: "24"
  - name: yearly
    expiresAfter: 1y
  - default
"#;
    let compiled = compile_in(dir.path(), config).unwrap();
    let expires = |id: &str| {
        compiled.resources.get(id).unwrap().properties["Expires"]
            .as_i64()
            .unwrap()
    };
    assert_eq!(
        expires("GraphQlApidaily"),
        (start_of_hour() + TimeDelta::hours(25)).timestamp()
    );
    assert_eq!(
        expires("GraphQlApiyearly"),
        (start_of_hour() + TimeDelta::days(365)).timestamp()
    );
    assert_eq!(
        expires("GraphQlApidefault"),
        (start_of_hour() + TimeDelta::days(365)).timestamp()
    );
    assert_eq!(
        compiled.resources.get("GraphQlApidaily").unwrap().properties["Description"],
        json!("daily")
    );
}

#[test]
fn test_api_key_out_of_range_fails() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int }");
    let config = "name: keys\nauthentication:\n  type: API_KEY\napiKeys:\n  - name: short\n    expiresAfter: 2h\n";
    let err = compile_in(dir.path(), config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Api Key short must be valid for a minimum of 1 day and a maximum of 365 days."
    );
}

#[test]
fn test_waf_priorities_with_api_key_rules() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int }");
    let config = r#"
name: guarded
authentication:
  type: API_KEY
apiKeys:
  - name: partner
    wafRules:
      - throttle
waf:
  rules:
    - throttle
    - disableIntrospection
"#;
    let compiled = compile_in(dir.path(), config).unwrap();
    let rules = compiled.resources.get("GraphQlWaf").unwrap().properties["Rules"]
        .as_array()
        .unwrap()
        .clone();
    let summary: Vec<_> = rules
        .iter()
        .map(|r| (r["Name"].as_str().unwrap().to_string(), r["Priority"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Throttle".to_string(), 100),
            ("DisableIntrospection".to_string(), 101),
            ("partnerThrottle".to_string(), 102),
        ]
    );
    assert!(compiled.resources.contains("GraphQlWafAssoc"));
}

#[test]
fn test_substitutions_become_join_expressions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int b: Int }");
    write(dir.path(), "a.request.vtl", "{\"table\": \"${tableName}\"}");
    write(dir.path(), "b.request.vtl", "{\"static\": \"${notDeclared}\"}");
    let config = r#"
name: subs
authentication:
  type: AWS_IAM
substitutions:
  tableName:
    Ref: UsersTable
dataSources:
  none:
    type: NONE
resolvers:
  Query.a:
    dataSource: none
    request: a.request.vtl
  Query.b:
    dataSource: none
    request: b.request.vtl
"#;
    let compiled = compile_in(dir.path(), config).unwrap();
    assert_eq!(
        compiled.resources.get("GraphQlResolverQuerya").unwrap().properties["RequestMappingTemplate"],
        json!({"Fn::Join": ["", [
            "{\"table\": \"",
            {"Fn::Sub": ["${tableName}", {"tableName": {"Ref": "UsersTable"}}]},
            "\"}"
        ]]})
    );
    assert_eq!(
        compiled.resources.get("GraphQlResolverQueryb").unwrap().properties["RequestMappingTemplate"],
        json!("{\"static\": \"${notDeclared}\"}")
    );
}

#[test]
fn test_embedded_lambda_data_source_registers_function() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int }");
    let config = r#"
name: lambdas
authentication:
  type: AWS_IAM
dataSources:
  resolverFn:
    type: AWS_LAMBDA
    config:
      function:
        handler: index.handler
"#;
    let compiled = compile_in(dir.path(), config).unwrap();
    assert_eq!(compiled.functions.len(), 1);
    assert_eq!(
        compiled.functions["resolverFn"],
        json!({"handler": "index.handler"})
    );
    let ds = compiled.resources.get("GraphQlDsresolverFn").unwrap();
    assert_eq!(
        ds.properties["LambdaConfig"]["LambdaFunctionArn"],
        json!({"Fn::GetAtt": ["ResolverFnLambdaFunction", "Arn"]})
    );
}

#[test]
fn test_multiple_schema_files_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema/base.graphql", "type Query { me: User }\ntype User { id: ID! }");
    write(dir.path(), "schema/user.graphql", "extend type User { email: AWSEmail }");
    let config = "name: merged\nauthentication:\n  type: AWS_IAM\nschema: schema/*.graphql\n";
    let compiled = compile_in(dir.path(), config).unwrap();
    assert_eq!(
        compiled.resources.get("GraphQlSchema").unwrap().properties["Definition"],
        json!("type Query {\n  me: User\n}\n\ntype User {\n  id: ID!\n  email: AWSEmail\n}")
    );
}

#[test]
fn test_invalid_schema_reports_every_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Missing }\nextend type Mutation { b: Int }");
    let config = "name: broken\nauthentication:\n  type: AWS_IAM\n";
    let err = compile_in(dir.path(), config).unwrap_err();
    let CompileError::Schema(errors) = err else {
        panic!("expected schema errors, got {err}");
    };
    assert_eq!(
        errors,
        vec![
            "Unknown type \"Missing\".",
            "Cannot extend type \"Mutation\" because it is not defined.",
        ]
    );
}

#[test]
fn test_structural_validation_reports_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = "name: limits\nauthentication:\n  type: AWS_IAM\nqueryDepthLimit: 100\n";
    let err = compile_in(dir.path(), config).unwrap_err();
    assert!(matches!(err, CompileError::Validation(_)));
    assert!(err.to_string().contains("/queryDepthLimit"));
}

#[test]
fn test_sanitized_name_collision_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "schema.graphql", "type Query { a: Int }");
    let config = r#"
name: clash
authentication:
  type: AWS_IAM
dataSources:
  user-table:
    type: NONE
  user_table:
    type: NONE
"#;
    let err = compile_in(dir.path(), config).unwrap_err();
    assert!(matches!(
        err,
        CompileError::LogicalIdCollision { ref logical_id } if logical_id == "GraphQlDsusertable"
    ));
}
