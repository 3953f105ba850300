//! Endpoint and API-wide resources

use super::ApiCompiler;
use crate::error::Result;
use crate::model::AuthProvider;
use crate::naming;
use crate::resource::intrinsic::{get_att, join, reference};
use crate::resource::{get_policy_registry, Resource, ResourceGraph};
use serde_json::{json, Map, Value};
use tracing::debug;

const LOG_GROUP_PREFIX: &str = "/aws/appsync/apis";

impl ApiCompiler<'_> {
    pub(super) fn compile_endpoint(&mut self) -> Result<ResourceGraph> {
        let config = self.config;
        let mut properties = Map::new();
        properties.insert("Name".into(), Value::from(config.name.as_str()));
        properties.insert("XrayEnabled".into(), Value::from(config.xray_enabled));
        properties.insert("Tags".into(), tags(&config.tags));
        if !config.environment.is_empty() {
            properties.insert("EnvironmentVariables".into(), json!(config.environment));
        }

        let primary = self.compile_auth_provider(&config.authentication, false)?;
        if let Value::Object(primary) = primary {
            properties.extend(primary);
        }

        if !config.additional_authentications.is_empty() {
            let mut providers = Vec::new();
            for provider in &config.additional_authentications {
                providers.push(self.compile_auth_provider(provider, true)?);
            }
            properties.insert("AdditionalAuthenticationProviders".into(), Value::Array(providers));
        }

        if let Some(logging) = config.logging.as_ref().filter(|l| l.enabled != Some(false)) {
            let role_arn = logging
                .role_arn
                .clone()
                .unwrap_or_else(|| get_att(naming::LOG_GROUP_ROLE, "Arn"));
            properties.insert(
                "LogConfig".into(),
                json!({
                    "CloudWatchLogsRoleArn": role_arn,
                    "FieldLogLevel": logging.level,
                    "ExcludeVerboseContent": logging.exclude_verbose_content,
                }),
            );
        }

        if let Some(visibility) = &config.visibility {
            properties.insert("Visibility".into(), Value::from(visibility.as_str()));
        }
        if let Some(introspection) = config.introspection {
            let value = if introspection { "ENABLED" } else { "DISABLED" };
            properties.insert("IntrospectionConfig".into(), Value::from(value));
        }
        if let Some(limit) = config.query_depth_limit {
            properties.insert("QueryDepthLimit".into(), Value::from(limit));
        }
        if let Some(limit) = config.resolver_count_limit {
            properties.insert("ResolverCountLimit".into(), Value::from(limit));
        }

        let mut graph = ResourceGraph::new();
        graph.insert(
            naming::API,
            Resource::new("AWS::AppSync::GraphQLApi", Value::Object(properties)),
        )?;
        Ok(graph)
    }

    fn compile_auth_provider(&mut self, provider: &AuthProvider, additional: bool) -> Result<Value> {
        let auth_type = provider.auth_type();
        let value = match provider {
            AuthProvider::ApiKey | AuthProvider::AwsIam => json!({ "AuthenticationType": auth_type }),
            AuthProvider::CognitoUserPools(cognito) => {
                let region = cognito
                    .aws_region
                    .clone()
                    .unwrap_or_else(|| json!({ "Fn::Sub": "${AWS::Region}" }));
                let mut pool = json!({
                    "AwsRegion": region,
                    "UserPoolId": cognito.user_pool_id,
                    "AppIdClientRegex": cognito.app_id_client_regex,
                });
                if !additional {
                    pool["DefaultAction"] =
                        Value::from(cognito.default_action.as_deref().unwrap_or("ALLOW"));
                }
                json!({ "AuthenticationType": auth_type, "UserPoolConfig": pool })
            }
            AuthProvider::OpenIdConnect(oidc) => json!({
                "AuthenticationType": auth_type,
                "OpenIDConnectConfig": {
                    "Issuer": oidc.issuer,
                    "ClientId": oidc.client_id,
                    "IatTTL": oidc.iat_ttl,
                    "AuthTTL": oidc.auth_ttl,
                },
            }),
            AuthProvider::Lambda(lambda) => {
                let name = self.naming.authorizer_function();
                let uri = self.lambda_arn(&lambda.function, &name)?;
                json!({
                    "AuthenticationType": auth_type,
                    "LambdaAuthorizerConfig": {
                        "AuthorizerUri": uri,
                        "IdentityValidationExpression": lambda.identity_validation_expression,
                        "AuthorizerResultTtlInSeconds": lambda.authorizer_result_ttl_in_seconds,
                    },
                })
            }
        };
        Ok(value)
    }

    pub(super) fn compile_log_group(&self) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let Some(logging) = self.config.logging.as_ref().filter(|l| l.enabled != Some(false))
        else {
            return Ok(graph);
        };

        let retention = logging.retention_in_days.or(self.ctx.log_retention_in_days);
        let log_group = Resource::new(
            "AWS::Logs::LogGroup",
            json!({
                "LogGroupName": join("/", vec![Value::from(LOG_GROUP_PREFIX), self.api_id()]),
                "RetentionInDays": retention,
            }),
        );
        graph.insert(naming::LOG_GROUP, log_group)?;

        if logging.role_arn.is_none() {
            let registry = get_policy_registry();
            let policy = Resource::new(
                "AWS::IAM::Policy",
                json!({
                    "PolicyName": naming::LOG_GROUP_POLICY,
                    "Roles": [reference(naming::LOG_GROUP_ROLE)],
                    "PolicyDocument": {
                        "Version": registry.policy_version,
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                            "Resource": [get_att(naming::LOG_GROUP, "Arn")],
                        }],
                    },
                }),
            );
            let role = Resource::new(
                "AWS::IAM::Role",
                json!({ "AssumeRolePolicyDocument": assume_role_policy() }),
            );
            graph.insert(naming::LOG_GROUP_POLICY, policy)?;
            graph.insert(naming::LOG_GROUP_ROLE, role)?;
        }

        debug!("Compiled log group with {} resources", graph.len());
        Ok(graph)
    }

    pub(super) fn compile_custom_domain(&self) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let Some(domain) = &self.config.domain else {
            return Ok(graph);
        };
        if domain.enabled == Some(false) || domain.use_cloud_formation == Some(false) {
            return Ok(graph);
        }

        let deletion_policy = if domain.retain == Some(true) { "Retain" } else { "Delete" };
        let certificate_arn = domain
            .certificate_arn
            .clone()
            .unwrap_or_else(|| reference(naming::DOMAIN_CERTIFICATE));

        let domain_name = Resource::new(
            "AWS::AppSync::DomainName",
            json!({ "CertificateArn": certificate_arn, "DomainName": domain.name }),
        )
        .deletion_policy(deletion_policy);
        let association = Resource::new(
            "AWS::AppSync::DomainNameApiAssociation",
            json!({ "ApiId": self.api_id(), "DomainName": domain.name }),
        )
        .deletion_policy(deletion_policy)
        .depends_on(naming::DOMAIN_NAME);

        graph.insert(naming::DOMAIN_NAME, domain_name)?;
        graph.insert(naming::DOMAIN_ASSOCIATION, association)?;

        if domain.certificate_arn.is_none() {
            let certificate = Resource::new(
                "AWS::CertificateManager::Certificate",
                json!({
                    "DomainName": domain.name,
                    "ValidationMethod": "DNS",
                    "DomainValidationOptions": [{
                        "DomainName": domain.name,
                        "HostedZoneId": domain.hosted_zone_id,
                    }],
                }),
            )
            .deletion_policy(deletion_policy);
            graph.insert(naming::DOMAIN_CERTIFICATE, certificate)?;
        }

        if domain.route53 != Some(false) {
            let mut properties = Map::new();
            match &domain.hosted_zone_id {
                Some(zone_id) => {
                    properties.insert("HostedZoneId".into(), zone_id.clone());
                }
                None => {
                    let zone_name = domain
                        .hosted_zone_name
                        .clone()
                        .unwrap_or_else(|| hosted_zone_name(&domain.name));
                    properties.insert("HostedZoneName".into(), Value::from(zone_name));
                }
            }
            properties.insert("Name".into(), Value::from(domain.name.as_str()));
            properties.insert("Type".into(), Value::from("A"));
            properties.insert(
                "AliasTarget".into(),
                json!({
                    "HostedZoneId": get_att(naming::DOMAIN_NAME, "HostedZoneId"),
                    "DNSName": get_att(naming::DOMAIN_NAME, "AppSyncDomainName"),
                    "EvaluateTargetHealth": false,
                }),
            );
            let record = Resource::new("AWS::Route53::RecordSet", Value::Object(properties))
                .deletion_policy(deletion_policy);
            graph.insert(naming::DOMAIN_ROUTE53_RECORD, record)?;
        }

        Ok(graph)
    }

    pub(super) fn compile_lambda_authorizer_permission(&mut self) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let config = self.config;
        let lambda = config
            .additional_authentications
            .iter()
            .chain(std::iter::once(&config.authentication))
            .find_map(|provider| match provider {
                AuthProvider::Lambda(lambda) => Some(lambda),
                _ => None,
            });
        let Some(lambda) = lambda else {
            return Ok(graph);
        };

        let name = self.naming.authorizer_function();
        let function_name = self.lambda_arn(&lambda.function, &name)?;
        graph.insert(
            naming::LAMBDA_AUTHORIZER_PERMISSION,
            Resource::new(
                "AWS::Lambda::Permission",
                json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": function_name,
                    "Principal": get_policy_registry().service_principal,
                    "SourceArn": reference(naming::API),
                }),
            ),
        )?;
        Ok(graph)
    }

    pub(super) fn compile_caching(&self) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let Some(caching) = self.config.caching.as_ref().filter(|c| c.enabled != Some(false))
        else {
            return Ok(graph);
        };

        let cache = Resource::new(
            "AWS::AppSync::ApiCache",
            json!({
                "ApiCachingBehavior": caching.behavior,
                "ApiId": self.api_id(),
                "AtRestEncryptionEnabled": caching.at_rest_encryption.unwrap_or(false),
                "TransitEncryptionEnabled": caching.transit_encryption.unwrap_or(false),
                "Ttl": caching.ttl.unwrap_or(3600),
                "Type": caching.instance_type.as_deref().unwrap_or("T2_SMALL"),
            }),
        );
        graph.insert(naming::CACHING, cache)?;
        Ok(graph)
    }
}

/// Trust policy letting AppSync assume a role
pub(super) fn assume_role_policy() -> Value {
    let registry = get_policy_registry();
    json!({
        "Version": registry.policy_version,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": [registry.service_principal] },
            "Action": ["sts:AssumeRole"],
        }],
    })
}

/// `[{Key, Value}]`, or null when there are no tags
pub(super) fn tags(tags: &indexmap::IndexMap<String, String>) -> Value {
    if tags.is_empty() {
        return Value::Null;
    }
    Value::Array(
        tags.iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

/// Parent zone of a domain: `api.example.com` → `example.com.`
pub fn hosted_zone_name(domain: &str) -> String {
    let parent = domain.split_once('.').map(|(_, rest)| rest).unwrap_or("");
    format!("{}.", parent)
}
