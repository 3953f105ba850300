//! Authentication providers and Lambda function references

use crate::error::{CompileError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum AuthProvider {
    #[serde(rename = "API_KEY")]
    ApiKey,
    #[serde(rename = "AWS_IAM")]
    AwsIam,
    #[serde(rename = "AMAZON_COGNITO_USER_POOLS")]
    CognitoUserPools(CognitoAuthConfig),
    #[serde(rename = "OPENID_CONNECT")]
    OpenIdConnect(OidcAuthConfig),
    #[serde(rename = "AWS_LAMBDA")]
    Lambda(LambdaAuthConfig),
}

impl AuthProvider {
    pub fn auth_type(&self) -> &'static str {
        match self {
            AuthProvider::ApiKey => "API_KEY",
            AuthProvider::AwsIam => "AWS_IAM",
            AuthProvider::CognitoUserPools(_) => "AMAZON_COGNITO_USER_POOLS",
            AuthProvider::OpenIdConnect(_) => "OPENID_CONNECT",
            AuthProvider::Lambda(_) => "AWS_LAMBDA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitoAuthConfig {
    pub user_pool_id: Value,
    pub aws_region: Option<Value>,
    pub default_action: Option<String>,
    pub app_id_client_regex: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcAuthConfig {
    pub issuer: String,
    pub client_id: Option<String>,
    #[serde(rename = "iatTTL")]
    pub iat_ttl: Option<u64>,
    #[serde(rename = "authTTL")]
    pub auth_ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaAuthConfig {
    #[serde(flatten)]
    pub function: LambdaFunctionConfig,
    pub identity_validation_expression: Option<String>,
    pub authorizer_result_ttl_in_seconds: Option<u64>,
}

/// `functionName` (+ `functionAlias`), `functionArn` or an embedded `function`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaFunctionConfig {
    pub function_name: Option<String>,
    pub function_alias: Option<String>,
    pub function_arn: Option<Value>,
    pub function: Option<Value>,
}

/// Where a Lambda function comes from
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaTarget {
    Arn(Value),
    Named { name: String, alias: Option<String> },
    /// A function definition to deploy alongside the API
    Embedded(Value),
}

impl LambdaFunctionConfig {
    pub fn target(&self) -> Result<LambdaTarget> {
        if let Some(arn) = &self.function_arn {
            Ok(LambdaTarget::Arn(arn.clone()))
        } else if let Some(name) = &self.function_name {
            Ok(LambdaTarget::Named {
                name: name.clone(),
                alias: self.function_alias.clone(),
            })
        } else if let Some(function) = &self.function {
            Ok(LambdaTarget::Embedded(function.clone()))
        } else {
            Err(CompileError::ConfigShape(
                "You must specify either `functionArn`, `functionName` or `function` for lambda definitions."
                    .to_string(),
            ))
        }
    }
}
