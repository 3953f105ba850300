//! Api orchestrator
//!
//! Lowers an [`ApiConfiguration`] into a [`ResourceGraph`]. Each area lives
//! in its own submodule as an `impl ApiCompiler` block:
//!
//! - [`api`] - endpoint, custom domain, logging, authorizer permission, cache
//! - [`api_key`] - API keys and their expiry window
//! - [`data_source`] - data sources and their synthesized roles
//! - [`resolver`] / [`pipeline_function`] - resolvers and pipeline steps
//! - [`schema`] - schema assembly
//! - [`waf`] - web ACL and per-key rules
//!
//! Embedded Lambda definitions met along the way are returned next to the
//! graph in [`CompiledApi::functions`].

mod api;
pub mod api_key;
mod data_source;
mod pipeline_function;
mod resolver;
mod schema;
mod sync;
pub mod template;
pub mod waf;

use crate::error::{CompileError, Result};
use crate::fs::FileSystem;
use crate::model::{ApiConfiguration, LambdaFunctionConfig, LambdaTarget};
use crate::naming::{self, Naming};
use crate::resource::intrinsic::{get_att, join};
use crate::resource::ResourceGraph;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inputs of a compile run that do not come from the configuration
pub struct CompileContext<'a> {
    pub fs: &'a dyn FileSystem,
    /// Directory that schema, template and code paths are relative to
    pub service_path: PathBuf,
    /// Provider-level log retention, used when logging sets none
    pub log_retention_in_days: Option<u32>,
    /// Reference time for API key expiry
    pub now: DateTime<Utc>,
}

impl<'a> CompileContext<'a> {
    pub fn new(fs: &'a dyn FileSystem, service_path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            fs,
            service_path: service_path.into(),
            log_retention_in_days: None,
            now,
        }
    }

    pub fn with_log_retention(mut self, days: Option<u32>) -> Self {
        self.log_retention_in_days = days;
        self
    }

    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.service_path.join(path)
        }
    }
}

/// Result of a compile run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledApi {
    pub resources: ResourceGraph,
    /// Embedded function definitions to deploy, keyed by function name
    pub functions: IndexMap<String, Value>,
}

/// Compile a normalized configuration
pub fn compile(config: &ApiConfiguration, ctx: &CompileContext) -> Result<CompiledApi> {
    ApiCompiler::new(config, ctx).compile()
}

pub struct ApiCompiler<'a> {
    config: &'a ApiConfiguration,
    ctx: &'a CompileContext<'a>,
    naming: Naming,
    functions: IndexMap<String, Value>,
}

impl<'a> ApiCompiler<'a> {
    pub fn new(config: &'a ApiConfiguration, ctx: &'a CompileContext<'a>) -> Self {
        Self {
            config,
            ctx,
            naming: Naming::new(config.name.clone()),
            functions: IndexMap::new(),
        }
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Embedded functions registered so far
    pub fn functions(&self) -> &IndexMap<String, Value> {
        &self.functions
    }

    pub fn compile(mut self) -> Result<CompiledApi> {
        info!("Compiling api '{}'", self.config.name);
        let mut resources = ResourceGraph::new();

        resources.merge(self.compile_endpoint()?)?;
        resources.merge(self.compile_schema()?)?;
        resources.merge(self.compile_custom_domain()?)?;
        resources.merge(self.compile_log_group()?)?;
        resources.merge(self.compile_lambda_authorizer_permission()?)?;
        resources.merge(self.compile_waf()?)?;
        resources.merge(self.compile_caching()?)?;

        if self.config.has_auth("API_KEY") {
            for key in self.config.api_keys.values() {
                resources.merge(self.compile_api_key(key)?)?;
            }
        }

        for data_source in self.config.data_sources.values() {
            resources.merge(self.compile_data_source(data_source)?)?;
        }

        for function in self.config.pipeline_functions.values() {
            resources.merge(self.compile_pipeline_function(function)?)?;
        }

        for resolver in self.config.resolvers.values() {
            resources.merge(self.compile_resolver(resolver)?)?;
        }

        info!(
            "Compiled api '{}': {} resources, {} embedded functions",
            self.config.name,
            resources.len(),
            self.functions.len()
        );

        Ok(CompiledApi {
            resources,
            functions: self.functions,
        })
    }

    /// `Fn::GetAtt [GraphQlApi, ApiId]`
    fn api_id(&self) -> Value {
        get_att(naming::API, "ApiId")
    }

    /// ARN of the Lambda function a config points at. Embedded definitions
    /// are registered under `embedded_name` for separate deployment.
    fn lambda_arn(&mut self, config: &LambdaFunctionConfig, embedded_name: &str) -> Result<Value> {
        match config.target()? {
            LambdaTarget::Arn(arn) => Ok(arn),
            LambdaTarget::Named { name, alias } => Ok(generate_lambda_arn(&name, alias.as_deref())),
            LambdaTarget::Embedded(function) => {
                match self.functions.get(embedded_name) {
                    Some(existing) if *existing != function => {
                        return Err(CompileError::ConfigShape(format!(
                            "Embedded function '{}' is defined more than once with different definitions",
                            embedded_name
                        )));
                    }
                    Some(_) => {}
                    None => {
                        debug!("Registered embedded function '{}'", embedded_name);
                        self.functions.insert(embedded_name.to_string(), function);
                    }
                }
                Ok(generate_lambda_arn(embedded_name, None))
            }
        }
    }
}

/// ARN of a function deployed by the host framework, optionally aliased
pub fn generate_lambda_arn(function_name: &str, alias: Option<&str>) -> Value {
    let arn = get_att(&naming::lambda_logical_id(function_name), "Arn");
    match alias {
        Some(alias) => join(":", vec![arn, Value::from(alias)]),
        None => arn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_lambda_arn() {
        assert_eq!(
            generate_lambda_arn("resolver", None),
            json!({"Fn::GetAtt": ["ResolverLambdaFunction", "Arn"]})
        );
        assert_eq!(
            generate_lambda_arn("resolver", Some("live")),
            json!({"Fn::Join": [":", [{"Fn::GetAtt": ["ResolverLambdaFunction", "Arn"]}, "live"]]})
        );
    }

    fn compile_yaml(yaml: &str) -> Result<CompiledApi> {
        let config = crate::normalize::normalize(crate::model::RawApiConfig::from_yaml(yaml).unwrap()).unwrap();
        let fs = crate::fs::MemoryFs::new().with_file("svc/schema.graphql", "type Query { a: Int }");
        let ctx = CompileContext::new(&fs, "svc", Utc::now());
        compile(&config, &ctx)
    }

    #[test]
    fn test_embedded_function_name_clash_is_an_error() {
        let err = compile_yaml(
            "name: api\nauthentication:\n  type: AWS_LAMBDA\n  config:\n    function:\n      handler: auth.handler\ndataSources:\n  apiAuthorizer:\n    type: AWS_LAMBDA\n    config:\n      function:\n        handler: resolver.handler\n",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::ConfigShape(_)));
        assert_eq!(
            err.to_string(),
            "Embedded function 'apiAuthorizer' is defined more than once with different definitions"
        );
    }

    #[test]
    fn test_embedded_function_reused_with_same_definition() {
        let compiled = compile_yaml(
            "name: api\nauthentication:\n  type: AWS_LAMBDA\n  config:\n    function:\n      handler: auth.handler\ndataSources:\n  resolver:\n    type: AWS_LAMBDA\n    config:\n      function:\n        handler: resolver.handler\n",
        )
        .unwrap();
        assert_eq!(
            compiled.functions,
            IndexMap::from([
                ("apiAuthorizer".to_string(), json!({"handler": "auth.handler"})),
                ("resolver".to_string(), json!({"handler": "resolver.handler"})),
            ])
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_service_path() {
        let fs = crate::fs::MemoryFs::new();
        let ctx = CompileContext::new(&fs, "/srv/app", Utc::now());
        assert_eq!(ctx.resolve_path("schema.graphql"), PathBuf::from("/srv/app/schema.graphql"));
        assert_eq!(ctx.resolve_path("/abs/x.vtl"), PathBuf::from("/abs/x.vtl"));
    }
}
