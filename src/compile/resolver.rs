//! Resolvers

use super::template::{merge_substitutions, resolve};
use super::ApiCompiler;
use crate::error::{CompileError, Result};
use crate::model::{ResolverCaching, ResolverDefinition, ResolverKind};
use crate::naming;
use crate::resource::intrinsic::get_att;
use crate::resource::{Resource, ResourceGraph};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Pass-through code for pipeline resolvers that declare no logic of their own
pub const DEFAULT_PIPELINE_CODE: &str = "export function request() {\n  return {};\n}\n\nexport function response(ctx) {\n  return ctx.prev.result;\n}\n";

const DEFAULT_CACHE_TTL: u32 = 3600;

/// Request/response logic shared by resolvers and pipeline functions
pub(super) struct Handler<'a> {
    pub owner: String,
    pub code: Option<&'a str>,
    pub request: Option<&'a str>,
    pub response: Option<&'a str>,
    pub substitutions: &'a IndexMap<String, Value>,
    /// Fall back to pass-through code when nothing is declared
    pub default_code: bool,
}

impl ApiCompiler<'_> {
    /// `Code` + `Runtime` for JS handlers, mapping templates for VTL ones
    pub(super) fn compile_handler(&self, handler: Handler, properties: &mut Map<String, Value>) -> Result<()> {
        let is_vtl = handler.request.is_some() || handler.response.is_some();
        if handler.code.is_some() && is_vtl {
            return Err(CompileError::ConfigShape(format!(
                "{} cannot declare both code and request/response templates",
                handler.owner
            )));
        }

        let substitutions = merge_substitutions(&self.config.substitutions, handler.substitutions);

        if let Some(code) = handler.code {
            let code = resolve(self.ctx, "Code", code, &substitutions)?;
            properties.insert("Code".into(), code);
            properties.insert("Runtime".into(), runtime());
        } else if is_vtl {
            if let Some(request) = handler.request {
                let template = resolve(self.ctx, "Mapping template", request, &substitutions)?;
                properties.insert("RequestMappingTemplate".into(), template);
            }
            if let Some(response) = handler.response {
                let template = resolve(self.ctx, "Mapping template", response, &substitutions)?;
                properties.insert("ResponseMappingTemplate".into(), template);
            }
        } else if handler.default_code {
            properties.insert("Code".into(), Value::from(DEFAULT_PIPELINE_CODE));
            properties.insert("Runtime".into(), runtime());
        }
        Ok(())
    }

    pub(super) fn compile_resolver(&mut self, resolver: &ResolverDefinition) -> Result<ResourceGraph> {
        let owner = format!("Resolver '{}'", resolver.path());

        let mut properties = Map::new();
        properties.insert("ApiId".into(), self.api_id());
        properties.insert("TypeName".into(), Value::from(resolver.type_name.as_str()));
        properties.insert("FieldName".into(), Value::from(resolver.field.as_str()));

        self.compile_handler(
            Handler {
                owner: owner.clone(),
                code: resolver.code.as_deref(),
                request: resolver.request.as_deref(),
                response: resolver.response.as_deref(),
                substitutions: &resolver.substitutions,
                default_code: matches!(resolver.kind, ResolverKind::Pipeline { .. }),
            },
            &mut properties,
        )?;

        if let Some(caching) = &resolver.caching {
            let api_ttl = self.config.caching_ttl();
            match caching {
                ResolverCaching::Enabled(true) => {
                    let ttl = api_ttl.unwrap_or(DEFAULT_CACHE_TTL);
                    properties.insert("CachingConfig".into(), json!({ "Ttl": ttl }));
                }
                ResolverCaching::Enabled(false) => {}
                ResolverCaching::Custom { ttl, keys } => {
                    let ttl = ttl.or(api_ttl).unwrap_or(DEFAULT_CACHE_TTL);
                    properties.insert(
                        "CachingConfig".into(),
                        json!({ "CachingKeys": keys, "Ttl": ttl }),
                    );
                }
            }
        }

        if let Some(sync) = &resolver.sync {
            let name = self
                .naming
                .resolver_sync_function(&resolver.type_name, &resolver.field);
            properties.insert("SyncConfig".into(), self.compile_sync_config(sync, &name)?);
        }

        match &resolver.kind {
            ResolverKind::Unit { data_source } => {
                if !self.config.has_data_source(data_source) {
                    return Err(CompileError::UnknownDataSource {
                        owner,
                        name: data_source.clone(),
                    });
                }
                properties.insert("Kind".into(), Value::from("UNIT"));
                properties.insert(
                    "DataSourceName".into(),
                    get_att(&self.naming.data_source(data_source), "Name"),
                );
                properties.insert("MaxBatchSize".into(), json!(resolver.max_batch_size));
            }
            ResolverKind::Pipeline { functions } => {
                let mut function_ids = Vec::with_capacity(functions.len());
                for function in functions {
                    if !self.config.has_pipeline_function(function) {
                        return Err(CompileError::UnknownPipelineFunction {
                            owner,
                            name: function.clone(),
                        });
                    }
                    function_ids.push(get_att(&self.naming.pipeline_function(function), "FunctionId"));
                }
                properties.insert("Kind".into(), Value::from("PIPELINE"));
                properties.insert("PipelineConfig".into(), json!({ "Functions": function_ids }));
                properties.insert("MaxBatchSize".into(), json!(resolver.max_batch_size));
            }
        }

        let mut graph = ResourceGraph::new();
        graph.insert(
            self.naming.resolver(&resolver.type_name, &resolver.field),
            Resource::new("AWS::AppSync::Resolver", Value::Object(properties))
                .depends_on(naming::SCHEMA),
        )?;
        debug!("Compiled resolver '{}'", resolver.path());
        Ok(graph)
    }
}

pub(super) fn runtime() -> Value {
    json!({ "Name": "APPSYNC_JS", "RuntimeVersion": "1.0.0" })
}
