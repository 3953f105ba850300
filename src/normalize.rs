//! Config normalizer
//!
//! Turns a [`RawApiConfig`] into an [`ApiConfiguration`]:
//!
//! 1. map-or-list-of-maps fields are merged (later entries win)
//! 2. `Type.field` resolver keys are split
//! 3. inline data sources and pipeline functions are lifted into named
//!    top-level entries
//! 4. API key shorthands are expanded
//!
//! Synthesized names only depend on where the inline definition sits, so
//! normalizing the same input twice yields the same names.

use crate::error::{CompileError, Result};
use crate::model::{
    ApiConfiguration, ApiKeyConfig, ApiKeyInput, DataSourceDefinition, DataSourceRef, FunctionRef,
    PipelineFunctionConfigInput, PipelineFunctionDefinition, PipelineFunctionInput, RawApiConfig,
    RawDataSource, ResolverConfigInput, ResolverDefinition, ResolverInput, ResolverKind,
    ResolverKindName,
};
use indexmap::IndexMap;
use tracing::debug;

pub const DEFAULT_SCHEMA: &str = "schema.graphql";

/// Keep ASCII letters and `_`
pub fn to_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect()
}

pub fn normalize(raw: RawApiConfig) -> Result<ApiConfiguration> {
    let mut normalizer = Normalizer::default();

    for (name, data_source) in raw.data_sources.flatten() {
        normalizer.add_data_source(&name, data_source, false)?;
    }

    for (name, function) in raw.pipeline_functions.flatten() {
        let function = match function {
            PipelineFunctionInput::DataSource(data_source) => PipelineFunctionConfigInput {
                data_source: DataSourceRef::Named(data_source),
                description: None,
                code: None,
                request: None,
                response: None,
                max_batch_size: None,
                sync: None,
                substitutions: IndexMap::new(),
            },
            PipelineFunctionInput::Config(config) => *config,
        };
        normalizer.add_pipeline_function(&name, function, false)?;
    }

    for (key, resolver) in raw.resolvers.flatten() {
        normalizer.add_resolver(&key, resolver)?;
    }

    let api_keys = raw
        .api_keys
        .into_iter()
        .map(|key| {
            let config = match key {
                ApiKeyInput::Name(name) => ApiKeyConfig::named(name),
                ApiKeyInput::Config(config) => config,
            };
            (config.name.clone(), config)
        })
        .collect();

    let schema = raw
        .schema
        .map(|s| s.into_vec())
        .unwrap_or_else(|| vec![DEFAULT_SCHEMA.to_string()]);

    debug!(
        "Normalized api '{}': {} data sources, {} functions, {} resolvers",
        raw.name,
        normalizer.data_sources.len(),
        normalizer.pipeline_functions.len(),
        normalizer.resolvers.len()
    );

    Ok(ApiConfiguration {
        name: raw.name,
        authentication: raw.authentication,
        additional_authentications: raw.additional_authentications,
        schema,
        domain: raw.domain,
        xray_enabled: raw.xray_enabled.unwrap_or(false),
        visibility: raw.visibility,
        introspection: raw.introspection,
        query_depth_limit: raw.query_depth_limit,
        resolver_count_limit: raw.resolver_count_limit,
        substitutions: raw.substitutions,
        environment: raw.environment,
        waf: raw.waf,
        tags: raw.tags,
        caching: raw.caching,
        api_keys,
        logging: raw.logging,
        data_sources: normalizer.data_sources,
        resolvers: normalizer.resolvers,
        pipeline_functions: normalizer.pipeline_functions,
    })
}

#[derive(Default)]
struct Normalizer {
    data_sources: IndexMap<String, DataSourceDefinition>,
    pipeline_functions: IndexMap<String, PipelineFunctionDefinition>,
    resolvers: IndexMap<String, ResolverDefinition>,
}

impl Normalizer {
    fn add_data_source(&mut self, name: &str, raw: RawDataSource, inline: bool) -> Result<()> {
        if inline && self.data_sources.contains_key(name) {
            return Err(CompileError::ConfigShape(format!(
                "Inline DataSource '{}' conflicts with a declared DataSource of the same name",
                name
            )));
        }
        if inline {
            debug!("Lifted inline data source '{}'", name);
        }
        let definition = DataSourceDefinition::from_raw(name, raw)?;
        self.data_sources.insert(name.to_string(), definition);
        Ok(())
    }

    /// Resolve a data source reference, lifting an inline one under `inline_name`
    fn data_source_ref(&mut self, reference: DataSourceRef, inline_name: &str) -> Result<String> {
        match reference {
            DataSourceRef::Named(name) => Ok(name),
            DataSourceRef::Inline(raw) => {
                self.add_data_source(inline_name, *raw, true)?;
                Ok(inline_name.to_string())
            }
        }
    }

    fn add_pipeline_function(
        &mut self,
        name: &str,
        input: PipelineFunctionConfigInput,
        inline: bool,
    ) -> Result<()> {
        if inline && self.pipeline_functions.contains_key(name) {
            return Err(CompileError::ConfigShape(format!(
                "Inline Pipeline function '{}' conflicts with a declared Pipeline function of the same name",
                name
            )));
        }
        let data_source = self.data_source_ref(input.data_source, name)?;
        let definition = PipelineFunctionDefinition {
            name: name.to_string(),
            data_source,
            description: input.description,
            code: input.code,
            request: input.request,
            response: input.response,
            max_batch_size: input.max_batch_size,
            sync: input.sync,
            substitutions: input.substitutions,
        };
        self.pipeline_functions.insert(name.to_string(), definition);
        Ok(())
    }

    fn add_resolver(&mut self, key: &str, input: ResolverInput) -> Result<()> {
        let config = match input {
            ResolverInput::DataSource(data_source) => ResolverConfigInput {
                kind: Some(ResolverKindName::Unit),
                data_source: Some(DataSourceRef::Named(data_source)),
                ..Default::default()
            },
            ResolverInput::Config(config) => *config,
        };

        let (key_type, key_field) = match key.split_once('.') {
            Some((type_name, field)) => (Some(type_name), Some(field)),
            None => (None, None),
        };
        let type_name = config.type_name.as_deref().or(key_type);
        let field = config.field.as_deref().or(key_field);
        let (type_name, field) = match (type_name, field) {
            (Some(t), Some(f)) if !t.is_empty() && !f.is_empty() => (t.to_string(), f.to_string()),
            _ => {
                return Err(CompileError::ConfigShape(format!(
                    "Resolver '{}' must be keyed as 'Type.field' or specify both `type` and `field`",
                    key
                )))
            }
        };
        let path = format!("{}.{}", type_name, field);
        let inline_base = to_resource_name(&format!("{}{}", type_name, field));

        let kind_name = config.kind.unwrap_or(if config.functions.is_some() {
            ResolverKindName::Pipeline
        } else {
            ResolverKindName::Unit
        });

        let kind = match kind_name {
            ResolverKindName::Unit => {
                let reference = config.data_source.ok_or_else(|| {
                    CompileError::ConfigShape(format!(
                        "Resolver '{}' of kind UNIT must specify a dataSource",
                        path
                    ))
                })?;
                ResolverKind::Unit {
                    data_source: self.data_source_ref(reference, &inline_base)?,
                }
            }
            ResolverKindName::Pipeline => {
                let references = config.functions.ok_or_else(|| {
                    CompileError::ConfigShape(format!(
                        "Resolver '{}' of kind PIPELINE must specify functions",
                        path
                    ))
                })?;
                let mut functions = Vec::with_capacity(references.len());
                for (index, reference) in references.into_iter().enumerate() {
                    match reference {
                        FunctionRef::Named(name) => functions.push(name),
                        FunctionRef::Inline(function) => {
                            let name = format!("{}_{}", inline_base, index);
                            debug!("Lifted inline pipeline function '{}'", name);
                            self.add_pipeline_function(&name, *function, true)?;
                            functions.push(name);
                        }
                    }
                }
                ResolverKind::Pipeline { functions }
            }
        };

        let definition = ResolverDefinition {
            type_name,
            field,
            kind,
            code: config.code,
            request: config.request,
            response: config.response,
            max_batch_size: config.max_batch_size,
            sync: config.sync,
            substitutions: config.substitutions,
            caching: config.caching,
        };
        self.resolvers.insert(path, definition);
        Ok(())
    }
}
