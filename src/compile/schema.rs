//! Schema assembly

use super::ApiCompiler;
use crate::error::{CompileError, Result};
use crate::naming;
use crate::resource::{Resource, ResourceGraph, AWS_SDL_DECLARATIONS};
use crate::sdl;
use indexmap::IndexSet;
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

impl ApiCompiler<'_> {
    /// Read, validate and (for several files) merge the schema sources
    pub(super) fn compile_schema(&self) -> Result<ResourceGraph> {
        let definition = self.schema_definition()?;

        let mut graph = ResourceGraph::new();
        graph.insert(
            naming::SCHEMA,
            Resource::new(
                "AWS::AppSync::GraphQLSchema",
                json!({
                    "Definition": definition,
                    "ApiId": self.api_id(),
                }),
            ),
        )?;
        Ok(graph)
    }

    fn schema_definition(&self) -> Result<String> {
        let files = self.schema_files()?;
        let sources = files
            .iter()
            .map(|path| self.ctx.fs.read_text(path))
            .collect::<Result<Vec<_>>>()?;

        let mut document = String::from(AWS_SDL_DECLARATIONS);
        for source in &sources {
            document.push('\n');
            document.push_str(source);
        }
        let errors = sdl::validate_sdl(&document);
        if !errors.is_empty() {
            return Err(CompileError::Schema(errors));
        }

        match sources.as_slice() {
            [single] => Ok(single.clone()),
            _ => {
                debug!("Merging {} schema files", sources.len());
                let merged = sdl::merge_type_defs(&sources).map_err(CompileError::Schema)?;
                Ok(sdl::print_document(&merged))
            }
        }
    }

    fn schema_files(&self) -> Result<IndexSet<PathBuf>> {
        let mut files = IndexSet::new();
        for pattern in &self.config.schema {
            let resolved = self.ctx.resolve_path(pattern);
            let matches = self.ctx.fs.glob(&resolved.to_string_lossy())?;
            if matches.is_empty() {
                return Err(CompileError::MissingFile {
                    kind: "Schema",
                    path: resolved,
                });
            }
            debug!("Schema pattern '{}' matched {} file(s)", pattern, matches.len());
            files.extend(matches);
        }
        Ok(files)
    }
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

    fn api_config(schema: &str) -> ApiConfiguration {
        let yaml = format!("name: api\nauthentication:\n  type: AWS_IAM\n{}", schema);
        normalize(RawApiConfig::from_yaml(&yaml).unwrap()).unwrap()
    }

    fn compile(config: &ApiConfiguration, fs: &MemoryFs) -> Result<ResourceGraph> {
        let ctx = CompileContext::new(fs, "svc", Utc::now());
        ApiCompiler::new(config, &ctx).compile_schema()
    }

    #[test]
    fn test_single_file_is_kept_verbatim() {
        let source = "type Query {\n    getUser: ID   # odd spacing\n}\n";
        let fs = MemoryFs::new().with_file("svc/schema.graphql", source);
        let graph = compile(&api_config(""), &fs).unwrap();
        let schema = graph.get("GraphQlSchema").unwrap();
        assert_eq!(schema.kind, "AWS::AppSync::GraphQLSchema");
        assert_eq!(
            schema.properties,
            json!({
                "Definition": source,
                "ApiId": {"Fn::GetAtt": ["GraphQlApi", "ApiId"]}
            })
        );
    }

    #[test]
    fn test_several_files_are_merged() {
        let fs = MemoryFs::new()
            .with_file("svc/schema/a.graphql", "type Query { user: User }\ntype User { id: ID! }")
            .with_file("svc/schema/b.graphql", "extend type User { createdAt: AWSDateTime }");
        let config = api_config("schema: schema/*.graphql\n");
        let graph = compile(&config, &fs).unwrap();
        assert_eq!(
            graph.get("GraphQlSchema").unwrap().properties["Definition"],
            json!("type Query {\n  user: User\n}\n\ntype User {\n  id: ID!\n  createdAt: AWSDateTime\n}")
        );
    }

    #[test]
    fn test_validation_errors_are_collected() {
        let fs = MemoryFs::new().with_file("svc/schema.graphql", "type Query { a: Foo b: Bar }");
        let err = compile(&api_config(""), &fs).unwrap_err();
        assert_eq!(err.to_string(), "Unknown type \"Foo\".\nUnknown type \"Bar\".");
    }

    #[test]
    fn test_unmatched_pattern_is_missing_file() {
        let err = compile(&api_config(""), &MemoryFs::new()).unwrap_err();
        assert!(matches!(err, CompileError::MissingFile { kind: "Schema", .. }));
    }

    #[test]
    fn test_overlapping_patterns_read_each_file_once() {
        let source = "type Query { a: Int }";
        let fs = MemoryFs::new().with_file("svc/schema.graphql", source);
        let config = api_config("schema:\n  - schema.graphql\n  - \"*.graphql\"\n");
        let graph = compile(&config, &fs).unwrap();
        assert_eq!(graph.get("GraphQlSchema").unwrap().properties["Definition"], json!(source));
    }

    #[test]
    fn test_patterns_keep_declared_order() {
        let fs = MemoryFs::new()
            .with_file("svc/z.graphql", "type Query { a: Int }")
            .with_file("svc/a.graphql", "extend type Query { b: Int }");
        let config = api_config("schema:\n  - z.graphql\n  - a.graphql\n");
        let graph = compile(&config, &fs).unwrap();
        assert_eq!(
            graph.get("GraphQlSchema").unwrap().properties["Definition"],
            json!("type Query {\n  a: Int\n  b: Int\n}")
        );
    }
}
