//! Pipeline functions

use super::resolver::Handler;
use super::ApiCompiler;
use crate::error::{CompileError, Result};
use crate::model::PipelineFunctionDefinition;
use crate::resource::intrinsic::get_att;
use crate::resource::{Resource, ResourceGraph};
use serde_json::{json, Map, Value};
use tracing::debug;

const FUNCTION_VERSION: &str = "2018-05-29";

impl ApiCompiler<'_> {
    pub(super) fn compile_pipeline_function(
        &mut self,
        function: &PipelineFunctionDefinition,
    ) -> Result<ResourceGraph> {
        let owner = format!("Pipeline Function '{}'", function.name);
        if !self.config.has_data_source(&function.data_source) {
            return Err(CompileError::UnknownDataSource {
                owner,
                name: function.data_source.clone(),
            });
        }

        let mut properties = Map::new();
        properties.insert("ApiId".into(), self.api_id());
        properties.insert("Name".into(), Value::from(function.name.as_str()));
        properties.insert(
            "DataSourceName".into(),
            get_att(&self.naming.data_source(&function.data_source), "Name"),
        );
        properties.insert("Description".into(), json!(function.description));
        properties.insert("FunctionVersion".into(), Value::from(FUNCTION_VERSION));
        properties.insert("MaxBatchSize".into(), json!(function.max_batch_size));

        self.compile_handler(
            Handler {
                owner,
                code: function.code.as_deref(),
                request: function.request.as_deref(),
                response: function.response.as_deref(),
                substitutions: &function.substitutions,
                default_code: false,
            },
            &mut properties,
        )?;

        if let Some(sync) = &function.sync {
            let name = self.naming.pipeline_function_sync_function(&function.name);
            properties.insert("SyncConfig".into(), self.compile_sync_config(sync, &name)?);
        }

        let mut graph = ResourceGraph::new();
        graph.insert(
            self.naming.pipeline_function(&function.name),
            Resource::new("AWS::AppSync::FunctionConfiguration", Value::Object(properties)),
        )?;
        debug!("Compiled pipeline function '{}'", function.name);
        Ok(graph)
    }
}
