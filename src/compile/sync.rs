//! Conflict detection and resolution

use super::ApiCompiler;
use crate::error::Result;
use crate::model::SyncConfig;
use serde_json::{json, Value};

impl ApiCompiler<'_> {
    /// `SyncConfig` block. A `LAMBDA` handler's embedded function is
    /// registered under `embedded_name`.
    pub(super) fn compile_sync_config(&mut self, sync: &SyncConfig, embedded_name: &str) -> Result<Value> {
        let detection = sync.conflict_detection.as_deref().unwrap_or("VERSION");
        let mut value = json!({ "ConflictDetection": detection });

        if detection == "VERSION" {
            let handler = sync
                .conflict_handler
                .as_deref()
                .unwrap_or("OPTIMISTIC_CONCURRENCY");
            value["ConflictHandler"] = Value::from(handler);
            if handler == "LAMBDA" {
                let arn = self.lambda_arn(&sync.function, embedded_name)?;
                value["LambdaConflictHandlerConfig"] = json!({ "LambdaConflictHandlerArn": arn });
            }
        }
        Ok(value)
    }
}
