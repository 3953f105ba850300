//! Template resolver
//!
//! Reads mapping templates and resolver code, then swaps `${name}` tokens
//! for deferred `Fn::Sub` expressions. Only names that are both declared as
//! substitutions and present in the text are replaced.

use super::CompileContext;
use crate::error::{CompileError, Result};
use crate::resource::intrinsic::{join, sub};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([\w-]+)\}")
            .unwrap_or_else(|e| panic!("Invalid substitution pattern: {}", e))
    })
}

/// Read a file relative to the service path
pub fn read_file(ctx: &CompileContext, kind: &'static str, relative: &str) -> Result<String> {
    let path = ctx.resolve_path(relative);
    if !ctx.fs.exists(&path) {
        return Err(CompileError::MissingFile { kind, path });
    }
    ctx.fs.read_text(&path)
}

/// API-level substitutions overridden by entity-level ones
pub fn merge_substitutions(
    api: &IndexMap<String, Value>,
    entity: &IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    let mut merged = api.clone();
    for (key, value) in entity {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Apply substitutions to a template body
///
/// Returns the text unchanged when no declared substitution is referenced,
/// otherwise an `Fn::Join` over alternating literal and `Fn::Sub` segments.
pub fn substitute(template: &str, substitutions: &IndexMap<String, Value>) -> Value {
    let referenced: HashSet<&str> = variable_regex()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if !substitutions.keys().any(|k| referenced.contains(k.as_str())) {
        return Value::String(template.to_string());
    }

    let mut parts = Vec::new();
    let mut last = 0;
    for captures in variable_regex().captures_iter(template) {
        let (Some(token), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(value) = substitutions.get(name.as_str()) else {
            continue;
        };
        parts.push(Value::from(&template[last..token.start()]));

        let mut variables = Map::new();
        variables.insert(name.as_str().to_string(), value.clone());
        parts.push(sub(&format!("${{{}}}", name.as_str()), Value::Object(variables)));

        last = token.end();
    }
    parts.push(Value::from(&template[last..]));

    join("", parts)
}

/// Read a file and apply substitutions to it
pub fn resolve(
    ctx: &CompileContext,
    kind: &'static str,
    relative: &str,
    substitutions: &IndexMap<String, Value>,
) -> Result<Value> {
    let content = read_file(ctx, kind, relative)?;
    Ok(substitute(&content, substitutions))
}
