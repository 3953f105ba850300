//! Web ACL
//!
//! Declared rules come first, then the rules of every API key that has
//! some. Rules without an explicit priority are numbered from 100 in that
//! list order, so an explicit priority can collide with an assigned one.

use super::api::tags;
use super::ApiCompiler;
use crate::error::Result;
use crate::model::{
    ApiKeyConfig, CustomWafRule, DisableIntrospectionConfig, ThrottleConfig, VisibilityConfig,
    WafConfig, WafPreset, WafRuleInput,
};
use crate::naming;
use crate::resource::intrinsic::{get_att, join, reference};
use crate::resource::{Resource, ResourceGraph};
use serde_json::{json, Value};
use tracing::debug;

/// First priority handed out to rules that declare none
pub const FIRST_AUTO_PRIORITY: u32 = 100;

const API_KEY_HEADER: &str = "X-Api-Key";
const MAX_INTROSPECTION_BODY_SIZE: u64 = 8192;

/// A resolved rule, before priority assignment
#[derive(Debug, Clone, PartialEq)]
struct WafRule {
    name: String,
    priority: Option<u32>,
    action: Option<Value>,
    override_action: Option<Value>,
    statement: Option<Value>,
    visibility_config: Value,
}

impl WafRule {
    fn into_json(self, priority: u32) -> Value {
        let mut rule = json!({
            "Name": self.name,
            "Priority": priority,
        });
        if let Some(action) = self.action {
            rule["Action"] = action;
        }
        if let Some(override_action) = self.override_action {
            rule["OverrideAction"] = override_action;
        }
        if let Some(statement) = self.statement {
            rule["Statement"] = statement;
        }
        rule["VisibilityConfig"] = self.visibility_config;
        rule
    }
}

/// Explicit priorities are kept, the others count up from
/// [`FIRST_AUTO_PRIORITY`] in list order
pub fn assign_priorities(declared: &[Option<u32>]) -> Vec<u32> {
    let mut next = FIRST_AUTO_PRIORITY;
    declared
        .iter()
        .map(|priority| {
            priority.unwrap_or_else(|| {
                let assigned = next;
                next += 1;
                assigned
            })
        })
        .collect()
}

impl ApiCompiler<'_> {
    pub(super) fn compile_waf(&self) -> Result<ResourceGraph> {
        let mut graph = ResourceGraph::new();
        let Some(waf) = &self.config.waf else {
            return Ok(graph);
        };
        if waf.enabled == Some(false) {
            return Ok(graph);
        }

        if let Some(arn) = &waf.arn {
            debug!("Associating externally managed web ACL");
            graph.insert(naming::WAF_ASSOCIATION, association(arn.clone()))?;
            return Ok(graph);
        }

        let name = waf.name.clone().unwrap_or_else(|| self.naming.waf_name());
        let rules = self.compile_waf_rules(waf);
        debug!("Compiled web ACL '{}' with {} rule(s)", name, rules.len());

        let default_action = waf.default_action.as_deref().unwrap_or("Allow");
        let description = match &waf.description {
            Some(description) => Value::from(description.as_str()),
            None => join(
                " ",
                vec![Value::from("ACL rules for"), reference(naming::API)],
            ),
        };

        graph.insert(
            naming::WAF,
            Resource::new(
                "AWS::WAFv2::WebACL",
                json!({
                    "DefaultAction": { default_action: {} },
                    "Scope": "REGIONAL",
                    "Description": description,
                    "Name": name,
                    "Rules": rules,
                    "VisibilityConfig": visibility_config(waf, waf.visibility_config.as_ref(), &name),
                    "Tags": tags(&self.config.tags),
                }),
            ),
        )?;
        graph.insert(
            naming::WAF_ASSOCIATION,
            association(get_att(naming::WAF, "Arn")),
        )?;
        Ok(graph)
    }

    fn compile_waf_rules(&self, waf: &WafConfig) -> Vec<Value> {
        let mut rules: Vec<WafRule> = waf
            .rules
            .iter()
            .map(|rule| resolve_rule(waf, rule, ""))
            .collect();

        if self.config.has_auth("API_KEY") {
            for key in self.config.api_keys.values() {
                rules.extend(self.api_key_rules(waf, key));
            }
        }

        let priorities = assign_priorities(&rules.iter().map(|r| r.priority).collect::<Vec<_>>());
        rules
            .into_iter()
            .zip(priorities)
            .map(|(rule, priority)| rule.into_json(priority))
            .collect()
    }

    /// Key rules only match requests carrying that key
    fn api_key_rules(&self, waf: &WafConfig, key: &ApiKeyConfig) -> Vec<WafRule> {
        let key_match = json!({
            "ByteMatchStatement": {
                "FieldToMatch": { "SingleHeader": { "Name": API_KEY_HEADER } },
                "PositionalConstraint": "EXACTLY",
                "SearchString": get_att(&self.naming.api_key(&key.name), "ApiKey"),
                "TextTransformations": [{ "Priority": 0, "Type": "NONE" }],
            }
        });

        key.waf_rules
            .iter()
            .map(|rule| {
                let mut rule = resolve_rule(waf, rule, &key.name);
                rule.statement = Some(scope_to_key(rule.statement.take(), key_match.clone()));
                rule
            })
            .collect()
    }
}

fn association(web_acl_arn: Value) -> Resource {
    Resource::new(
        "AWS::WAFv2::WebACLAssociation",
        json!({
            "ResourceArn": reference(naming::API),
            "WebACLArn": web_acl_arn,
        }),
    )
}

/// Combine a rule statement with the API key header match
fn scope_to_key(statement: Option<Value>, key_match: Value) -> Value {
    let Some(mut statement) = statement else {
        return key_match;
    };

    if let Some(rate_based) = statement
        .get_mut("RateBasedStatement")
        .and_then(Value::as_object_mut)
    {
        let scope_down = match rate_based.remove("ScopeDownStatement") {
            Some(existing) if !existing.is_null() => {
                json!({ "AndStatement": { "Statements": [existing, key_match] } })
            }
            _ => key_match,
        };
        rate_based.insert("ScopeDownStatement".into(), scope_down);
        return statement;
    }

    json!({ "AndStatement": { "Statements": [statement, key_match] } })
}

// ============================================================================
// Rule shapes
// ============================================================================

fn resolve_rule(waf: &WafConfig, rule: &WafRuleInput, prefix: &str) -> WafRule {
    match rule {
        WafRuleInput::Preset(WafPreset::Throttle) => {
            throttle_rule(waf, &ThrottleConfig::default(), prefix)
        }
        WafRuleInput::Preset(WafPreset::DisableIntrospection) => {
            disable_introspection_rule(waf, &DisableIntrospectionConfig::default(), prefix)
        }
        WafRuleInput::Throttle(rule) => {
            throttle_rule(waf, &rule.throttle.clone().into_config(), prefix)
        }
        WafRuleInput::DisableIntrospection(rule) => {
            disable_introspection_rule(waf, &rule.disable_introspection, prefix)
        }
        WafRuleInput::Custom(rule) => custom_rule(waf, rule),
    }
}

fn throttle_rule(waf: &WafConfig, config: &ThrottleConfig, prefix: &str) -> WafRule {
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("{}Throttle", prefix));
    let aggregate_key_type = config.aggregate_key_type.as_deref().unwrap_or("IP");

    let mut statement = json!({
        "AggregateKeyType": aggregate_key_type,
        "Limit": config.limit.unwrap_or(100),
    });
    if aggregate_key_type == "FORWARDED_IP" {
        let forwarded = config.forwarded_ip_config.clone().unwrap_or_default();
        statement["ForwardedIPConfig"] = json!({
            "HeaderName": forwarded.header_name.as_deref().unwrap_or("X-Forwarded-For"),
            "FallbackBehavior": forwarded.fallback_behavior.as_deref().unwrap_or("MATCH"),
        });
    }
    if let Some(scope_down) = &config.scope_down_statement {
        statement["ScopeDownStatement"] = scope_down.clone();
    }

    let action = config.action.as_deref().unwrap_or("Block");
    WafRule {
        visibility_config: visibility_config(waf, config.visibility_config.as_ref(), &name),
        name,
        priority: config.priority,
        action: Some(json!({ action: {} })),
        override_action: None,
        statement: Some(json!({ "RateBasedStatement": statement })),
    }
}

fn disable_introspection_rule(
    waf: &WafConfig,
    config: &DisableIntrospectionConfig,
    prefix: &str,
) -> WafRule {
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| format!("{}DisableIntrospection", prefix));

    WafRule {
        visibility_config: visibility_config(waf, config.visibility_config.as_ref(), &name),
        name,
        priority: config.priority,
        action: Some(json!({ "Block": {} })),
        override_action: None,
        statement: Some(json!({
            "OrStatement": {
                "Statements": [
                    {
                        "SizeConstraintStatement": {
                            "ComparisonOperator": "GT",
                            "FieldToMatch": { "Body": {} },
                            "Size": MAX_INTROSPECTION_BODY_SIZE,
                            "TextTransformations": [{ "Priority": 0, "Type": "NONE" }],
                        }
                    },
                    {
                        "ByteMatchStatement": {
                            "FieldToMatch": { "Body": {} },
                            "PositionalConstraint": "CONTAINS",
                            "SearchString": "__schema",
                            "TextTransformations": [{ "Priority": 0, "Type": "COMPRESS_WHITE_SPACE" }],
                        }
                    }
                ]
            }
        })),
    }
}

fn custom_rule(waf: &WafConfig, rule: &CustomWafRule) -> WafRule {
    let (action, override_action) = match &rule.override_action {
        Some(override_action) => (None, Some(override_action.clone())),
        None => {
            let action = rule.action.as_deref().unwrap_or("Allow");
            (Some(json!({ action: {} })), None)
        }
    };

    WafRule {
        name: rule.name.clone(),
        priority: rule.priority,
        action,
        override_action,
        statement: rule.statement.clone(),
        visibility_config: visibility_config(waf, rule.visibility_config.as_ref(), &rule.name),
    }
}

/// Rule settings, else the ACL's, else enabled. The metric is named after
/// the rule unless set.
fn visibility_config(waf: &WafConfig, own: Option<&VisibilityConfig>, default_name: &str) -> Value {
    let acl = waf.visibility_config.as_ref();
    let pick = |get: fn(&VisibilityConfig) -> Option<bool>| {
        own.and_then(get).or_else(|| acl.and_then(get)).unwrap_or(true)
    };

    json!({
        "CloudWatchMetricsEnabled": pick(|v| v.cloud_watch_metrics_enabled),
        "MetricName": own
            .and_then(|v| v.name.as_deref())
            .unwrap_or(default_name),
        "SampledRequestsEnabled": pick(|v| v.sampled_requests_enabled),
    })
}
