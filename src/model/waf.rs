//! WAF configuration

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WafConfig {
    pub enabled: Option<bool>,
    /// Externally managed web ACL; only an association is emitted
    pub arn: Option<Value>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Allow` or `Block`
    pub default_action: Option<String>,
    pub visibility_config: Option<VisibilityConfig>,
    #[serde(default)]
    pub rules: Vec<WafRuleInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityConfig {
    pub name: Option<String>,
    pub cloud_watch_metrics_enabled: Option<bool>,
    pub sampled_requests_enabled: Option<bool>,
}

/// One entry of a `rules` list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WafRuleInput {
    /// `throttle` or `disableIntrospection` with default settings
    Preset(WafPreset),
    Throttle(ThrottleRule),
    DisableIntrospection(DisableIntrospectionRule),
    Custom(CustomWafRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WafPreset {
    Throttle,
    DisableIntrospection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleRule {
    pub throttle: ThrottleInput,
}

/// `throttle: 200` or a full throttle block
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThrottleInput {
    Limit(u64),
    Config(ThrottleConfig),
}

impl ThrottleInput {
    pub fn into_config(self) -> ThrottleConfig {
        match self {
            ThrottleInput::Limit(limit) => ThrottleConfig {
                limit: Some(limit),
                ..Default::default()
            },
            ThrottleInput::Config(config) => config,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThrottleConfig {
    pub name: Option<String>,
    pub action: Option<String>,
    /// `IP` or `FORWARDED_IP`
    pub aggregate_key_type: Option<String>,
    pub limit: Option<u64>,
    pub priority: Option<u32>,
    pub scope_down_statement: Option<Value>,
    #[serde(rename = "forwardedIPConfig")]
    pub forwarded_ip_config: Option<ForwardedIpConfig>,
    pub visibility_config: Option<VisibilityConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedIpConfig {
    pub header_name: Option<String>,
    pub fallback_behavior: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisableIntrospectionRule {
    pub disable_introspection: DisableIntrospectionConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisableIntrospectionConfig {
    pub name: Option<String>,
    pub priority: Option<u32>,
    pub visibility_config: Option<VisibilityConfig>,
}

/// A rule written directly in WAFv2 terms
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWafRule {
    pub name: String,
    pub priority: Option<u32>,
    /// `Allow`, `Block`, `Count`, `Captcha` or `Challenge`
    pub action: Option<String>,
    pub override_action: Option<Value>,
    pub statement: Option<Value>,
    pub visibility_config: Option<VisibilityConfig>,
}
