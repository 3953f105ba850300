//! Structural validation
//!
//! Range, pattern and enum checks on the authored configuration. Every
//! issue is collected before failing, and they are reported together as one
//! [`CompileError::Validation`].

use crate::error::{CompileError, Result, ValidationIssue};
use crate::model::{
    ApiKeyInput, AuthProvider, DataSourceRef, DurationInput, FunctionRef, PipelineFunctionInput,
    RawApiConfig, ResolverCaching, ResolverInput, WafConfig, WafRuleInput,
};
use chrono::DateTime;
use regex::Regex;
use std::sync::OnceLock;

const DOMAIN_PATTERN: &str = r"^([a-z][a-z0-9+-]*\.)+[a-z][a-z0-9]*$";
const HOSTED_ZONE_PATTERN: &str = r"^([a-z][a-z0-9+-]*\.)+[a-z][a-z0-9]*\.$";
const HEADER_PATTERN: &str = r"^[a-zA-Z0-9-]+$";
pub const DURATION_PATTERN: &str = r"^(\d+)(y|q|M|w|d|h|m|s|ms)?$";

const VISIBILITY: &[&str] = &["GLOBAL", "PRIVATE"];
const LOG_LEVELS: &[&str] = &["ALL", "INFO", "DEBUG", "ERROR", "NONE"];
const CACHING_BEHAVIORS: &[&str] = &["FULL_REQUEST_CACHING", "PER_RESOLVER_CACHING"];
const DEFAULT_ACTIONS: &[&str] = &["ALLOW", "DENY"];
const WAF_ACTIONS: &[&str] = &["Allow", "Block"];
const AGGREGATE_KEY_TYPES: &[&str] = &["IP", "FORWARDED_IP"];

fn pattern(slot: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    slot.get_or_init(|| {
        Regex::new(source).unwrap_or_else(|e| panic!("Invalid built-in pattern {}: {}", source, e))
    })
}

pub fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, DURATION_PATTERN)
}

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, DOMAIN_PATTERN)
}

fn hosted_zone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, HOSTED_ZONE_PATTERN)
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, HEADER_PATTERN)
}

/// Parse authored YAML/JSON, reporting syntax and shape errors as validation issues
pub fn parse(content: &str) -> Result<RawApiConfig> {
    RawApiConfig::from_yaml(content).map_err(|e| {
        let path = match e.location() {
            Some(location) => format!("line {} column {}", location.line(), location.column()),
            None => "/".to_string(),
        };
        CompileError::Validation(vec![ValidationIssue::new(path, e.to_string())])
    })
}

/// Check a parsed configuration
pub fn validate(config: &RawApiConfig) -> Result<()> {
    let mut issues = Issues::default();

    if config.name.trim().is_empty() {
        issues.push("/name", "must not be empty");
    }

    issues.check_auth("/authentication", &config.authentication, true);
    for (i, auth) in config.additional_authentications.iter().enumerate() {
        issues.check_auth(&format!("/additionalAuthentications/{}", i), auth, false);
    }

    if let Some(visibility) = &config.visibility {
        issues.one_of("/visibility", visibility, VISIBILITY);
    }
    if let Some(limit) = config.query_depth_limit {
        issues.range("/queryDepthLimit", limit as u64, 1, 75);
    }
    if let Some(limit) = config.resolver_count_limit {
        issues.range("/resolverCountLimit", limit as u64, 1, 1000);
    }

    if let Some(domain) = &config.domain {
        if !domain_regex().is_match(&domain.name) {
            issues.pattern("/domain/name", DOMAIN_PATTERN);
        }
        if let Some(zone) = &domain.hosted_zone_name {
            if !hosted_zone_regex().is_match(zone) {
                issues.pattern("/domain/hostedZoneName", HOSTED_ZONE_PATTERN);
            }
        }
        if domain.use_cloud_formation != Some(false)
            && domain.certificate_arn.is_none()
            && domain.hosted_zone_id.is_none()
        {
            issues.push(
                "/domain",
                "when using CloudFormation, you must provide either certificateArn or hostedZoneId.",
            );
        }
    }

    if let Some(logging) = &config.logging {
        issues.one_of("/logging/level", &logging.level, LOG_LEVELS);
    }

    if let Some(caching) = &config.caching {
        issues.one_of("/caching/behavior", &caching.behavior, CACHING_BEHAVIORS);
        if let Some(ttl) = caching.ttl {
            issues.range("/caching/ttl", ttl as u64, 1, 3600);
        }
    }

    if let Some(waf) = &config.waf {
        issues.check_waf("/waf", waf);
    }

    for (i, key) in config.api_keys.iter().enumerate() {
        let ApiKeyInput::Config(key) = key else {
            continue;
        };
        let path = format!("/apiKeys/{}", i);
        match &key.expires_after {
            Some(DurationInput::Text(text)) if !duration_regex().is_match(text) => {
                issues.pattern(&format!("{}/expiresAfter", path), DURATION_PATTERN);
            }
            _ => {}
        }
        if let Some(at) = &key.expires_at {
            if DateTime::parse_from_rfc3339(at).is_err() {
                issues.push(format!("{}/expiresAt", path), "must be a RFC 3339 date-time");
            }
        }
        for (j, rule) in key.waf_rules.iter().enumerate() {
            issues.check_rule(&format!("{}/wafRules/{}", path, j), rule);
        }
    }

    for (name, function) in config.pipeline_functions.clone().flatten() {
        if let PipelineFunctionInput::Config(function) = function {
            let path = format!("/pipelineFunctions/{}", name);
            issues.check_batch_size(&path, function.max_batch_size);
            issues.check_code_or_templates(&path, &function.code, &function.request, &function.response);
        }
    }

    for (key, resolver) in config.resolvers.clone().flatten() {
        let ResolverInput::Config(resolver) = resolver else {
            continue;
        };
        let path = format!("/resolvers/{}", key);
        issues.check_batch_size(&path, resolver.max_batch_size);
        issues.check_code_or_templates(&path, &resolver.code, &resolver.request, &resolver.response);
        if let Some(ResolverCaching::Custom { ttl: Some(ttl), .. }) = &resolver.caching {
            issues.range(&format!("{}/caching/ttl", path), *ttl as u64, 1, 3600);
        }
        if let Some(DataSourceRef::Named(name)) = &resolver.data_source {
            if name.is_empty() {
                issues.push(format!("{}/dataSource", path), "must not be empty");
            }
        }
        for (i, function) in resolver.functions.iter().flatten().enumerate() {
            if let FunctionRef::Inline(function) = function {
                let path = format!("{}/functions/{}", path, i);
                issues.check_batch_size(&path, function.max_batch_size);
                issues.check_code_or_templates(&path, &function.code, &function.request, &function.response);
            }
        }
    }

    issues.into_result()
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue::new(path, message));
    }

    fn range(&mut self, path: &str, value: u64, min: u64, max: u64) {
        if value < min {
            self.push(path, format!("must be >= {}", min));
        } else if value > max {
            self.push(path, format!("must be <= {}", max));
        }
    }

    fn one_of(&mut self, path: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.push(path, format!("must be one of {}", allowed.join(", ")));
        }
    }

    fn pattern(&mut self, path: &str, pattern: &str) {
        self.push(path, format!("must match pattern \"{}\"", pattern));
    }

    fn check_batch_size(&mut self, path: &str, max_batch_size: Option<u32>) {
        if let Some(size) = max_batch_size {
            self.range(&format!("{}/maxBatchSize", path), size as u64, 1, 2000);
        }
    }

    fn check_code_or_templates(
        &mut self,
        path: &str,
        code: &Option<String>,
        request: &Option<String>,
        response: &Option<String>,
    ) {
        if code.is_some() && (request.is_some() || response.is_some()) {
            self.push(path, "code cannot be combined with request or response templates");
        }
    }

    fn check_auth(&mut self, path: &str, auth: &AuthProvider, primary: bool) {
        if let AuthProvider::CognitoUserPools(config) = auth {
            if let Some(action) = &config.default_action {
                if primary {
                    self.one_of(&format!("{}/config/defaultAction", path), action, DEFAULT_ACTIONS);
                } else {
                    self.push(
                        format!("{}/config/defaultAction", path),
                        "is only allowed on the primary authentication",
                    );
                }
            }
        }
    }

    fn check_waf(&mut self, path: &str, waf: &WafConfig) {
        if let Some(action) = &waf.default_action {
            self.one_of(&format!("{}/defaultAction", path), action, WAF_ACTIONS);
        }
        for (i, rule) in waf.rules.iter().enumerate() {
            self.check_rule(&format!("{}/rules/{}", path, i), rule);
        }
    }

    fn check_rule(&mut self, path: &str, rule: &WafRuleInput) {
        let WafRuleInput::Throttle(rule) = rule else {
            return;
        };
        let config = rule.throttle.clone().into_config();
        let path = format!("{}/throttle", path);
        if let Some(limit) = config.limit {
            if limit < 100 {
                self.push(format!("{}/limit", path), "must be >= 100");
            }
        }
        if let Some(key_type) = &config.aggregate_key_type {
            self.one_of(&format!("{}/aggregateKeyType", path), key_type, AGGREGATE_KEY_TYPES);
        }
        if let Some(header) = config.forwarded_ip_config.and_then(|c| c.header_name) {
            if !header_regex().is_match(&header) {
                self.pattern(&format!("{}/forwardedIPConfig/headerName", path), HEADER_PATTERN);
            }
        }
    }

    fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CompileError::Validation(self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str) -> Result<()> {
        validate(&parse(yaml)?)
    }

    #[test]
    fn test_minimal_config_is_valid() {
        check(
            r#"
name: api
authentication:
  type: API_KEY
"#,
        )
        .unwrap();
    }

    #[test]
    fn test_issues_are_collected() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
queryDepthLimit: 100
resolverCountLimit: 0
caching:
  behavior: PER_RESOLVER_CACHING
  ttl: 7200
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "/queryDepthLimit: must be <= 75\n/resolverCountLimit: must be >= 1\n/caching/ttl: must be <= 3600"
        );
    }

    #[test]
    fn test_domain_checks() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
domain:
  name: Not_A_Domain
  hostedZoneName: example.com
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/domain/name: must match pattern"));
        assert!(message.contains("/domain/hostedZoneName: must match pattern"));
        assert!(message.contains("certificateArn or hostedZoneId"));
    }

    #[test]
    fn test_api_key_expiry_formats() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
apiKeys:
  - name: a
    expiresAfter: 10x
  - name: b
    expiresAt: tomorrow
  - name: c
    expiresAfter: 1y
  - name: d
    expiresAt: "2030-01-01T00:00:00Z"
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/apiKeys/0/expiresAfter"));
        assert!(message.contains("/apiKeys/1/expiresAt"));
        assert!(!message.contains("/apiKeys/2"));
        assert!(!message.contains("/apiKeys/3"));
    }

    #[test]
    fn test_throttle_rules() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
waf:
  rules:
    - throttle: 50
    - throttle:
        aggregateKeyType: FORWARDED_IP
        forwardedIPConfig:
          headerName: "X Forwarded"
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/waf/rules/0/throttle/limit: must be >= 100"));
        assert!(message.contains("/waf/rules/1/throttle/forwardedIPConfig/headerName"));
    }

    #[test]
    fn test_batch_size_and_code_conflicts() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
resolvers:
  Query.user:
    dataSource: users
    maxBatchSize: 5000
    code: user.js
    request: user.request.vtl
"#,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/resolvers/Query.user/maxBatchSize: must be <= 2000"));
        assert!(message.contains("code cannot be combined"));
    }

    #[test]
    fn test_parse_errors_are_validation_errors() {
        let err = parse("name: [unclosed").unwrap_err();
        assert!(matches!(err, CompileError::Validation(_)));
    }

    #[test]
    fn test_default_action_on_additional_provider() {
        let err = check(
            r#"
name: api
authentication:
  type: API_KEY
additionalAuthentications:
  - type: AMAZON_COGNITO_USER_POOLS
    config:
      userPoolId: pool
      defaultAction: DENY
"#,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("/additionalAuthentications/0/config/defaultAction"));
    }
}
