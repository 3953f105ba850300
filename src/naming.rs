//! Naming scheme
//!
//! Logical ids and embedded function names are pure functions of the entity
//! kind and its key. Keys are sanitized to `[A-Za-z0-9]` before they are
//! concatenated with a kind prefix.

pub const API: &str = "GraphQlApi";
pub const SCHEMA: &str = "GraphQlSchema";
pub const DOMAIN_NAME: &str = "GraphQlDomainName";
pub const DOMAIN_CERTIFICATE: &str = "GraphQlDomainCertificate";
pub const DOMAIN_ASSOCIATION: &str = "GraphQlDomainAssociation";
pub const DOMAIN_ROUTE53_RECORD: &str = "GraphQlDomainRoute53Record";
pub const LOG_GROUP: &str = "GraphQlApiLogGroup";
pub const LOG_GROUP_ROLE: &str = "GraphQlApiLogGroupRole";
pub const LOG_GROUP_POLICY: &str = "GraphQlApiLogGroupPolicy";
pub const CACHING: &str = "GraphQlCaching";
pub const LAMBDA_AUTHORIZER_PERMISSION: &str = "LambdaAuthorizerPermission";
pub const WAF: &str = "GraphQlWaf";
pub const WAF_ASSOCIATION: &str = "GraphQlWafAssoc";

/// Strip every character outside `[A-Za-z0-9]`
pub fn sanitize(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Logical id of a function deployed by the host framework
///
/// `my-fn_v2` becomes `MyDashfnUnderscorev2LambdaFunction`.
pub fn lambda_logical_id(function_name: &str) -> String {
    let normalized = function_name.replace('-', "Dash").replace('_', "Underscore");
    let mut chars = normalized.chars();
    let upper_first = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{}LambdaFunction", upper_first)
}

/// Identifiers scoped to one API
#[derive(Debug, Clone)]
pub struct Naming {
    api_name: String,
}

impl Naming {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
        }
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn api_key(&self, name: &str) -> String {
        sanitize(&format!("{}{}", API, name))
    }

    pub fn data_source(&self, name: &str) -> String {
        sanitize(&format!("GraphQlDs{}", name))
    }

    pub fn data_source_role(&self, name: &str) -> String {
        sanitize(&format!("GraphQlDs{}Role", name))
    }

    pub fn resolver(&self, type_name: &str, field: &str) -> String {
        sanitize(&format!("GraphQlResolver{}{}", type_name, field))
    }

    pub fn pipeline_function(&self, name: &str) -> String {
        sanitize(&format!("GraphQlFunctionConfiguration{}", name))
    }

    // ========================================================================
    // Embedded function names
    // ========================================================================

    /// A data source's embedded function is named after the data source
    pub fn data_source_function(&self, data_source: &str) -> String {
        data_source.to_string()
    }

    pub fn authorizer_function(&self) -> String {
        format!("{}Authorizer", self.api_name)
    }

    pub fn resolver_sync_function(&self, type_name: &str, field: &str) -> String {
        format!("{}_{}_Sync", type_name, field)
    }

    pub fn pipeline_function_sync_function(&self, function: &str) -> String {
        format!("{}_Sync", function)
    }

    // ========================================================================
    // WAF names
    // ========================================================================

    pub fn waf_name(&self) -> String {
        sanitize(&format!("{}Waf", self.api_name))
    }
}
