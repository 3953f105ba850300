//! Intrinsic functions
//!
//! Deferred references evaluated by CloudFormation at provisioning time.

use serde_json::{json, Value};

pub const REGION: &str = "AWS::Region";
pub const ACCOUNT_ID: &str = "AWS::AccountId";

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Ref": name}`
pub fn reference(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{"Fn::Join": [separator, parts]}`
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

/// `{"Fn::Sub": [template, variables]}`
pub fn sub(template: &str, variables: Value) -> Value {
    json!({ "Fn::Sub": [template, variables] })
}

/// The explicit region when given, the stack region otherwise
pub fn region_or_default(region: Option<&Value>) -> Value {
    region.cloned().unwrap_or_else(|| reference(REGION))
}

/// `arn:aws:<service>:<region>:<account>:<rest...>` as a join expression
pub fn arn(service: &str, region: Value, rest: Vec<Value>) -> Value {
    let mut parts = vec![
        Value::from("arn"),
        Value::from("aws"),
        Value::from(service),
        region,
        reference(ACCOUNT_ID),
    ];
    parts.extend(rest);
    join(":", parts)
}
