//! API keys
//!
//! Expiry is anchored at the start of the current UTC hour. Durations use
//! fixed conversions (a year is always 365 days) so `1y` never lands past
//! the 365 day ceiling.

use super::ApiCompiler;
use crate::error::{CompileError, Result};
use crate::model::{ApiKeyConfig, DurationInput};
use crate::resource::{Resource, ResourceGraph};
use crate::validate::duration_regex;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde_json::json;
use tracing::debug;

/// Parse `expiresAfter`. Bare numbers are hours.
pub fn parse_duration(input: &DurationInput) -> Result<TimeDelta> {
    let (amount, unit) = match input {
        DurationInput::Hours(hours) => (*hours, "h"),
        DurationInput::Text(text) => {
            let invalid = || CompileError::InvalidDuration(text.clone());
            let captures = duration_regex().captures(text).ok_or_else(invalid)?;
            let amount = captures
                .get(1)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .ok_or_else(invalid)?;
            let unit = captures.get(2).map(|m| m.as_str()).unwrap_or("h");
            (amount, unit)
        }
    };

    let invalid = || CompileError::InvalidDuration(format!("{}{}", amount, unit));
    let amount = i64::try_from(amount).map_err(|_| invalid())?;
    let days = |n: i64| amount.checked_mul(n).and_then(TimeDelta::try_days);
    let delta = match unit {
        "y" => days(365),
        "q" => days(91),
        "M" => days(30),
        "w" => days(7),
        "d" => days(1),
        "h" => TimeDelta::try_hours(amount),
        "m" => TimeDelta::try_minutes(amount),
        "s" => TimeDelta::try_seconds(amount),
        "ms" => TimeDelta::try_milliseconds(amount),
        _ => None,
    };
    delta.ok_or_else(invalid)
}

/// Expiry of a key created at `now`
pub fn expiry(key: &ApiKeyConfig, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let start_of_hour = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);

    let expires = if let Some(after) = &key.expires_after {
        let mut duration = parse_duration(after)?;
        // Truncation to the hour eats up to an hour; a 24h key would fail the floor
        if duration >= TimeDelta::hours(24) && duration < TimeDelta::hours(25) {
            duration = TimeDelta::hours(25);
        }
        start_of_hour
            .checked_add_signed(duration)
            .ok_or_else(|| CompileError::ApiKeyExpiry {
                name: key.name.clone(),
            })?
    } else if let Some(at) = &key.expires_at {
        DateTime::parse_from_rfc3339(at)
            .map_err(|e| {
                CompileError::ConfigShape(format!(
                    "Api Key {}: invalid expiresAt '{}': {}",
                    key.name, at, e
                ))
            })?
            .with_timezone(&Utc)
    } else {
        start_of_hour + TimeDelta::days(365)
    };

    if expires < now + TimeDelta::days(1) || expires > now + TimeDelta::days(365) {
        return Err(CompileError::ApiKeyExpiry {
            name: key.name.clone(),
        });
    }
    Ok(expires)
}

impl ApiCompiler<'_> {
    pub(super) fn compile_api_key(&self, key: &ApiKeyConfig) -> Result<ResourceGraph> {
        let expires = expiry(key, self.ctx.now)?;
        let seconds = (expires.timestamp_millis() as f64 / 1000.0).round() as i64;
        debug!("Api key '{}' expires at {}", key.name, expires);

        let mut graph = ResourceGraph::new();
        graph.insert(
            self.naming.api_key(&key.name),
            Resource::new(
                "AWS::AppSync::ApiKey",
                json!({
                    "ApiId": self.api_id(),
                    "Description": key.description.as_deref().unwrap_or(&key.name),
                    "Expires": seconds,
                    "ApiKeyId": key.api_key_id,
                }),
            ),
        )?;
        Ok(graph)
    }
}
