use super::ApiError;
use crate::domain::{AggregateResult, ProviderName};
use crate::email;

/// The string inside a JSON value, or `None` for any other JSON type.
pub fn json_str(value: Option<&serde_json::Value>) -> Option<&str> {
    value.and_then(serde_json::Value::as_str)
}

pub fn validate_search_query(query: Option<&str>) -> Result<&str, ApiError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(ApiError::validation("Invalid search query")),
    }
}

pub fn validate_email(address: Option<&str>) -> Result<&str, ApiError> {
    let address = address.ok_or_else(|| ApiError::validation("Email address is required"))?;
    Ok(email::validate_address(address)?)
}

/// Requires one list per known provider and decodes those lists. Keys for
/// other providers are ignored.
pub fn validate_results(results: Option<serde_json::Value>) -> Result<AggregateResult, ApiError> {
    let invalid = || ApiError::validation("Invalid results format");

    let Some(serde_json::Value::Object(mut object)) = results else {
        return Err(invalid());
    };

    let mut aggregate = AggregateResult::new();
    for provider in ProviderName::ALL {
        let list = object.remove(provider.as_str()).ok_or_else(invalid)?;
        if !list.is_array() {
            return Err(invalid());
        }
        let items = serde_json::from_value(list).map_err(|_| invalid())?;
        aggregate.insert(provider, items);
    }

    Ok(aggregate)
}
