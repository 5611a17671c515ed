use serde_json::Value;
use thiserror::Error;

/// Choices offered when the backend's answer cannot be used.
pub const FALLBACK_CHOICES: [&str; 3] = ["招募技术团队", "寻找投资人", "开发产品原型"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response had no content")]
    Empty,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{0}` must be an array")]
    NotAnArray(&'static str),
    #[error("field `{field}` has a non-string entry at index {index}")]
    NonStringEntry { field: &'static str, index: usize },
    #[error("field `{0}` is empty")]
    EmptyList(&'static str),
}

pub fn fallback_choices() -> Vec<String> {
    FALLBACK_CHOICES.iter().map(|c| c.to_string()).collect()
}

/// Decode `{"choices": [...]}` from the choice-generation call.
pub fn decode_choices(raw: Option<&str>) -> Result<Vec<String>, DecodeError> {
    decode_string_list(raw, "choices")
}

/// Decode `{"types": [...]}` from the type-suggestion call.
pub fn decode_startup_types(raw: Option<&str>) -> Result<Vec<String>, DecodeError> {
    decode_string_list(raw, "types")
}

/// Pull a non-empty list of strings out of `{"<field>": [...]}`.
/// Entries are kept as sent; whitespace-only ones are dropped. Order is
/// preserved.
pub fn decode_string_list(
    raw: Option<&str>,
    field: &'static str,
) -> Result<Vec<String>, DecodeError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(DecodeError::Empty);
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let Value::Object(mut object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let items = match object.remove(field) {
        None | Some(Value::Null) => return Err(DecodeError::MissingField(field)),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(DecodeError::NotAnArray(field)),
    };

    let mut list = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::String(text) = item else {
            return Err(DecodeError::NonStringEntry { field, index });
        };
        if !text.trim().is_empty() {
            list.push(text);
        }
    }

    if list.is_empty() {
        return Err(DecodeError::EmptyList(field));
    }

    Ok(list)
}
