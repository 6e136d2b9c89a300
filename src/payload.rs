use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AppError, INVALID_JSON};

/// A JSON object request body.
///
/// A missing or non-JSON content type is rejected with 415; an unparseable
/// body or any JSON value other than an object is rejected with 400.
#[derive(Debug)]
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(Value::Object(fields))) => Ok(JsonObject(fields)),
            Ok(Json(_)) => Err(AppError::Validation(INVALID_JSON)),
            Err(JsonRejection::MissingJsonContentType(_)) => Err(AppError::UnsupportedMediaType),
            Err(rejection) => {
                debug!(error = %rejection, "rejected request body");
                Err(AppError::Validation(INVALID_JSON))
            }
        }
    }
}

/// Body of a partial update. Any failure to read a non-empty JSON object is a
/// 400, whatever the content type.
pub fn patch_fields(body: Result<JsonObject, AppError>) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(JsonObject(fields)) if !fields.is_empty() => Ok(fields),
        _ => Err(AppError::Validation(INVALID_JSON)),
    }
}

/// Pair every submitted field with its allow-listed column name. Fails with
/// "Invalid field." if any key is outside `allowed`, before anything is
/// written.
pub fn assignments(
    fields: Map<String, Value>,
    allowed: &[&'static str],
) -> Result<Vec<(&'static str, Value)>, AppError> {
    let mut out = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let column = allowed
            .iter()
            .copied()
            .find(|column| *column == key)
            .ok_or(AppError::Validation("Invalid field."))?;
        out.push((column, value));
    }
    Ok(out)
}

/// Text to store for a submitted JSON value. Strings are stored verbatim,
/// `null` clears the column, anything else is stored as its JSON text.
pub fn column_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// A present, non-empty string field.
pub fn required_str<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
    message: &'static str,
) -> Result<&'a str, AppError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Validation(message))
}
