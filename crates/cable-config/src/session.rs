//! Session identity taken from the persisted user cookie.

use serde_json::Value;

use crate::error::ConfigError;

/// Identifies the user a socket belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    id: String,
}

impl SessionIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse the user cookie value (JSON) and take its `id` field.
    ///
    /// A missing, null or empty `id` yields `Ok(None)`; a value that is not a
    /// JSON object is an error. Percent-encoded values are decoded first.
    pub fn from_cookie(raw: &str) -> Result<Option<Self>, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(first) => {
                let decoded = percent_decode(raw);
                serde_json::from_str(&decoded)
                    .map_err(|_| ConfigError::InvalidSession(first.to_string()))?
            }
        };

        let Value::Object(object) = value else {
            return Err(ConfigError::InvalidSession(
                "cookie is not a JSON object".to_string(),
            ));
        };

        let id = match object.get("id") {
            Some(Value::String(id)) => id.trim().to_string(),
            Some(Value::Number(id)) => id.to_string(),
            Some(Value::Null) | None => return Ok(None),
            Some(other) => {
                return Err(ConfigError::InvalidSession(format!(
                    "unsupported 'id' value: {}",
                    other
                )))
            }
        };

        Ok((!id.is_empty()).then(|| Self::new(id)))
    }

    /// Find `cookie_name` in a `Cookie:` header and parse it.
    pub fn from_cookie_header(header: &str, cookie_name: &str) -> Result<Option<Self>, ConfigError> {
        header
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(name, _)| name.trim() == cookie_name)
            .map(|(_, value)| Self::from_cookie(value))
            .unwrap_or(Ok(None))
    }
}

fn percent_decode(raw: &str) -> String {
    url::form_urlencoded::parse(format!("v={}", raw.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}
