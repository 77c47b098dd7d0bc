//! Write-time redaction of environment configuration.
//!
//! Raw env values never leave this module: they are reduced to a `${VAR}`
//! reference (which names a variable but holds no secret) or to
//! [`REDACTED_PLACEHOLDER`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const REDACTED_PLACEHOLDER: &str = "<redacted>";

const ENV_KEYS: &[&str] = &["env", "environment", "env_vars", "envvars"];

/// Environment variables with their values already redacted.
///
/// The only constructors go through [`redact_value`], including
/// deserialization, so an `EnvVars` can never carry a raw literal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn from_raw<I, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, V)>,
        V: Into<Value>,
    {
        Self(
            vars.into_iter()
                .map(|(name, value)| (name, redact_value(&value.into())))
                .collect(),
        )
    }

    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names whose value is a `${VAR}` reference rather than a literal
    pub fn placeholder_names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, v)| is_reference(v))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl<'de> Deserialize<'de> for EnvVars {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(EnvVars::from_raw(raw))
    }
}

/// Reduce one env value to its persisted form
pub fn redact_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if is_reference(s) => s.clone(),
        Value::String(s) if s.is_empty() => String::new(),
        _ => REDACTED_PLACEHOLDER.to_string(),
    }
}

/// `${NAME}` with a shell-style variable name
pub fn is_reference(s: &str) -> bool {
    s.strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .is_some_and(|name| {
            let mut chars = name.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

pub fn is_env_key(key: &str) -> bool {
    ENV_KEYS.contains(&key.to_ascii_lowercase().as_str())
}

/// Redact the values of an env object in place, returning its variable names.
///
/// Anything that is not an object is replaced wholesale by the placeholder.
pub fn scrub_env_object(value: &mut Value) -> Vec<String> {
    match value {
        Value::Object(map) => {
            let mut names = Vec::with_capacity(map.len());
            for (name, v) in map.iter_mut() {
                *v = Value::String(redact_value(v));
                names.push(name.clone());
            }
            names
        }
        Value::Null => Vec::new(),
        other => {
            *other = Value::String(REDACTED_PLACEHOLDER.to_string());
            Vec::new()
        }
    }
}

/// Walk a free-form value and redact every env object nested inside it
pub fn scrub_value(value: &mut Value) -> Vec<String> {
    let mut names = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_env_key(key) {
                    names.extend(scrub_env_object(v));
                } else {
                    names.extend(scrub_value(v));
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                names.extend(scrub_value(item));
            }
        }
        _ => {}
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literal_secret_is_replaced() {
        let env = EnvVars::from_raw([("API_KEY".to_string(), json!("sk-live-abc123"))]);
        assert_eq!(env.get("API_KEY"), Some(REDACTED_PLACEHOLDER));
        assert_eq!(env.names(), vec!["API_KEY"]);
    }

    #[test]
    fn test_reference_is_kept() {
        let env = EnvVars::from_raw([
            ("TOKEN".to_string(), json!("${GITHUB_TOKEN}")),
            ("EMPTY".to_string(), json!(null)),
            ("PORT".to_string(), json!(8080)),
        ]);
        assert_eq!(env.get("TOKEN"), Some("${GITHUB_TOKEN}"));
        assert_eq!(env.get("EMPTY"), Some(""));
        assert_eq!(env.get("PORT"), Some(REDACTED_PLACEHOLDER));
        assert_eq!(env.placeholder_names(), vec!["TOKEN"]);
    }

    #[test]
    fn test_reference_detection_is_strict() {
        assert!(is_reference("${HOME}"));
        assert!(is_reference("${_X1}"));
        assert!(!is_reference("${1X}"));
        assert!(!is_reference("prefix-${HOME}"));
        assert!(!is_reference("${HOME} && curl evil"));
        assert!(!is_reference("$HOME"));
    }

    #[test]
    fn test_deserialize_redacts() {
        let env: EnvVars = serde_json::from_str(r#"{"API_KEY": "sk-live-abc123"}"#).unwrap();
        let out = serde_json::to_string(&env).unwrap();
        assert!(!out.contains("sk-live-abc123"));
        assert!(out.contains("API_KEY"));
    }

    #[test]
    fn test_scrub_value_walks_nested_objects() {
        let mut value = json!({
            "servers": [
                {"name": "a", "env": {"SECRET": "s3cr3t"}},
                {"name": "b", "Environment": "inline-secret"}
            ]
        });
        let names = scrub_value(&mut value);
        assert_eq!(names, vec!["SECRET"]);
        let out = value.to_string();
        assert!(!out.contains("s3cr3t"));
        assert!(!out.contains("inline-secret"));
    }
}
