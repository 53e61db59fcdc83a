//! Lenient access to JSON object replies.
//!
//! Backends are asked for a JSON object, but replies drift: prose around the
//! object, camelCase keys, numbers sent as strings, missing fields. Only a
//! reply with no recoverable object is an error; every field read here falls
//! back to a default.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),
    #[error("reply JSON is not an object")]
    NotObject,
}

/// A parsed JSON object reply.
pub(crate) struct Reply {
    fields: Map<String, Value>,
}

impl Reply {
    /// Parse a reply, falling back to the outermost `{ ... }` span when the
    /// text has content around the object.
    pub(crate) fn parse(text: &str) -> Result<Self, ReplyError> {
        let trimmed = text.trim();
        let value = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(err) => match (trimmed.find('{'), trimmed.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&trimmed[start..=end]).map_err(|_| err)?
                }
                _ => return Err(err.into()),
            },
        };
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ReplyError::NotObject),
        }
    }

    /// Look up `key` (snake_case), then its camelCase spelling.
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .get(key)
            .or_else(|| self.fields.get(&camel_case(key)))
            .filter(|v| !v.is_null())
    }

    /// A score clamped to `[0, max]`. Missing or non-numeric values give `default`.
    pub(crate) fn score(&self, key: &str, default: f64, max: f64) -> f64 {
        self.get(key)
            .and_then(as_f64)
            .map(|v| clamp_score(v, max))
            .unwrap_or(default)
    }

    pub(crate) fn text(&self, key: &str) -> String {
        self.get(key).map(as_text).unwrap_or_default()
    }

    pub(crate) fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => true,
                "false" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// A list of strings. Scalars in the array are stringified; objects are skipped.
    pub(crate) fn strings(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_object() && !v.is_array() && !v.is_null())
                .map(as_text)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// A list of structured items, each built from its object through the
    /// same lenient accessors. Non-object elements are skipped.
    pub(crate) fn items<T>(&self, key: &str, build: impl Fn(&Reply) -> T) -> Vec<T> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Object(fields) => Some(build(&Reply {
                        fields: fields.clone(),
                    })),
                    _ => None,
                })
                .collect(),
            Some(Value::Object(fields)) => vec![build(&Reply {
                fields: fields.clone(),
            })],
            _ => Vec::new(),
        }
    }
}

/// Clamp to `[0, max]`, mapping non-finite values to zero.
fn clamp_score(value: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
