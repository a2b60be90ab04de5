//! Schema-free node parameters with typed accessors.
//!
//! Scripts are edited by hand and by the editor, so numbers sometimes arrive
//! as strings (`"0.5"`) and integers as floats (`2.0`). The accessors accept
//! those spellings and report anything else as a [`ParamError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::node::NodeId;

/// Errors produced when a parameter has an unusable value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamError {
    /// The value has the wrong JSON type.
    #[error("parameter '{key}' expected {expected}, found {found}")]
    Type {
        /// Parameter name.
        key: String,
        /// Expected type description.
        expected: &'static str,
        /// The offending value, rendered as JSON.
        found: String,
    },

    /// The value is numeric but outside the accepted range.
    #[error("parameter '{key}' out of range: {value}")]
    OutOfRange {
        /// Parameter name.
        key: String,
        /// The offending value, rendered as JSON.
        value: String,
    },

    /// A required parameter is absent.
    #[error("parameter '{0}' is required")]
    Missing(String),
}

impl ParamError {
    fn type_error(key: &str, expected: &'static str, found: &Value) -> Self {
        ParamError::Type {
            key: key.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}

/// Mapping of parameter names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from a JSON object; any other value yields an empty map.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Sets a parameter, chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a parameter.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the parameters as a JSON object.
    #[must_use]
    pub fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Reads a textual parameter; numbers are rendered to text.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for arrays, objects, booleans and null.
    pub fn string_or(&self, key: &str, default: &str) -> Result<String, ParamError> {
        match self.0.get(key) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(ParamError::type_error(key, "string", other)),
        }
    }

    /// Reads a floating point parameter; numeric strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] if the value is not a number.
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => as_f64(value).ok_or_else(|| ParamError::type_error(key, "number", value)),
        }
    }

    /// Reads an integer parameter; floats truncate toward zero and integer strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] if the value is not numeric, or
    /// [`ParamError::OutOfRange`] if it does not fit in an `i64`.
    pub fn i64_or(&self, key: &str, default: i64) -> Result<i64, ParamError> {
        let Some(value) = self.0.get(key) else {
            return Ok(default);
        };
        let out_of_range = || ParamError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        };
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(i),
                None => truncate(n.as_f64().ok_or_else(out_of_range)?).ok_or_else(out_of_range),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ParamError::type_error(key, "integer", value)),
            other => Err(ParamError::type_error(key, "integer", other)),
        }
    }

    /// Reads an integer parameter that must fit in an `i32`.
    ///
    /// # Errors
    ///
    /// As [`i64_or`](Self::i64_or), plus [`ParamError::OutOfRange`] outside `i32`.
    pub fn i32_or(&self, key: &str, default: i32) -> Result<i32, ParamError> {
        let value = self.i64_or(key, i64::from(default))?;
        i32::try_from(value).map_err(|_| ParamError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Reads a boolean parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] if the value is not a boolean.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ParamError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ParamError::type_error(key, "boolean", other)),
        }
    }

    /// Reads a node reference. Missing, empty or non-string values mean "no target".
    #[must_use]
    pub fn node_ref(&self, key: &str) -> Option<NodeId> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(NodeId::new(s.clone())),
            _ => None,
        }
    }

    /// Reads a three channel color bound such as `[0, 200, 0]`.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] if the value is not a three element
    /// array, or [`ParamError::OutOfRange`] if a channel is outside `0..=255`.
    pub fn color_triplet(&self, key: &str) -> Result<Option<[u8; 3]>, ParamError> {
        let Some(value) = self.0.get(key) else {
            return Ok(None);
        };
        let items = match value {
            Value::Null => return Ok(None),
            Value::Array(items) if items.len() == 3 => items,
            other => return Err(ParamError::type_error(key, "array of 3 channels", other)),
        };

        let mut channels = [0u8; 3];
        for (slot, item) in channels.iter_mut().zip(items) {
            let v = as_f64(item).ok_or_else(|| ParamError::type_error(key, "number", item))?;
            if !(0.0..=255.0).contains(&v) {
                return Err(ParamError::OutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            *slot = v as u8;
        }
        Ok(Some(channels))
    }

    /// Reads a four element bounding box `[x1, y1, x2, y2]`.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] if the value is not four numbers.
    pub fn bbox_or(&self, key: &str, default: [i32; 4]) -> Result<[i32; 4], ParamError> {
        let Some(value) = self.0.get(key) else {
            return Ok(default);
        };
        let Value::Array(items) = value else {
            return Err(ParamError::type_error(key, "array of 4 numbers", value));
        };
        if items.len() != 4 {
            return Err(ParamError::type_error(key, "array of 4 numbers", value));
        }
        let mut out = [0i32; 4];
        for (slot, item) in out.iter_mut().zip(items) {
            let v = as_f64(item).ok_or_else(|| ParamError::type_error(key, "number", item))?;
            *slot = truncate(v)
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| ParamError::OutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
        }
        Ok(out)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truncate(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}
