//! Typed program parameters.
//!
//! Every program carries a map of named parameters (port, ip, memory, world
//! name, ...). Each one is an explicit descriptor with a declared type, so
//! argument substitution is a typed-to-text projection instead of guessing at
//! the shape of arbitrary JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Parameter name to descriptor. Ordered so saved documents are stable.
pub type ProgramData = BTreeMap<String, ParameterDescriptor>;

/// A scalar parameter value as it appears in a definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Text rendering used for argument and install-step substitution.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Empty text counts as "no value" for edits and defaults.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl Default for ParamValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Boolean,
    /// One of the descriptor's `options`.
    Option,
}

/// A value did not fit the parameter's declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} expects an integer, got {value}")]
    NotAnInteger { name: String, value: String },

    #[error("{name} expects true or false, got {value}")]
    NotABoolean { name: String, value: String },

    #[error("{name} must be one of [{allowed}], got {value}")]
    NotAnOption {
        name: String,
        value: String,
        allowed: String,
    },
}

const fn is_false(b: &bool) -> bool {
    !*b
}

/// Declaration and current value of one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Current value.
    #[serde(default)]
    pub value: ParamValue,

    /// Declared type.
    #[serde(rename = "type", default)]
    pub kind: ParamType,

    /// Used when `value` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,

    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Allowed values for [`ParamType::Option`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParamValue>,
}

impl ParameterDescriptor {
    /// Descriptor with a value and type inferred from it.
    pub fn new(value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        let kind = match value {
            ParamValue::Bool(_) => ParamType::Boolean,
            ParamValue::Integer(_) => ParamType::Integer,
            ParamValue::Float(_) | ParamValue::Text(_) => ParamType::String,
        };
        Self {
            value,
            kind,
            ..Self::default()
        }
    }

    /// The effective value: `value`, or `default` when `value` is empty.
    pub fn current(&self) -> &ParamValue {
        match &self.default {
            Some(default) if self.value.is_empty() => default,
            _ => &self.value,
        }
    }

    /// Text projection of the effective value.
    pub fn render(&self) -> String {
        self.current().render()
    }

    /// Convert `value` to this parameter's declared type.
    ///
    /// Text input is parsed for integer and boolean parameters, since edits
    /// usually arrive as strings.
    pub fn coerce(&self, name: &str, value: ParamValue) -> Result<ParamValue, ParameterError> {
        match self.kind {
            ParamType::String => Ok(ParamValue::Text(value.render())),
            ParamType::Integer => match value {
                ParamValue::Integer(_) => Ok(value),
                ParamValue::Text(ref s) => {
                    s.trim()
                        .parse::<i64>()
                        .map(ParamValue::Integer)
                        .map_err(|_| ParameterError::NotAnInteger {
                            name: name.to_string(),
                            value: value.render(),
                        })
                }
                other => Err(ParameterError::NotAnInteger {
                    name: name.to_string(),
                    value: other.render(),
                }),
            },
            ParamType::Boolean => match value {
                ParamValue::Bool(_) => Ok(value),
                ParamValue::Text(ref s) if s.trim().eq_ignore_ascii_case("true") => {
                    Ok(ParamValue::Bool(true))
                }
                ParamValue::Text(ref s) if s.trim().eq_ignore_ascii_case("false") => {
                    Ok(ParamValue::Bool(false))
                }
                other => Err(ParameterError::NotABoolean {
                    name: name.to_string(),
                    value: other.render(),
                }),
            },
            ParamType::Option => {
                let rendered = value.render();
                if self.options.iter().any(|o| o.render() == rendered) {
                    Ok(value)
                } else {
                    Err(ParameterError::NotAnOption {
                        name: name.to_string(),
                        value: rendered,
                        allowed: self
                            .options
                            .iter()
                            .map(ParamValue::render)
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
                }
            }
        }
    }
}

/// Text values of every parameter, keyed by name.
pub fn resolved_values(data: &ProgramData) -> BTreeMap<String, String> {
    data.iter()
        .map(|(name, descriptor)| (name.clone(), descriptor.render()))
        .collect()
}
