use std::{fmt::Display, str::FromStr};

use regex::Regex;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

use crate::{
    config::{ConfigNode, ConfigValue, ScalarValue},
    kvp::{self, Annotation, Label},
    schema::{AttributeKind, ScalarType},
    validation,
};

/// A constraint attached to an attribute, checked against its value after the value was
/// structurally accepted. Validators are plain data: checking a value never mutates them, so a
/// schema can be shared freely between threads.
#[derive(Clone, Debug, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
#[strum(serialize_all = "camelCase")]
pub enum Validator {
    /// A lowercase RFC 1123 label, such as an object name.
    Identifier,

    /// Same rule as [`Validator::Identifier`], applied to namespace names.
    Namespace,

    /// A lowercase RFC 1123 subdomain.
    DnsSubdomain,

    /// Map keys and values are valid Kubernetes labels.
    Labels,

    /// Map keys are valid Kubernetes annotation keys, the total size is bounded.
    Annotations,

    /// The value is one of a fixed, case-sensitive set.
    OneOf { values: Vec<String> },

    MinLength { min: usize },
    MaxLength { max: usize },

    /// The whole value matches a regular expression.
    Pattern { pattern: Pattern },

    AtLeast { min: i64 },
    AtMost { max: i64 },

    /// Lists and maps contain at least `min` entries.
    MinItems { min: usize },
    /// Lists and maps contain at most `max` entries.
    MaxItems { max: usize },
}

/// A single constraint violation. Map validators report violations per entry and set `key`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Violation {
    pub key: Option<String>,
    pub message: String,
}

impl Violation {
    fn new(message: impl Into<String>) -> Self {
        Self {
            key: None,
            message: message.into(),
        }
    }

    fn at_key(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.to_owned()),
            message: message.into(),
        }
    }
}

impl Validator {
    /// The name of the validator as used in descriptor tables, e.g. `oneOf`.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns whether this validator is able to judge values of `kind`.
    pub fn applies_to(&self, kind: &AttributeKind) -> bool {
        match self {
            Self::Identifier
            | Self::Namespace
            | Self::DnsSubdomain
            | Self::OneOf { .. }
            | Self::MinLength { .. }
            | Self::MaxLength { .. }
            | Self::Pattern { .. } => matches!(kind, AttributeKind::Scalar(ScalarType::String)),
            Self::AtLeast { .. } | Self::AtMost { .. } => {
                matches!(kind, AttributeKind::Scalar(ScalarType::Integer))
            }
            Self::Labels | Self::Annotations => matches!(
                kind,
                AttributeKind::Map(value)
                    if matches!(value.kind(), AttributeKind::Scalar(ScalarType::String))
            ),
            Self::MinItems { .. } | Self::MaxItems { .. } => {
                matches!(kind, AttributeKind::List(_) | AttributeKind::Map(_))
            }
        }
    }

    /// Checks a present value, returning every violation found.
    ///
    /// Values of a kind this validator does not apply to pass unchecked; schemas are verified
    /// before use so this does not happen for registered resource kinds.
    pub(crate) fn check(&self, value: &ConfigValue) -> Vec<Violation> {
        match (self, value) {
            (Self::Identifier, ConfigValue::Scalar(ScalarValue::String(s))) => {
                from_errors(validation::validate_object_name(s))
            }
            (Self::Namespace, ConfigValue::Scalar(ScalarValue::String(s))) => {
                from_errors(validation::validate_namespace_name(s))
            }
            (Self::DnsSubdomain, ConfigValue::Scalar(ScalarValue::String(s))) => {
                from_errors(validation::is_rfc_1123_subdomain(s))
            }
            (Self::OneOf { values }, ConfigValue::Scalar(ScalarValue::String(s))) => {
                if values.iter().any(|allowed| allowed == s) {
                    Vec::new()
                } else {
                    vec![Violation::new(format!(
                        "value {s:?} must be one of {values:?}"
                    ))]
                }
            }
            (Self::MinLength { min }, ConfigValue::Scalar(ScalarValue::String(s))) => {
                let length = s.chars().count();
                if length < *min {
                    vec![Violation::new(format!(
                        "string length must be at least {min}, got {length}"
                    ))]
                } else {
                    Vec::new()
                }
            }
            (Self::MaxLength { max }, ConfigValue::Scalar(ScalarValue::String(s))) => {
                let length = s.chars().count();
                if length > *max {
                    vec![Violation::new(format!(
                        "string length must be at most {max}, got {length}"
                    ))]
                } else {
                    Vec::new()
                }
            }
            (Self::Pattern { pattern }, ConfigValue::Scalar(ScalarValue::String(s))) => {
                if pattern.is_match(s) {
                    Vec::new()
                } else {
                    vec![Violation::new(format!(
                        "value {s:?} must match regular expression {pattern}"
                    ))]
                }
            }
            (Self::AtLeast { min }, ConfigValue::Scalar(ScalarValue::Integer(i))) => {
                if i < min {
                    vec![Violation::new(format!("value must be at least {min}, got {i}"))]
                } else {
                    Vec::new()
                }
            }
            (Self::AtMost { max }, ConfigValue::Scalar(ScalarValue::Integer(i))) => {
                if i > max {
                    vec![Violation::new(format!("value must be at most {max}, got {i}"))]
                } else {
                    Vec::new()
                }
            }
            (Self::Labels, ConfigValue::Map(entries)) => string_entries(entries)
                .filter_map(|(key, value)| {
                    Label::try_from((key, value))
                        .err()
                        .map(|error| Violation::at_key(key, kvp::error_chain(&error)))
                })
                .collect(),
            (Self::Annotations, ConfigValue::Map(entries)) => {
                let mut violations = string_entries(entries)
                    .filter_map(|(key, value)| {
                        Annotation::try_from((key, value))
                            .err()
                            .map(|error| Violation::at_key(key, kvp::error_chain(&error)))
                    })
                    .collect::<Vec<_>>();

                if let Err(error) = kvp::validate_annotations_size(string_entries(entries)) {
                    violations.push(Violation::new(error.to_string()));
                }
                violations
            }
            (Self::MinItems { min }, ConfigValue::List(_) | ConfigValue::Map(_)) => {
                let count = item_count(value);
                if count < *min {
                    vec![Violation::new(format!(
                        "must contain at least {min} items, got {count}"
                    ))]
                } else {
                    Vec::new()
                }
            }
            (Self::MaxItems { max }, ConfigValue::List(_) | ConfigValue::Map(_)) => {
                let count = item_count(value);
                if count > *max {
                    vec![Violation::new(format!(
                        "must contain at most {max} items, got {count}"
                    ))]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

fn from_errors(result: Result<(), validation::Errors>) -> Vec<Violation> {
    match result {
        Ok(()) => Vec::new(),
        Err(errors) => vec![Violation::new(errors.to_string())],
    }
}

/// Present string entries of a map. Absent entries are not part of the configuration.
fn string_entries<'a>(
    entries: &'a indexmap::IndexMap<String, ConfigNode>,
) -> impl Iterator<Item = (&'a str, &'a str)> {
    entries.iter().filter_map(|(key, node)| match node {
        ConfigNode::Present(ConfigValue::Scalar(ScalarValue::String(value))) => {
            Some((key.as_str(), value.as_str()))
        }
        _ => None,
    })
}

/// Counts present items, absent entries are dropped during projection.
fn item_count(value: &ConfigValue) -> usize {
    match value {
        ConfigValue::List(items) => items.iter().filter(|item| item.is_present()).count(),
        ConfigValue::Map(entries) => entries.values().filter(|item| item.is_present()).count(),
        ConfigValue::Scalar(_) | ConfigValue::Object(_) => 0,
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("failed to compile regular expression {pattern:?}"))]
pub struct PatternError {
    source: regex::Error,
    pattern: String,
}

/// A regular expression which has to match the whole value.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).context(PatternSnafu { pattern })?;

        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.source)
    }
}
