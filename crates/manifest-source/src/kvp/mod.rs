//! Validation of Kubernetes key/value pairs, like labels and annotations.
//!
//! Both share the key grammar of [`Key`]. They differ in what they accept as
//! value: label values are short and restricted to a small ASCII alphabet,
//! annotation values can contain any UTF-8 data.
use std::{fmt::Display, str::FromStr};

use snafu::{ResultExt, Snafu};

pub mod annotation;
pub mod label;

mod key;

pub use annotation::{Annotation, AnnotationError, AnnotationValue, validate_annotations_size};
pub use key::*;
pub use label::{Label, LabelError, LabelValue, LabelValueError};

/// The value half of a [`KeyValuePair`].
pub trait Value: FromStr<Err = Self::Error> + Display {
    type Error: std::error::Error + 'static;
}

/// The error type for key/value pair parsing/validating operations.
#[derive(Debug, PartialEq, Snafu)]
pub enum KeyValuePairError<E>
where
    E: std::error::Error + 'static,
{
    #[snafu(display("invalid key {key:?}"))]
    InvalidKey { source: KeyError, key: String },

    #[snafu(display("invalid value {value:?} for key {key:?}", key = key.to_string()))]
    InvalidValue { source: E, key: Key, value: String },
}

/// A validated Kubernetes key/value pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValuePair<V>
where
    V: Value,
{
    pub key: Key,
    pub value: V,
}

impl<V> TryFrom<(&str, &str)> for KeyValuePair<V>
where
    V: Value,
{
    type Error = KeyValuePairError<<V as Value>::Error>;

    fn try_from((key, value): (&str, &str)) -> Result<Self, Self::Error> {
        let key = Key::from_str(key).context(InvalidKeySnafu { key })?;
        let value = V::from_str(value).context(InvalidValueSnafu {
            key: key.clone(),
            value,
        })?;
        Ok(Self { key, value })
    }
}

impl<V> Display for KeyValuePair<V>
where
    V: Value,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Renders an error and its chain of sources as a single line.
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
