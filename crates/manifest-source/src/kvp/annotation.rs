//! Kubernetes annotations. Keys follow the label key grammar, values can
//! contain **any** valid UTF-8 data.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/annotations/>.
use std::{convert::Infallible, fmt::Display, ops::Deref, str::FromStr};

use snafu::{Snafu, ensure};

use crate::kvp::{KeyValuePair, KeyValuePairError, Value};

/// The combined size of all annotation keys and values of an object.
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

pub type AnnotationError = KeyValuePairError<Infallible>;

pub type Annotation = KeyValuePair<AnnotationValue>;

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct AnnotationValue(String);

impl Value for AnnotationValue {
    type Error = Infallible;
}

impl FromStr for AnnotationValue {
    type Err = Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Self(input.to_owned()))
    }
}

impl Deref for AnnotationValue {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for AnnotationValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(display(
    "annotations are {size} bytes in total but must be no more than {TOTAL_ANNOTATION_SIZE_LIMIT}"
))]
pub struct AnnotationsTooLargeError {
    size: usize,
}

/// Checks the combined byte size of all annotation keys and values.
pub fn validate_annotations_size<'a>(
    annotations: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), AnnotationsTooLargeError> {
    let size: usize = annotations
        .into_iter()
        .map(|(key, value)| key.len() + value.len())
        .sum();

    ensure!(
        size <= TOTAL_ANNOTATION_SIZE_LIMIT,
        AnnotationsTooLargeSnafu { size }
    );
    Ok(())
}
