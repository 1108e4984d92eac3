//! Kubernetes labels. The value can contain a limited set of ASCII characters.
//!
//! See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/>.
use std::{fmt::Display, ops::Deref, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{Snafu, ensure};

use crate::kvp::{KeyValuePair, KeyValuePairError, Value};

const LABEL_VALUE_MAX_LEN: usize = 63;

// Empty values are allowed
static LABEL_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$")
        .expect("failed to compile label value regex")
});

pub type LabelError = KeyValuePairError<LabelValueError>;

/// A Kubernetes label, e.g. `app.kubernetes.io/name=vm1`.
pub type Label = KeyValuePair<LabelValue>;

/// The error type for label value parse/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum LabelValueError {
    #[snafu(display(
        "value exceeds the maximum length - expected {LABEL_VALUE_MAX_LEN} characters or less, got {length}"
    ))]
    ValueTooLong { length: usize },

    #[snafu(display("value contains non-ascii characters"))]
    ValueNotAscii,

    #[snafu(display(
        "value must be empty or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
    ))]
    ValueInvalid,
}

/// A validated Kubernetes label value.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct LabelValue(String);

impl Value for LabelValue {
    type Error = LabelValueError;
}

impl FromStr for LabelValue {
    type Err = LabelValueError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(
            input.len() <= LABEL_VALUE_MAX_LEN,
            ValueTooLongSnafu {
                length: input.len()
            }
        );
        ensure!(input.is_ascii(), ValueNotAsciiSnafu);
        ensure!(LABEL_VALUE_REGEX.is_match(input), ValueInvalidSnafu);

        Ok(Self(input.to_owned()))
    }
}

impl Deref for LabelValue {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("a".repeat(64), LabelValueError::ValueTooLong { length: 64 })]
    #[case("foo-", LabelValueError::ValueInvalid)]
    #[case("-foo", LabelValueError::ValueInvalid)]
    #[case("a b", LabelValueError::ValueInvalid)]
    #[case("ä", LabelValueError::ValueNotAscii)]
    fn invalid_value(#[case] input: String, #[case] error: LabelValueError) {
        let err = LabelValue::from_str(&input).unwrap_err();
        assert_eq!(err, error);
    }

    #[rstest]
    #[case("")]
    #[case("x")]
    #[case("v1.2_3-rc")]
    #[case(&"a".repeat(63))]
    fn valid_value(#[case] input: &str) {
        assert!(LabelValue::from_str(input).is_ok());
    }

    #[test]
    fn label_display() {
        let label = Label::try_from(("app.kubernetes.io/name", "vm1")).unwrap();
        assert_eq!(label.to_string(), "app.kubernetes.io/name=vm1");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = Label::try_from(("", "v")).unwrap_err();
        assert!(matches!(err, LabelError::InvalidKey { .. }));
    }
}
