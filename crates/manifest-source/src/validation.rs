// This is adapted from Kubernetes.
// See apimachinery/pkg/util/validation/validation.go and apimachinery/pkg/api/validation/generic.go
// in the Kubernetes source

use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

/// Minimal length required by RFC 1123 is 63. Up to 255 allowed, unsupported by k8s.
const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character";

/// This is a subdomain's max length in DNS (RFC 1123)
pub(crate) const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const RFC_1123_SUBDOMAIN_FMT: &str =
    concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");
const RFC_1123_SUBDOMAIN_ERROR_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";

// Lazily initialized regular expressions
static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_LABEL_FMT}$")).expect("failed to compile RFC 1123 label regex")
});

static RFC_1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_SUBDOMAIN_FMT}$"))
        .expect("failed to compile RFC 1123 subdomain regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug, PartialEq, Eq)]
pub struct Errors(Vec<Error>);

impl Errors {
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}
impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Self(vec![error])
    }
}

/// A single validation error.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },

    #[snafu(display("input must not contain uppercase characters, found {found:?}"))]
    Uppercase { found: String },
}

#[derive(Debug, PartialEq, Eq)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: String,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        if !examples.is_empty() {
            for (i, example) in examples.iter().enumerate() {
                let prefix = match i {
                    0 => "e.g.",
                    _ => "or",
                };
                write!(f, "{prefix} {example:?}, ")?;
            }
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
pub(crate) fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
pub(crate) fn validate_str_regex(
    value: &str,
    regex: &Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$')
                .to_owned(),
            examples,
        }
        .into())
    }
}

/// Returns [`Ok`] if `value` contains no uppercase characters.
fn validate_str_lowercase(value: &str) -> Result<(), Error> {
    let found = value
        .chars()
        .filter(|c| c.is_uppercase())
        .collect::<String>();

    if found.is_empty() {
        Ok(())
    } else {
        UppercaseSnafu { found }.fail()
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
pub(crate) fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(|res| res.err())
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Tests for a string that conforms to the Kubernetes definition of a DNS label
/// (lowercase RFC 1123), which is the format of most object names.
pub fn is_rfc_1123_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_LABEL_MAX_LENGTH),
        validate_str_lowercase(value),
        validate_str_regex(
            value,
            &RFC_1123_LABEL_REGEX,
            RFC_1123_LABEL_ERROR_MSG,
            &["example-label", "1-label-1"],
        ),
    ])
}

/// Tests for a string that conforms to the Kubernetes definition of a DNS subdomain
/// (lowercase RFC 1123).
pub fn is_rfc_1123_subdomain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_SUBDOMAIN_MAX_LENGTH),
        validate_str_lowercase(value),
        validate_str_regex(
            value,
            &RFC_1123_SUBDOMAIN_REGEX,
            RFC_1123_SUBDOMAIN_ERROR_MSG,
            &["example.com"],
        ),
    ])
}

/// Validates an object name.
///
/// See [`is_rfc_1123_label`] for more information.
pub fn validate_object_name(name: &str) -> Result {
    is_rfc_1123_label(name)
}

/// Validates a namespace name.
///
/// See [`is_rfc_1123_label`] for more information.
pub fn validate_namespace_name(name: &str) -> Result {
    is_rfc_1123_label(name)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("a-")]
    #[case("-a")]
    #[case("1-")]
    #[case("-1")]
    #[case("_")]
    #[case("a_b")]
    #[case(".")]
    #[case("a.b")]
    #[case(" ")]
    #[case("a b")]
    #[case("a@b")]
    #[case("A")]
    #[case("ABC")]
    #[case("aBc")]
    #[case(&"a".repeat(64))]
    fn is_rfc_1123_label_fail(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_err());
    }

    #[rstest]
    #[case("a")]
    #[case("0")]
    #[case("ab")]
    #[case("a1")]
    #[case("1a")]
    #[case("a-1")]
    #[case("abc-123")]
    #[case("a--1--2--b")]
    #[case(&"a".repeat(63))]
    fn is_rfc_1123_label_pass(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("a.")]
    #[case(".a")]
    #[case("a..b")]
    #[case("A.b")]
    #[case("a_b.c")]
    #[case(&"a".repeat(254))]
    fn is_rfc_1123_subdomain_fail(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_err());
    }

    #[rstest]
    #[case("a")]
    #[case("example.com")]
    #[case("a.b.c.d.e")]
    #[case("1.2.3.4.5")]
    #[case("kubevirt.io")]
    #[case(&"a".repeat(253))]
    fn is_rfc_1123_subdomain_pass(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_ok());
    }

    #[test]
    fn uppercase_is_reported_explicitly() {
        let errors = validate_object_name("ABC").unwrap_err();

        assert!(errors.iter().any(|error| matches!(
            error,
            Error::Uppercase { found } if found == "ABC"
        )));
        assert!(errors.to_string().contains("uppercase"));
    }

    #[test]
    fn all_errors_are_collected() {
        let errors = validate_namespace_name(&"A".repeat(64)).unwrap_err();

        // too long, uppercase and regex mismatch
        assert_eq!(errors.iter().count(), 3);
    }
}
