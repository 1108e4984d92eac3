use std::{fmt::Display, ops::Deref, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{ResultExt, Snafu, ensure};

use crate::validation::{self, RFC_1123_SUBDOMAIN_MAX_LENGTH};

const KEY_NAME_MAX_LEN: usize = 63;

static KEY_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$")
        .expect("failed to compile key name regex")
});

/// The error type for key parsing/validation operations.
///
/// This error will be returned if the input is empty, the parser encounters
/// multiple prefixes or any deeper errors occur during key prefix and key name
/// parsing.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum KeyError {
    /// Indicates that the input is empty. The key must at least contain a name.
    /// The prefix is optional.
    #[snafu(display("key input cannot be empty"))]
    EmptyInput,

    /// Indicates that the input contains multiple nested prefixes, e.g.
    /// `app.kubernetes.io/nested/name`.
    #[snafu(display("key prefixes cannot be nested, only use a single slash"))]
    NestedPrefix,

    #[snafu(display("failed to parse key prefix"))]
    KeyPrefixError { source: KeyPrefixError },

    #[snafu(display("failed to parse key name"))]
    KeyNameError { source: KeyNameError },
}

/// The key of a label or annotation. It contains an optional prefix, and a
/// required name, using the format `(<PREFIX>/)<NAME>`.
///
/// See <https://kubernetes.io/docs/concepts/overview/working-with-objects/labels/#syntax-and-character-set>.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key {
    prefix: Option<KeyPrefix>,
    name: KeyName,
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // Keys are taken verbatim, surrounding whitespace is an error reported
        // by the name or prefix grammar
        ensure!(!input.is_empty(), EmptyInputSnafu);

        let parts = input.split('/').collect::<Vec<_>>();

        let (prefix, name) = match parts[..] {
            [name] => (None, name),
            [prefix, name] => (Some(prefix), name),
            _ => return NestedPrefixSnafu.fail(),
        };

        Ok(Self {
            prefix: prefix
                .map(KeyPrefix::from_str)
                .transpose()
                .context(KeyPrefixSnafu)?,
            name: KeyName::from_str(name).context(KeyNameSnafu)?,
        })
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}/{}", prefix, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Key {
    pub fn prefix(&self) -> Option<&KeyPrefix> {
        self.prefix.as_ref()
    }

    pub fn name(&self) -> &KeyName {
        &self.name
    }
}

/// The error type for key prefix parsing/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum KeyPrefixError {
    /// Indicates that the key prefix segment is empty, which is not permitted
    /// when the key indicates that a prefix is present (via a slash). This
    /// prevents keys like `/name`.
    #[snafu(display("prefix segment of key cannot be empty"))]
    PrefixEmpty,

    #[snafu(display(
        "prefix segment of key exceeds the maximum length - expected {RFC_1123_SUBDOMAIN_MAX_LENGTH} characters or less, got {length}"
    ))]
    PrefixTooLong { length: usize },

    /// Indicates that the key prefix segment is not a DNS subdomain.
    #[snafu(display("prefix segment of key must be a DNS subdomain: {source}"))]
    PrefixInvalid { source: validation::Errors },
}

/// A validated optional key prefix segment of a key, which is always a
/// lowercase DNS subdomain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyPrefix(String);

impl FromStr for KeyPrefix {
    type Err = KeyPrefixError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), PrefixEmptySnafu);
        ensure!(
            input.len() <= RFC_1123_SUBDOMAIN_MAX_LENGTH,
            PrefixTooLongSnafu {
                length: input.len()
            }
        );

        validation::is_rfc_1123_subdomain(input).context(PrefixInvalidSnafu)?;

        Ok(Self(input.to_owned()))
    }
}

impl Deref for KeyPrefix {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The error type for key name parsing/validation operations.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum KeyNameError {
    #[snafu(display("name segment of key cannot be empty"))]
    NameEmpty,

    #[snafu(display(
        "name segment of key exceeds the maximum length - expected {KEY_NAME_MAX_LEN} characters or less, got {length}"
    ))]
    NameTooLong { length: usize },

    /// Indicates that the key name segment contains non-ASCII characters
    /// which Kubernetes does not permit.
    #[snafu(display("name segment of key contains non-ascii characters"))]
    NameNotAscii,

    #[snafu(display(
        "name segment of key must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
    ))]
    NameInvalid,
}

/// A validated name segment of a key. This part of the key is required.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyName(String);

impl FromStr for KeyName {
    type Err = KeyNameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), NameEmptySnafu);
        ensure!(
            input.len() <= KEY_NAME_MAX_LEN,
            NameTooLongSnafu {
                length: input.len()
            }
        );
        ensure!(input.is_ascii(), NameNotAsciiSnafu);
        ensure!(KEY_NAME_REGEX.is_match(input), NameInvalidSnafu);

        Ok(Self(input.to_owned()))
    }
}

impl Deref for KeyName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for KeyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn key_with_prefix() {
        let key = Key::from_str("app.kubernetes.io/name").unwrap();

        assert_eq!(key.prefix().map(|p| &**p), Some("app.kubernetes.io"));
        assert_eq!(&**key.name(), "name");
        assert_eq!(key.to_string(), "app.kubernetes.io/name");
    }

    #[test]
    fn key_without_prefix() {
        let key = Key::from_str("Tier_1.x").unwrap();

        assert_eq!(key.prefix(), None);
        assert_eq!(key.to_string(), "Tier_1.x");
    }

    #[rstest]
    #[case("foo/bar/baz", KeyError::NestedPrefix)]
    #[case("", KeyError::EmptyInput)]
    fn invalid_key(#[case] input: &str, #[case] error: KeyError) {
        let err = Key::from_str(input).unwrap_err();
        assert_eq!(err, error);
    }

    #[rstest]
    #[case("/name")]
    #[case("Example.com/name")]
    #[case("example_com/name")]
    #[case("example.com./name")]
    fn invalid_key_prefix(#[case] input: &str) {
        let err = Key::from_str(input).unwrap_err();
        assert!(matches!(err, KeyError::KeyPrefixError { .. }));
    }

    #[rstest]
    #[case("a".repeat(254), KeyPrefixError::PrefixTooLong { length: 254 })]
    #[case(String::new(), KeyPrefixError::PrefixEmpty)]
    fn invalid_key_prefix_length(#[case] input: String, #[case] error: KeyPrefixError) {
        let err = KeyPrefix::from_str(&input).unwrap_err();
        assert_eq!(err, error);
    }

    #[rstest]
    #[case("a".repeat(64), KeyNameError::NameTooLong { length: 64 })]
    #[case("foo-", KeyNameError::NameInvalid)]
    #[case(" foo", KeyNameError::NameInvalid)]
    #[case("ä", KeyNameError::NameNotAscii)]
    #[case(String::new(), KeyNameError::NameEmpty)]
    fn invalid_key_name(#[case] input: String, #[case] error: KeyNameError) {
        let err = KeyName::from_str(&input).unwrap_err();
        assert_eq!(err, error);
    }
}
