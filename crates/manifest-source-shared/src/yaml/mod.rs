//! Utility functions for emitting data in the YAML file format
use std::{io::Write, sync::LazyLock};

use regex::Regex;
use serde_yaml::{Mapping, Value};
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML serialization.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to write YAML document"))]
    WriteDocument { source: std::io::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Plain scalars a YAML 1.1 parser resolves to something other than a string: booleans, nulls,
/// integers (including `_` separators, octal and sexagesimal forms), floats, the merge key and the
/// value key. serde_yaml only quotes strings that are ambiguous under YAML 1.2.
const YAML_1_1_NON_STRING_FMT: &str = concat!(
    r"^(?:",
    r"y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF",
    r"|~|null|Null|NULL",
    r"|[-+]?0b[01_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+",
    r"|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+",
    r"|[-+]?(?:[0-9][0-9_]*)?\.[0-9.]*(?:[eE][-+][0-9]+)?",
    r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
    r"|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)",
    r"|<<|=",
    r")$",
);

static YAML_1_1_NON_STRING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(YAML_1_1_NON_STRING_FMT).expect("failed to compile YAML 1.1 scalar regex")
});

/// Provides configurable options during YAML serialization.
///
/// The default emits a bare document without the leading `---` marker, which is what a single
/// rendered manifest should look like. Hosts concatenating several documents into one stream
/// should enable [`SerializeOptions::explicit_document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) to the output string.
    pub explicit_document: bool,
}

impl SerializeOptions {
    pub fn explicit_document() -> Self {
        Self {
            explicit_document: true,
        }
    }
}

/// Serializes any type `T` which is [serializable](serde::Serialize) as YAML using the provided
/// [`SerializeOptions`].
pub trait YamlDocument: Sized + serde::Serialize {
    /// Renders `self` as a YAML [`String`].
    fn to_yaml_string(&self, options: SerializeOptions) -> Result<String> {
        let mut buffer = Vec::new();
        serialize(self, &mut buffer, options)?;

        String::from_utf8(buffer).context(ParseUtf8BytesSnafu)
    }
}

impl<T> YamlDocument for T where T: serde::ser::Serialize {}

/// Serializes the given data structure and writes it to a [`Writer`](Write).
///
/// Strings which a YAML 1.1 or 1.2 parser would read back as a different type (`"true"`,
/// `"42"`, `"~"`, `"on"`, `"1_000"`) are single-quoted, so string-typed values always round-trip
/// as strings.
pub fn serialize<T, W>(value: &T, mut writer: W, options: SerializeOptions) -> Result<()>
where
    T: serde::Serialize,
    W: Write,
{
    if options.explicit_document {
        writer
            .write_all(b"---\n")
            .context(WriteDocumentSeparatorSnafu)?;
    }

    let mut value = serde_yaml::to_value(value).context(SerializeYamlSnafu)?;
    let mut placeholders = Placeholders::new(&value);
    placeholders.substitute(&mut value);

    let mut buffer = Vec::new();
    let mut serializer = serde_yaml::Serializer::new(&mut buffer);
    serde::Serialize::serialize(&value, &mut serializer).context(SerializeYamlSnafu)?;
    let document = String::from_utf8(buffer).context(ParseUtf8BytesSnafu)?;

    writer
        .write_all(placeholders.restore(document).as_bytes())
        .context(WriteDocumentSnafu)
}

/// Stands in for strings serde_yaml would emit as ambiguous plain scalars.
///
/// Every placeholder is a `0` followed by digits, which serde_yaml always single-quotes. The
/// digits start with a run of `7`s longer than any such run in the document, so the quoted
/// placeholder cannot collide with other output.
struct Placeholders {
    prefix: String,
    originals: Vec<String>,
}

impl Placeholders {
    fn new(value: &Value) -> Self {
        Self {
            prefix: format!("0{}", "7".repeat(longest_run(value, '7') + 1)),
            originals: Vec::new(),
        }
    }

    fn substitute(&mut self, value: &mut Value) {
        match value {
            Value::String(string) if YAML_1_1_NON_STRING_REGEX.is_match(string) => {
                let placeholder = format!("{}{}", self.prefix, self.originals.len());
                self.originals.push(std::mem::replace(string, placeholder));
            }
            Value::Sequence(items) => items.iter_mut().for_each(|item| self.substitute(item)),
            Value::Mapping(mapping) => {
                *mapping = std::mem::take(mapping)
                    .into_iter()
                    .map(|(mut key, mut value)| {
                        self.substitute(&mut key);
                        self.substitute(&mut value);
                        (key, value)
                    })
                    .collect::<Mapping>();
            }
            Value::Tagged(tagged) => self.substitute(&mut tagged.value),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    fn restore(&self, mut document: String) -> String {
        for (index, original) in self.originals.iter().enumerate() {
            document = document.replace(
                &format!("'{}{index}'", self.prefix),
                &format!("'{}'", original.replace('\'', "''")),
            );
        }
        document
    }
}

fn longest_run(value: &Value, needle: char) -> usize {
    match value {
        Value::String(string) => string
            .split(|c: char| c != needle)
            .map(str::len)
            .max()
            .unwrap_or_default(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| longest_run(item, needle))
            .max()
            .unwrap_or_default(),
        Value::Mapping(mapping) => mapping
            .iter()
            .map(|(key, value)| longest_run(key, needle).max(longest_run(value, needle)))
            .max()
            .unwrap_or_default(),
        Value::Tagged(tagged) => longest_run(&tagged.value, needle),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}
