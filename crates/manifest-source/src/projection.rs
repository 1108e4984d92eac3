//! Projection of an accepted configuration into a canonical [`Document`], and its serialization
//! to YAML.
//!
//! The document contains only what was configured: absent attributes, list elements and map
//! entries are dropped instead of being emitted as `null` or empty placeholders. The identity
//! constants are always the first two keys of the document root.
use indexmap::IndexMap;
use manifest_source_shared::yaml::{self, SerializeOptions, YamlDocument};
use serde::{Serialize, ser::SerializeMap};
use snafu::{ResultExt, Snafu};

use crate::{
    config::{ConfigNode, ConfigValue, ScalarValue},
    schema::{API_VERSION_KEY, IdentityConstants, KIND_KEY},
};

/// Raised when a document cannot be rendered. Documents are finite trees of strings, booleans,
/// integers, sequences and string-keyed mappings, so this indicates a fault in the engine rather
/// than a problem with the configuration.
#[derive(Debug, Snafu)]
#[snafu(display("failed to serialize {kind:?} document"))]
pub struct SerializeError {
    source: yaml::Error,
    kind: String,
}

/// A value of the projected document.
///
/// Strings are emitted quoted whenever a YAML 1.1 or 1.2 parser would resolve them to another
/// type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Sequence(Vec<DocumentValue>),
    Mapping(IndexMap<String, DocumentValue>),
}

/// The canonical output tree of one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    identity: IdentityConstants,
    content: IndexMap<String, DocumentValue>,
}

impl Document {
    pub fn identity(&self) -> &IdentityConstants {
        &self.identity
    }

    /// The projected configuration, without the identity constants.
    pub fn content(&self) -> &IndexMap<String, DocumentValue> {
        &self.content
    }

    /// Renders the document as canonical YAML.
    pub fn to_yaml(&self, options: SerializeOptions) -> Result<String, SerializeError> {
        self.to_yaml_string(options).context(SerializeSnafu {
            kind: &self.identity.kind,
        })
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.content.len() + 2))?;
        map.serialize_entry(API_VERSION_KEY, &self.identity.api_version)?;
        map.serialize_entry(KIND_KEY, &self.identity.kind)?;
        for (key, value) in &self.content {
            // The schema never declares the identity keys, this only guards hand-built trees
            if key != API_VERSION_KEY && key != KIND_KEY {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Builds the document of an accepted configuration.
///
/// Objects keep their schema-declared attribute order, lists and maps their input order.
pub fn project(node: &ConfigNode, identity: &IdentityConstants) -> Document {
    let content = match node.value().map(project_value) {
        Some(DocumentValue::Mapping(content)) => content,
        // Resource roots are objects, anything else has nothing to contribute
        _ => IndexMap::new(),
    };

    Document {
        identity: identity.clone(),
        content,
    }
}

/// Renders a document as canonical YAML using the default options.
pub fn serialize(document: &Document) -> Result<String, SerializeError> {
    document.to_yaml(SerializeOptions::default())
}

fn project_value(value: &ConfigValue) -> DocumentValue {
    match value {
        ConfigValue::Scalar(ScalarValue::String(value)) => DocumentValue::String(value.clone()),
        ConfigValue::Scalar(ScalarValue::Boolean(value)) => DocumentValue::Boolean(*value),
        ConfigValue::Scalar(ScalarValue::Integer(value)) => DocumentValue::Integer(*value),
        ConfigValue::Object(children) | ConfigValue::Map(children) => {
            DocumentValue::Mapping(project_entries(children))
        }
        ConfigValue::List(items) => DocumentValue::Sequence(
            items
                .iter()
                .filter_map(|item| item.value().map(project_value))
                .collect(),
        ),
    }
}

fn project_entries(entries: &IndexMap<String, ConfigNode>) -> IndexMap<String, DocumentValue> {
    entries
        .iter()
        .filter_map(|(key, node)| {
            let value = node.value().map(project_value)?;
            Some((key.clone(), value))
        })
        .collect()
}
