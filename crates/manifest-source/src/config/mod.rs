//! The configuration model: a runtime tree mirroring an [`AttributeSchema`], where every node is
//! explicitly [`ConfigNode::Absent`] or [`ConfigNode::Present`].
//!
//! A tree is built per request by [`accept`]ing raw user input against a schema. Acceptance either
//! yields a fully typed tree or the complete list of [`ValidationError`]s, never a partially
//! accepted tree.
//!
//! Keeping absence explicit (rather than using zero values) means a field that was never set and a
//! field set to `false`, `0`, `""` or `{}` stay distinguishable all the way to the output document.
use indexmap::IndexMap;

#[cfg(doc)]
use crate::schema::AttributeSchema;

mod accept;
mod error;

pub use accept::accept;
pub use error::{FieldPath, PathSegment, ValidationError, ValidationErrorKind, ValidationErrors};

/// A node of the configuration tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigNode {
    /// The field was not supplied (or explicitly set to `null`).
    Absent,
    Present(ConfigValue),
}

/// The value of a present node, shaped like its attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Scalar(ScalarValue),

    /// Declared attributes in schema order, each independently absent or present.
    Object(IndexMap<String, ConfigNode>),

    /// Elements in input order.
    List(Vec<ConfigNode>),

    /// Entries in input insertion order.
    Map(IndexMap<String, ConfigNode>),
}

/// A typed scalar value. Its type always matches the declared [`ScalarType`](crate::schema::ScalarType).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarValue {
    String(String),
    Boolean(bool),
    Integer(i64),
}

impl ConfigNode {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn value(&self) -> Option<&ConfigValue> {
        match self {
            Self::Absent => None,
            Self::Present(value) => Some(value),
        }
    }

    /// Returns the child node `name` of a present object or map.
    pub fn get(&self, name: &str) -> Option<&Self> {
        match self.value()? {
            ConfigValue::Object(children) | ConfigValue::Map(children) => children.get(name),
            ConfigValue::Scalar(_) | ConfigValue::List(_) => None,
        }
    }

    /// Follows a path of object attribute names or map keys.
    pub fn lookup<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&Self> {
        path.into_iter().try_fold(self, |node, name| node.get(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.value()? {
            ConfigValue::Scalar(ScalarValue::String(value)) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_follows_present_nodes() {
        let node = ConfigNode::Present(ConfigValue::Object(IndexMap::from([
            (
                "metadata".to_owned(),
                ConfigNode::Present(ConfigValue::Object(IndexMap::from([(
                    "name".to_owned(),
                    ConfigNode::Present(ConfigValue::Scalar(ScalarValue::String(
                        "vm1".to_owned(),
                    ))),
                )]))),
            ),
            ("spec".to_owned(), ConfigNode::Absent),
        ])));

        assert_eq!(
            node.lookup(["metadata", "name"]).and_then(ConfigNode::as_str),
            Some("vm1")
        );
        assert_eq!(node.lookup(["spec"]), Some(&ConfigNode::Absent));
        assert_eq!(node.lookup(["spec", "template"]), None);
    }
}
