//! Schema descriptors describe the accepted shape of one resource kind's configuration.
//!
//! An [`AttributeSchema`] is an immutable tree of scalar, object, list and map nodes. Together
//! with the [`IdentityConstants`] of the resource kind it forms a [`ResourceSchema`]. Descriptors
//! are built once (either in code using the builder functions, or deserialized from a descriptor
//! table, see [`crate::catalog`]) and then shared read-only across any number of requests.
//!
//! Descriptor tables use the following YAML shape for every attribute:
//!
//! ```yaml
//! name: metadata
//! type: object            # string | boolean | integer | object | list | map
//! required: true
//! validators:
//!   - type: identifier
//! attributes: []          # object only
//! element: {}             # list only
//! value: {}               # map only
//! ```
use std::{
    collections::{BTreeMap, HashSet},
    fmt::Display,
};

use serde::{Deserialize, de::IgnoredAny};
use snafu::{Snafu, ensure};

mod validator;

pub use validator::{Pattern, PatternError, Validator};

/// The root keys every projected document starts with. They are never part of the accepted input.
pub const API_VERSION_KEY: &str = "apiVersion";
pub const KIND_KEY: &str = "kind";

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum SchemaError {
    #[snafu(display("the root of resource schema {type_name:?} must be an object"))]
    RootNotObject { type_name: String },

    #[snafu(display("attribute at {path:?} has an empty name"))]
    EmptyAttributeName { path: String },

    #[snafu(display("object at {path:?} declares attribute {name:?} more than once"))]
    DuplicateAttribute { path: String, name: String },

    #[snafu(display("validator {validator:?} cannot be applied to the {kind} attribute at {path:?}"))]
    InapplicableValidator {
        path: String,
        validator: &'static str,
        kind: String,
    },

    #[snafu(display(
        "resource schema {type_name:?} declares {name:?}, which is reserved for the identity constants"
    ))]
    ReservedIdentityKey { type_name: String, name: String },

    #[snafu(display("descriptor of attribute at {path:?} contains unknown key {key:?}"))]
    UnknownDescriptorKey { path: String, key: String },
}

/// The type of a scalar attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarType {
    String,
    Boolean,
    Integer,
}

/// The shape of an attribute.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "AttributeKindRepr")]
pub enum AttributeKind {
    Scalar(ScalarType),
    /// An object with a fixed set of attributes, in declaration order.
    Object(Vec<AttributeSchema>),
    /// An ordered sequence of elements of the same shape.
    List(Box<AttributeSchema>),
    /// String keys mapped to values of the same shape.
    Map(Box<AttributeSchema>),
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(scalar_type) => write!(f, "{scalar_type}"),
            Self::Object(_) => f.write_str("object"),
            Self::List(_) => f.write_str("list"),
            Self::Map(_) => f.write_str("map"),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum AttributeKindRepr {
    String,
    Boolean,
    Integer,
    Object {
        #[serde(default)]
        attributes: Vec<AttributeSchema>,
    },
    List {
        element: Box<AttributeSchema>,
    },
    Map {
        value: Box<AttributeSchema>,
    },
}

impl From<AttributeKindRepr> for AttributeKind {
    fn from(repr: AttributeKindRepr) -> Self {
        match repr {
            AttributeKindRepr::String => Self::Scalar(ScalarType::String),
            AttributeKindRepr::Boolean => Self::Scalar(ScalarType::Boolean),
            AttributeKindRepr::Integer => Self::Scalar(ScalarType::Integer),
            AttributeKindRepr::Object { attributes } => Self::Object(attributes),
            AttributeKindRepr::List { element } => Self::List(element),
            AttributeKindRepr::Map { value } => Self::Map(value),
        }
    }
}

/// Describes one configuration field: its shape, whether it must be set and which constraints its
/// value has to satisfy.
///
/// The `name` of list elements and map values is not used for addressing (indices and keys are),
/// so it is usually left empty.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    #[serde(default)]
    name: String,

    #[serde(flatten)]
    kind: AttributeKind,

    #[serde(default)]
    required: bool,

    #[serde(default)]
    validators: Vec<Validator>,

    #[serde(default)]
    description: Option<String>,

    /// Every descriptor key not claimed by the fields above, plus the keys of the flattened kind.
    #[serde(flatten)]
    unclaimed: BTreeMap<String, IgnoredAny>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            validators: Vec::new(),
            description: None,
            unclaimed: BTreeMap::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Scalar(ScalarType::String))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Scalar(ScalarType::Boolean))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Scalar(ScalarType::Integer))
    }

    pub fn object(name: impl Into<String>, attributes: impl IntoIterator<Item = Self>) -> Self {
        Self::new(name, AttributeKind::Object(attributes.into_iter().collect()))
    }

    pub fn list(name: impl Into<String>, element: Self) -> Self {
        Self::new(name, AttributeKind::List(Box::new(element)))
    }

    pub fn map(name: impl Into<String>, value: Self) -> Self {
        Self::new(name, AttributeKind::Map(Box::new(value)))
    }

    /// Marks the attribute as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the declared child attribute `name` if this is an object.
    pub fn attribute(&self, name: &str) -> Option<&Self> {
        match &self.kind {
            AttributeKind::Object(attributes) => {
                attributes.iter().find(|attribute| attribute.name == name)
            }
            _ => None,
        }
    }

    fn verify(&self, path: &str) -> Result<(), SchemaError> {
        let kind_key = match &self.kind {
            AttributeKind::Scalar(_) => None,
            AttributeKind::Object(_) => Some("attributes"),
            AttributeKind::List(_) => Some("element"),
            AttributeKind::Map(_) => Some("value"),
        };
        if let Some(key) = self
            .unclaimed
            .keys()
            .find(|key| key.as_str() != "type" && Some(key.as_str()) != kind_key)
        {
            return UnknownDescriptorKeySnafu {
                path: if path.is_empty() { "<root>" } else { path },
                key,
            }
            .fail();
        }

        for validator in &self.validators {
            ensure!(
                validator.applies_to(&self.kind),
                InapplicableValidatorSnafu {
                    path,
                    validator: validator.name(),
                    kind: self.kind.to_string(),
                }
            );
        }

        match &self.kind {
            AttributeKind::Scalar(_) => Ok(()),
            AttributeKind::Object(attributes) => {
                let mut seen = HashSet::new();
                for attribute in attributes {
                    let child_path = join_path(path, &attribute.name);
                    ensure!(
                        !attribute.name.is_empty(),
                        EmptyAttributeNameSnafu { path: child_path }
                    );
                    ensure!(
                        seen.insert(attribute.name.as_str()),
                        DuplicateAttributeSnafu {
                            path,
                            name: &attribute.name,
                        }
                    );
                    attribute.verify(&child_path)?;
                }
                Ok(())
            }
            AttributeKind::List(element) => element.verify(&format!("{path}[]")),
            AttributeKind::Map(value) => value.verify(&format!("{path}{{}}")),
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}

/// The fixed `apiVersion`/`kind` pair of a resource kind, injected into every projected document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConstants {
    pub api_version: String,
    pub kind: String,
}

impl IdentityConstants {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

impl Display for IdentityConstants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

/// The schema descriptor of one resource kind.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "ResourceSchemaRepr")]
pub struct ResourceSchema {
    type_name: String,
    identity: IdentityConstants,
    root: AttributeSchema,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSchemaRepr {
    type_name: String,
    #[serde(flatten)]
    identity: IdentityConstants,
    #[serde(default)]
    description: Option<String>,
    attributes: Vec<AttributeSchema>,
    #[serde(flatten)]
    unclaimed: BTreeMap<String, IgnoredAny>,
}

impl From<ResourceSchemaRepr> for ResourceSchema {
    fn from(repr: ResourceSchemaRepr) -> Self {
        let mut root = AttributeSchema::object("", repr.attributes);
        root.description = repr.description;
        root.unclaimed = repr.unclaimed;

        Self {
            type_name: repr.type_name,
            identity: repr.identity,
            root,
        }
    }
}

impl ResourceSchema {
    /// Builds and verifies a resource schema from its root attributes.
    pub fn new(
        type_name: impl Into<String>,
        identity: IdentityConstants,
        attributes: impl IntoIterator<Item = AttributeSchema>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            type_name: type_name.into(),
            identity,
            root: AttributeSchema::object("", attributes),
        };
        schema.verify()?;
        Ok(schema)
    }

    /// The name under which the host exposes this resource kind, e.g.
    /// `kubevirt_io_virtual_machine_v1`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the root attribute of the accepted configuration. Always an object.
    pub fn describe(&self) -> &AttributeSchema {
        &self.root
    }

    pub fn identity(&self) -> &IdentityConstants {
        &self.identity
    }

    /// Checks the structural soundness of the descriptor.
    pub fn verify(&self) -> Result<(), SchemaError> {
        let AttributeKind::Object(attributes) = &self.root.kind else {
            return RootNotObjectSnafu {
                type_name: &self.type_name,
            }
            .fail();
        };

        for reserved in [API_VERSION_KEY, KIND_KEY] {
            ensure!(
                attributes.iter().all(|attribute| attribute.name != reserved),
                ReservedIdentityKeySnafu {
                    type_name: &self.type_name,
                    name: reserved,
                }
            );
        }

        self.root.verify("")
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn identity() -> IdentityConstants {
        IdentityConstants::new("infra.example.io/v1alpha1", "ExampleMachineTemplate")
    }

    #[test]
    fn schemas_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResourceSchema>();
        assert_send_sync::<AttributeSchema>();
        assert_send_sync::<Validator>();
    }

    #[test]
    fn deserialize_descriptor() {
        let attribute: AttributeSchema = serde_yaml::from_str(indoc! {"
            name: metadata
            type: object
            required: true
            attributes:
              - name: name
                type: string
                required: true
                validators:
                  - type: identifier
              - name: labels
                type: map
                value:
                  type: string
              - name: ports
                type: list
                element:
                  type: integer
                  validators:
                    - type: atLeast
                      min: 1
        "})
        .unwrap();

        assert_eq!(attribute.name(), "metadata");
        assert!(attribute.is_required());

        let name = attribute.attribute("name").unwrap();
        assert!(matches!(
            name.kind(),
            AttributeKind::Scalar(ScalarType::String)
        ));
        assert!(matches!(name.validators(), [Validator::Identifier]));

        assert!(matches!(
            attribute.attribute("labels").unwrap().kind(),
            AttributeKind::Map(_)
        ));
        let AttributeKind::List(element) = attribute.attribute("ports").unwrap().kind() else {
            panic!("ports must be a list");
        };
        assert!(matches!(element.validators(), [Validator::AtLeast { min: 1 }]));
    }

    #[test]
    fn deserialize_resource_schema() {
        let schema: ResourceSchema = serde_yaml::from_str(indoc! {"
            typeName: infra_example_io_example_machine_template_v1alpha1
            apiVersion: infra.example.io/v1alpha1
            kind: ExampleMachineTemplate
            attributes:
              - name: spec
                type: object
        "})
        .unwrap();

        assert_eq!(schema.identity(), &identity());
        assert!(schema.describe().attribute("spec").is_some());
        assert!(schema.verify().is_ok());
    }

    #[test]
    fn unknown_descriptor_keys_are_rejected() {
        let schema: ResourceSchema = serde_yaml::from_str(indoc! {"
            typeName: typo
            apiVersion: v1
            kind: ConfigMap
            attributes:
              - name: metadata
                type: object
                attributes:
                  - name: name
                    type: string
                    requried: true
        "})
        .unwrap();

        assert_eq!(
            schema.verify().unwrap_err(),
            SchemaError::UnknownDescriptorKey {
                path: "metadata.name".to_owned(),
                key: "requried".to_owned(),
            }
        );

        let schema: ResourceSchema = serde_yaml::from_str(indoc! {"
            typeName: typo
            apiVersion: v1
            kind: ConfigMap
            descripton: Holds configuration data
            attributes: []
        "})
        .unwrap();

        assert_eq!(
            schema.verify().unwrap_err(),
            SchemaError::UnknownDescriptorKey {
                path: "<root>".to_owned(),
                key: "descripton".to_owned(),
            }
        );
    }

    #[test]
    fn kind_keys_belong_to_their_kind() {
        let schema: ResourceSchema = serde_yaml::from_str(indoc! {"
            typeName: misplaced
            apiVersion: v1
            kind: ConfigMap
            attributes:
              - name: data
                type: string
                value:
                  type: string
        "})
        .unwrap();

        assert_eq!(
            schema.verify().unwrap_err(),
            SchemaError::UnknownDescriptorKey {
                path: "data".to_owned(),
                key: "value".to_owned(),
            }
        );
    }

    #[test]
    fn duplicate_attributes_are_rejected() {
        let err = ResourceSchema::new(
            "dup",
            identity(),
            [AttributeSchema::object(
                "spec",
                [AttributeSchema::string("a"), AttributeSchema::integer("a")],
            )],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaError::DuplicateAttribute {
                path: "spec".to_owned(),
                name: "a".to_owned()
            }
        );
    }

    #[test]
    fn identity_keys_are_reserved() {
        let err =
            ResourceSchema::new("reserved", identity(), [AttributeSchema::string("kind")])
                .unwrap_err();

        assert!(matches!(err, SchemaError::ReservedIdentityKey { .. }));
    }

    #[test]
    fn validators_must_match_the_attribute_kind() {
        let err = ResourceSchema::new(
            "mismatch",
            identity(),
            [AttributeSchema::object(
                "spec",
                [AttributeSchema::list(
                    "disks",
                    AttributeSchema::boolean("").with_validator(Validator::Identifier),
                )],
            )],
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaError::InapplicableValidator {
                path: "spec.disks[]".to_owned(),
                validator: "identifier",
                kind: "boolean".to_owned(),
            }
        );
    }
}
