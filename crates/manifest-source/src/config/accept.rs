use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use crate::{
    config::{
        ConfigNode, ConfigValue, FieldPath, PathSegment, ScalarValue, ValidationError,
        ValidationErrorKind, ValidationErrors,
    },
    schema::{
        API_VERSION_KEY, AttributeKind, AttributeSchema, IdentityConstants, KIND_KEY,
        ResourceSchema, ScalarType,
    },
};

/// Location of the node currently being accepted.
///
/// Forms a linked list towards the root, so descending into a child never copies the path. The
/// full [`FieldPath`] is only built once an error is reported.
struct Context<'a> {
    segment: Option<PathSegment>,
    parent: Option<&'a Context<'a>>,
}

impl Context<'_> {
    fn root() -> Context<'static> {
        Context {
            segment: None,
            parent: None,
        }
    }

    fn child(&self, segment: PathSegment) -> Context<'_> {
        Context {
            segment: Some(segment),
            parent: Some(self),
        }
    }

    fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    fn path(&self) -> FieldPath {
        let mut segments = Vec::new();
        let mut current = Some(self);
        while let Some(context) = current {
            if let Some(segment) = &context.segment {
                segments.push(segment.clone());
            }
            current = context.parent;
        }
        segments.into_iter().rev().collect()
    }
}

/// Collects every error of one acceptance pass.
struct Acceptance<'s> {
    /// Set when accepting a whole resource, whose root must not contain the identity keys.
    identity: Option<&'s IdentityConstants>,
    errors: Vec<ValidationError>,
}

/// Matches `raw` input against `schema`, returning the typed configuration tree.
///
/// All problems are collected: a bad element or attribute never stops its siblings from being
/// checked. If any problem was found, no tree is returned.
pub fn accept(raw: &Value, schema: &AttributeSchema) -> Result<ConfigNode, ValidationErrors> {
    let mut acceptance = Acceptance {
        identity: None,
        errors: Vec::new(),
    };
    let context = Context::root();

    let node = acceptance.node(raw, schema, &context);
    if raw.is_null() && schema.is_required() {
        acceptance.missing(&context);
    }

    acceptance.finish(node)
}

impl ResourceSchema {
    /// Accepts a whole resource configuration.
    ///
    /// A `null` document is treated as an empty one. The identity keys (`apiVersion`, `kind`) are
    /// fixed by the resource kind, supplying them is reported as an unknown field.
    pub fn accept(&self, raw: &Value) -> Result<ConfigNode, ValidationErrors> {
        let mut acceptance = Acceptance {
            identity: Some(self.identity()),
            errors: Vec::new(),
        };

        let empty = Value::Mapping(Mapping::new());
        let raw = if raw.is_null() { &empty } else { raw };

        let node = acceptance.node(raw, self.describe(), &Context::root());
        acceptance.finish(node)
    }
}

impl Acceptance<'_> {
    fn finish(self, node: ConfigNode) -> Result<ConfigNode, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(node)
        } else {
            Err(ValidationErrors::new(self.errors))
        }
    }

    fn node(&mut self, raw: &Value, schema: &AttributeSchema, context: &Context<'_>) -> ConfigNode {
        let value = match (schema.kind(), raw) {
            (_, Value::Null) => return ConfigNode::Absent,
            (AttributeKind::Scalar(scalar_type), _) => self
                .scalar(raw, *scalar_type, context)
                .map(ConfigValue::Scalar),
            (AttributeKind::Object(attributes), Value::Mapping(mapping)) => {
                Some(ConfigValue::Object(self.object(mapping, attributes, context)))
            }
            (AttributeKind::List(element), Value::Sequence(items)) => {
                Some(ConfigValue::List(self.list(items, element, context)))
            }
            (AttributeKind::Map(value), Value::Mapping(mapping)) => {
                Some(ConfigValue::Map(self.map(mapping, value, context)))
            }
            (kind, _) => {
                self.type_mismatch(context, format!("expected {kind}, found {}", describe(raw)));
                None
            }
        };

        let Some(value) = value else {
            return ConfigNode::Absent;
        };

        for validator in schema.validators() {
            for violation in validator.check(&value) {
                let path = match violation.key {
                    Some(key) => context.child(PathSegment::Key(key)).path(),
                    None => context.path(),
                };
                self.errors.push(ValidationError::constraint(
                    path,
                    validator.name(),
                    violation.message,
                ));
            }
        }

        ConfigNode::Present(value)
    }

    fn scalar(
        &mut self,
        raw: &Value,
        scalar_type: ScalarType,
        context: &Context<'_>,
    ) -> Option<ScalarValue> {
        match (scalar_type, raw) {
            (ScalarType::String, Value::String(value)) => Some(ScalarValue::String(value.clone())),
            (ScalarType::Boolean, Value::Bool(value)) => Some(ScalarValue::Boolean(*value)),
            (ScalarType::Integer, Value::Number(number)) if number.is_i64() => {
                number.as_i64().map(ScalarValue::Integer)
            }
            (ScalarType::Integer, Value::Number(number)) if number.is_u64() => {
                self.type_mismatch(
                    context,
                    format!("integer {number} does not fit into a 64-bit signed integer"),
                );
                None
            }
            _ => {
                self.type_mismatch(
                    context,
                    format!("expected {scalar_type}, found {}", describe(raw)),
                );
                None
            }
        }
    }

    fn object(
        &mut self,
        mapping: &Mapping,
        attributes: &[AttributeSchema],
        context: &Context<'_>,
    ) -> IndexMap<String, ConfigNode> {
        let mut children = IndexMap::with_capacity(attributes.len());

        for attribute in attributes {
            let child_context = context.child(PathSegment::Field(attribute.name().to_owned()));
            let child = match mapping.get(attribute.name()) {
                Some(raw) if !raw.is_null() => self.node(raw, attribute, &child_context),
                _ => {
                    if attribute.is_required() {
                        self.missing(&child_context);
                    }
                    ConfigNode::Absent
                }
            };
            children.insert(attribute.name().to_owned(), child);
        }

        for key in mapping.keys() {
            let Some(key) = self.string_key(key, context) else {
                continue;
            };
            if children.contains_key(key) {
                continue;
            }

            let child_context = context.child(PathSegment::Field(key.to_owned()));
            let message = match self.identity {
                Some(identity) if context.is_root() && key == API_VERSION_KEY => format!(
                    "{API_VERSION_KEY} is fixed to {:?} and cannot be configured",
                    identity.api_version
                ),
                Some(identity) if context.is_root() && key == KIND_KEY => format!(
                    "{KIND_KEY} is fixed to {:?} and cannot be configured",
                    identity.kind
                ),
                _ => format!("unknown field {key:?}"),
            };
            self.errors.push(ValidationError::new(
                child_context.path(),
                ValidationErrorKind::UnknownField,
                message,
            ));
        }

        children
    }

    fn list(
        &mut self,
        items: &[Value],
        element: &AttributeSchema,
        context: &Context<'_>,
    ) -> Vec<ConfigNode> {
        items
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let element_context = context.child(PathSegment::Index(index));
                if raw.is_null() && element.is_required() {
                    self.missing(&element_context);
                }
                self.node(raw, element, &element_context)
            })
            .collect()
    }

    fn map(
        &mut self,
        mapping: &Mapping,
        value: &AttributeSchema,
        context: &Context<'_>,
    ) -> IndexMap<String, ConfigNode> {
        let mut entries = IndexMap::with_capacity(mapping.len());

        for (key, raw) in mapping {
            let Some(key) = self.string_key(key, context) else {
                continue;
            };

            let entry_context = context.child(PathSegment::Key(key.to_owned()));
            if raw.is_null() && value.is_required() {
                self.missing(&entry_context);
            }
            let node = self.node(raw, value, &entry_context);
            entries.insert(key.to_owned(), node);
        }

        entries
    }

    fn string_key<'v>(&mut self, key: &'v Value, context: &Context<'_>) -> Option<&'v str> {
        match key {
            Value::String(key) => Some(key),
            _ => {
                self.type_mismatch(
                    context,
                    format!("keys must be strings, found {}", describe(key)),
                );
                None
            }
        }
    }

    fn missing(&mut self, context: &Context<'_>) {
        self.errors.push(ValidationError::new(
            context.path(),
            ValidationErrorKind::MissingRequired,
            "field is required".to_owned(),
        ));
    }

    fn type_mismatch(&mut self, context: &Context<'_>, message: String) {
        self.errors.push(ValidationError::new(
            context.path(),
            ValidationErrorKind::TypeMismatch,
            message,
        ));
    }
}

/// Names the YAML type of `value` for error messages.
fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}
