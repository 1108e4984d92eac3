use std::fmt::{Display, Write};

use serde::Serialize;

/// One step from a parent node to a child node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// An object attribute.
    Field(String),
    /// A list element.
    Index(usize),
    /// A map entry.
    Key(String),
}

/// The location of a node, as a sequence of steps from the root.
///
/// Rendered like `spec.template.spec.domain.devices.disks[1].name` or
/// `metadata.labels["app.kubernetes.io/name"]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

}

impl FromIterator<PathSegment> for FieldPath {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The category of a [`ValidationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
pub enum ValidationErrorKind {
    /// The input contains a key the schema does not declare.
    UnknownField,

    /// A required attribute is absent.
    MissingRequired,

    /// The input value does not have the declared shape or scalar type.
    TypeMismatch,

    /// A present value violates a validator attached to its attribute.
    ConstraintViolation,
}

/// A problem with one node of the user supplied configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    path: FieldPath,
    kind: ValidationErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    constraint: Option<&'static str>,
    message: String,
}

impl ValidationError {
    pub(crate) fn new(path: FieldPath, kind: ValidationErrorKind, message: String) -> Self {
        Self {
            path,
            kind,
            constraint: None,
            message,
        }
    }

    pub(crate) fn constraint(path: FieldPath, constraint: &'static str, message: String) -> Self {
        Self {
            path,
            kind: ValidationErrorKind::ConstraintViolation,
            constraint: Some(constraint),
            message,
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    /// The name of the violated validator, e.g. `identifier`, for
    /// [`ValidationErrorKind::ConstraintViolation`]s.
    pub fn violated_constraint(&self) -> Option<&'static str> {
        self.constraint
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            path,
            kind,
            constraint,
            message,
        } = self;
        match constraint {
            Some(constraint) => write!(f, "{path}: {kind} ({constraint}): {message}"),
            None => write!(f, "{path}: {kind}: {message}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Every error discovered while accepting a configuration, in discovery order.
///
/// Never empty when returned from [`accept`](super::accept).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether any error of `kind` was reported at `path`, given in its rendered form
    /// like `metadata.labels["app"]`.
    ///
    /// Lets hosts react to specific problems, e.g. prompting for a missing required field,
    /// without matching on the rendered messages.
    pub fn contains(&self, kind: ValidationErrorKind, path: &str) -> bool {
        self.0
            .iter()
            .any(|error| error.kind == kind && error.path.to_string() == path)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => "; ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type IntoIter = std::vec::IntoIter<ValidationError>;
    type Item = ValidationError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type IntoIter = std::slice::Iter<'a, ValidationError>;
    type Item = &'a ValidationError;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
