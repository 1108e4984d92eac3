use std::fmt::{Display, Formatter, Result};

use manifest_source::schema::{AttributeKind, AttributeSchema, ResourceSchema, Validator};

/// Renders the configurable attributes of a resource kind as an indented tree.
///
/// ```text
/// metadata: object (required)
///   name: string (required) [identifier]
///   labels: map<string> [labels]
/// ```
pub struct SchemaTree<'a>(pub &'a ResourceSchema);

impl Display for SchemaTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let schema = self.0;
        writeln!(f, "{} ({})", schema.identity(), schema.type_name())?;
        if let Some(description) = schema.describe().description() {
            writeln!(f, "{description}")?;
        }
        writeln!(f)?;
        write_children(f, schema.describe().kind(), 0)
    }
}

fn write_children(f: &mut Formatter<'_>, kind: &AttributeKind, depth: usize) -> Result {
    for attribute in children(kind) {
        write_attribute(f, attribute, depth)?;
    }
    Ok(())
}

fn write_attribute(f: &mut Formatter<'_>, attribute: &AttributeSchema, depth: usize) -> Result {
    write!(
        f,
        "{:indent$}{}: {}",
        "",
        attribute.name(),
        kind_label(attribute.kind()),
        indent = depth * 2
    )?;
    if attribute.is_required() {
        f.write_str(" (required)")?;
    }

    let validators = attribute
        .validators()
        .iter()
        .map(Validator::name)
        .collect::<Vec<_>>();
    if !validators.is_empty() {
        write!(f, " [{}]", validators.join(", "))?;
    }
    if let Some(description) = attribute.description() {
        write!(f, " - {description}")?;
    }
    writeln!(f)?;

    write_children(f, attribute.kind(), depth + 1)
}

/// Object attributes below `kind`, looking through lists and maps.
fn children(kind: &AttributeKind) -> &[AttributeSchema] {
    match kind {
        AttributeKind::Object(attributes) => attributes,
        AttributeKind::List(inner) | AttributeKind::Map(inner) => children(inner.kind()),
        AttributeKind::Scalar(_) => &[],
    }
}

fn kind_label(kind: &AttributeKind) -> String {
    match kind {
        AttributeKind::List(element) => format!("list<{}>", kind_label(element.kind())),
        AttributeKind::Map(value) => format!("map<{}>", kind_label(value.kind())),
        AttributeKind::Scalar(_) | AttributeKind::Object(_) => kind.to_string(),
    }
}
