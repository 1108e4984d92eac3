//! Single pass from raw user input to the canonical YAML manifest of one resource.
//!
//! Stages run strictly in order: accept (with inline validation), project, serialize. A failing
//! stage aborts the pass, there is never a partial manifest.
use serde_yaml::Value;
use snafu::{ResultExt, Snafu};
use tracing::{Level, instrument};

use crate::{
    config::ValidationErrors,
    projection::{self, SerializeError},
    schema::ResourceSchema,
    shared::yaml::SerializeOptions,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid configuration for {type_name:?}: {errors}"))]
    InvalidConfiguration {
        errors: ValidationErrors,
        type_name: String,
    },

    #[snafu(display("failed to render manifest"))]
    Serialize { source: SerializeError },
}

impl Error {
    /// Returns whether the error is a fault of the engine rather than of the supplied
    /// configuration. Retrying with the same input cannot succeed either way.
    pub fn is_internal(&self) -> bool {
        match self {
            Self::InvalidConfiguration { .. } => false,
            Self::Serialize { .. } => true,
        }
    }

    /// The diagnostics of an invalid configuration.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::InvalidConfiguration { errors, .. } => Some(errors),
            Self::Serialize { .. } => None,
        }
    }
}

/// Renders `raw` as the manifest of the resource kind described by `schema`.
pub fn render(schema: &ResourceSchema, raw: &Value) -> Result<String, Error> {
    render_with_options(schema, raw, SerializeOptions::default())
}

/// Like [`render`], with explicit serialization options.
#[instrument(
    level = Level::DEBUG,
    skip(schema, raw),
    fields(type_name = schema.type_name())
)]
pub fn render_with_options(
    schema: &ResourceSchema,
    raw: &Value,
    options: SerializeOptions,
) -> Result<String, Error> {
    let node = schema.accept(raw).map_err(|errors| {
        tracing::debug!(error.count = errors.len(), "configuration was rejected");
        InvalidConfigurationSnafu {
            errors,
            type_name: schema.type_name(),
        }
        .build()
    })?;
    tracing::debug!("configuration accepted");

    let document = projection::project(&node, schema.identity());
    tracing::debug!(
        keys = document.content().len(),
        "configuration projected"
    );

    document.to_yaml(options).context(SerializeSnafu)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{
        config::ValidationErrorKind,
        schema::{AttributeSchema, IdentityConstants, Validator},
    };

    fn schema() -> ResourceSchema {
        ResourceSchema::new(
            "config_map_v1",
            IdentityConstants::new("v1", "ConfigMap"),
            [
                AttributeSchema::object(
                    "metadata",
                    [AttributeSchema::string("name")
                        .required()
                        .with_validator(Validator::Identifier)],
                )
                .required(),
                AttributeSchema::map("data", AttributeSchema::string("")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renders_valid_configuration() {
        let raw = serde_yaml::from_str("{metadata: {name: cm}, data: {b: '2', a: x}}").unwrap();
        assert_eq!(
            render(&schema(), &raw).unwrap(),
            indoc! {"
                apiVersion: v1
                kind: ConfigMap
                metadata:
                  name: cm
                data:
                  b: '2'
                  a: x
            "}
        );
    }

    #[test]
    fn explicit_document_marker() {
        let raw = serde_yaml::from_str("{metadata: {name: cm}}").unwrap();
        let yaml = render_with_options(&schema(), &raw, SerializeOptions::explicit_document())
            .unwrap();
        assert_eq!(yaml, "---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n");
    }

    #[test]
    fn invalid_configuration_is_not_internal() {
        let raw = serde_yaml::from_str("{metadata: {name: CM}, extra: 1}").unwrap();
        let err = render(&schema(), &raw).unwrap_err();

        assert!(!err.is_internal());
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(ValidationErrorKind::ConstraintViolation, "metadata.name"));
        assert!(errors.contains(ValidationErrorKind::UnknownField, "extra"));
    }
}
