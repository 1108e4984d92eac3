//! Collections of [`ResourceSchema`]s, looked up by type name.
//!
//! A catalog is loaded from descriptor tables: YAML sequences of resource schemas, see
//! [`crate::schema`] for the attribute shape.
//!
//! ```yaml
//! - typeName: config_map_v1
//!   apiVersion: v1
//!   kind: ConfigMap
//!   attributes:
//!     - name: data
//!       type: map
//!       value:
//!         type: string
//! ```
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use indexmap::{IndexMap, map::Entry};
use snafu::{ResultExt, Snafu};

use crate::schema::{ResourceSchema, SchemaError};

/// Descriptor tables compiled into the crate.
const BUILTIN_TABLES: &[(&str, &str)] = &[
    (
        "example_machine_template.yaml",
        include_str!("../schemas/example_machine_template.yaml"),
    ),
    (
        "virtual_machine.yaml",
        include_str!("../schemas/virtual_machine.yaml"),
    ),
    ("config_map.yaml", include_str!("../schemas/config_map.yaml")),
];

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| {
    let mut catalog = Catalog::default();
    for (table, content) in BUILTIN_TABLES {
        catalog
            .load_table(content)
            .with_context(|_| BuiltinSnafu { table: *table })
            .expect("failed to load builtin descriptor tables");
    }
    catalog
});

type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum CatalogError {
    #[snafu(display("failed to read descriptor table from {path:?}"))]
    ReadTable {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse descriptor table"))]
    ParseTable { source: serde_yaml::Error },

    #[snafu(display("descriptor table from {path:?} is invalid"))]
    InvalidTable {
        #[snafu(source(from(CatalogError, Box::new)))]
        source: Box<CatalogError>,
        path: PathBuf,
    },

    #[snafu(display("builtin descriptor table {table:?} is invalid"))]
    Builtin {
        #[snafu(source(from(CatalogError, Box::new)))]
        source: Box<CatalogError>,
        table: &'static str,
    },

    #[snafu(display("resource schema {type_name:?} is invalid"))]
    InvalidSchema {
        source: SchemaError,
        type_name: String,
    },

    #[snafu(display("type name {type_name:?} is declared more than once"))]
    DuplicateTypeName { type_name: String },
}

/// Verified resource schemas keyed by their type name, in load order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    schemas: IndexMap<String, ResourceSchema>,
}

impl Catalog {
    /// The resource kinds shipped with this crate. Loaded once per process.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Loads a catalog from the contents of a descriptor table.
    pub fn from_yaml_str(table: &str) -> Result<Self> {
        let mut catalog = Self::default();
        catalog.load_table(table)?;
        Ok(catalog)
    }

    /// Loads a catalog from a descriptor table file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = std::fs::read_to_string(path).context(ReadTableSnafu { path })?;

        Self::from_yaml_str(&table).context(InvalidTableSnafu { path })
    }

    /// Adds a schema, verifying it first. Type names must be unique within a catalog.
    pub fn insert(&mut self, schema: ResourceSchema) -> Result<()> {
        schema.verify().with_context(|_| InvalidSchemaSnafu {
            type_name: schema.type_name(),
        })?;

        match self.schemas.entry(schema.type_name().to_owned()) {
            Entry::Occupied(entry) => DuplicateTypeNameSnafu {
                type_name: entry.key(),
            }
            .fail(),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    type_name = entry.key(),
                    identity = %schema.identity(),
                    "registered resource schema"
                );
                entry.insert(schema);
                Ok(())
            }
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    /// Iterates over all schemas in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn load_table(&mut self, table: &str) -> Result<()> {
        let schemas: Vec<ResourceSchema> = serde_yaml::from_str(table).context(ParseTableSnafu)?;
        for schema in schemas {
            self.insert(schema)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type IntoIter = indexmap::map::Values<'a, String, ResourceSchema>;
    type Item = &'a ResourceSchema;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.values()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::schema::{AttributeKind, IdentityConstants};

    const TABLE: &str = indoc! {"
        - typeName: config_map_v1
          apiVersion: v1
          kind: ConfigMap
          attributes:
            - name: data
              type: map
              value:
                type: string
        - typeName: secret_v1
          apiVersion: v1
          kind: Secret
          attributes:
            - name: stringData
              type: map
              value:
                type: string
    "};

    #[test]
    fn catalog_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin();
        let type_names = catalog.iter().map(ResourceSchema::type_name).collect::<Vec<_>>();
        assert_eq!(
            type_names,
            [
                "infra_example_io_example_machine_template_v1alpha1",
                "kubevirt_io_virtual_machine_v1",
                "config_map_v1",
            ]
        );
    }

    #[rstest]
    #[case(
        "infra_example_io_example_machine_template_v1alpha1",
        "infra.example.io/v1alpha1",
        "ExampleMachineTemplate"
    )]
    #[case("kubevirt_io_virtual_machine_v1", "kubevirt.io/v1", "VirtualMachine")]
    #[case("config_map_v1", "v1", "ConfigMap")]
    fn builtin_identities(#[case] type_name: &str, #[case] api_version: &str, #[case] kind: &str) {
        let schema = Catalog::builtin().get(type_name).unwrap();
        assert_eq!(
            schema.identity(),
            &IdentityConstants::new(api_version, kind)
        );
        assert!(matches!(
            schema.describe().attribute("metadata").unwrap().kind(),
            AttributeKind::Object(_)
        ));
    }

    #[test]
    fn load_from_str() {
        let catalog = Catalog::from_yaml_str(TABLE).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("secret_v1").unwrap().identity().kind,
            "Secret"
        );
        assert!(catalog.get("pod_v1").is_none());
    }

    #[test]
    fn load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();

        let catalog = Catalog::from_path(file.path()).unwrap();
        assert_eq!((&catalog).into_iter().count(), 2);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::from_path(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::ReadTable { .. }));
    }

    #[test]
    fn duplicate_type_names_are_rejected() {
        let table = format!("{TABLE}{}", indoc! {"
            - typeName: config_map_v1
              apiVersion: v1
              kind: ConfigMap
              attributes: []
        "});

        let err = Catalog::from_yaml_str(&table).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicateTypeName { type_name } if type_name == "config_map_v1"
        ));
    }

    #[test]
    fn unverifiable_schemas_are_rejected() {
        let err = Catalog::from_yaml_str(indoc! {"
            - typeName: broken_v1
              apiVersion: v1
              kind: Broken
              attributes:
                - name: replicas
                  type: integer
                  validators:
                    - type: identifier
        "})
        .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidSchema {
                source: SchemaError::InapplicableValidator { .. },
                ..
            }
        ));
    }

    #[rstest]
    #[case::not_a_sequence("typeName: x")]
    #[case::unknown_type("- {typeName: x, apiVersion: v1, kind: X, attributes: [{name: a, type: float}]}")]
    #[case::unknown_validator(
        "- {typeName: x, apiVersion: v1, kind: X, attributes: [{name: a, type: string, validators: [{type: email}]}]}"
    )]
    #[case::bad_pattern(
        "- {typeName: x, apiVersion: v1, kind: X, attributes: [{name: a, type: string, validators: [{type: pattern, pattern: '('}]}]}"
    )]
    fn malformed_tables(#[case] table: &str) {
        let err = Catalog::from_yaml_str(table).unwrap_err();
        assert!(matches!(err, CatalogError::ParseTable { .. }));
    }
}
