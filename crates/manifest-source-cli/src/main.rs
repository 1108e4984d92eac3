use std::{
    io::{Read, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use manifest_source::{
    catalog::{Catalog, CatalogError},
    config::ValidationErrors,
    pipeline,
    schema::ResourceSchema,
    shared::yaml::SerializeOptions,
};
use snafu::{OptionExt, ResultExt, Snafu};

use crate::describe::SchemaTree;

mod describe;
mod logging;

const APP_NAME: &str = "manifest-source";
const LOG_ENV: &str = "MANIFEST_SOURCE_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitLogging { source: logging::Error },

    #[snafu(display("failed to load descriptor table"))]
    LoadCatalog { source: CatalogError },

    #[snafu(display("unknown resource type {type_name:?}, run `{APP_NAME} list` to see all types"))]
    UnknownType { type_name: String },

    #[snafu(display("failed to read input from {input}"))]
    ReadInput {
        source: std::io::Error,
        input: String,
    },

    #[snafu(display("failed to parse input from {input} as YAML or JSON"))]
    ParseInput {
        source: serde_yaml::Error,
        input: String,
    },

    #[snafu(display("configuration for {type_name:?} is invalid ({count} errors)"))]
    InvalidConfiguration { type_name: String, count: usize },

    #[snafu(display("failed to render manifest for {type_name:?}"))]
    Render {
        source: pipeline::Error,
        type_name: String,
    },

    #[snafu(display("failed to serialize diagnostics as JSON"))]
    SerializeDiagnostics { source: serde_json::Error },

    #[snafu(display("failed to write to stdout"))]
    WriteStdout { source: std::io::Error },
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about)]
struct Cli {
    /// Loads resource schemas from this descriptor table instead of the builtin ones
    #[arg(long, global = true, value_name = "FILE", env = "MANIFEST_SOURCE_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists all known resource types.
    List,

    /// Prints the configurable attributes of a resource type.
    Describe {
        /// The type name, e.g. `kubevirt_io_virtual_machine_v1`
        type_name: String,
    },

    /// Renders the manifest of a resource from a (partial) YAML or JSON configuration.
    Render(RenderArguments),
}

#[derive(Debug, clap::Args)]
struct RenderArguments {
    /// The type name, e.g. `kubevirt_io_virtual_machine_v1`
    type_name: String,

    /// Reads the configuration from this file instead of stdin
    #[arg(long, short = 'i', value_name = "FILE")]
    input: Option<PathBuf>,

    /// Prefixes the manifest with a `---` document marker
    #[arg(long)]
    explicit_document: bool,

    /// How validation errors are printed
    #[arg(long, value_enum, default_value_t)]
    diagnostics_format: DiagnosticsFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum DiagnosticsFormat {
    /// One line per error on stderr
    #[default]
    Text,

    /// A JSON array on stdout
    Json,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitLoggingSnafu)?;

    let loaded;
    let catalog = match &cli.catalog {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading descriptor table");
            loaded = Catalog::from_path(path).context(LoadCatalogSnafu)?;
            &loaded
        }
        None => Catalog::builtin(),
    };

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::List => {
            for schema in catalog {
                writeln!(stdout, "{}\t{}", schema.type_name(), schema.identity())
                    .context(WriteStdoutSnafu)?;
            }
            Ok(())
        }
        Command::Describe { type_name } => {
            let schema = lookup(catalog, &type_name)?;
            write!(stdout, "{}", SchemaTree(schema)).context(WriteStdoutSnafu)
        }
        Command::Render(arguments) => {
            let schema = lookup(catalog, &arguments.type_name)?;
            let raw = read_input(arguments.input.as_deref())?;
            let manifest = render(schema, &raw, &arguments, &mut stdout)?;
            stdout
                .write_all(manifest.as_bytes())
                .context(WriteStdoutSnafu)
        }
    }
}

fn lookup<'a>(catalog: &'a Catalog, type_name: &str) -> Result<&'a ResourceSchema, Error> {
    catalog
        .get(type_name)
        .context(UnknownTypeSnafu { type_name })
}

fn read_input(path: Option<&Path>) -> Result<serde_yaml::Value, Error> {
    let (input, content) = match path {
        Some(path) => {
            let input = path.display().to_string();
            let content = std::fs::read_to_string(path).context(ReadInputSnafu { input: &input })?;
            (input, content)
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context(ReadInputSnafu { input: "stdin" })?;
            ("stdin".to_owned(), content)
        }
    };

    parse_input(&content).context(ParseInputSnafu { input })
}

/// Parses a configuration. JSON documents are valid YAML, an empty input is an empty
/// configuration.
fn parse_input(content: &str) -> Result<serde_yaml::Value, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Null);
    }
    serde_yaml::from_str(content)
}

fn render(
    schema: &ResourceSchema,
    raw: &serde_yaml::Value,
    arguments: &RenderArguments,
    stdout: &mut impl Write,
) -> Result<String, Error> {
    let options = SerializeOptions {
        explicit_document: arguments.explicit_document,
    };

    match pipeline::render_with_options(schema, raw, options) {
        Ok(manifest) => Ok(manifest),
        Err(pipeline::Error::InvalidConfiguration { errors, type_name }) => {
            report_diagnostics(&errors, arguments.diagnostics_format, stdout)?;
            InvalidConfigurationSnafu {
                type_name,
                count: errors.len(),
            }
            .fail()
        }
        Err(source) => Err(source).context(RenderSnafu {
            type_name: schema.type_name(),
        }),
    }
}

fn report_diagnostics(
    errors: &ValidationErrors,
    format: DiagnosticsFormat,
    stdout: &mut impl Write,
) -> Result<(), Error> {
    match format {
        DiagnosticsFormat::Text => {
            for error in errors {
                tracing::debug!(%error, "rejected configuration");
                eprintln!("{error}");
            }
            Ok(())
        }
        DiagnosticsFormat::Json => {
            serde_json::to_writer_pretty(&mut *stdout, errors).context(SerializeDiagnosticsSnafu)?;
            writeln!(stdout).context(WriteStdoutSnafu)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use indoc::indoc;
    use manifest_source::schema::{AttributeSchema, IdentityConstants, Validator};
    use rstest::rstest;

    use super::*;

    fn schema() -> ResourceSchema {
        ResourceSchema::new(
            "config_map_v1",
            IdentityConstants::new("v1", "ConfigMap"),
            [AttributeSchema::object(
                "metadata",
                [AttributeSchema::string("name")
                    .required()
                    .with_validator(Validator::Identifier)],
            )
            .required()],
        )
        .unwrap()
    }

    fn arguments(args: &[&str]) -> RenderArguments {
        let cli = Cli::try_parse_from([APP_NAME, "render", "config_map_v1"].iter().chain(args))
            .unwrap();
        match cli.command {
            Command::Render(arguments) => arguments,
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case::empty("", serde_yaml::Value::Null)]
    #[case::whitespace("\n  \n", serde_yaml::Value::Null)]
    #[case::json(r#"{"metadata": {"name": "cm"}}"#, serde_yaml::from_str("metadata: {name: cm}").unwrap())]
    fn parses_input(#[case] content: &str, #[case] expected: serde_yaml::Value) {
        assert_eq!(parse_input(content).unwrap(), expected);
    }

    #[test]
    fn reads_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.yaml");
        std::fs::write(&path, "metadata:\n  name: cm\n").unwrap();

        let raw = read_input(Some(&path)).unwrap();
        assert_eq!(raw["metadata"]["name"].as_str(), Some("cm"));

        let err = read_input(Some(&dir.path().join("missing.yaml"))).unwrap_err();
        assert!(matches!(err, Error::ReadInput { .. }));
    }

    #[test]
    fn renders_manifest() {
        let raw = parse_input("metadata: {name: cm}").unwrap();
        let mut stdout = Vec::new();

        let manifest = render(&schema(), &raw, &arguments(&["--explicit-document"]), &mut stdout)
            .unwrap();
        assert_eq!(manifest, "---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n");
        assert!(stdout.is_empty());
    }

    #[test]
    fn reports_json_diagnostics() {
        let raw = parse_input("metadata: {name: CM}\ndata: {}").unwrap();
        let mut stdout = Vec::new();

        let err = render(
            &schema(),
            &raw,
            &arguments(&["--diagnostics-format", "json"]),
            &mut stdout,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { count: 2, .. }));

        let diagnostics: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
        assert_eq!(diagnostics[0]["path"], "metadata.name");
        assert_eq!(diagnostics[0]["kind"], "ConstraintViolation");
        assert_eq!(diagnostics[0]["constraint"], "identifier");
        assert_eq!(
            diagnostics[1],
            serde_json::json!({
                "path": "data",
                "kind": "UnknownField",
                "message": "unknown field \"data\"",
            })
        );
    }

    #[test]
    fn lists_builtin_types() {
        let type_names = Catalog::builtin()
            .iter()
            .map(|schema| format!("{}\t{}", schema.type_name(), schema.identity()))
            .collect::<Vec<_>>()
            .join("\n");

        assert_eq!(
            type_names,
            indoc! {"
                infra_example_io_example_machine_template_v1alpha1\tinfra.example.io/v1alpha1/ExampleMachineTemplate
                kubevirt_io_virtual_machine_v1\tkubevirt.io/v1/VirtualMachine
                config_map_v1\tv1/ConfigMap"}
        );
    }
}
