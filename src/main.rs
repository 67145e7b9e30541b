use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ocsf_datacontract::contract::DataContract;
use ocsf_datacontract::error::{Error, Result};
use ocsf_datacontract::iceberg::{self, IcebergOptions};
use ocsf_datacontract::importer::OcsfImporter;

/// Import OCSF classes into data contracts and export contracts as Iceberg DDL.
#[derive(Parser)]
#[command(name = "ocsf-datacontract", version, about)]
struct Cli {
    /// Only log errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the OCSF schema export and cache locally.
    #[cfg(feature = "download")]
    DownloadSchema {
        /// OCSF version to download (e.g., "1.3.0").
        #[arg(long, default_value = "1.3.0")]
        ocsf_version: String,

        /// Output directory for cached schema.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Base URL for the OCSF schema export API.
        #[arg(
            long,
            default_value = "https://schema.ocsf.io/export/schema",
            env = "OCSF_SCHEMA_URL"
        )]
        schema_url: String,
    },

    /// Import OCSF classes into a data contract.
    Import {
        /// Path to the OCSF schema JSON document.
        #[arg(long, env = "OCSF_SCHEMA")]
        schema: PathBuf,

        /// Comma-separated class names, or "all" for every class.
        ///
        /// Example: --classes authentication,network-activity
        #[arg(long, default_value = "all")]
        classes: String,

        /// Existing contract to extend. A new one is created otherwise.
        #[arg(long)]
        contract: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export a data contract as Iceberg CREATE TABLE statements.
    ExportIceberg {
        /// Path to the data contract (YAML or JSON).
        #[arg(long)]
        contract: PathBuf,

        /// Partition expression; repeat for several.
        #[arg(long = "partition")]
        partitions: Vec<String>,

        /// Table location, e.g. s3://bucket/prefix.
        #[arg(long)]
        location: Option<String>,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        #[cfg(feature = "download")]
        Commands::DownloadSchema {
            ocsf_version,
            output_dir,
            schema_url,
        } => {
            let path = output_dir.join(&ocsf_version).join("schema.json");
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| Error::Download(format!("starting runtime: {e}")))?;
            rt.block_on(ocsf_datacontract::schema::download_schema(
                &ocsf_version,
                &path,
                &schema_url,
            ))?;
        }

        Commands::Import {
            schema,
            classes,
            contract,
            format,
            output,
        } => {
            let importer = OcsfImporter::from_path(&schema)?;
            if !quiet {
                eprintln!(
                    "Loaded OCSF {}: {} classes, {} objects",
                    importer.schema().version,
                    importer.schema().classes.len(),
                    importer.schema().objects.len()
                );
            }

            let class_names: Vec<String> = if classes == "all" {
                Vec::new()
            } else {
                classes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            };

            let mut data_contract = match &contract {
                Some(path) => DataContract::load(path)?,
                None => DataContract::new(contract_id(&schema), "OCSF"),
            };
            let report = importer.import(&mut data_contract, Some(class_names.as_slice()))?;

            if !quiet {
                eprintln!(
                    "Imported {} models, {} definitions",
                    report.models_imported, report.definitions_collected
                );
                if report.deprecated_fields_skipped > 0 {
                    eprintln!(
                        "Skipped {} deprecated fields",
                        report.deprecated_fields_skipped
                    );
                }
            }

            let rendered = match format {
                Format::Yaml => data_contract.to_yaml()?,
                Format::Json => data_contract.to_json()?,
            };
            emit(output.as_deref(), &rendered)?;
        }

        Commands::ExportIceberg {
            contract,
            partitions,
            location,
            output,
        } => {
            let data_contract = DataContract::load(&contract)?;
            let options = IcebergOptions {
                partitions,
                location,
            };
            let ddl = iceberg::to_iceberg(&data_contract, &options)?;
            emit(output.as_deref(), &format!("{ddl}\n"))?;
        }
    }

    Ok(())
}

fn contract_id(schema: &Path) -> String {
    let stem = schema
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("schema");
    format!("urn:ocsf:{stem}")
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content).map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        }),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
