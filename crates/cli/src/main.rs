mod migrate;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use attrmig_migrate::summarize_definitions;
use attrmig_model::read_resource;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Attribute migration between simulation schemas.
#[derive(Parser)]
#[command(
    name = "attrmig",
    version,
    about = "Attribute migration between simulation schemas"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy attributes from an attribute file into a template's schema
    Migrate {
        /// Resource holding the attributes to migrate
        attribute_file: PathBuf,
        /// Resource holding the destination schema
        template_file: PathBuf,
        /// Where to write the migrated resource
        output_file: PathBuf,
        /// Where to write the migration log (printed when omitted)
        log_file: Option<PathBuf>,
        /// TOML file with a [migration] section
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the definitions of a resource
    Definitions {
        /// Resource file to inspect
        file: PathBuf,
        /// Only list this type and the types deriving from it
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Validate a resource file against the attribute resource JSON Schema
    Validate {
        /// Resource file to validate
        file: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            attribute_file,
            template_file,
            output_file,
            log_file,
            config,
        } => {
            migrate::cmd_migrate(
                migrate::MigrateArgs {
                    attribute_file,
                    template_file,
                    output_file,
                    log_file,
                    config,
                },
                cli.output,
                cli.quiet,
            );
        }
        Commands::Definitions { file, type_name } => {
            cmd_definitions(&file, type_name.as_deref(), cli.output, cli.quiet);
        }
        Commands::Validate { file } => {
            cmd_validate(&file, cli.output, cli.quiet);
        }
    }
}

/// Diagnostics go to stderr. `RUST_LOG` replaces the default of warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

// ── Definitions ─────────────────────────────────────────────────────

fn cmd_definitions(path: &Path, type_name: Option<&str>, output: OutputFormat, quiet: bool) {
    let loaded = match read_resource(path) {
        Ok(l) => l,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    if let Some(t) = type_name {
        if loaded.manager.find_definition(t).is_none() {
            report_error(&format!("unknown type '{}'", t), output, quiet);
            process::exit(1);
        }
    }

    let summaries = summarize_definitions(&loaded.manager, type_name);
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summaries)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                for summary in &summaries {
                    print!("{}", summary.to_text());
                }
            }
        }
    }
}

// ── Validate ────────────────────────────────────────────────────────

static RESOURCE_SCHEMA_STR: &str = include_str!("../../../docs/attribute-resource-schema.json");

fn cmd_validate(path: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(RESOURCE_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc_str = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let doc: serde_json::Value = match serde_json::from_str(&doc_str) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();
    // Structure is fine; make sure the definitions also resolve.
    if errors.is_empty() {
        if let Err(e) = attrmig_model::resource::from_json(&doc) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid: {} error(s)", errors.len());
                for e in &errors {
                    eprintln!("  {}", e);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({ "valid": false, "errors": errors });
            println!(
                "{}",
                serde_json::to_string_pretty(&json)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e))
            );
        }
    }
    process::exit(1);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
