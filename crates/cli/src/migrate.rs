//! CLI migrate subcommand.
//!
//! Loads options, runs the file-level migration pipeline and maps a
//! failed stage onto the process exit code:
//!
//! | code | meaning                         |
//! |------|---------------------------------|
//! | 0    | success                         |
//! | -1   | configuration could not be used |
//! | -2   | template could not be read      |
//! | -3   | output could not be written     |
//! | -4   | log could not be written        |
//!
//! Individual attributes that fail to migrate do not change the code.

use std::path::PathBuf;
use std::process;

use attrmig_migrate::{
    run_migration, MigrationJob, MigrationOptions, MigrationReport, EXIT_CONFIG,
};
use serde::Serialize;

use crate::{report_error, OutputFormat};

pub(crate) struct MigrateArgs {
    pub attribute_file: PathBuf,
    pub template_file: PathBuf,
    pub output_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// JSON rendering of a finished run.
#[derive(Serialize)]
struct MigrateOutput<'a> {
    output_file: &'a PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<&'a PathBuf>,
    summary: String,
    #[serde(flatten)]
    report: &'a MigrationReport,
}

pub(crate) fn cmd_migrate(args: MigrateArgs, output: OutputFormat, quiet: bool) {
    let options = match &args.config {
        Some(path) => match MigrationOptions::load(path) {
            Ok(o) => o,
            Err(e) => {
                report_error(&e.to_string(), output, quiet);
                process::exit(EXIT_CONFIG);
            }
        },
        None => MigrationOptions::default(),
    };
    tracing::debug!(?options, "migration options");

    let job = MigrationJob {
        attribute_file: args.attribute_file,
        template_file: args.template_file,
        output_file: args.output_file,
        log_file: args.log_file,
        options,
    };
    let report = match run_migration(&job) {
        Ok(r) => r,
        Err(e) => {
            tracing::info!(stage = %e.stage(), code = e.exit_code(), "migration failed");
            report_error(&e.to_string(), output, quiet);
            process::exit(e.exit_code());
        }
    };

    match output {
        OutputFormat::Json => {
            let rendered = MigrateOutput {
                output_file: &job.output_file,
                log_file: job.log_file.as_ref(),
                summary: report.summary(),
                report: &report,
            };
            let json = serde_json::to_string_pretty(&rendered)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            if job.log_file.is_none() {
                print!("{}", report.to_text());
            } else {
                println!("{}", report.summary());
            }
        }
    }
}
