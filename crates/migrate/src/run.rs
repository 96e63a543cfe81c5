//! File-level migration pipeline.
//!
//! Reads the source attribute file and the destination template, runs the
//! orchestrator, and writes the output resource and (optionally) the
//! log. Failures are tagged with the stage they happened in; each stage
//! maps to a fixed process exit code.

use std::fmt;
use std::path::PathBuf;

use attrmig_model::{read_resource, write_resource, Manager, ResourceError};
use serde::Serialize;

use crate::config::MigrationOptions;
use crate::log::MigrationLog;
use crate::orchestrator::{migrate, MigrationReport};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG: i32 = -1;
pub const EXIT_TEMPLATE_READ: i32 = -2;
pub const EXIT_OUTPUT_WRITE: i32 = -3;
pub const EXIT_LOG_WRITE: i32 = -4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    LoadSource,
    LoadDestinationSchema,
    GroupByType,
    OrderTypes,
    CopyLoop,
    WriteOutput,
    WriteLog,
    Done,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationStage::LoadSource => "load source",
            MigrationStage::LoadDestinationSchema => "load destination schema",
            MigrationStage::GroupByType => "group by type",
            MigrationStage::OrderTypes => "order types",
            MigrationStage::CopyLoop => "copy",
            MigrationStage::WriteOutput => "write output",
            MigrationStage::WriteLog => "write log",
            MigrationStage::Done => "done",
        })
    }
}

/// A failure that ends the run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not load template: {0}")]
    Template(#[source] ResourceError),

    #[error("could not write output: {0}")]
    Output(#[source] ResourceError),

    #[error("could not write log '{}': {}", .path.display(), .source)]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn stage(&self) -> MigrationStage {
        match self {
            RunError::Template(_) => MigrationStage::LoadDestinationSchema,
            RunError::Output(_) => MigrationStage::WriteOutput,
            RunError::Log { .. } => MigrationStage::WriteLog,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Template(_) => EXIT_TEMPLATE_READ,
            RunError::Output(_) => EXIT_OUTPUT_WRITE,
            RunError::Log { .. } => EXIT_LOG_WRITE,
        }
    }
}

/// Inputs of one file-level migration.
#[derive(Debug, Clone)]
pub struct MigrationJob {
    pub attribute_file: PathBuf,
    pub template_file: PathBuf,
    pub output_file: PathBuf,
    pub log_file: Option<PathBuf>,
    pub options: MigrationOptions,
}

/// Run `job` end to end.
///
/// An unreadable attribute file is logged as a warning and treated as
/// empty; the template is still copied to the output.
pub fn run_migration(job: &MigrationJob) -> Result<MigrationReport, RunError> {
    let mut log = MigrationLog::new();

    tracing::info!(stage = %MigrationStage::LoadSource, path = %job.attribute_file.display());
    let source = match read_resource(&job.attribute_file) {
        Ok(loaded) => {
            for problem in loaded.diagnostics {
                log.warning(format!("attribute file: {}", problem));
            }
            loaded.manager
        }
        Err(e) => {
            log.warning(format!(
                "no attributes loaded, continuing with an empty source: {}",
                e
            ));
            Manager::new()
        }
    };

    tracing::info!(
        stage = %MigrationStage::LoadDestinationSchema,
        path = %job.template_file.display()
    );
    let template = read_resource(&job.template_file).map_err(RunError::Template)?;
    for problem in template.diagnostics {
        log.warning(format!("template file: {}", problem));
    }
    let mut dest = template.manager;

    let mut report = migrate(&source, &mut dest, &job.options);
    log.extend(std::mem::take(&mut report.log));
    report.log = log;

    tracing::info!(stage = %MigrationStage::WriteOutput, path = %job.output_file.display());
    write_resource(&dest, &job.output_file).map_err(RunError::Output)?;

    if let Some(path) = &job.log_file {
        tracing::info!(stage = %MigrationStage::WriteLog, path = %path.display());
        std::fs::write(path, report.to_text()).map_err(|source| RunError::Log {
            path: path.clone(),
            source,
        })?;
    }

    tracing::info!(
        stage = %MigrationStage::Done,
        migrated = report.migrated,
        total = report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn template() -> serde_json::Value {
        json!({
            "kind": "AttributeResource",
            "version": 1,
            "definitions": [
                { "type": "Material",
                  "items": [ { "name": "Viscosity", "kind": "double" } ] }
            ]
        })
    }

    fn source() -> serde_json::Value {
        let mut doc = template();
        doc["attributes"] = json!([
            { "name": "att1", "type": "Material", "id": 5,
              "items": [ { "name": "Viscosity", "values": [0.001002] } ] }
        ]);
        doc
    }

    fn job(dir: &TempDir) -> MigrationJob {
        let attribute_file = dir.path().join("source.json");
        let template_file = dir.path().join("template.json");
        std::fs::write(&attribute_file, source().to_string()).unwrap();
        std::fs::write(&template_file, template().to_string()).unwrap();
        MigrationJob {
            attribute_file,
            template_file,
            output_file: dir.path().join("out.json"),
            log_file: Some(dir.path().join("migration.log")),
            options: MigrationOptions::default(),
        }
    }

    #[test]
    fn writes_output_and_log() {
        let dir = TempDir::new().unwrap();
        let job = job(&dir);
        let report = run_migration(&job).unwrap();
        assert_eq!(report.migrated, 1);

        let out = read_resource(&job.output_file).unwrap();
        assert!(out.manager.find_attribute("att1").is_some());
        let log = std::fs::read_to_string(dir.path().join("migration.log")).unwrap();
        assert!(log.ends_with("INFO: Migrated 1 of 1 attributes\n"));
    }

    #[test]
    fn missing_source_is_only_a_warning() {
        let dir = TempDir::new().unwrap();
        let mut job = job(&dir);
        job.attribute_file = dir.path().join("absent.json");
        let report = run_migration(&job).unwrap();
        assert_eq!(report.total, 0);
        assert!(report.log.records()[0].message.contains("empty source"));
        assert!(job.output_file.exists());
    }

    #[test]
    fn each_failing_stage_has_its_exit_code() {
        let dir = TempDir::new().unwrap();

        let mut bad_template = job(&dir);
        bad_template.template_file = dir.path().join("absent.json");
        let err = run_migration(&bad_template).unwrap_err();
        assert_eq!(err.stage(), MigrationStage::LoadDestinationSchema);
        assert_eq!(err.exit_code(), EXIT_TEMPLATE_READ);

        let mut bad_output = job(&dir);
        bad_output.output_file = dir.path().join("no/such/dir/out.json");
        let err = run_migration(&bad_output).unwrap_err();
        assert_eq!(err.stage(), MigrationStage::WriteOutput);
        assert_eq!(err.exit_code(), EXIT_OUTPUT_WRITE);

        let mut bad_log = job(&dir);
        bad_log.log_file = Some(dir.path().join("no/such/dir/migration.log"));
        let err = run_migration(&bad_log).unwrap_err();
        assert_eq!(err.stage(), MigrationStage::WriteLog);
        assert_eq!(err.exit_code(), EXIT_LOG_WRITE);
    }

    #[test]
    fn run_errors_never_exit_with_success() {
        let io = || std::io::Error::other("denied");
        let errors = [
            RunError::Template(ResourceError::InvalidDocument("no kind".into())),
            RunError::Output(ResourceError::Write {
                path: PathBuf::from("out.json"),
                source: io(),
            }),
            RunError::Log {
                path: PathBuf::from("migration.log"),
                source: io(),
            },
        ];
        for err in &errors {
            assert_ne!(err.exit_code(), EXIT_SUCCESS, "{}", err);
        }
    }
}
