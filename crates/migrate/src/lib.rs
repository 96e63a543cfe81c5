//! attrmig-migrate: copies attributes from one schema into another.
//!
//! Given a source [`Manager`](attrmig_model::Manager) and a destination
//! manager holding the target schema, [`migrate`] copies every source
//! attribute whose type the destination defines, one attribute at a
//! time. Each attribute either lands completely or not at all; problems
//! are recorded in a [`MigrationLog`] rather than aborting the run.
//! [`run_migration`] wraps this with resource file I/O.

pub mod attribute;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod log;
pub mod orchestrator;
pub mod resolve;
pub mod run;
pub mod value;

pub use attribute::copy_attribute;
pub use config::{ConfigError, DiscreteToLiteral, MigrationOptions, DEFAULT_EXPRESSION_TYPE};
pub use context::CopyContext;
pub use error::CopyError;
pub use group::{compatible, copy_group_item, copy_item};
pub use log::{LogRecord, MigrationLog, Severity};
pub use orchestrator::{group_by_type, migrate, order_types, MigrationReport, SkippedType};
pub use resolve::{
    resolve_definition, summarize_definitions, DefinitionSummary, ItemSummary, Unresolved,
};
pub use run::{
    run_migration, MigrationJob, MigrationStage, RunError, EXIT_CONFIG, EXIT_LOG_WRITE,
    EXIT_OUTPUT_WRITE, EXIT_SUCCESS, EXIT_TEMPLATE_READ,
};
pub use value::copy_value_item;
