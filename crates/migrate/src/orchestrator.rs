//! Whole-manager migration: grouping by type, ordering, and the copy loop.
//!
//! Expression types (everything deriving from the configured expression
//! base in the source schema) are migrated first so that attributes
//! referencing them find their targets already in the destination. The
//! remaining types follow in name order; attributes within a type go in
//! id order.

use std::collections::BTreeMap;

use attrmig_model::{Attribute, Manager};
use serde::Serialize;

use crate::attribute::copy_attribute;
use crate::config::MigrationOptions;
use crate::log::MigrationLog;
use crate::resolve::{resolve_definition, Unresolved};
use crate::run::MigrationStage;

/// A source type whose attributes were not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedType {
    #[serde(rename = "type")]
    pub type_name: String,
    pub count: usize,
    pub reason: Unresolved,
}

/// Outcome of one migration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Attributes in the source.
    pub total: usize,
    pub migrated: usize,
    /// Attempted and rolled back.
    pub failed: usize,
    /// Never attempted because their type did not resolve.
    pub skipped: usize,
    pub skipped_types: Vec<SkippedType>,
    pub log: MigrationLog,
}

impl MigrationReport {
    pub fn summary(&self) -> String {
        format!("Migrated {} of {} attributes", self.migrated, self.total)
    }

    pub fn is_complete(&self) -> bool {
        self.migrated == self.total
    }

    /// The log, one record per line. Ends with the summary record.
    pub fn to_text(&self) -> String {
        self.log.to_text()
    }
}

/// Source attributes keyed by type name, each list in id order.
pub fn group_by_type(source: &Manager) -> BTreeMap<&str, Vec<&Attribute>> {
    let mut groups: BTreeMap<&str, Vec<&Attribute>> = BTreeMap::new();
    for attr in source.attributes() {
        groups.entry(attr.type_name()).or_default().push(attr);
    }
    groups
}

/// Expression types first, then everything else; name order within each.
pub fn order_types<'a>(
    source: &Manager,
    types: impl IntoIterator<Item = &'a str>,
    expression_type: &str,
) -> Vec<&'a str> {
    let mut types: Vec<&str> = types.into_iter().collect();
    types.sort_unstable();
    types.dedup();
    let (mut ordered, rest): (Vec<&str>, Vec<&str>) = types
        .into_iter()
        .partition(|t| source.is_a(t, expression_type));
    ordered.extend(rest);
    ordered
}

/// Copy every attribute of `source` into `dest`.
///
/// Per-attribute failures are logged and counted; they never abort the
/// run. Afterwards no id up to the largest source id is handed out by
/// `dest`.
pub fn migrate(source: &Manager, dest: &mut Manager, options: &MigrationOptions) -> MigrationReport {
    let mut report = MigrationReport {
        total: source.attribute_count(),
        ..Default::default()
    };

    tracing::debug!(stage = ?MigrationStage::GroupByType, attributes = report.total);
    let groups = group_by_type(source);

    tracing::debug!(stage = ?MigrationStage::OrderTypes, types = groups.len());
    if source.find_definition(&options.expression_type).is_none() {
        report.log.debug(format!(
            "expression type '{}' is not defined in the source schema",
            options.expression_type
        ));
    }
    let order = order_types(source, groups.keys().copied(), &options.expression_type);

    tracing::debug!(stage = ?MigrationStage::CopyLoop);
    for type_name in order {
        let Some(attrs) = groups.get(type_name) else {
            continue;
        };
        if let Err(reason) = resolve_definition(dest, type_name) {
            report.log.warning(format!(
                "skipped {} attribute(s) of type '{}': {}",
                attrs.len(),
                type_name,
                reason
            ));
            report.skipped += attrs.len();
            report.skipped_types.push(SkippedType {
                type_name: type_name.to_string(),
                count: attrs.len(),
                reason,
            });
            continue;
        }
        for attr in attrs {
            match copy_attribute(source, dest, attr, options, &mut report.log) {
                Ok(_) => report.migrated += 1,
                Err(_) => report.failed += 1,
            }
        }
    }

    if let Some(max_id) = source.attributes().map(|a| a.id()).max() {
        dest.reserve_ids_up_to(max_id);
    }
    let summary = report.summary();
    report.log.info(summary);
    report
}
