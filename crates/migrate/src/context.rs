use attrmig_model::Manager;

use crate::config::MigrationOptions;
use crate::log::MigrationLog;

/// Everything the item copiers read while one attribute is being copied.
pub struct CopyContext<'a> {
    pub source: &'a Manager,
    pub dest: &'a Manager,
    pub options: &'a MigrationOptions,
    pub log: &'a mut MigrationLog,
    /// Name of the attribute being copied, for log messages.
    pub attribute: &'a str,
}

impl CopyContext<'_> {
    pub(crate) fn info(&mut self, message: impl std::fmt::Display) {
        let line = format!("{}: {}", self.attribute, message);
        self.log.info(line);
    }
}
