//! Copying of whole attributes.
//!
//! The destination attribute is assembled detached from the destination
//! manager and registered in one step once every item has been copied. A
//! failure anywhere leaves the destination exactly as it was.

use attrmig_model::{Attribute, AttributeId, ItemPath, Manager, ModelError};

use crate::config::MigrationOptions;
use crate::context::CopyContext;
use crate::error::CopyError;
use crate::group::copy_item;
use crate::log::MigrationLog;

/// Copy `src` into `dest` under its own name, type and id.
///
/// An existing destination attribute of the same name is replaced,
/// keeping references to it intact. If it had a different id the
/// replacement is renumbered to the source id.
pub fn copy_attribute(
    source: &Manager,
    dest: &mut Manager,
    src: &Attribute,
    options: &MigrationOptions,
    log: &mut MigrationLog,
) -> Result<AttributeId, CopyError> {
    let existing = dest.find_attribute(src.name()).map(|a| a.id());
    if let Some(holder) = dest.attribute(src.id()) {
        if holder.name() != src.name() {
            let err = CopyError::IdConflict {
                id: src.id(),
                holder: holder.name().to_string(),
            };
            log.error(format!("attribute '{}' not migrated: {}", src.name(), err));
            return Err(err);
        }
    }

    let built = build(source, dest, src, options, log);
    let committed = built.and_then(|attr| {
        match existing {
            Some(old) => {
                dest.replace_attribute(old, attr)?;
            }
            None => {
                dest.insert_attribute(attr)?;
            }
        }
        Ok(())
    });
    match committed {
        Ok(()) => {
            if let Some(old) = existing.filter(|&old| old != src.id()) {
                log.info(format!(
                    "renumbered attribute '{}' from id {} to id {}",
                    src.name(),
                    old,
                    src.id()
                ));
            }
            log.info(format!(
                "migrated attribute '{}' (type '{}', id {})",
                src.name(),
                src.type_name(),
                src.id()
            ));
            Ok(src.id())
        }
        Err(err) => {
            log.warning(format!("attribute '{}' not migrated: {}", src.name(), err));
            Err(err)
        }
    }
}

/// Assemble the destination attribute without registering it.
fn build(
    source: &Manager,
    dest: &Manager,
    src: &Attribute,
    options: &MigrationOptions,
    log: &mut MigrationLog,
) -> Result<Attribute, CopyError> {
    let src_def = source
        .find_definition(src.type_name())
        .ok_or_else(|| ModelError::UnknownDefinition(src.type_name().to_string()))?;
    let dest_def = dest
        .find_definition(src.type_name())
        .ok_or_else(|| ModelError::UnknownDefinition(src.type_name().to_string()))?;
    let mut attr = dest.new_attribute(src.name(), src.type_name(), src.id())?;
    attr.applies_to_boundary = src.applies_to_boundary;
    attr.applies_to_interior = src.applies_to_interior;
    attr.color = src.color;

    let mut ctx = CopyContext {
        source,
        dest,
        options,
        log,
        attribute: src.name(),
    };
    for (item, item_def) in src.items().iter().zip(src_def.items()) {
        let (Some(dest_item_def), Some(dest_item)) =
            (dest_def.find_item(item.name()), attr.item_mut(item.name()))
        else {
            ctx.info(format!(
                "item '{}' has no counterpart in the destination, skipped",
                item.name()
            ));
            continue;
        };
        copy_item(
            &mut ctx,
            item,
            item_def,
            dest_item,
            dest_item_def,
            &ItemPath::item(item.name()),
        )?;
    }

    if options.copy_associations && !src.associations().is_empty() {
        if dest_def.associations.is_empty() {
            ctx.log.warning(format!(
                "{}: {} association(s) dropped, '{}' declares no association kinds in the destination",
                src.name(),
                src.associations().len(),
                src.type_name()
            ));
        } else {
            for entity in src.associations() {
                attr.associate(entity.as_str());
            }
        }
    }
    Ok(attr)
}
