//! Item dispatch and recursive copying of GROUP items.

use attrmig_model::{
    GroupDefinition, Item, ItemDefinition, ItemKind, ItemList, ItemPath, ItemType,
};

use crate::context::CopyContext;
use crate::error::CopyError;
use crate::value::copy_value_item;

/// Whether items of type `from` can be copied into items of type `to`.
pub fn compatible(from: ItemType, to: ItemType) -> bool {
    from == to || (from == ItemType::Int && to == ItemType::Double)
}

/// Copy one item into its destination counterpart of the same name.
pub fn copy_item(
    ctx: &mut CopyContext<'_>,
    src: &Item,
    src_def: &ItemDefinition,
    dest: &mut Item,
    dest_def: &ItemDefinition,
    path: &ItemPath,
) -> Result<(), CopyError> {
    let (from, to) = (src_def.item_type(), dest_def.item_type());
    if !compatible(from, to) {
        return Err(CopyError::TypeMismatch {
            path: path.clone(),
            from,
            to,
        });
    }
    if src_def.optional && dest_def.optional {
        dest.set_enabled(src.is_enabled());
    }

    match (&src_def.kind, &dest_def.kind) {
        (ItemKind::Group(s), ItemKind::Group(d)) => copy_group_item(ctx, src, s, dest, d, path),
        (ItemKind::Void, ItemKind::Void) => Ok(()),
        (ItemKind::AttributeRef(_), ItemKind::AttributeRef(_)) => Err(CopyError::Unsupported {
            path: path.clone(),
            item_type: ItemType::AttributeRef,
        }),
        (
            ItemKind::Double(s) | ItemKind::Int(s) | ItemKind::String(s),
            ItemKind::Double(d) | ItemKind::Int(d) | ItemKind::String(d),
        ) => {
            let Some(dest_type) = to.value_type() else {
                return Err(CopyError::TypeMismatch {
                    path: path.clone(),
                    from,
                    to,
                });
            };
            copy_value_item(ctx, src, s, dest, dest_type, d, path)
        }
        _ => Err(CopyError::TypeMismatch {
            path: path.clone(),
            from,
            to,
        }),
    }
}

/// Copy every group of `src` into `dest`, matching children by name.
///
/// Children missing from the destination group definition are skipped
/// without a log record.
pub fn copy_group_item(
    ctx: &mut CopyContext<'_>,
    src: &Item,
    src_def: &GroupDefinition,
    dest: &mut Item,
    dest_def: &GroupDefinition,
    path: &ItemPath,
) -> Result<(), CopyError> {
    let groups = src.groups().unwrap_or(&[]);
    let n = groups.len();
    if n < dest_def.required_groups {
        return Err(CopyError::TooFewGroups {
            path: path.clone(),
            found: n,
            required: dest_def.required_groups,
        });
    }
    if dest_def.required_groups > 1 && src_def.items.len() != dest_def.items.len() {
        return Err(CopyError::GroupShape {
            path: path.clone(),
            found: src_def.items.len(),
            expected: dest_def.items.len(),
        });
    }
    if !dest_def.can_hold(n) {
        return Err(CopyError::TooManyGroups {
            path: path.clone(),
            found: n,
        });
    }

    let to = dest.item_type();
    let Some(dest_groups) = dest.groups_mut() else {
        return Err(CopyError::TypeMismatch {
            path: path.clone(),
            from: ItemType::Group,
            to,
        });
    };
    dest_groups.resize_with(n, || ItemList::from_definitions(&dest_def.items));

    for (gi, (src_list, dest_list)) in groups.iter().zip(dest_groups.iter_mut()).enumerate() {
        let group_path = path.group(gi);
        for (child, child_def) in src_list.iter().zip(&src_def.items) {
            let (Some(dest_child_def), Some(dest_child)) = (
                dest_def.find_item(child.name()),
                dest_list.find_mut(child.name()),
            ) else {
                continue;
            };
            copy_item(
                ctx,
                child,
                child_def,
                dest_child,
                dest_child_def,
                &group_path.child(child.name()),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationOptions;
    use crate::log::MigrationLog;
    use attrmig_model::{Manager, ReferenceDefinition, Scalar, Slot, ValueDefinition};

    fn layers(required: usize, children: Vec<ItemDefinition>) -> ItemDefinition {
        ItemDefinition::group(
            "layers",
            GroupDefinition {
                required_groups: required,
                extensible: true,
                max_groups: 0,
                items: children,
            },
        )
    }

    fn filled(def: &ItemDefinition, values: &[i64]) -> Item {
        let mut item = Item::from_definition(def);
        let ItemKind::Group(g) = &def.kind else {
            unreachable!()
        };
        let lists = item.groups_mut().unwrap();
        lists.clear();
        for v in values {
            let mut list = ItemList::from_definitions(&g.items);
            list.find_mut("thickness")
                .unwrap()
                .set_value(0, Slot::Literal(Scalar::Int(*v)))
                .unwrap();
            lists.push(list);
        }
        item
    }

    fn run(
        src: &Item,
        src_def: &ItemDefinition,
        dest_def: &ItemDefinition,
    ) -> Result<Item, CopyError> {
        let m = Manager::new();
        let options = MigrationOptions::default();
        let mut log = MigrationLog::new();
        let mut ctx = CopyContext {
            source: &m,
            dest: &m,
            options: &options,
            log: &mut log,
            attribute: "att1",
        };
        let mut dest = Item::from_definition(dest_def);
        copy_item(&mut ctx, src, src_def, &mut dest, dest_def, &ItemPath::item("layers"))?;
        Ok(dest)
    }

    #[test]
    fn groups_are_copied_with_children_matched_by_name() {
        let src_def = layers(
            1,
            vec![
                ItemDefinition::string("note", ValueDefinition::default()),
                ItemDefinition::int("thickness", ValueDefinition::default()),
            ],
        );
        let dest_def = layers(
            1,
            vec![ItemDefinition::double("thickness", ValueDefinition::default())],
        );
        let src = filled(&src_def, &[3, 4, 5]);
        let dest = run(&src, &src_def, &dest_def).unwrap();
        let groups = dest.groups().unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[2].find("thickness").unwrap().value(0),
            Some(&Slot::Literal(Scalar::Double(5.0)))
        );
    }

    #[test]
    fn group_counts_and_shapes_are_enforced() {
        let one = vec![ItemDefinition::int("thickness", ValueDefinition::default())];
        let src_def = layers(1, one.clone());
        let src = filled(&src_def, &[3]);
        assert!(matches!(
            run(&src, &src_def, &layers(2, one.clone())),
            Err(CopyError::TooFewGroups { found: 1, required: 2, .. })
        ));

        let src = filled(&src_def, &[3, 4]);
        let wider = layers(
            2,
            vec![
                ItemDefinition::int("thickness", ValueDefinition::default()),
                ItemDefinition::int("count", ValueDefinition::default()),
            ],
        );
        assert!(matches!(
            run(&src, &src_def, &wider),
            Err(CopyError::GroupShape { found: 1, expected: 2, .. })
        ));

        let fixed = ItemDefinition::group(
            "layers",
            GroupDefinition {
                required_groups: 1,
                extensible: false,
                max_groups: 0,
                items: one,
            },
        );
        assert!(matches!(
            run(&src, &src_def, &fixed),
            Err(CopyError::TooManyGroups { found: 2, .. })
        ));
    }

    #[test]
    fn mismatched_and_unsupported_kinds_fail() {
        let double = ItemDefinition::double("v", ValueDefinition::default());
        let int = ItemDefinition::int("v", ValueDefinition::default());
        let src = Item::from_definition(&double);
        assert!(matches!(
            run(&src, &double, &int),
            Err(CopyError::TypeMismatch {
                from: ItemType::Double,
                to: ItemType::Int,
                ..
            })
        ));

        let reference =
            ItemDefinition::new("r", ItemKind::AttributeRef(ReferenceDefinition::default()));
        let src = Item::from_definition(&reference);
        assert!(matches!(
            run(&src, &reference, &reference),
            Err(CopyError::Unsupported { .. })
        ));
    }

    #[test]
    fn optional_items_keep_their_enabled_state() {
        let def = ItemDefinition::int("v", ValueDefinition::default()).optional(false);
        let mut src = Item::from_definition(&def);
        src.set_enabled(true);
        let dest = run(&src, &def, &def).unwrap();
        assert!(dest.is_enabled());
    }
}
