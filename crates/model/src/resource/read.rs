//! Deserialization of resource documents into a [`Manager`].
//!
//! Definitions go through serde; attributes are walked by hand because
//! every value has to be interpreted against its item definition, and a
//! bad attribute should cost a diagnostic rather than the whole file.

use std::collections::HashMap;

use serde_json::Value;

use super::{LoadedResource, ResourceError, FORMAT_VERSION, RESOURCE_KIND};
use crate::attribute::Attribute;
use crate::definition::{Definition, ItemDefinition, ItemKind};
use crate::error::ModelError;
use crate::item::{Item, ItemList, ItemPath};
use crate::manager::Manager;
use crate::value::{AttributeId, Scalar, Slot};

/// A reference recorded by name, resolved once every attribute is parsed.
struct PendingRef {
    path: ItemPath,
    index: usize,
    target: String,
    expression: bool,
}

struct Parsed {
    attr: Attribute,
    refs: Vec<PendingRef>,
}

/// Build a manager from a parsed resource document.
pub fn from_json(doc: &Value) -> Result<LoadedResource, ResourceError> {
    let kind = doc.get("kind").and_then(|k| k.as_str()).unwrap_or("");
    if kind != RESOURCE_KIND {
        return Err(ResourceError::InvalidDocument(format!(
            "expected kind '{}', found '{}'",
            RESOURCE_KIND, kind
        )));
    }
    let version = doc.get("version").and_then(|v| v.as_u64()).unwrap_or(1);
    if version > FORMAT_VERSION {
        return Err(ResourceError::InvalidDocument(format!(
            "unsupported version {}",
            version
        )));
    }

    let mut manager = Manager::new();
    let definitions = doc
        .get("definitions")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ResourceError::InvalidDocument("missing 'definitions' array".to_string()))?;
    for (index, obj) in definitions.iter().enumerate() {
        let def: Definition =
            serde_json::from_value(obj.clone()).map_err(|e| ResourceError::InvalidDefinition {
                index,
                message: e.to_string(),
            })?;
        manager.add_definition(def)?;
    }

    if let Some(next_id) = doc.get("next_id").and_then(|v| v.as_u64()) {
        if next_id > 0 {
            manager.reserve_ids_up_to(next_id - 1);
        }
    }

    let mut diagnostics = Vec::new();
    let mut parsed = Vec::new();
    if let Some(attributes) = doc.get("attributes").and_then(|a| a.as_array()) {
        for (index, obj) in attributes.iter().enumerate() {
            if let Some(p) = parse_attribute(&manager, index, obj, &mut diagnostics) {
                parsed.push(p);
            }
        }
    }

    let ids: HashMap<String, AttributeId> = parsed
        .iter()
        .map(|p| (p.attr.name().to_string(), p.attr.id()))
        .collect();
    let mut ready = Vec::with_capacity(parsed.len());
    for Parsed { mut attr, refs } in parsed {
        for r in refs {
            let Some(&target) = ids.get(&r.target) else {
                diagnostics.push(format!(
                    "attribute '{}' item '{}': unresolved reference to '{}'",
                    attr.name(),
                    r.path,
                    r.target
                ));
                continue;
            };
            let placed = match attr.items_mut().item_at_mut(&r.path) {
                Some(item) => set_reference(item, r.index, target, r.expression)
                    .map_err(|e| e.to_string()),
                None => Err("no such item".to_string()),
            };
            if let Err(e) = placed {
                diagnostics.push(format!(
                    "attribute '{}' item '{}': reference to '{}' dropped: {}",
                    attr.name(),
                    r.path,
                    r.target,
                    e
                ));
            }
        }
        ready.push(attr);
    }

    insert_in_dependency_order(&mut manager, ready, &mut diagnostics);
    Ok(LoadedResource {
        manager,
        diagnostics,
    })
}

fn set_reference(
    item: &mut Item,
    index: usize,
    target: AttributeId,
    expression: bool,
) -> Result<(), ModelError> {
    if expression {
        return item.set_value(index, Slot::Expression(target));
    }
    match item.references_mut().and_then(|r| r.get_mut(index)) {
        Some(entry) => {
            *entry = Some(target);
            Ok(())
        }
        None => Err(ModelError::IndexOutOfRange {
            item: item.name().to_string(),
            index,
        }),
    }
}

/// Register attributes so that referenced ones go in first. Whatever is
/// left when no progress can be made (cycles, or targets that failed to
/// register) loses its dangling references.
fn insert_in_dependency_order(
    manager: &mut Manager,
    mut remaining: Vec<Attribute>,
    diagnostics: &mut Vec<String>,
) {
    loop {
        let before = remaining.len();
        let mut deferred = Vec::new();
        for attr in remaining {
            let ready = attr
                .references()
                .iter()
                .all(|(_, _, target)| manager.attribute(*target).is_some());
            if ready {
                let name = attr.name().to_string();
                if let Err(e) = manager.insert_attribute(attr) {
                    diagnostics.push(format!("skipping attribute '{}': {}", name, e));
                }
            } else {
                deferred.push(attr);
            }
        }
        remaining = deferred;
        if remaining.is_empty() || remaining.len() == before {
            break;
        }
    }

    for mut attr in remaining {
        for (path, index, target) in attr.references() {
            if manager.attribute(target).is_none() {
                if let Some(item) = attr.items_mut().item_at_mut(&path) {
                    item.clear_reference(index);
                }
                diagnostics.push(format!(
                    "attribute '{}' item '{}': dropped reference to attribute id {}",
                    attr.name(),
                    path,
                    target
                ));
            }
        }
        let name = attr.name().to_string();
        if let Err(e) = manager.insert_attribute(attr) {
            diagnostics.push(format!("skipping attribute '{}': {}", name, e));
        }
    }
}

fn parse_attribute(
    manager: &Manager,
    index: usize,
    obj: &Value,
    diagnostics: &mut Vec<String>,
) -> Option<Parsed> {
    let name = obj.get("name").and_then(|v| v.as_str());
    let type_name = obj.get("type").and_then(|v| v.as_str());
    let id = obj.get("id").and_then(|v| v.as_u64());
    let (Some(name), Some(type_name), Some(id)) = (name, type_name, id) else {
        diagnostics.push(format!(
            "attribute #{}: 'name', 'type' and 'id' are required",
            index
        ));
        return None;
    };

    let mut attr = match manager.new_attribute(name, type_name, id) {
        Ok(a) => a,
        Err(e) => {
            diagnostics.push(format!("skipping attribute '{}': {}", name, e));
            return None;
        }
    };
    let def = manager.find_definition(type_name)?;

    attr.applies_to_boundary = bool_field(obj, "applies_to_boundary");
    attr.applies_to_interior = bool_field(obj, "applies_to_interior");
    attr.color = obj.get("color").and_then(parse_color);
    if let Some(entities) = obj.get("associations").and_then(|a| a.as_array()) {
        for entity in entities.iter().filter_map(|e| e.as_str()) {
            attr.associate(entity);
        }
    }

    let mut ctx = ItemContext {
        attribute: name,
        refs: Vec::new(),
        diagnostics,
    };
    if let Some(items) = obj.get("items").and_then(|i| i.as_array()) {
        parse_items(&mut ctx, items, def.items(), attr.items_mut(), &ItemPath::root());
    }
    let refs = ctx.refs;
    Some(Parsed { attr, refs })
}

fn bool_field(obj: &Value, field: &str) -> bool {
    obj.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn parse_color(v: &Value) -> Option<[f64; 4]> {
    let arr = v.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rgba = [0.0; 4];
    for (slot, c) in rgba.iter_mut().zip(arr) {
        *slot = c.as_f64()?;
    }
    Some(rgba)
}

struct ItemContext<'a> {
    attribute: &'a str,
    refs: Vec<PendingRef>,
    diagnostics: &'a mut Vec<String>,
}

impl ItemContext<'_> {
    fn diag(&mut self, path: &ItemPath, message: impl std::fmt::Display) {
        self.diagnostics.push(format!(
            "attribute '{}' item '{}': {}",
            self.attribute, path, message
        ));
    }
}

fn parse_items(
    ctx: &mut ItemContext<'_>,
    objs: &[Value],
    defs: &[ItemDefinition],
    list: &mut ItemList,
    prefix: &ItemPath,
) {
    for obj in objs {
        let Some(name) = obj.get("name").and_then(|n| n.as_str()) else {
            ctx.diag(prefix, "item without a name");
            continue;
        };
        let path = prefix.child(name);
        let (Some(def), Some(item)) = (defs.iter().find(|d| d.name == name), list.find_mut(name))
        else {
            ctx.diag(&path, "no such item in the definition");
            continue;
        };
        parse_item(ctx, obj, def, item, &path);
    }
}

fn parse_item(
    ctx: &mut ItemContext<'_>,
    obj: &Value,
    def: &ItemDefinition,
    item: &mut Item,
    path: &ItemPath,
) {
    if let Some(enabled) = obj.get("enabled").and_then(|e| e.as_bool()) {
        item.set_enabled(enabled);
    }
    match &def.kind {
        ItemKind::Double(_) | ItemKind::Int(_) | ItemKind::String(_) => {
            let Some(values) = obj.get("values").and_then(|v| v.as_array()) else {
                return;
            };
            let Some((value_type, value_def)) = def.kind.value_definition() else {
                return;
            };
            item.set_number_of_values(values.len());
            for (i, v) in values.iter().enumerate() {
                let slot = match v {
                    Value::Null => Slot::Unset,
                    Value::Object(o) => {
                        if let Some(index) = o.get("discrete").and_then(|d| d.as_u64()) {
                            let index = index as usize;
                            if index < value_def.discrete.len() {
                                Slot::Discrete(index)
                            } else {
                                ctx.diag(path, format!("discrete index {} out of range", index));
                                Slot::Unset
                            }
                        } else if let Some(target) = o.get("expression").and_then(|e| e.as_str())
                        {
                            ctx.refs.push(PendingRef {
                                path: path.clone(),
                                index: i,
                                target: target.to_string(),
                                expression: true,
                            });
                            Slot::Unset
                        } else {
                            ctx.diag(path, format!("unrecognized value {}", v));
                            Slot::Unset
                        }
                    }
                    other => {
                        match serde_json::from_value::<Scalar>(other.clone())
                            .ok()
                            .and_then(|s| s.coerce(value_type))
                        {
                            Some(s) => Slot::Literal(s),
                            None => {
                                ctx.diag(path, format!("{} is not a {} value", other, value_type));
                                Slot::Unset
                            }
                        }
                    }
                };
                if let Err(e) = item.set_value(i, slot) {
                    ctx.diag(path, e);
                }
            }
        }
        ItemKind::Group(g) => {
            let Some(groups) = obj.get("groups").and_then(|g| g.as_array()) else {
                return;
            };
            let mut lists = Vec::with_capacity(groups.len());
            for (gi, group) in groups.iter().enumerate() {
                let mut list = ItemList::from_definitions(&g.items);
                if let Some(children) = group.as_array() {
                    parse_items(ctx, children, &g.items, &mut list, &path.group(gi));
                }
                lists.push(list);
            }
            if let Some(existing) = item.groups_mut() {
                *existing = lists;
            }
        }
        ItemKind::Void => {}
        ItemKind::AttributeRef(_) => {
            let Some(targets) = obj.get("references").and_then(|r| r.as_array()) else {
                return;
            };
            item.set_number_of_values(targets.len());
            for (i, target) in targets.iter().enumerate() {
                if let Some(name) = target.as_str() {
                    ctx.refs.push(PendingRef {
                        path: path.clone(),
                        index: i,
                        target: name.to_string(),
                        expression: false,
                    });
                }
            }
        }
    }
}
