//! Serialization of a [`Manager`] into a resource document.

use serde_json::{json, Map, Value};

use super::{ResourceError, FORMAT_VERSION, RESOURCE_KIND};
use crate::attribute::Attribute;
use crate::definition::{ItemDefinition, ItemKind};
use crate::item::{Item, ItemData, ItemList};
use crate::manager::Manager;
use crate::value::{Scalar, Slot};

/// Serialize definitions (registration order) and attributes (id order).
pub fn to_json(manager: &Manager) -> Result<Value, ResourceError> {
    let definitions = manager
        .definitions()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let mut attributes = Vec::new();
    for attr in manager.attributes() {
        attributes.push(attribute_json(manager, attr));
    }

    Ok(json!({
        "kind": RESOURCE_KIND,
        "version": FORMAT_VERSION,
        "next_id": manager.next_id(),
        "definitions": definitions,
        "attributes": attributes,
    }))
}

fn attribute_json(manager: &Manager, attr: &Attribute) -> Value {
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(attr.name()));
    obj.insert("type".to_string(), json!(attr.type_name()));
    obj.insert("id".to_string(), json!(attr.id()));
    if attr.applies_to_boundary {
        obj.insert("applies_to_boundary".to_string(), json!(true));
    }
    if attr.applies_to_interior {
        obj.insert("applies_to_interior".to_string(), json!(true));
    }
    if let Some(color) = attr.color {
        obj.insert("color".to_string(), json!(color));
    }
    if !attr.associations().is_empty() {
        obj.insert("associations".to_string(), json!(attr.associations()));
    }
    let defs = manager
        .find_definition(attr.type_name())
        .map(|d| d.items())
        .unwrap_or(&[]);
    obj.insert(
        "items".to_string(),
        Value::Array(items_json(manager, attr.items(), defs)),
    );
    Value::Object(obj)
}

fn items_json(manager: &Manager, list: &ItemList, defs: &[ItemDefinition]) -> Vec<Value> {
    list.iter()
        .zip(defs)
        .map(|(item, def)| item_json(manager, item, def))
        .collect()
}

fn item_json(manager: &Manager, item: &Item, def: &ItemDefinition) -> Value {
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(item.name()));
    if def.optional {
        obj.insert("enabled".to_string(), json!(item.is_enabled()));
    }
    match (item.data(), &def.kind) {
        (ItemData::Double(slots), _) | (ItemData::Int(slots), _) | (ItemData::String(slots), _) => {
            let values: Vec<Value> = slots.iter().map(|s| slot_json(manager, s)).collect();
            obj.insert("values".to_string(), Value::Array(values));
        }
        (ItemData::Group(groups), ItemKind::Group(g)) => {
            let groups: Vec<Value> = groups
                .iter()
                .map(|list| Value::Array(items_json(manager, list, &g.items)))
                .collect();
            obj.insert("groups".to_string(), Value::Array(groups));
        }
        (ItemData::AttributeRef(targets), _) => {
            let refs: Vec<Value> = targets
                .iter()
                .map(|t| {
                    t.and_then(|id| manager.attribute(id))
                        .map_or(Value::Null, |a| json!(a.name()))
                })
                .collect();
            obj.insert("references".to_string(), Value::Array(refs));
        }
        (ItemData::Group(_), _) | (ItemData::Void, _) => {}
    }
    Value::Object(obj)
}

fn slot_json(manager: &Manager, slot: &Slot) -> Value {
    match slot {
        Slot::Unset => Value::Null,
        Slot::Literal(Scalar::Double(d)) => json!(d),
        Slot::Literal(Scalar::Int(i)) => json!(i),
        Slot::Literal(Scalar::String(s)) => json!(s),
        Slot::Discrete(index) => json!({ "discrete": index }),
        Slot::Expression(id) => manager
            .attribute(*id)
            .map_or(Value::Null, |a| json!({ "expression": a.name() })),
    }
}
