use std::collections::BTreeSet;

use crate::definition::Definition;
use crate::item::{Item, ItemList, ItemPath};
use crate::value::AttributeId;

/// A named, ID-tagged instance of a [`Definition`].
///
/// Attributes are built detached (see [`crate::Manager::new_attribute`]),
/// populated, then registered. Once registered the manager only hands
/// out shared references, so its reference index cannot go stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    id: AttributeId,
    name: String,
    type_name: String,
    items: ItemList,
    pub applies_to_boundary: bool,
    pub applies_to_interior: bool,
    /// RGBA color metadata.
    pub color: Option<[f64; 4]>,
    associations: BTreeSet<String>,
}

impl Attribute {
    pub(crate) fn from_definition(id: AttributeId, name: &str, def: &Definition) -> Self {
        Self {
            id,
            name: name.to_string(),
            type_name: def.type_name.clone(),
            items: ItemList::from_definitions(def.items()),
            applies_to_boundary: false,
            applies_to_interior: false,
            color: None,
            associations: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> AttributeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut ItemList {
        &mut self.items
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.find(name)
    }

    pub fn item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.find_mut(name)
    }

    pub fn associations(&self) -> &BTreeSet<String> {
        &self.associations
    }

    /// Associate with a model entity by identifier. Returns false if
    /// already associated.
    pub fn associate(&mut self, entity: impl Into<String>) -> bool {
        self.associations.insert(entity.into())
    }

    pub fn disassociate(&mut self, entity: &str) -> bool {
        self.associations.remove(entity)
    }

    /// Every reference this attribute holds, as (item path, value index, target).
    pub fn references(&self) -> Vec<(ItemPath, usize, AttributeId)> {
        let mut out = Vec::new();
        self.items.collect_references(&ItemPath::root(), &mut out);
        out
    }
}
