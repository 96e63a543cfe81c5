//! Item instances and the indexed item lists that hold them.

use std::collections::HashMap;
use std::fmt;

use crate::definition::{ItemDefinition, ItemKind, ItemType};
use crate::error::ModelError;
use crate::value::{AttributeId, Slot, ValueType};

// ── Paths ───────────────────────────────────────────────────────────

/// One step of an [`ItemPath`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    /// Item by name within the current list.
    Item(String),
    /// Repetition index within the current group item.
    Group(usize),
}

/// Location of an item inside an attribute, e.g. `bcs[1]/value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemPath(Vec<PathStep>);

impl ItemPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn item(name: &str) -> Self {
        Self::root().child(name)
    }

    pub fn child(&self, name: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Item(name.to_string()));
        Self(steps)
    }

    pub fn group(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Group(index));
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Item(name) => {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    f.write_str(name)?;
                }
                PathStep::Group(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

// ── Items ───────────────────────────────────────────────────────────

/// Kind-specific storage of an item, mirroring [`ItemKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    Double(Vec<Slot>),
    Int(Vec<Slot>),
    String(Vec<Slot>),
    Group(Vec<ItemList>),
    Void,
    AttributeRef(Vec<Option<AttributeId>>),
}

/// A value holder created from one [`ItemDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    name: String,
    enabled: bool,
    data: ItemData,
}

impl Item {
    /// Build an item populated with the definition's defaults.
    pub fn from_definition(def: &ItemDefinition) -> Self {
        let data = match &def.kind {
            ItemKind::Double(v) => ItemData::Double(vec![v.default_slot(); v.required_values]),
            ItemKind::Int(v) => ItemData::Int(vec![v.default_slot(); v.required_values]),
            ItemKind::String(v) => ItemData::String(vec![v.default_slot(); v.required_values]),
            ItemKind::Group(g) => ItemData::Group(
                (0..g.required_groups)
                    .map(|_| ItemList::from_definitions(&g.items))
                    .collect(),
            ),
            ItemKind::Void => ItemData::Void,
            ItemKind::AttributeRef(r) => ItemData::AttributeRef(vec![None; r.required_values]),
        };
        Self {
            name: def.name.clone(),
            enabled: !def.optional || def.enabled_by_default,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn data(&self) -> &ItemData {
        &self.data
    }

    pub fn item_type(&self) -> ItemType {
        match self.data {
            ItemData::Double(_) => ItemType::Double,
            ItemData::Int(_) => ItemType::Int,
            ItemData::String(_) => ItemType::String,
            ItemData::Group(_) => ItemType::Group,
            ItemData::Void => ItemType::Void,
            ItemData::AttributeRef(_) => ItemType::AttributeRef,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.item_type().value_type()
    }

    /// Value slots of a DOUBLE, INT or STRING item.
    pub fn values(&self) -> Option<&[Slot]> {
        match &self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn values_mut(&mut self) -> Option<&mut Vec<Slot>> {
        match &mut self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn value(&self, index: usize) -> Option<&Slot> {
        self.values().and_then(|v| v.get(index))
    }

    /// Replace one value slot.
    pub fn set_value(&mut self, index: usize, slot: Slot) -> Result<(), ModelError> {
        let name = self.name.clone();
        match self.values_mut().and_then(|v| v.get_mut(index)) {
            Some(s) => {
                *s = slot;
                Ok(())
            }
            None => Err(ModelError::IndexOutOfRange { item: name, index }),
        }
    }

    /// Resize the value (or reference) list. New positions start unset.
    pub fn set_number_of_values(&mut self, n: usize) {
        match &mut self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => {
                v.resize(n, Slot::Unset)
            }
            ItemData::AttributeRef(r) => r.resize(n, None),
            ItemData::Group(_) | ItemData::Void => {}
        }
    }

    pub fn number_of_values(&self) -> usize {
        match &self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => v.len(),
            ItemData::AttributeRef(r) => r.len(),
            ItemData::Group(_) | ItemData::Void => 0,
        }
    }

    pub fn groups(&self) -> Option<&[ItemList]> {
        match &self.data {
            ItemData::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn groups_mut(&mut self) -> Option<&mut Vec<ItemList>> {
        match &mut self.data {
            ItemData::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn number_of_groups(&self) -> usize {
        self.groups().map_or(0, |g| g.len())
    }

    pub fn references(&self) -> Option<&[Option<AttributeId>]> {
        match &self.data {
            ItemData::AttributeRef(r) => Some(r),
            _ => None,
        }
    }

    pub fn references_mut(&mut self) -> Option<&mut Vec<Option<AttributeId>>> {
        match &mut self.data {
            ItemData::AttributeRef(r) => Some(r),
            _ => None,
        }
    }

    /// Drop the reference held at `index`, if any.
    pub(crate) fn clear_reference(&mut self, index: usize) {
        match &mut self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => {
                if let Some(slot @ Slot::Expression(_)) = v.get_mut(index) {
                    *slot = Slot::Unset;
                }
            }
            ItemData::AttributeRef(r) => {
                if let Some(entry) = r.get_mut(index) {
                    *entry = None;
                }
            }
            ItemData::Group(_) | ItemData::Void => {}
        }
    }

    /// Point the reference held at `index` at `target` instead.
    pub(crate) fn retarget_reference(&mut self, index: usize, target: AttributeId) {
        match &mut self.data {
            ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => {
                if let Some(slot @ Slot::Expression(_)) = v.get_mut(index) {
                    *slot = Slot::Expression(target);
                }
            }
            ItemData::AttributeRef(r) => {
                if let Some(entry @ Some(_)) = r.get_mut(index) {
                    *entry = Some(target);
                }
            }
            ItemData::Group(_) | ItemData::Void => {}
        }
    }

    fn conforms_to(&self, def: &ItemDefinition) -> Result<(), String> {
        if self.name != def.name {
            return Err(format!("expected item '{}', found '{}'", def.name, self.name));
        }
        if self.item_type() != def.item_type() {
            return Err(format!(
                "item '{}' is {}, definition says {}",
                self.name,
                self.item_type(),
                def.item_type()
            ));
        }
        if let (ItemData::Group(groups), ItemKind::Group(g)) = (&self.data, &def.kind) {
            for list in groups {
                list.conforms_to(&g.items)?;
            }
        }
        Ok(())
    }
}

// ── Item lists ──────────────────────────────────────────────────────

/// Ordered items with a name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemList {
    items: Vec<Item>,
    positions: HashMap<String, usize>,
}

impl ItemList {
    pub fn from_definitions(defs: &[ItemDefinition]) -> Self {
        let mut list = Self::default();
        for def in defs {
            list.push(Item::from_definition(def));
        }
        list
    }

    fn push(&mut self, item: Item) {
        self.positions.insert(item.name.clone(), self.items.len());
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Option<&Item> {
        self.position(name).map(|i| &self.items[i])
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Item> {
        let index = self.position(name)?;
        self.items.get_mut(index)
    }

    /// Walk `path` from this list to an item.
    pub fn item_at(&self, path: &ItemPath) -> Option<&Item> {
        let mut list = self;
        let mut current: Option<&Item> = None;
        for step in path.steps() {
            match step {
                PathStep::Item(name) => current = Some(list.find(name)?),
                PathStep::Group(index) => list = current?.groups()?.get(*index)?,
            }
        }
        current
    }

    pub fn item_at_mut(&mut self, path: &ItemPath) -> Option<&mut Item> {
        let (last, parents) = path.steps().split_last()?;
        let mut list = self;
        let mut steps = parents.iter();
        while let Some(step) = steps.next() {
            let PathStep::Item(name) = step else {
                return None;
            };
            let Some(PathStep::Group(index)) = steps.next() else {
                return None;
            };
            list = list.find_mut(name)?.groups_mut()?.get_mut(*index)?;
        }
        match last {
            PathStep::Item(name) => list.find_mut(name),
            PathStep::Group(_) => None,
        }
    }

    /// Every reference held below this list as (item path, value index, target).
    pub fn collect_references(
        &self,
        prefix: &ItemPath,
        out: &mut Vec<(ItemPath, usize, AttributeId)>,
    ) {
        for item in &self.items {
            let path = prefix.child(&item.name);
            match &item.data {
                ItemData::Double(v) | ItemData::Int(v) | ItemData::String(v) => {
                    for (i, slot) in v.iter().enumerate() {
                        if let Slot::Expression(id) = slot {
                            out.push((path.clone(), i, *id));
                        }
                    }
                }
                ItemData::AttributeRef(r) => {
                    for (i, target) in r.iter().enumerate() {
                        if let Some(id) = target {
                            out.push((path.clone(), i, *id));
                        }
                    }
                }
                ItemData::Group(groups) => {
                    for (g, list) in groups.iter().enumerate() {
                        list.collect_references(&path.group(g), out);
                    }
                }
                ItemData::Void => {}
            }
        }
    }

    /// Check that this list mirrors `defs` by position, recursively.
    pub fn conforms_to(&self, defs: &[ItemDefinition]) -> Result<(), String> {
        if self.items.len() != defs.len() {
            return Err(format!(
                "expected {} items, found {}",
                defs.len(),
                self.items.len()
            ));
        }
        for (item, def) in self.items.iter().zip(defs) {
            item.conforms_to(def)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{GroupDefinition, ValueDefinition};
    use crate::value::Scalar;

    fn bc_group() -> ItemDefinition {
        ItemDefinition::group(
            "bcs",
            GroupDefinition {
                required_groups: 2,
                extensible: true,
                items: vec![ItemDefinition::double(
                    "value",
                    ValueDefinition {
                        default: Some(Scalar::Double(1.0)),
                        ..Default::default()
                    },
                )],
                ..Default::default()
            },
        )
    }

    #[test]
    fn from_definition_applies_defaults() {
        let item = Item::from_definition(&bc_group());
        assert_eq!(item.number_of_groups(), 2);
        let child = item.groups().unwrap()[1].find("value").unwrap();
        assert_eq!(child.value(0), Some(&Slot::Literal(Scalar::Double(1.0))));
    }

    #[test]
    fn optional_items_start_with_default_enabled_state() {
        let def = ItemDefinition::int("n", ValueDefinition::default()).optional(false);
        assert!(!Item::from_definition(&def).is_enabled());
    }

    #[test]
    fn path_navigation_into_groups() {
        let mut list = ItemList::from_definitions(&[bc_group()]);
        let path = ItemPath::item("bcs").group(1).child("value");
        assert_eq!(path.to_string(), "bcs[1]/value");

        let item = list.item_at_mut(&path).unwrap();
        item.set_value(0, Slot::Expression(9)).unwrap();

        let mut refs = Vec::new();
        list.collect_references(&ItemPath::root(), &mut refs);
        assert_eq!(refs, vec![(path.clone(), 0, 9)]);
        assert_eq!(
            list.item_at(&path).unwrap().value(0),
            Some(&Slot::Expression(9))
        );
    }

    #[test]
    fn set_value_out_of_range_is_an_error() {
        let def = ItemDefinition::double("x", ValueDefinition::default());
        let mut item = Item::from_definition(&def);
        assert!(matches!(
            item.set_value(3, Slot::Unset),
            Err(ModelError::IndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn conformance_detects_type_changes() {
        let list = ItemList::from_definitions(&[ItemDefinition::double(
            "x",
            ValueDefinition::default(),
        )]);
        let other = [ItemDefinition::int("x", ValueDefinition::default())];
        assert!(list.conforms_to(&other).is_err());
    }
}
