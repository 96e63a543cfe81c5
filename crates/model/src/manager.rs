//! The owning registry for definitions and attributes.
//!
//! Besides the definition and attribute tables, the manager maintains an
//! explicit reverse index from each referenced attribute to everything
//! that references it (expression slots and ATTRIBUTE_REF entries).
//! Removing an attribute walks that index to detach the references; it
//! is never recomputed by scanning.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::attribute::Attribute;
use crate::definition::{Definition, ItemDefinition, ItemKind};
use crate::error::ModelError;
use crate::item::{ItemData, ItemList, ItemPath};
use crate::value::{AttributeId, Slot};

/// A value position that references another attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Referrer {
    pub attribute: AttributeId,
    pub path: ItemPath,
    pub index: usize,
}

/// Registry of definitions and attributes.
#[derive(Debug, Clone, Default)]
pub struct Manager {
    definitions: Vec<Definition>,
    definition_index: HashMap<String, usize>,
    attributes: BTreeMap<AttributeId, Attribute>,
    names: HashMap<String, AttributeId>,
    references: HashMap<AttributeId, BTreeSet<Referrer>>,
    next_id: AttributeId,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Definitions ─────────────────────────────────────────────────

    /// Register a definition. Its base must already be registered; the
    /// base's items are prepended to the definition's own.
    pub fn add_definition(&mut self, mut def: Definition) -> Result<(), ModelError> {
        if self.definition_index.contains_key(&def.type_name) {
            return Err(ModelError::DuplicateDefinition(def.type_name));
        }
        let inherited = match &def.base {
            Some(base) => match self.find_definition(base) {
                Some(b) => b.items().to_vec(),
                None => {
                    return Err(ModelError::UnknownBase {
                        type_name: def.type_name.clone(),
                        base: base.clone(),
                    })
                }
            },
            None => Vec::new(),
        };
        def.resolve(&inherited)?;
        self.definition_index
            .insert(def.type_name.clone(), self.definitions.len());
        self.definitions.push(def);
        Ok(())
    }

    pub fn find_definition(&self, type_name: &str) -> Option<&Definition> {
        self.definition_index
            .get(type_name)
            .map(|&i| &self.definitions[i])
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Base chain of `type_name`, nearest base first.
    pub fn ancestors(&self, type_name: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.find_definition(type_name).and_then(|d| d.base.as_deref());
        while let Some(base) = current {
            chain.push(base);
            current = self.find_definition(base).and_then(|d| d.base.as_deref());
        }
        chain
    }

    /// Whether `type_name` is `base` or derives from it.
    pub fn is_a(&self, type_name: &str, base: &str) -> bool {
        self.find_definition(type_name).is_some()
            && (type_name == base || self.ancestors(type_name).contains(&base))
    }

    /// Definitions deriving (directly or not) from `base`, excluding `base`.
    pub fn derived_definitions(&self, base: &str) -> Vec<&Definition> {
        self.definitions
            .iter()
            .filter(|d| d.type_name != base && self.is_a(&d.type_name, base))
            .collect()
    }

    // ── Attributes ──────────────────────────────────────────────────

    /// Create and register an attribute with the next free id.
    pub fn create_attribute(
        &mut self,
        name: &str,
        type_name: &str,
    ) -> Result<AttributeId, ModelError> {
        let mut id = self.next_id;
        while self.attributes.contains_key(&id) {
            id += 1;
        }
        self.create_attribute_with_id(name, type_name, id)
    }

    /// Create and register an attribute with a caller-chosen id.
    pub fn create_attribute_with_id(
        &mut self,
        name: &str,
        type_name: &str,
        id: AttributeId,
    ) -> Result<AttributeId, ModelError> {
        let attr = self.new_attribute(name, type_name, id)?;
        self.insert_attribute(attr)
    }

    /// Build a detached, default-populated attribute. Nothing is registered.
    pub fn new_attribute(
        &self,
        name: &str,
        type_name: &str,
        id: AttributeId,
    ) -> Result<Attribute, ModelError> {
        let def = self
            .find_definition(type_name)
            .ok_or_else(|| ModelError::UnknownDefinition(type_name.to_string()))?;
        if def.is_abstract {
            return Err(ModelError::AbstractDefinition(type_name.to_string()));
        }
        Ok(Attribute::from_definition(id, name, def))
    }

    /// Register a detached attribute.
    ///
    /// Rejects abstract or unknown types, structural drift from the
    /// definition, name or id conflicts, and references to attributes that
    /// are missing or of the wrong type.
    pub fn insert_attribute(&mut self, attr: Attribute) -> Result<AttributeId, ModelError> {
        let def = self
            .find_definition(attr.type_name())
            .ok_or_else(|| ModelError::UnknownDefinition(attr.type_name().to_string()))?;
        if def.is_abstract {
            return Err(ModelError::AbstractDefinition(def.type_name.clone()));
        }
        attr.items()
            .conforms_to(def.items())
            .map_err(|detail| ModelError::StructureMismatch {
                attribute: attr.name().to_string(),
                detail,
            })?;
        if self.names.contains_key(attr.name()) {
            return Err(ModelError::DuplicateName(attr.name().to_string()));
        }
        if self.attributes.contains_key(&attr.id()) {
            return Err(ModelError::DuplicateId(attr.id()));
        }
        self.check_references(&attr, attr.items(), def.items(), &ItemPath::root())?;

        Ok(self.register(attr))
    }

    /// Index a validated attribute and its outgoing references.
    fn register(&mut self, attr: Attribute) -> AttributeId {
        let id = attr.id();
        for (path, index, target) in attr.references() {
            self.references.entry(target).or_default().insert(Referrer {
                attribute: id,
                path,
                index,
            });
        }
        self.names.insert(attr.name().to_string(), id);
        self.attributes.insert(id, attr);
        self.next_id = self.next_id.max(id.saturating_add(1));
        id
    }

    /// Unindex an attribute and its outgoing references. Incoming
    /// references are left to the caller.
    fn take_attribute(&mut self, id: AttributeId) -> Result<Attribute, ModelError> {
        let attr = self
            .attributes
            .remove(&id)
            .ok_or(ModelError::AttributeNotFound(id))?;
        self.names.remove(attr.name());
        for (path, index, target) in attr.references() {
            if let Some(set) = self.references.get_mut(&target) {
                set.remove(&Referrer {
                    attribute: id,
                    path,
                    index,
                });
                if set.is_empty() {
                    self.references.remove(&target);
                }
            }
        }
        Ok(attr)
    }

    /// Swap the attribute registered as `old_id` for `attr` in one step.
    ///
    /// `attr` may carry a new id (renumbering). References held elsewhere
    /// to the old attribute follow the replacement when its type is
    /// unchanged and are detached otherwise. Nothing is modified unless
    /// the replacement passes the same checks as
    /// [`Manager::insert_attribute`].
    pub fn replace_attribute(
        &mut self,
        old_id: AttributeId,
        attr: Attribute,
    ) -> Result<Attribute, ModelError> {
        let old_type = match self.attributes.get(&old_id) {
            Some(old) => old.type_name().to_string(),
            None => return Err(ModelError::AttributeNotFound(old_id)),
        };
        let def = self
            .find_definition(attr.type_name())
            .ok_or_else(|| ModelError::UnknownDefinition(attr.type_name().to_string()))?;
        if def.is_abstract {
            return Err(ModelError::AbstractDefinition(def.type_name.clone()));
        }
        attr.items()
            .conforms_to(def.items())
            .map_err(|detail| ModelError::StructureMismatch {
                attribute: attr.name().to_string(),
                detail,
            })?;
        if matches!(self.names.get(attr.name()), Some(&holder) if holder != old_id) {
            return Err(ModelError::DuplicateName(attr.name().to_string()));
        }
        if attr.id() != old_id && self.attributes.contains_key(&attr.id()) {
            return Err(ModelError::DuplicateId(attr.id()));
        }
        if let Some((path, _, _)) = attr.references().into_iter().find(|r| r.2 == old_id) {
            return Err(ModelError::InvalidReference {
                attribute: attr.name().to_string(),
                path: path.to_string(),
                detail: "references the attribute it replaces".to_string(),
            });
        }
        self.check_references(&attr, attr.items(), def.items(), &ItemPath::root())?;

        let old = self.take_attribute(old_id)?;
        let new_id = attr.id();
        let follow = old_type == attr.type_name();
        if let Some(referrers) = self.references.remove(&old_id) {
            let mut moved = BTreeSet::new();
            for r in referrers {
                let Some(item) = self
                    .attributes
                    .get_mut(&r.attribute)
                    .and_then(|a| a.items_mut().item_at_mut(&r.path))
                else {
                    continue;
                };
                if follow {
                    item.retarget_reference(r.index, new_id);
                    moved.insert(r);
                } else {
                    item.clear_reference(r.index);
                }
            }
            if !moved.is_empty() {
                self.references.insert(new_id, moved);
            }
        }
        self.register(attr);
        Ok(old)
    }

    /// Remove an attribute, detaching every reference to it.
    pub fn remove_attribute(&mut self, id: AttributeId) -> Result<Attribute, ModelError> {
        let attr = self.take_attribute(id)?;
        if let Some(referrers) = self.references.remove(&id) {
            for r in referrers {
                if let Some(item) = self
                    .attributes
                    .get_mut(&r.attribute)
                    .and_then(|a| a.items_mut().item_at_mut(&r.path))
                {
                    item.clear_reference(r.index);
                }
            }
        }
        Ok(attr)
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.names.get(name).and_then(|id| self.attributes.get(id))
    }

    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.get(&id)
    }

    /// Attributes in id order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Attributes whose definition is exactly `type_name`.
    pub fn attributes_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes
            .values()
            .filter(move |a| a.type_name() == type_name)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Everything currently referencing `id`.
    pub fn references_to(&self, id: AttributeId) -> Vec<&Referrer> {
        self.references
            .get(&id)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    // ── Id counter ──────────────────────────────────────────────────

    /// The id the next [`Manager::create_attribute`] call starts from.
    pub fn next_id(&self) -> AttributeId {
        self.next_id
    }

    /// Make sure ids up to and including `max_id` are never handed out
    /// by [`Manager::create_attribute`]. The counter never moves backwards.
    pub fn reserve_ids_up_to(&mut self, max_id: AttributeId) {
        self.next_id = self.next_id.max(max_id.saturating_add(1));
    }

    // ── Validation ──────────────────────────────────────────────────

    fn check_references(
        &self,
        owner: &Attribute,
        list: &ItemList,
        defs: &[ItemDefinition],
        prefix: &ItemPath,
    ) -> Result<(), ModelError> {
        for (item, def) in list.iter().zip(defs) {
            let path = prefix.child(item.name());
            let invalid = |detail: String| ModelError::InvalidReference {
                attribute: owner.name().to_string(),
                path: path.to_string(),
                detail,
            };
            match (&def.kind, item.data()) {
                (ItemKind::Group(g), ItemData::Group(groups)) => {
                    for (i, group) in groups.iter().enumerate() {
                        self.check_references(owner, group, &g.items, &path.group(i))?;
                    }
                }
                (ItemKind::AttributeRef(r), ItemData::AttributeRef(targets)) => {
                    for &target in targets.iter().flatten() {
                        let referenced = self.referenced(owner, target).map_err(&invalid)?;
                        if !r.accepted_types.is_empty()
                            && !r
                                .accepted_types
                                .iter()
                                .any(|t| self.is_a(referenced.type_name(), t))
                        {
                            return Err(invalid(format!(
                                "'{}' is of type '{}', which the item does not accept",
                                referenced.name(),
                                referenced.type_name()
                            )));
                        }
                    }
                }
                (kind, _) => {
                    let (Some((_, value_def)), Some(slots)) =
                        (kind.value_definition(), item.values())
                    else {
                        continue;
                    };
                    for slot in slots {
                        match slot {
                            Slot::Expression(target) => {
                                let Some(expr_type) = &value_def.expression_type else {
                                    return Err(invalid(
                                        "item does not accept expressions".to_string(),
                                    ));
                                };
                                let referenced =
                                    self.referenced(owner, *target).map_err(&invalid)?;
                                if !self.is_a(referenced.type_name(), expr_type) {
                                    return Err(invalid(format!(
                                        "'{}' is not a '{}' expression",
                                        referenced.name(),
                                        expr_type
                                    )));
                                }
                            }
                            Slot::Discrete(index) if *index >= value_def.discrete.len() => {
                                return Err(invalid(format!(
                                    "discrete index {} out of range",
                                    index
                                )));
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn referenced(&self, owner: &Attribute, target: AttributeId) -> Result<&Attribute, String> {
        if target == owner.id() {
            return Err("attribute references itself".to_string());
        }
        self.attributes
            .get(&target)
            .ok_or_else(|| format!("references unknown attribute id {}", target))
    }
}
