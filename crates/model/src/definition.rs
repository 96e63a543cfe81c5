//! Schema nodes: attribute definitions and their item definitions.
//!
//! Definitions serialize with serde directly. Only *local* items are
//! written; the registry resolves inherited items when a definition is
//! added (see [`crate::Manager::add_definition`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;
use crate::value::{Scalar, Slot, ValueType};

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

// ── Value constraints ───────────────────────────────────────────────

/// One end of a numeric range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub value: Scalar,
    #[serde(default = "default_true")]
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: Scalar) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Scalar) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// A labelled entry of a discrete enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteValue {
    pub label: String,
    pub value: Scalar,
}

/// Constraints for DOUBLE, INT and STRING items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueDefinition {
    pub required_values: usize,
    #[serde(skip_serializing_if = "is_false")]
    pub extensible: bool,
    /// Upper limit on the value count for extensible items; 0 means unlimited.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_values: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discrete: Vec<DiscreteValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_discrete: Option<usize>,
    /// When set, values may reference attributes of this type instead of
    /// holding a literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression_type: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Default for ValueDefinition {
    fn default() -> Self {
        Self {
            required_values: 1,
            extensible: false,
            max_values: 0,
            min: None,
            max: None,
            discrete: Vec::new(),
            default: None,
            default_discrete: None,
            expression_type: None,
        }
    }
}

impl ValueDefinition {
    pub fn is_discrete(&self) -> bool {
        !self.discrete.is_empty()
    }

    pub fn allows_expressions(&self) -> bool {
        self.expression_type.is_some()
    }

    pub fn discrete_label(&self, index: usize) -> Option<&str> {
        self.discrete.get(index).map(|d| d.label.as_str())
    }

    pub fn find_discrete_label(&self, label: &str) -> Option<usize> {
        self.discrete.iter().position(|d| d.label == label)
    }

    /// Find the discrete entry whose value renders as `text`.
    pub fn find_discrete_value(&self, text: &str) -> Option<usize> {
        self.discrete
            .iter()
            .position(|d| d.value.to_string() == text)
    }

    /// Whether an item of this definition may hold `n` values.
    pub fn can_hold(&self, n: usize) -> bool {
        if n < self.required_values {
            return false;
        }
        if n > self.required_values && !self.extensible {
            return false;
        }
        self.max_values == 0 || n <= self.max_values
    }

    /// The slot a freshly created value position starts with.
    pub fn default_slot(&self) -> Slot {
        if self.is_discrete() {
            match self.default_discrete {
                Some(index) if index < self.discrete.len() => Slot::Discrete(index),
                _ => Slot::Unset,
            }
        } else {
            match &self.default {
                Some(v) => Slot::Literal(v.clone()),
                None => Slot::Unset,
            }
        }
    }

    /// Check a literal against the item's type and range.
    pub fn check_literal(&self, value_type: ValueType, value: &Scalar) -> Result<(), ModelError> {
        if value.value_type() != value_type {
            return Err(ModelError::ValueTypeMismatch {
                expected: value_type,
                found: value.value_type(),
            });
        }
        if let Scalar::Double(d) = value {
            if !d.is_finite() {
                return Err(ModelError::OutOfRange {
                    value: value.to_string(),
                    constraint: "a finite number".to_string(),
                });
            }
        }
        if let Some(min) = &self.min {
            let ok = match value.compare(&min.value) {
                Some(std::cmp::Ordering::Greater) => true,
                Some(std::cmp::Ordering::Equal) => min.inclusive,
                _ => false,
            };
            if !ok {
                let op = if min.inclusive { ">=" } else { ">" };
                return Err(ModelError::OutOfRange {
                    value: value.to_string(),
                    constraint: format!("{} {}", op, min.value),
                });
            }
        }
        if let Some(max) = &self.max {
            let ok = match value.compare(&max.value) {
                Some(std::cmp::Ordering::Less) => true,
                Some(std::cmp::Ordering::Equal) => max.inclusive,
                _ => false,
            };
            if !ok {
                let op = if max.inclusive { "<=" } else { "<" };
                return Err(ModelError::OutOfRange {
                    value: value.to_string(),
                    constraint: format!("{} {}", op, max.value),
                });
            }
        }
        Ok(())
    }

    /// Coerce bounds, defaults and discrete values to `value_type`.
    fn normalize(&mut self, value_type: ValueType) -> Result<(), String> {
        let coerce = |v: &Scalar, what: &str| {
            v.coerce(value_type)
                .ok_or_else(|| format!("{} {} is not a {} value", what, v, value_type))
        };
        if let Some(b) = &mut self.min {
            b.value = coerce(&b.value, "minimum")?;
        }
        if let Some(b) = &mut self.max {
            b.value = coerce(&b.value, "maximum")?;
        }
        if let Some(d) = &self.default {
            self.default = Some(coerce(d, "default")?);
        }
        for entry in &mut self.discrete {
            entry.value = coerce(&entry.value, "discrete value")?;
        }
        if let Some(index) = self.default_discrete {
            if index >= self.discrete.len() {
                return Err(format!("default discrete index {} out of range", index));
            }
        }
        if self.extensible && self.max_values != 0 && self.max_values < self.required_values {
            return Err("max_values is below required_values".to_string());
        }
        Ok(())
    }
}

/// Shape of a repeating GROUP item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefinition {
    pub required_groups: usize,
    #[serde(skip_serializing_if = "is_false")]
    pub extensible: bool,
    /// 0 means unlimited.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_groups: usize,
    pub items: Vec<ItemDefinition>,
}

impl Default for GroupDefinition {
    fn default() -> Self {
        Self {
            required_groups: 1,
            extensible: false,
            max_groups: 0,
            items: Vec::new(),
        }
    }
}

impl GroupDefinition {
    pub fn can_hold(&self, n: usize) -> bool {
        if n < self.required_groups {
            return false;
        }
        if n > self.required_groups && !self.extensible {
            return false;
        }
        self.max_groups == 0 || n <= self.max_groups
    }

    pub fn find_item(&self, name: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|i| i.name == name)
    }
}

/// Shape of an ATTRIBUTE_REF item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDefinition {
    #[serde(default = "default_one")]
    pub required_values: usize,
    /// Types the referenced attribute must derive from; empty accepts any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_types: Vec<String>,
}

impl Default for ReferenceDefinition {
    fn default() -> Self {
        Self {
            required_values: 1,
            accepted_types: Vec::new(),
        }
    }
}

// ── Item definitions ────────────────────────────────────────────────

/// Tag-only view of an item's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Double,
    Int,
    String,
    Group,
    Void,
    AttributeRef,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Double => "double",
            ItemType::Int => "int",
            ItemType::String => "string",
            ItemType::Group => "group",
            ItemType::Void => "void",
            ItemType::AttributeRef => "attribute_ref",
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            ItemType::Double => Some(ValueType::Double),
            ItemType::Int => Some(ValueType::Int),
            ItemType::String => Some(ValueType::String),
            ItemType::Group | ItemType::Void | ItemType::AttributeRef => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific part of an item definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Double(ValueDefinition),
    Int(ValueDefinition),
    String(ValueDefinition),
    Group(GroupDefinition),
    Void,
    AttributeRef(ReferenceDefinition),
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemKind::Double(_) => ItemType::Double,
            ItemKind::Int(_) => ItemType::Int,
            ItemKind::String(_) => ItemType::String,
            ItemKind::Group(_) => ItemType::Group,
            ItemKind::Void => ItemType::Void,
            ItemKind::AttributeRef(_) => ItemType::AttributeRef,
        }
    }

    /// The value constraints and value type, for value items.
    pub fn value_definition(&self) -> Option<(ValueType, &ValueDefinition)> {
        match self {
            ItemKind::Double(v) => Some((ValueType::Double, v)),
            ItemKind::Int(v) => Some((ValueType::Int, v)),
            ItemKind::String(v) => Some((ValueType::String, v)),
            ItemKind::Group(_) | ItemKind::Void | ItemKind::AttributeRef(_) => None,
        }
    }
}

/// A typed slot within a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional items carry an enabled flag.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default = "default_true")]
    pub enabled_by_default: bool,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl ItemDefinition {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            optional: false,
            enabled_by_default: true,
            kind,
        }
    }

    pub fn double(name: impl Into<String>, def: ValueDefinition) -> Self {
        Self::new(name, ItemKind::Double(def))
    }

    pub fn int(name: impl Into<String>, def: ValueDefinition) -> Self {
        Self::new(name, ItemKind::Int(def))
    }

    pub fn string(name: impl Into<String>, def: ValueDefinition) -> Self {
        Self::new(name, ItemKind::String(def))
    }

    pub fn group(name: impl Into<String>, def: GroupDefinition) -> Self {
        Self::new(name, ItemKind::Group(def))
    }

    pub fn optional(mut self, enabled_by_default: bool) -> Self {
        self.optional = true;
        self.enabled_by_default = enabled_by_default;
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    /// Normalize values and check child-name uniqueness, recursively.
    pub(crate) fn normalize(&mut self, type_name: &str) -> Result<(), ModelError> {
        let invalid = |item: &str, message: String| ModelError::InvalidItemDefinition {
            type_name: type_name.to_string(),
            item: item.to_string(),
            message,
        };
        let name = self.name.clone();
        match &mut self.kind {
            ItemKind::Double(v) => v
                .normalize(ValueType::Double)
                .map_err(|m| invalid(&name, m)),
            ItemKind::Int(v) => v.normalize(ValueType::Int).map_err(|m| invalid(&name, m)),
            ItemKind::String(v) => v
                .normalize(ValueType::String)
                .map_err(|m| invalid(&name, m)),
            ItemKind::Group(g) => {
                let mut seen = std::collections::HashSet::new();
                for child in &mut g.items {
                    if !seen.insert(child.name.clone()) {
                        return Err(invalid(
                            &name,
                            format!("duplicate child item '{}'", child.name),
                        ));
                    }
                    child.normalize(type_name)?;
                }
                Ok(())
            }
            ItemKind::Void | ItemKind::AttributeRef(_) => Ok(()),
        }
    }
}

// ── Definitions ─────────────────────────────────────────────────────

/// Schema node describing the shape of an attribute type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    /// Model entity kinds attributes of this type may associate with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<String>,
    #[serde(rename = "items", default)]
    local_items: Vec<ItemDefinition>,
    /// Inherited items followed by local items.
    #[serde(skip)]
    items: Vec<ItemDefinition>,
}

impl Definition {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            label: None,
            base: None,
            is_abstract: false,
            associations: Vec::new(),
            local_items: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn into_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_associations<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.associations = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.local_items.push(item.clone());
        self.items.push(item);
        self
    }

    /// All items, inherited ones first.
    pub fn items(&self) -> &[ItemDefinition] {
        &self.items
    }

    /// Items declared by this definition itself.
    pub fn local_items(&self) -> &[ItemDefinition] {
        &self.local_items
    }

    pub fn find_item(&self, name: &str) -> Option<&ItemDefinition> {
        self.items.iter().find(|i| i.name == name)
    }

    /// Resolve the flattened item list against the base's items.
    pub(crate) fn resolve(&mut self, inherited: &[ItemDefinition]) -> Result<(), ModelError> {
        for item in &mut self.local_items {
            item.normalize(&self.type_name)?;
        }
        let mut items = Vec::with_capacity(inherited.len() + self.local_items.len());
        items.extend(inherited.iter().cloned());
        for item in &self.local_items {
            if items.iter().any(|i: &ItemDefinition| i.name == item.name) {
                return Err(ModelError::DuplicateItem {
                    type_name: self.type_name.clone(),
                    item: item.name.clone(),
                });
            }
            items.push(item.clone());
        }
        self.items = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_definition_reads_kind_tag() {
        let item: ItemDefinition = serde_json::from_value(json!({
            "name": "Viscosity",
            "kind": "double",
            "min": { "value": 0 }
        }))
        .unwrap();
        assert_eq!(item.item_type(), ItemType::Double);
        let (ty, def) = item.kind.value_definition().unwrap();
        assert_eq!(ty, ValueType::Double);
        assert_eq!(def.required_values, 1);
        assert!(def.min.as_ref().unwrap().inclusive);
    }

    #[test]
    fn normalize_coerces_integer_bounds_for_double_items() {
        let mut item: ItemDefinition = serde_json::from_value(json!({
            "name": "x",
            "kind": "double",
            "min": { "value": 0 },
            "default": 1
        }))
        .unwrap();
        item.normalize("T").unwrap();
        let (_, def) = item.kind.value_definition().unwrap();
        assert_eq!(def.min.as_ref().unwrap().value, Scalar::Double(0.0));
        assert_eq!(def.default, Some(Scalar::Double(1.0)));
    }

    #[test]
    fn normalize_rejects_bad_default_discrete() {
        let mut item = ItemDefinition::int(
            "units",
            ValueDefinition {
                discrete: vec![DiscreteValue {
                    label: "Seconds".into(),
                    value: Scalar::Int(0),
                }],
                default_discrete: Some(3),
                ..Default::default()
            },
        );
        assert!(matches!(
            item.normalize("T"),
            Err(ModelError::InvalidItemDefinition { .. })
        ));
    }

    #[test]
    fn range_checks_respect_inclusive_flags() {
        let def = ValueDefinition {
            min: Some(Bound::inclusive(Scalar::Double(0.0))),
            max: Some(Bound::exclusive(Scalar::Double(1.0))),
            ..Default::default()
        };
        assert!(def.check_literal(ValueType::Double, &Scalar::Double(0.0)).is_ok());
        assert!(def.check_literal(ValueType::Double, &Scalar::Double(0.5)).is_ok());
        assert!(def.check_literal(ValueType::Double, &Scalar::Double(1.0)).is_err());
        assert!(def.check_literal(ValueType::Double, &Scalar::Double(-0.1)).is_err());
        assert!(matches!(
            def.check_literal(ValueType::Double, &Scalar::Int(0)),
            Err(ModelError::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_doubles_fail_even_without_bounds() {
        let open_above = ValueDefinition {
            min: Some(Bound::inclusive(Scalar::Double(0.0))),
            ..Default::default()
        };
        for d in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = open_above.check_literal(ValueType::Double, &Scalar::Double(d));
            assert!(matches!(
                err,
                Err(ModelError::OutOfRange { ref constraint, .. }) if constraint == "a finite number"
            ));
            assert!(ValueDefinition::default()
                .check_literal(ValueType::Double, &Scalar::Double(d))
                .is_err());
        }
    }

    #[test]
    fn value_count_capacity() {
        let fixed = ValueDefinition {
            required_values: 2,
            ..Default::default()
        };
        assert!(!fixed.can_hold(1));
        assert!(fixed.can_hold(2));
        assert!(!fixed.can_hold(3));

        let bounded = ValueDefinition {
            required_values: 1,
            extensible: true,
            max_values: 3,
            ..Default::default()
        };
        assert!(bounded.can_hold(3));
        assert!(!bounded.can_hold(4));
    }
}
