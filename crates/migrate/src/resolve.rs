//! Destination definition lookup and schema summaries.

use std::fmt;

use attrmig_model::{Definition, ItemDefinition, ItemKind, Manager};
use serde::Serialize;

/// Why a source type has no usable destination definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unresolved {
    NotFound,
    Abstract,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::NotFound => f.write_str("no definition in the destination schema"),
            Unresolved::Abstract => f.write_str("definition is abstract in the destination schema"),
        }
    }
}

/// Find the concrete destination definition for `type_name`.
pub fn resolve_definition<'a>(
    dest: &'a Manager,
    type_name: &str,
) -> Result<&'a Definition, Unresolved> {
    match dest.find_definition(type_name) {
        None => Err(Unresolved::NotFound),
        Some(def) if def.is_abstract => Err(Unresolved::Abstract),
        Some(def) => Ok(def),
    }
}

/// One definition as listed by the `definitions` command.
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionSummary {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    /// Nearest base first.
    pub ancestors: Vec<String>,
    pub attributes: usize,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub name: String,
    pub kind: String,
    pub inherited: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discrete: Vec<String>,
}

/// Summaries of every definition, or of `root` and its descendants.
pub fn summarize_definitions(manager: &Manager, root: Option<&str>) -> Vec<DefinitionSummary> {
    manager
        .definitions()
        .iter()
        .filter(|d| root.map_or(true, |r| manager.is_a(&d.type_name, r)))
        .map(|d| summarize(manager, d))
        .collect()
}

fn summarize(manager: &Manager, def: &Definition) -> DefinitionSummary {
    let inherited = def.items().len() - def.local_items().len();
    DefinitionSummary {
        type_name: def.type_name.clone(),
        label: def.label.clone(),
        is_abstract: def.is_abstract,
        ancestors: manager
            .ancestors(&def.type_name)
            .into_iter()
            .map(str::to_string)
            .collect(),
        attributes: manager.attributes_of_type(&def.type_name).count(),
        items: def
            .items()
            .iter()
            .enumerate()
            .map(|(i, item)| summarize_item(item, i < inherited))
            .collect(),
    }
}

fn summarize_item(item: &ItemDefinition, inherited: bool) -> ItemSummary {
    let discrete = match &item.kind {
        ItemKind::Double(v) | ItemKind::Int(v) | ItemKind::String(v) => {
            v.discrete.iter().map(|d| d.label.clone()).collect()
        }
        ItemKind::Group(_) | ItemKind::Void | ItemKind::AttributeRef(_) => Vec::new(),
    };
    ItemSummary {
        name: item.name.clone(),
        kind: item.item_type().to_string(),
        inherited,
        discrete,
    }
}

impl DefinitionSummary {
    pub fn to_text(&self) -> String {
        let mut out = self.type_name.clone();
        if let Some(base) = self.ancestors.first() {
            out.push_str(&format!(" : {}", base));
        }
        if self.is_abstract {
            out.push_str(" (abstract)");
        }
        out.push_str(&format!(" [{} attribute(s)]\n", self.attributes));
        for item in &self.items {
            out.push_str(&format!("  {} ({})", item.name, item.kind));
            if item.inherited {
                out.push_str(" inherited");
            }
            if !item.discrete.is_empty() {
                out.push_str(&format!(" {{{}}}", item.discrete.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrmig_model::{DiscreteValue, Scalar, ValueDefinition};

    fn schema() -> Manager {
        let mut m = Manager::new();
        m.add_definition(Definition::new("SimExpression").into_abstract())
            .unwrap();
        m.add_definition(
            Definition::new("PolyLinearFunction")
                .with_base("SimExpression")
                .with_item(ItemDefinition::double("x", ValueDefinition::default())),
        )
        .unwrap();
        m.add_definition(Definition::new("Material").with_item(ItemDefinition::string(
            "units",
            ValueDefinition {
                discrete: vec![
                    DiscreteValue {
                        label: "Seconds".into(),
                        value: Scalar::String("s".into()),
                    },
                    DiscreteValue {
                        label: "Hours".into(),
                        value: Scalar::String("h".into()),
                    },
                ],
                ..Default::default()
            },
        )))
        .unwrap();
        m
    }

    #[test]
    fn resolves_concrete_definitions_only() {
        let m = schema();
        assert_eq!(
            resolve_definition(&m, "Material").unwrap().type_name,
            "Material"
        );
        assert_eq!(
            resolve_definition(&m, "SimExpression").unwrap_err(),
            Unresolved::Abstract
        );
        assert_eq!(
            resolve_definition(&m, "Obsolete").unwrap_err(),
            Unresolved::NotFound
        );
    }

    #[test]
    fn summaries_can_be_limited_to_a_subtree() {
        let m = schema();
        let all = summarize_definitions(&m, None);
        assert_eq!(all.len(), 3);
        let expressions = summarize_definitions(&m, Some("SimExpression"));
        let names: Vec<_> = expressions.iter().map(|s| s.type_name.as_str()).collect();
        assert_eq!(names, vec!["SimExpression", "PolyLinearFunction"]);
        assert_eq!(expressions[1].ancestors, vec!["SimExpression"]);
    }

    #[test]
    fn text_lists_items_and_discrete_labels() {
        let m = schema();
        let material = &summarize_definitions(&m, Some("Material"))[0];
        assert_eq!(
            material.to_text(),
            "Material [0 attribute(s)]\n  units (string) {Seconds, Hours}\n"
        );
    }
}
