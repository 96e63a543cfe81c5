//! Copying of DOUBLE, INT and STRING items.
//!
//! Value positions are copied one by one. Unset stays unset, literals are
//! range-checked against the destination, discrete values are matched by
//! label, and expressions are re-pointed to the destination attribute of
//! the same name.

use attrmig_model::{AttributeId, Item, ItemPath, Scalar, Slot, ValueDefinition, ValueType};

use crate::config::DiscreteToLiteral;
use crate::context::CopyContext;
use crate::error::CopyError;

/// Copy the values of `src` into `dest`.
///
/// The caller has already checked that the two value types are
/// compatible (equal, or INT into DOUBLE).
pub fn copy_value_item(
    ctx: &mut CopyContext<'_>,
    src: &Item,
    src_def: &ValueDefinition,
    dest: &mut Item,
    dest_type: ValueType,
    dest_def: &ValueDefinition,
    path: &ItemPath,
) -> Result<(), CopyError> {
    let slots = src.values().unwrap_or(&[]);
    let n = slots.len();
    if n < dest_def.required_values {
        return Err(CopyError::TooFewValues {
            path: path.clone(),
            found: n,
            required: dest_def.required_values,
        });
    }
    if !dest_def.can_hold(n) {
        return Err(CopyError::TooManyValues {
            path: path.clone(),
            found: n,
        });
    }

    dest.set_number_of_values(n);
    for (index, slot) in slots.iter().enumerate() {
        let at = ValueAt { path, index };
        let copied = match slot {
            Slot::Unset => Slot::Unset,
            Slot::Literal(value) => copy_literal(ctx, value, dest_type, dest_def, &at)?,
            Slot::Discrete(i) => copy_discrete(ctx, *i, src_def, dest_type, dest_def, &at)?,
            Slot::Expression(id) => copy_expression(ctx, *id, dest_def, &at)?,
        };
        dest.set_value(index, copied)?;
    }
    Ok(())
}

/// Position of the value being copied.
struct ValueAt<'p> {
    path: &'p ItemPath,
    index: usize,
}

impl ValueAt<'_> {
    fn invalid(&self, reason: impl std::fmt::Display) -> CopyError {
        CopyError::InvalidValue {
            path: self.path.clone(),
            index: self.index,
            reason: reason.to_string(),
        }
    }
}

fn copy_literal(
    ctx: &mut CopyContext<'_>,
    value: &Scalar,
    dest_type: ValueType,
    dest_def: &ValueDefinition,
    at: &ValueAt<'_>,
) -> Result<Slot, CopyError> {
    if dest_def.is_discrete() {
        let text = value.to_string();
        let matched = dest_def
            .find_discrete_label(&text)
            .or_else(|| dest_def.find_discrete_value(&text));
        return Ok(match matched {
            Some(j) => Slot::Discrete(j),
            None => {
                ctx.info(format!(
                    "item '{}' value {}: '{}' matches no discrete entry, left unset",
                    at.path, at.index, text
                ));
                Slot::Unset
            }
        });
    }
    let converted = value
        .coerce(dest_type)
        .ok_or_else(|| at.invalid(format!("{} is not a {} value", value, dest_type)))?;
    dest_def
        .check_literal(dest_type, &converted)
        .map_err(|e| at.invalid(e))?;
    Ok(Slot::Literal(converted))
}

fn copy_discrete(
    ctx: &mut CopyContext<'_>,
    index: usize,
    src_def: &ValueDefinition,
    dest_type: ValueType,
    dest_def: &ValueDefinition,
    at: &ValueAt<'_>,
) -> Result<Slot, CopyError> {
    let Some(entry) = src_def.discrete.get(index) else {
        ctx.info(format!(
            "item '{}' value {}: source discrete index {} is out of range, left unset",
            at.path, at.index, index
        ));
        return Ok(Slot::Unset);
    };

    if dest_def.is_discrete() {
        return Ok(match dest_def.find_discrete_label(&entry.label) {
            Some(j) => Slot::Discrete(j),
            None => {
                ctx.info(format!(
                    "item '{}' value {}: discrete value '{}' is not offered by the destination, left unset",
                    at.path, at.index, entry.label
                ));
                Slot::Unset
            }
        });
    }

    let rejected = || CopyError::DiscreteToLiteral {
        path: at.path.clone(),
        index: at.index,
        label: entry.label.clone(),
    };
    let literal = match ctx.options.discrete_to_literal {
        DiscreteToLiteral::Reject => return Err(rejected()),
        DiscreteToLiteral::Label if dest_type != ValueType::String => return Err(rejected()),
        DiscreteToLiteral::Label => Scalar::String(entry.label.clone()),
        DiscreteToLiteral::Value => entry.value.clone(),
    };
    let slot = copy_literal(ctx, &literal, dest_type, dest_def, at)?;
    ctx.info(format!(
        "item '{}' value {}: discrete value '{}' copied as literal {}",
        at.path, at.index, entry.label, literal
    ));
    Ok(slot)
}

fn copy_expression(
    ctx: &mut CopyContext<'_>,
    id: AttributeId,
    dest_def: &ValueDefinition,
    at: &ValueAt<'_>,
) -> Result<Slot, CopyError> {
    let Some(expected) = dest_def.expression_type.as_deref() else {
        return Err(CopyError::ExpressionNotAllowed {
            path: at.path.clone(),
            index: at.index,
        });
    };
    let Some(src_expr) = ctx.source.attribute(id) else {
        ctx.info(format!(
            "item '{}' value {}: dangling expression reference (id {}), left unset",
            at.path, at.index, id
        ));
        return Ok(Slot::Unset);
    };
    let name = src_expr.name().to_string();
    let Some(dest_expr) = ctx.dest.find_attribute(&name) else {
        ctx.info(format!(
            "item '{}' value {}: expression '{}' does not exist in the destination, left unset",
            at.path, at.index, name
        ));
        return Ok(Slot::Unset);
    };
    if !ctx.dest.is_a(dest_expr.type_name(), expected) {
        return Err(CopyError::ExpressionType {
            path: at.path.clone(),
            index: at.index,
            name,
            expected: expected.to_string(),
        });
    }
    Ok(Slot::Expression(dest_expr.id()))
}
