use crate::value::{AttributeId, ValueType};

/// Errors raised by the attribute model and its registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A definition with this type name is already registered.
    #[error("definition '{0}' already exists")]
    DuplicateDefinition(String),

    /// No definition with this type name is registered.
    #[error("unknown definition '{0}'")]
    UnknownDefinition(String),

    /// The definition names a base that is not registered (yet).
    #[error("definition '{type_name}' derives from unknown base '{base}'")]
    UnknownBase { type_name: String, base: String },

    /// Two items of one definition (inherited items included) share a name.
    #[error("definition '{type_name}' has more than one item named '{item}'")]
    DuplicateItem { type_name: String, item: String },

    /// A bound, default, or discrete value does not fit the item's type.
    #[error("definition '{type_name}' item '{item}': {message}")]
    InvalidItemDefinition {
        type_name: String,
        item: String,
        message: String,
    },

    /// Abstract definitions can only serve as bases.
    #[error("definition '{0}' is abstract and cannot be instantiated")]
    AbstractDefinition(String),

    #[error("an attribute named '{0}' already exists")]
    DuplicateName(String),

    #[error("attribute id {0} is already in use")]
    DuplicateId(AttributeId),

    #[error("attribute id {0} not found")]
    AttributeNotFound(AttributeId),

    /// The attribute's items do not mirror its definition.
    #[error("attribute '{attribute}' does not match its definition: {detail}")]
    StructureMismatch { attribute: String, detail: String },

    /// An expression or attribute reference that the registry rejects.
    #[error("attribute '{attribute}' item '{path}': {detail}")]
    InvalidReference {
        attribute: String,
        path: String,
        detail: String,
    },

    #[error("expected a {expected} value, found {found}")]
    ValueTypeMismatch { expected: ValueType, found: ValueType },

    #[error("value {value} violates constraint {constraint}")]
    OutOfRange { value: String, constraint: String },

    #[error("item '{item}' has no value index {index}")]
    IndexOutOfRange { item: String, index: usize },
}
