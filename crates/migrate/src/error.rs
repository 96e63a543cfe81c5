use attrmig_model::{AttributeId, ItemPath, ItemType, ModelError};

/// Why one attribute could not be migrated. Any of these rolls the
/// attribute back; the run itself continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CopyError {
    #[error("item '{path}': {item_type} items cannot be migrated")]
    Unsupported { path: ItemPath, item_type: ItemType },

    #[error("item '{path}': source is {from}, destination is {to}")]
    TypeMismatch {
        path: ItemPath,
        from: ItemType,
        to: ItemType,
    },

    #[error("item '{path}': {found} value(s), destination requires at least {required}")]
    TooFewValues {
        path: ItemPath,
        found: usize,
        required: usize,
    },

    #[error("item '{path}': destination cannot hold {found} value(s)")]
    TooManyValues { path: ItemPath, found: usize },

    #[error("item '{path}': {found} group(s), destination requires at least {required}")]
    TooFewGroups {
        path: ItemPath,
        found: usize,
        required: usize,
    },

    #[error("item '{path}': destination cannot hold {found} group(s)")]
    TooManyGroups { path: ItemPath, found: usize },

    #[error("item '{path}': {found} item(s) per group, destination has {expected}")]
    GroupShape {
        path: ItemPath,
        found: usize,
        expected: usize,
    },

    #[error("item '{path}' value {index}: {reason}")]
    InvalidValue {
        path: ItemPath,
        index: usize,
        reason: String,
    },

    #[error("item '{path}' value {index}: destination does not accept expressions")]
    ExpressionNotAllowed { path: ItemPath, index: usize },

    #[error("item '{path}' value {index}: '{name}' is not a '{expected}' expression in the destination")]
    ExpressionType {
        path: ItemPath,
        index: usize,
        name: String,
        expected: String,
    },

    #[error("item '{path}' value {index}: discrete value '{label}' has no counterpart in a non-discrete item")]
    DiscreteToLiteral {
        path: ItemPath,
        index: usize,
        label: String,
    },

    #[error("id {id} is already used by '{holder}'")]
    IdConflict { id: AttributeId, holder: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}
