//! attrmig-model: the attribute model the migration engine works against.
//!
//! Provides typed schema nodes ([`Definition`], [`ItemDefinition`]),
//! attribute instances ([`Attribute`], [`Item`]), the owning registry
//! ([`Manager`]) and a JSON resource reader/writer ([`resource`]).
//!
//! Item kinds are a closed sum type: every consumer matches on
//! [`ItemKind`] / [`ItemData`] exhaustively instead of casting by tag.

pub mod attribute;
pub mod definition;
pub mod error;
pub mod item;
pub mod manager;
pub mod resource;
pub mod value;

pub use attribute::Attribute;
pub use definition::{
    Bound, Definition, DiscreteValue, GroupDefinition, ItemDefinition, ItemKind, ItemType,
    ReferenceDefinition, ValueDefinition,
};
pub use error::ModelError;
pub use item::{Item, ItemData, ItemList, ItemPath, PathStep};
pub use manager::{Manager, Referrer};
pub use resource::{read_resource, write_resource, LoadedResource, ResourceError};
pub use value::{AttributeId, Scalar, Slot, ValueType};
