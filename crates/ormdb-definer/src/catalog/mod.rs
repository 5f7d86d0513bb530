//! In-memory model catalog.
//!
//! The catalog is a [`ModelRegistry`](crate::registry::ModelRegistry) that
//! records models, attributes and associations, applying the usual
//! relational mapper defaults for labels and foreign key columns.

mod association;
mod catalog;
mod model;

pub use association::{Association, AssociationKind};
pub use catalog::Catalog;
pub use model::Model;
