//! ORMDB Definer - bulk model and relationship definition.
//!
//! Takes a map of entity definitions, either built in code or loaded from a
//! folder of JSON/TOML files, and defines every entity on a
//! [`ModelRegistry`], then binds the one-to-one, one-to-many and
//! many-to-many relationships the definitions declare.
//!
//! ```
//! use ormdb_definer::{define_all, Catalog, DataType, DefineOptions, Definitions, EntityDefinition, FieldAttributes};
//!
//! let mut definitions = Definitions::new();
//! definitions.insert(
//!     "User".into(),
//!     EntityDefinition::new().with_field("name", DataType::String(None)),
//! );
//! definitions.insert(
//!     "Task".into(),
//!     EntityDefinition::new().with_field("UserId", FieldAttributes::new().references("User")),
//! );
//!
//! let mut catalog = Catalog::new();
//! define_all(&mut catalog, definitions, &DefineOptions::default()).unwrap();
//! assert!(catalog.model("User").unwrap().association("Tasks").is_some());
//! ```

pub mod catalog;
pub mod config;
pub mod define;
pub mod definition;
pub mod error;
pub mod folder;
pub mod naming;
pub mod registry;
pub mod types;

pub use catalog::{Association, AssociationKind, Catalog, Model};
pub use config::{
    DefineOptions, DefinitionContext, LoadOptions, OptionsFile, PrimaryKeySetting, Value,
};
pub use define::{define_all, define_from_folder, Defined, Definer};
pub use definition::{
    Definitions, EntityDefinition, FieldAttributes, FieldSpec, ManyToManyOptions, ManyToManySpec,
    Reference, Through,
};
pub use error::{DefinerError, DefinerErrorKind, Error, RegistryError, Result};
pub use registry::{Attribute, AssociationOptions, ModelId, ModelOptions, ModelRegistry};
pub use types::{DataType, ReferentialAction};
