//! Bulk definition of models and relationships.
//!
//! A definition call runs in three steps:
//!
//! 1. [`resolve_keys`] gives every entity its primary key.
//! 2. Each entity is [`classify`]-ed and registered in map order. References
//!    may point forward; they are only collected at this stage.
//! 3. Once every entity is registered, [`bind`] declares the collected
//!    relationships on the registry.

mod bind;
mod classify;
mod keys;
mod register;

pub use bind::{bind, join_name, BindSummary};
pub use classify::{classify, Classified};
pub use keys::{flagged_key, resolve_keys, synthesized_key, through_names, KeyEntry, KeyIndex};
pub use register::{register_entity, table_name};

use crate::config::DefineOptions;
use crate::definition::{Definitions, Through};
use crate::error::Result;
use crate::folder;
use crate::registry::{ModelId, ModelRegistry};
use crate::types::ReferentialAction;
use indexmap::IndexMap;
use std::path::Path;
use tracing::{info, instrument};

/// How many rows of the source the target of a field reference sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    HasOne,
    HasMany,
}

/// A relationship declared by a reference field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipOne {
    /// Entity holding the foreign key.
    pub source: String,
    /// Referenced entity.
    pub target: String,
    /// Foreign key field on the source.
    pub foreign_key: String,
    /// Referenced field on the target.
    pub references_key: String,
    pub multiplicity: Multiplicity,
    /// Label of the source -> target association.
    pub as_name: Option<String>,
    /// Label of the target -> source association.
    pub as_reverse: Option<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// A relationship declared in a many-to-many table.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMany {
    /// Declaring entity.
    pub entity_a: String,
    /// Other entity.
    pub entity_b: String,
    pub through: Option<Through>,
    /// Label of the A -> B association.
    pub as_name: Option<String>,
    /// Label of the B -> A association.
    pub as_reverse: Option<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Outcome of a definition call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defined {
    /// Handles of the defined entities, in definition order.
    pub models: IndexMap<String, ModelId>,
    /// Join entities synthesized while binding.
    pub join_models: Vec<String>,
    /// Number of associations declared.
    pub associations: usize,
}

impl Defined {
    /// Handle of a defined entity.
    pub fn model(&self, name: &str) -> Option<ModelId> {
        self.models.get(name).copied()
    }
}

/// Define every entity of `definitions` in `registry` and bind their
/// relationships.
///
/// Stops at the first error. Models registered before it stay registered.
#[instrument(skip_all, fields(entities = definitions.len()))]
pub fn define_all<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    mut definitions: Definitions,
    options: &DefineOptions,
) -> Result<Defined> {
    let keys = resolve_keys(&mut definitions, options);

    let mut defined = Defined::default();
    let mut relationships_one = Vec::new();
    let mut relationships_many = Vec::new();

    for (name, definition) in &definitions {
        let classified = classify(name, definition, &definitions, &keys, options)?;
        let id = register_entity(
            registry,
            name,
            classified.attributes,
            &definition.options,
            options,
        )?;
        defined.models.insert(name.clone(), id);
        relationships_one.extend(classified.relationships_one);
        relationships_many.extend(classified.relationships_many);
    }

    let summary = bind(
        registry,
        &relationships_one,
        &relationships_many,
        &definitions,
        &keys,
        options,
    )?;
    defined.join_models = summary.join_models;
    defined.associations = summary.associations;

    info!(
        models = defined.models.len(),
        join_models = defined.join_models.len(),
        associations = defined.associations,
        "defined models"
    );
    Ok(defined)
}

/// Load definitions from a folder and define them.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn define_from_folder<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    path: impl AsRef<Path>,
    options: &DefineOptions,
) -> Result<Defined> {
    let definitions = folder::load_definitions(path.as_ref(), &options.load_options)?;
    define_all(registry, definitions, options)
}

/// A reusable set of options.
#[derive(Debug, Clone, Default)]
pub struct Definer {
    options: DefineOptions,
}

impl Definer {
    /// Create a definer with the given options.
    pub fn new(options: DefineOptions) -> Self {
        Self { options }
    }

    /// The options of every call.
    pub fn options(&self) -> &DefineOptions {
        &self.options
    }

    /// See [`define_all`].
    pub fn define_all<R: ModelRegistry + ?Sized>(
        &self,
        registry: &mut R,
        definitions: Definitions,
    ) -> Result<Defined> {
        define_all(registry, definitions, &self.options)
    }

    /// See [`define_from_folder`].
    pub fn define_from_folder<R: ModelRegistry + ?Sized>(
        &self,
        registry: &mut R,
        path: impl AsRef<Path>,
    ) -> Result<Defined> {
        define_from_folder(registry, path, &self.options)
    }
}
