//! Catalog registry.

use super::{Association, AssociationKind, Model};
use crate::error::RegistryError;
use crate::naming;
use crate::registry::{AssociationOptions, Attribute, ModelId, ModelOptions, ModelRegistry};
use crate::types::DataType;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Name of the creation timestamp column.
pub const CREATED_AT: &str = "createdAt";

/// Name of the update timestamp column.
pub const UPDATED_AT: &str = "updatedAt";

/// In-memory registry of models and their associations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    /// Registered models in registration order; a model's id is its index.
    models: IndexMap<String, Model>,
    /// Freeze table names unless told otherwise.
    #[serde(skip)]
    freeze_table_name: bool,
    /// Add timestamp columns unless told otherwise.
    #[serde(skip)]
    timestamps: bool,
}

/// Referenced side of a foreign key column.
struct KeyTarget {
    entity: String,
    key: String,
    data_type: Option<DataType>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default table name freezing.
    pub fn with_freeze_table_name(mut self, freeze: bool) -> Self {
        self.freeze_table_name = freeze;
        self
    }

    /// Set whether models get timestamp columns by default.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Get a model by name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Get a model by handle.
    pub fn model_by_id(&self, id: ModelId) -> Option<&Model> {
        self.models.get_index(id.0 as usize).map(|(_, model)| model)
    }

    /// All models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Check if a model is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Total number of associations across all models.
    pub fn association_count(&self) -> usize {
        self.models.values().map(|m| m.associations.len()).sum()
    }

    fn get(&self, id: ModelId) -> Result<&Model, RegistryError> {
        self.model_by_id(id).ok_or(RegistryError::UnknownModel(id))
    }

    fn get_mut(&mut self, id: ModelId) -> Result<&mut Model, RegistryError> {
        self.models
            .get_index_mut(id.0 as usize)
            .map(|(_, model)| model)
            .ok_or(RegistryError::UnknownModel(id))
    }

    fn key_target(&self, id: ModelId) -> Result<KeyTarget, RegistryError> {
        let model = self.get(id)?;
        let (key, attr) = model.primary_key().ok_or_else(|| {
            RegistryError::Other(format!("model '{}' has no primary key", model.name).into())
        })?;
        Ok(KeyTarget {
            entity: model.name.clone(),
            key: key.to_string(),
            data_type: attr.data_type.clone(),
        })
    }

    /// Default foreign key column pointing at a model: its name followed by
    /// its capitalized key.
    fn default_foreign_key(&self, id: ModelId) -> Result<String, RegistryError> {
        let target = self.key_target(id)?;
        Ok(format!("{}{}", target.entity, naming::upper_first(&target.key)))
    }

    /// Add a foreign key column pointing at `referenced` unless `model`
    /// already has a column of that name.
    fn ensure_foreign_key(
        &mut self,
        model: ModelId,
        column: &str,
        referenced: ModelId,
        allow_null: bool,
        options: &AssociationOptions,
    ) -> Result<(), RegistryError> {
        if self.get(model)?.has_attribute(column) {
            return Ok(());
        }
        let target = self.key_target(referenced)?;
        let mut attribute = Attribute::new(target.data_type.unwrap_or_default())
            .with_reference(target.entity, target.key);
        attribute.allow_null = allow_null;
        attribute.on_delete = options.on_delete;
        attribute.on_update = options.on_update;

        let model = self.get_mut(model)?;
        debug!(model = %model.name, column, "adding foreign key column");
        model.attributes.insert(column.to_string(), attribute);
        Ok(())
    }

    fn add_association(
        &mut self,
        source: ModelId,
        association: Association,
    ) -> Result<(), RegistryError> {
        let model = self.get_mut(source)?;
        if model.associations.contains_key(&association.label) {
            return Err(RegistryError::DuplicateAssociation {
                model: model.name.clone(),
                label: association.label,
            });
        }
        debug!(
            model = %model.name,
            label = %association.label,
            kind = %association.kind,
            target = %association.target,
            "adding association"
        );
        model
            .associations
            .insert(association.label.clone(), association);
        Ok(())
    }

    fn association(
        &self,
        kind: AssociationKind,
        source: ModelId,
        target: ModelId,
        label: String,
        foreign_key: String,
        options: &AssociationOptions,
    ) -> Result<Association, RegistryError> {
        let through = match options.through {
            Some(id) => Some(self.get(id)?.name.clone()),
            None => None,
        };
        Ok(Association {
            label,
            kind,
            source: self.get(source)?.name.clone(),
            target: self.get(target)?.name.clone(),
            foreign_key,
            other_key: options.other_key.clone(),
            through,
            on_delete: options.on_delete,
            on_update: options.on_update,
        })
    }
}

impl ModelRegistry for Catalog {
    fn register_model(
        &mut self,
        name: &str,
        mut attributes: IndexMap<String, Attribute>,
        options: &ModelOptions,
    ) -> Result<ModelId, RegistryError> {
        if self.models.contains_key(name) {
            return Err(RegistryError::DuplicateModel(name.to_string()));
        }

        let table_name = options.table_name.clone().unwrap_or_else(|| {
            if options.freeze_table_name.unwrap_or(self.freeze_table_name) {
                name.to_string()
            } else {
                naming::pluralize(name)
            }
        });

        if options.timestamps.unwrap_or(self.timestamps) {
            let labels = options.labels.unwrap_or(false);
            for column in [CREATED_AT, UPDATED_AT] {
                if !attributes.contains_key(column) {
                    let mut attribute = Attribute::new(DataType::Timestamp).not_null();
                    if labels {
                        attribute.label = Some(naming::humanize(column));
                    }
                    attributes.insert(column.to_string(), attribute);
                }
            }
        }

        let id = ModelId(self.models.len() as u32);
        debug!(model = name, table = %table_name, %id, "registering model");
        self.models.insert(
            name.to_string(),
            Model {
                id,
                name: name.to_string(),
                table_name,
                attributes,
                associations: IndexMap::new(),
                options: options.clone(),
            },
        );
        Ok(id)
    }

    fn model_handles(&self) -> IndexMap<String, ModelId> {
        self.models
            .values()
            .map(|model| (model.name.clone(), model.id))
            .collect()
    }

    fn belongs_to(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError> {
        let target_name = self.get(target)?.name.clone();
        let label = options.as_name.clone().unwrap_or(target_name);
        let foreign_key = match &options.foreign_key {
            Some(fk) => fk.clone(),
            None => {
                let key = self.key_target(target)?.key;
                format!("{}{}", label, naming::upper_first(&key))
            }
        };
        self.ensure_foreign_key(source, &foreign_key, target, true, &options)?;
        let association = self.association(
            AssociationKind::BelongsTo,
            source,
            target,
            label,
            foreign_key,
            &options,
        )?;
        self.add_association(source, association)
    }

    fn has_one(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError> {
        let label = match &options.as_name {
            Some(label) => label.clone(),
            None => self.get(target)?.name.clone(),
        };
        let foreign_key = match &options.foreign_key {
            Some(fk) => fk.clone(),
            None => self.default_foreign_key(source)?,
        };
        self.ensure_foreign_key(target, &foreign_key, source, true, &options)?;
        let association = self.association(
            AssociationKind::HasOne,
            source,
            target,
            label,
            foreign_key,
            &options,
        )?;
        self.add_association(source, association)
    }

    fn has_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError> {
        let label = match &options.as_name {
            Some(label) => label.clone(),
            None => naming::pluralize(&self.get(target)?.name),
        };
        let foreign_key = match &options.foreign_key {
            Some(fk) => fk.clone(),
            None => self.default_foreign_key(source)?,
        };

        let (kind, options) = match options.through {
            Some(through) => {
                let other_key = match &options.other_key {
                    Some(key) => key.clone(),
                    None => self.default_foreign_key(target)?,
                };
                self.ensure_foreign_key(through, &foreign_key, source, false, &options)?;
                self.ensure_foreign_key(through, &other_key, target, false, &options)?;
                (
                    AssociationKind::BelongsToMany,
                    AssociationOptions {
                        other_key: Some(other_key),
                        ..options
                    },
                )
            }
            None => {
                self.ensure_foreign_key(target, &foreign_key, source, true, &options)?;
                (AssociationKind::HasMany, options)
            }
        };

        let association = self.association(kind, source, target, label, foreign_key, &options)?;
        self.add_association(source, association)
    }

    fn freeze_table_name_default(&self) -> bool {
        self.freeze_table_name
    }
}
