//! The model registry seam.
//!
//! Definition calls never touch models directly. Everything goes through
//! [`ModelRegistry`]: cleaned attribute maps go in, opaque [`ModelId`]
//! handles come out, and associations are declared between handles.

use crate::error::RegistryError;
use crate::types::{DataType, ReferentialAction};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-model options passed through to the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOptions {
    /// Explicit table name. Filled in by the definition call when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Use the entity name as the table name instead of its plural.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_table_name: Option<bool>,
    /// Add creation and update timestamp columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,
    /// Label the columns the registry adds itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<bool>,
    /// Anything else, passed through untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Override the table name freezing for this model.
    pub fn with_freeze_table_name(mut self, freeze: bool) -> Self {
        self.freeze_table_name = Some(freeze);
        self
    }

    /// Enable or disable timestamp columns.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = Some(timestamps);
        self
    }
}

/// Column in a referenced model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReference {
    /// Referenced entity name.
    pub entity: String,
    /// Referenced column name.
    pub key: String,
}

/// A cleaned attribute ready for registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Storage type. `None` leaves the choice to the registry.
    #[serde(rename = "type")]
    pub data_type: Option<DataType>,
    pub allow_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Foreign key target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<ColumnReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
    /// Free-form attributes.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Attribute {
    /// Create a nullable attribute of the given type.
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            allow_null: true,
            primary_key: false,
            auto_increment: false,
            label: None,
            references: None,
            on_delete: None,
            on_update: None,
            extra: IndexMap::new(),
        }
    }

    /// Disallow null values.
    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// Mark as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    /// Mark as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set the human readable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Point at a column of another model.
    pub fn with_reference(mut self, entity: impl Into<String>, key: impl Into<String>) -> Self {
        self.references = Some(ColumnReference {
            entity: entity.into(),
            key: key.into(),
        });
        self
    }
}

/// Options of a single association.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationOptions {
    /// Association label. The registry picks a default when absent.
    pub as_name: Option<String>,
    /// Foreign key column.
    pub foreign_key: Option<String>,
    /// Join model column pointing at the target (many-to-many only).
    pub other_key: Option<String>,
    /// Join model (many-to-many only).
    pub through: Option<ModelId>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_as(mut self, as_name: Option<String>) -> Self {
        self.as_name = as_name;
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn with_other_key(mut self, other_key: impl Into<String>) -> Self {
        self.other_key = Some(other_key.into());
        self
    }

    pub fn through(mut self, through: ModelId) -> Self {
        self.through = Some(through);
        self
    }

    pub fn with_actions(
        mut self,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    ) -> Self {
        self.on_delete = on_delete;
        self.on_update = on_update;
        self
    }
}

/// A registry of mapped models.
pub trait ModelRegistry {
    /// Register a model. `options.table_name` is always set by the caller.
    fn register_model(
        &mut self,
        name: &str,
        attributes: IndexMap<String, Attribute>,
        options: &ModelOptions,
    ) -> Result<ModelId, RegistryError>;

    /// Handles of all registered models, keyed by name.
    fn model_handles(&self) -> IndexMap<String, ModelId>;

    /// `source` holds a foreign key to `target`.
    fn belongs_to(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError>;

    /// `target` holds a foreign key to `source`, at most one row per source.
    fn has_one(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError>;

    /// `target` holds a foreign key to `source`, or both are linked through
    /// a join model when `options.through` is set.
    fn has_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        options: AssociationOptions,
    ) -> Result<(), RegistryError>;

    /// Whether table names are frozen when neither the model nor the call
    /// says otherwise.
    fn freeze_table_name_default(&self) -> bool {
        false
    }
}
