//! Registered models.

use super::association::Association;
use crate::registry::{Attribute, ModelId, ModelOptions};
use indexmap::IndexMap;
use serde::Serialize;

/// A model registered in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Handle of this model.
    pub id: ModelId,
    /// Model name (unique within the catalog).
    pub name: String,
    /// Table the model maps to.
    pub table_name: String,
    /// Attributes in column order.
    pub attributes: IndexMap<String, Attribute>,
    /// Associations keyed by label, in declaration order.
    pub associations: IndexMap<String, Association>,
    /// Options the model was registered with.
    pub options: ModelOptions,
}

impl Model {
    /// Get an attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check if the model has an attribute.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Name and attribute of the primary key.
    pub fn primary_key(&self) -> Option<(&str, &Attribute)> {
        self.attributes
            .iter()
            .find(|(_, attr)| attr.primary_key)
            .map(|(name, attr)| (name.as_str(), attr))
    }

    /// Name of the primary key.
    pub fn primary_key_name(&self) -> Option<&str> {
        self.primary_key().map(|(name, _)| name)
    }

    /// Get an association by label.
    pub fn association(&self, label: &str) -> Option<&Association> {
        self.associations.get(label)
    }

    /// Attribute names in column order.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }
}
