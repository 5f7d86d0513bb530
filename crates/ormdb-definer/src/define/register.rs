//! Model registration.

use crate::config::DefineOptions;
use crate::error::RegistryError;
use crate::naming;
use crate::registry::{Attribute, ModelId, ModelOptions, ModelRegistry};
use indexmap::IndexMap;
use tracing::debug;

/// Table name of an entity: the explicit one, the entity name when frozen,
/// its plural otherwise.
///
/// Freezing is decided by the entity's options, then the call options, then
/// the registry default.
pub fn table_name<R: ModelRegistry + ?Sized>(
    registry: &R,
    name: &str,
    model_options: &ModelOptions,
    options: &DefineOptions,
) -> String {
    if let Some(table_name) = &model_options.table_name {
        return table_name.clone();
    }
    let freeze = model_options
        .freeze_table_name
        .or(options.freeze_table_name)
        .unwrap_or_else(|| registry.freeze_table_name_default());
    if freeze {
        name.to_string()
    } else {
        naming::pluralize(name)
    }
}

/// Register one entity with its cleaned attributes.
pub fn register_entity<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    name: &str,
    attributes: IndexMap<String, Attribute>,
    model_options: &ModelOptions,
    options: &DefineOptions,
) -> Result<ModelId, RegistryError> {
    let mut resolved = model_options.clone();
    resolved.table_name = Some(table_name(registry, name, model_options, options));
    if options.labels && resolved.labels.is_none() {
        resolved.labels = Some(true);
    }

    let id = registry.register_model(name, attributes, &resolved)?;
    debug!(
        entity = name,
        table = resolved.table_name.as_deref().unwrap_or_default(),
        %id,
        "registered model"
    );
    Ok(id)
}
