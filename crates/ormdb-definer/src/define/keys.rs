//! Primary key resolution.
//!
//! Every entity ends up with at most one primary key field. A field flagged
//! `primaryKey` wins; otherwise one is synthesized from the call options.
//! Entities used as an explicit join entity only get a synthesized key under
//! `primary_key_through`.

use crate::config::{DefineOptions, DefinitionContext};
use crate::definition::{Definitions, EntityDefinition, FieldAttributes, FieldSpec};
use crate::naming;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// A resolved primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Entity owning the key.
    pub entity: String,
    /// Key field name.
    pub field: String,
}

/// Primary keys indexed by their conventional foreign key name,
/// `<Entity><Key>` (`User` + `id` -> `UserId`).
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: IndexMap<String, KeyEntry>,
}

impl KeyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conventional foreign key name of an entity's key.
    pub fn foreign_key_name(entity: &str, field: &str) -> String {
        format!("{}{}", entity, naming::upper_first(field))
    }

    /// Index an entity's key.
    pub fn insert(&mut self, entity: impl Into<String>, field: impl Into<String>) {
        let entry = KeyEntry {
            entity: entity.into(),
            field: field.into(),
        };
        self.entries
            .insert(Self::foreign_key_name(&entry.entity, &entry.field), entry);
    }

    /// Look up the key a foreign key name points to.
    pub fn get(&self, foreign_key: &str) -> Option<&KeyEntry> {
        self.entries.get(foreign_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names used as the explicit join entity of a many-to-many declaration.
pub fn through_names(definitions: &Definitions) -> HashSet<String> {
    definitions
        .values()
        .flat_map(EntityDefinition::through_names)
        .map(String::from)
        .collect()
}

/// First field flagged as the primary key, in field order.
pub fn flagged_key(definition: &EntityDefinition) -> Option<&str> {
    definition
        .fields
        .iter()
        .find(|(_, spec)| spec.is_primary_key())
        .map(|(name, _)| name.as_str())
}

/// Field spec of a synthesized primary key.
pub fn synthesized_key(options: &DefineOptions) -> FieldSpec {
    let mut attributes = FieldAttributes::typed(options.primary_key_type.clone())
        .primary_key()
        .with_allow_null(false)
        .no_reference();
    attributes.auto_increment = true;
    attributes.extra = options.primary_key_attributes.clone();
    attributes.into()
}

enum KeyPlan {
    Flagged(String),
    Synthesized(String),
}

/// Decide every entity's key before touching the definitions, so computed
/// key names see the map as the caller supplied it.
fn plan_keys(definitions: &Definitions, options: &DefineOptions) -> Vec<(String, KeyPlan)> {
    let through = through_names(definitions);
    definitions
        .iter()
        .filter_map(|(name, definition)| {
            if let Some(field) = flagged_key(definition) {
                return Some((name.clone(), KeyPlan::Flagged(field.to_string())));
            }
            if through.contains(name) && !options.primary_key_through {
                debug!(entity = %name, "join entity left without primary key");
                return None;
            }
            let ctx = DefinitionContext {
                entity: name,
                definition,
                definitions,
            };
            let field = options.primary_key.as_ref()?.resolve(&ctx);
            Some((name.clone(), KeyPlan::Synthesized(field)))
        })
        .collect()
}

/// Resolve the primary key of every entity, synthesizing missing ones, and
/// index the results.
pub fn resolve_keys(definitions: &mut Definitions, options: &DefineOptions) -> KeyIndex {
    let plans = plan_keys(definitions, options);

    let mut index = KeyIndex::new();
    for (name, plan) in plans {
        let Some(definition) = definitions.get_mut(&name) else {
            continue;
        };
        let field = match plan {
            KeyPlan::Flagged(field) => field,
            KeyPlan::Synthesized(field) => {
                add_synthesized_key(definition, &field, options);
                debug!(entity = %name, field = %field, "synthesized primary key");
                field
            }
        };
        index.insert(name.as_str(), field.as_str());
        definition.primary_key = Some(field);
    }
    index
}

/// Insert a synthesized key field, first or last. An unflagged field of the
/// same name is replaced in place.
pub(crate) fn add_synthesized_key(
    definition: &mut EntityDefinition,
    field: &str,
    options: &DefineOptions,
) {
    let spec = synthesized_key(options);
    if options.primary_key_first {
        definition.fields.shift_insert(0, field.to_string(), spec);
    } else {
        definition.fields.insert(field.to_string(), spec);
    }
}
