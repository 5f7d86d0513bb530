//! Relationship binding.
//!
//! Runs once every entity of the call is registered. One-to-one and
//! one-to-many relationships are bound first, then many-to-many ones, which
//! may register join entities of their own.

use super::classify::{classify_with, key_type};
use super::keys::{add_synthesized_key, flagged_key, KeyIndex};
use super::register::register_entity;
use super::{Multiplicity, RelationshipMany, RelationshipOne};
use crate::config::{DefineOptions, DefinitionContext};
use crate::definition::{Definitions, EntityDefinition, FieldAttributes, FieldSpec, Through};
use crate::error::{DefinerError, Result};
use crate::naming;
use crate::registry::{AssociationOptions, ColumnReference, ModelId, ModelRegistry};
use crate::types::{DataType, ReferentialAction};
use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::debug;

/// What binding did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSummary {
    /// Number of associations declared on the registry.
    pub associations: usize,
    /// Join entities registered while binding.
    pub join_models: Vec<String>,
}

/// One side of a many-to-many relationship.
struct Participant {
    entity: String,
    id: ModelId,
    key: String,
    key_type: DataType,
    /// Column of the join entity pointing at this participant.
    column: String,
}

/// Name of a synthesized join entity: the declaring entity followed by the
/// singular `as` label, or the other entity.
pub fn join_name(
    entity_a: &str,
    entity_b: &str,
    as_name: Option<&str>,
    options: &DefineOptions,
) -> String {
    let second = as_name
        .map(naming::singularize)
        .unwrap_or_else(|| entity_b.to_string());
    if options.camel_through {
        naming::camelize(entity_a, &second)
    } else {
        format!("{}{}", entity_a, second)
    }
}

/// Bind every relationship collected from the definitions.
pub fn bind<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    relationships_one: &[RelationshipOne],
    relationships_many: &[RelationshipMany],
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
) -> Result<BindSummary> {
    let mut handles = registry.model_handles();
    let mut summary = BindSummary::default();

    for relationship in relationships_one {
        bind_one(registry, &handles, relationship)?;
        summary.associations += 2;
    }

    let mut pending: VecDeque<RelationshipMany> = relationships_many.iter().cloned().collect();
    while let Some(relationship) = pending.pop_front() {
        let join_relationships = bind_many(
            registry,
            &mut handles,
            &relationship,
            definitions,
            keys,
            options,
            &mut summary,
        )?;
        pending.extend(join_relationships);
    }

    Ok(summary)
}

fn lookup(
    handles: &IndexMap<String, ModelId>,
    entity: &str,
    field: Option<&str>,
    target: &str,
) -> std::result::Result<ModelId, DefinerError> {
    handles
        .get(target)
        .copied()
        .ok_or_else(|| DefinerError::invalid_reference(entity, field, target))
}

fn bind_one<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    handles: &IndexMap<String, ModelId>,
    relationship: &RelationshipOne,
) -> Result<()> {
    let field = Some(relationship.foreign_key.as_str());
    let source = lookup(handles, &relationship.source, field, &relationship.source)?;
    let target = lookup(handles, &relationship.source, field, &relationship.target)?;

    let reverse = AssociationOptions::new()
        .with_as(relationship.as_reverse.clone())
        .with_foreign_key(relationship.foreign_key.clone())
        .with_actions(relationship.on_delete, relationship.on_update);
    match relationship.multiplicity {
        Multiplicity::HasOne => registry.has_one(target, source, reverse)?,
        Multiplicity::HasMany => registry.has_many(target, source, reverse)?,
    }

    let forward = AssociationOptions::new()
        .with_as(relationship.as_name.clone())
        .with_foreign_key(relationship.foreign_key.clone())
        .with_actions(relationship.on_delete, relationship.on_update);
    registry.belongs_to(source, target, forward)?;

    debug!(
        source = %relationship.source,
        target = %relationship.target,
        foreign_key = %relationship.foreign_key,
        multiplicity = ?relationship.multiplicity,
        "bound relationship"
    );
    Ok(())
}

/// Bind a many-to-many relationship, registering its join entity if needed.
/// Returns the many-to-many relationships declared by an inline join
/// definition.
fn bind_many<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    handles: &mut IndexMap<String, ModelId>,
    relationship: &RelationshipMany,
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
    summary: &mut BindSummary,
) -> Result<Vec<RelationshipMany>> {
    let entity_a = relationship.entity_a.as_str();
    let entity_b = relationship.entity_b.as_str();
    let self_reference = entity_a == entity_b;

    let as_name = relationship.as_name.as_deref();
    if self_reference && (as_name.is_none() || relationship.as_reverse.is_none()) {
        return Err(DefinerError::missing_association_label(entity_a).into());
    }

    let a = participant(handles, definitions, options, entity_a, entity_a, None)?;
    let b_column_prefix = match as_name {
        Some(as_name) if self_reference => naming::singularize(as_name),
        _ => entity_b.to_string(),
    };
    let b = participant(
        handles,
        definitions,
        options,
        entity_a,
        entity_b,
        Some(&b_column_prefix),
    )?;

    let through_name = match &relationship.through {
        Some(Through::Name(name)) => name.clone(),
        _ => join_name(entity_a, entity_b, as_name, options),
    };

    let existing = handles.get(&through_name).copied();
    let mut join_relationships = Vec::new();
    let through = match existing {
        Some(id) => id,
        None => {
            let inline = match &relationship.through {
                Some(Through::Definition(definition)) => (**definition).clone(),
                _ => EntityDefinition::new(),
            };
            let (id, declared) = define_join(
                registry,
                handles,
                &through_name,
                inline,
                [&a, &b],
                (relationship.on_delete, relationship.on_update),
                definitions,
                keys,
                options,
            )?;
            summary.associations += 2 * declared.relationships_one;
            summary.join_models.push(through_name.clone());
            join_relationships = declared.relationships_many;
            id
        }
    };

    let actions = (relationship.on_delete, relationship.on_update);
    registry.has_many(
        a.id,
        b.id,
        AssociationOptions::new()
            .with_as(relationship.as_name.clone())
            .with_foreign_key(a.column.clone())
            .with_other_key(b.column.clone())
            .through(through)
            .with_actions(actions.0, actions.1),
    )?;
    registry.has_many(
        b.id,
        a.id,
        AssociationOptions::new()
            .with_as(relationship.as_reverse.clone())
            .with_foreign_key(b.column.clone())
            .with_other_key(a.column.clone())
            .through(through)
            .with_actions(actions.0, actions.1),
    )?;
    summary.associations += 2;

    if options.associate_through {
        registry.belongs_to(
            through,
            a.id,
            AssociationOptions::new()
                .with_foreign_key(a.column.clone())
                .with_actions(actions.0, actions.1),
        )?;
        registry.belongs_to(
            through,
            b.id,
            AssociationOptions::new()
                .with_as(as_name.map(naming::singularize))
                .with_foreign_key(b.column.clone())
                .with_actions(actions.0, actions.1),
        )?;
        summary.associations += 2;
    }

    debug!(
        entity_a,
        entity_b,
        through = %through_name,
        "bound many-to-many relationship"
    );
    Ok(join_relationships)
}

fn participant(
    handles: &IndexMap<String, ModelId>,
    definitions: &Definitions,
    options: &DefineOptions,
    declaring: &str,
    entity: &str,
    column_prefix: Option<&str>,
) -> std::result::Result<Participant, DefinerError> {
    let definition = definitions
        .get(entity)
        .ok_or_else(|| DefinerError::invalid_reference(declaring, None, entity))?;
    let id = lookup(handles, declaring, None, entity)?;
    let key = definition
        .primary_key
        .clone()
        .ok_or_else(|| DefinerError::missing_primary_key(entity))?;
    Ok(Participant {
        entity: entity.to_string(),
        id,
        key_type: key_type(definition, &key, options),
        column: KeyIndex::foreign_key_name(column_prefix.unwrap_or(entity), &key),
        key,
    })
}

/// Counts of relationships declared by an inline join definition.
struct JoinDeclarations {
    relationships_one: usize,
    relationships_many: Vec<RelationshipMany>,
}

/// Synthesize and register a join entity.
///
/// The join gets one non-null column per participant, typed to its key,
/// ahead of any inline fields. Default fields are merged unless
/// `skip_fields_on_through` is set; a key is synthesized only under
/// `primary_key_through`.
#[allow(clippy::too_many_arguments)]
fn define_join<R: ModelRegistry + ?Sized>(
    registry: &mut R,
    handles: &mut IndexMap<String, ModelId>,
    name: &str,
    mut join: EntityDefinition,
    participants: [&Participant; 2],
    actions: (Option<ReferentialAction>, Option<ReferentialAction>),
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
) -> Result<(ModelId, JoinDeclarations)> {
    let mut fields: IndexMap<String, FieldSpec> = IndexMap::new();
    for participant in participants {
        if !join.fields.contains_key(&participant.column) {
            fields.insert(
                participant.column.clone(),
                FieldAttributes::typed(participant.key_type.clone())
                    .with_allow_null(false)
                    .no_reference()
                    .into(),
            );
        }
    }
    fields.extend(std::mem::take(&mut join.fields));
    join.fields = fields;

    if options.primary_key_through && flagged_key(&join).is_none() {
        if let Some(key) = &options.primary_key {
            let field = key.resolve(&DefinitionContext {
                entity: name,
                definition: &join,
                definitions,
            });
            add_synthesized_key(&mut join, &field, options);
            join.primary_key = Some(field);
        }
    }

    let classified = classify_with(
        name,
        &join,
        definitions,
        keys,
        options,
        !options.skip_fields_on_through,
    )?;

    let mut attributes = classified.attributes;
    for participant in participants {
        if let Some(attribute) = attributes.get_mut(&participant.column) {
            if attribute.references.is_none() {
                attribute.references = Some(ColumnReference {
                    entity: participant.entity.clone(),
                    key: participant.key.clone(),
                });
                attribute.on_delete = actions.0;
                attribute.on_update = actions.1;
            }
        }
    }

    let id = register_entity(registry, name, attributes, &join.options, options)?;
    handles.insert(name.to_string(), id);
    debug!(entity = name, "synthesized join entity");

    for relationship in &classified.relationships_one {
        bind_one(registry, handles, relationship)?;
    }

    Ok((
        id,
        JoinDeclarations {
            relationships_one: classified.relationships_one.len(),
            relationships_many: classified.relationships_many,
        },
    ))
}
