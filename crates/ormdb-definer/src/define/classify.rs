//! Field and relationship classification.
//!
//! Turns one entity definition into the attribute map handed to the
//! registry, collecting the relationships its fields and many-to-many
//! declarations imply along the way.

use super::keys::KeyIndex;
use super::{Multiplicity, RelationshipMany, RelationshipOne};
use crate::config::{DefineOptions, DefinitionContext};
use crate::definition::{
    Definitions, EntityDefinition, FieldAttributes, FieldSpec, ManyToManySpec, Reference,
};
use crate::error::DefinerError;
use crate::naming;
use crate::registry::{Attribute, ColumnReference};
use crate::types::DataType;
use indexmap::IndexMap;
use tracing::debug;

/// Label given to a field named `id`.
const ID_LABEL: &str = "ID";

/// Result of classifying one entity.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Cleaned attributes, in field order.
    pub attributes: IndexMap<String, Attribute>,
    /// Relationships declared by the entity's fields.
    pub relationships_one: Vec<RelationshipOne>,
    /// Relationships declared by the entity's many-to-many table.
    pub relationships_many: Vec<RelationshipMany>,
}

/// Referenced side of a detected relationship.
struct Target {
    entity: String,
    key: String,
    data_type: DataType,
    as_name: Option<String>,
}

/// Classify an entity, merging in the default fields.
pub fn classify(
    name: &str,
    definition: &EntityDefinition,
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
) -> Result<Classified, DefinerError> {
    classify_with(name, definition, definitions, keys, options, true)
}

pub(crate) fn classify_with(
    name: &str,
    definition: &EntityDefinition,
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
    merge_defaults: bool,
) -> Result<Classified, DefinerError> {
    let mut classified = Classified::default();

    for (field, spec) in merged_fields(name, definition, definitions, options, merge_defaults) {
        let Some(attrs) = spec.to_attributes() else {
            continue;
        };

        let target = detect_target(name, &field, &attrs, definitions, keys, options)?;
        let mut attribute = plain_attribute(&attrs);
        let mut navigation = None;

        if let Some(target) = target {
            let multiplicity = match attrs.reference_type.as_deref() {
                None | Some("many") => Multiplicity::HasMany,
                Some("one") => Multiplicity::HasOne,
                Some(other) => {
                    return Err(DefinerError::invalid_reference_type(name, &field, other));
                }
            };
            let on_delete = attrs.on_delete.or(options.on_delete);
            let on_update = attrs.on_update.or(options.on_update);

            attribute.data_type = Some(target.data_type);
            attribute.references = Some(ColumnReference {
                entity: target.entity.clone(),
                key: target.key.clone(),
            });
            attribute.on_delete = on_delete;
            attribute.on_update = on_update;

            debug!(
                entity = name,
                field = %field,
                target = %target.entity,
                ?multiplicity,
                "detected reference"
            );
            navigation = Some(
                target
                    .as_name
                    .clone()
                    .unwrap_or_else(|| target.entity.clone()),
            );
            classified.relationships_one.push(RelationshipOne {
                source: name.to_string(),
                target: target.entity,
                foreign_key: field.clone(),
                references_key: target.key,
                multiplicity,
                as_name: target.as_name,
                as_reverse: attrs.as_reverse.clone(),
                on_delete,
                on_update,
            });
        }

        if options.labels && attribute.label.is_none() {
            attribute.label = Some(label_for(&field, navigation.as_deref()));
        }

        classified.attributes.insert(field, attribute);
    }

    for (other, spec) in &definition.many_to_many {
        let ManyToManySpec::Enabled(many) = spec else {
            continue;
        };
        classified.relationships_many.push(RelationshipMany {
            entity_a: name.to_string(),
            entity_b: other.clone(),
            through: many.through.clone(),
            as_name: many.as_name.clone(),
            as_reverse: many.as_reverse.clone(),
            on_delete: many.on_delete.or(options.on_delete),
            on_update: many.on_update.or(options.on_update),
        });
    }

    Ok(classified)
}

/// Entity fields followed by the default fields it does not mention, with
/// suppressed fields removed.
fn merged_fields(
    name: &str,
    definition: &EntityDefinition,
    definitions: &Definitions,
    options: &DefineOptions,
    merge_defaults: bool,
) -> Vec<(String, FieldSpec)> {
    let mut fields: Vec<(String, FieldSpec)> = definition
        .fields
        .iter()
        .map(|(field, spec)| (field.clone(), spec.clone()))
        .collect();

    if merge_defaults {
        let ctx = DefinitionContext {
            entity: name,
            definition,
            definitions,
        };
        for (field, value) in &options.fields {
            if !definition.fields.contains_key(field) {
                fields.push((field.clone(), value.resolve(&ctx)));
            }
        }
    }

    fields.retain(|(_, spec)| !spec.is_omitted());
    fields
}

/// Find the entity a field points to, explicitly or by naming convention.
fn detect_target(
    name: &str,
    field: &str,
    attrs: &FieldAttributes,
    definitions: &Definitions,
    keys: &KeyIndex,
    options: &DefineOptions,
) -> Result<Option<Target>, DefinerError> {
    match &attrs.reference {
        Reference::Suppressed => Ok(None),
        Reference::Entity(target) => {
            let target_definition = definitions
                .get(target)
                .ok_or_else(|| DefinerError::invalid_reference(name, Some(field), target))?;
            let key = attrs
                .references_key
                .clone()
                .or_else(|| target_definition.primary_key.clone())
                .ok_or_else(|| DefinerError::missing_primary_key(target))?;

            let as_name = attrs.as_name.clone().or_else(|| {
                field
                    .strip_suffix(naming::upper_first(&key).as_str())
                    .filter(|prefix| !prefix.is_empty() && *prefix != target.as_str())
                    .map(String::from)
            });

            Ok(Some(Target {
                data_type: key_type(target_definition, &key, options),
                entity: target.clone(),
                key,
                as_name,
            }))
        }
        Reference::Auto => {
            if !options.auto_associate || attrs.primary_key {
                return Ok(None);
            }
            let Some(entry) = keys.get(field) else {
                return Ok(None);
            };
            let data_type = match definitions.get(&entry.entity) {
                Some(target_definition) => key_type(target_definition, &entry.field, options),
                None => options.primary_key_type.clone(),
            };
            Ok(Some(Target {
                entity: entry.entity.clone(),
                key: entry.field.clone(),
                data_type,
                as_name: attrs.as_name.clone(),
            }))
        }
    }
}

/// Type of a referenced key, falling back to the primary key type.
pub(crate) fn key_type(definition: &EntityDefinition, key: &str, options: &DefineOptions) -> DataType {
    definition
        .field_type(key)
        .cloned()
        .unwrap_or_else(|| options.primary_key_type.clone())
}

fn plain_attribute(attrs: &FieldAttributes) -> Attribute {
    Attribute {
        data_type: attrs.data_type.clone(),
        allow_null: attrs.allow_null.unwrap_or(!attrs.primary_key),
        primary_key: attrs.primary_key,
        auto_increment: attrs.auto_increment,
        label: attrs.label.clone(),
        references: None,
        on_delete: None,
        on_update: None,
        extra: attrs.extra.clone(),
    }
}

/// Human readable label of a field.
fn label_for(field: &str, navigation: Option<&str>) -> String {
    if field == "id" {
        return ID_LABEL.to_string();
    }
    naming::humanize(navigation.unwrap_or(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define::keys::resolve_keys;
    use crate::definition::{ManyToManyOptions, Through};
    use crate::error::DefinerErrorKind;
    use crate::types::ReferentialAction;
    use pretty_assertions::assert_eq;

    fn prepare(definitions: &mut Definitions, options: &DefineOptions) -> KeyIndex {
        resolve_keys(definitions, options)
    }

    fn users_and_tasks(task_fields: Vec<(&str, FieldSpec)>) -> Definitions {
        let mut definitions = Definitions::new();
        definitions.insert(
            "User".into(),
            EntityDefinition::new().with_field("name", DataType::string(50)),
        );
        let mut task = EntityDefinition::new().with_field("name", DataType::string(50));
        for (name, spec) in task_fields {
            task = task.with_field(name, spec);
        }
        definitions.insert("Task".into(), task);
        definitions
    }

    fn classify_task(
        definitions: &mut Definitions,
        options: &DefineOptions,
    ) -> Result<Classified, DefinerError> {
        let keys = prepare(definitions, options);
        classify("Task", &definitions["Task"], definitions, &keys, options)
    }

    #[test]
    fn test_explicit_reference() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::new().references("User").into(),
        )]);
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();

        assert_eq!(classified.relationships_one.len(), 1);
        let rel = &classified.relationships_one[0];
        assert_eq!(rel.source, "Task");
        assert_eq!(rel.target, "User");
        assert_eq!(rel.foreign_key, "UserId");
        assert_eq!(rel.references_key, "id");
        assert_eq!(rel.multiplicity, Multiplicity::HasMany);
        assert_eq!(rel.as_name, None);

        let attribute = &classified.attributes["UserId"];
        assert_eq!(attribute.data_type, Some(DataType::Integer));
        assert_eq!(attribute.references.as_ref().unwrap().entity, "User");
    }

    #[test]
    fn test_prefix_becomes_label() {
        let mut definitions = users_and_tasks(vec![(
            "WorkerId",
            FieldAttributes::new().references("User").into(),
        )]);
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();
        assert_eq!(
            classified.relationships_one[0].as_name.as_deref(),
            Some("Worker")
        );
    }

    #[test]
    fn test_explicit_labels_win() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::new()
                .references("User")
                .with_reference_type("one")
                .with_as("Owner")
                .with_as_reverse("OwnedTask")
                .into(),
        )]);
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();

        let rel = &classified.relationships_one[0];
        assert_eq!(rel.multiplicity, Multiplicity::HasOne);
        assert_eq!(rel.as_name.as_deref(), Some("Owner"));
        assert_eq!(rel.as_reverse.as_deref(), Some("OwnedTask"));
    }

    #[test]
    fn test_unknown_reference_target() {
        let mut definitions = users_and_tasks(vec![(
            "PersonId",
            FieldAttributes::new().references("Person").into(),
        )]);
        let err = classify_task(&mut definitions, &DefineOptions::default()).unwrap_err();
        assert_eq!(err.kind, DefinerErrorKind::InvalidReference);
        assert_eq!(err.entity, "Task");
        assert_eq!(err.field.as_deref(), Some("PersonId"));
    }

    #[test]
    fn test_invalid_reference_type() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::new()
                .references("User")
                .with_reference_type("several")
                .into(),
        )]);
        let err = classify_task(&mut definitions, &DefineOptions::default()).unwrap_err();
        assert_eq!(err.kind, DefinerErrorKind::InvalidReferenceType);
        assert_eq!(err.field.as_deref(), Some("UserId"));
    }

    #[test]
    fn test_auto_association() {
        let fields = vec![("UserId", FieldAttributes::new().into())];

        let mut definitions = users_and_tasks(fields.clone());
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();
        assert!(classified.relationships_one.is_empty());

        let mut definitions = users_and_tasks(fields);
        let options = DefineOptions::new().with_auto_associate(true);
        let classified = classify_task(&mut definitions, &options).unwrap();
        assert_eq!(classified.relationships_one.len(), 1);
        assert_eq!(classified.relationships_one[0].target, "User");
        assert_eq!(classified.relationships_one[0].as_name, None);
    }

    #[test]
    fn test_suppressed_reference_is_plain() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::typed(DataType::BigInt).no_reference().into(),
        )]);
        let options = DefineOptions::new().with_auto_associate(true);
        let classified = classify_task(&mut definitions, &options).unwrap();

        assert!(classified.relationships_one.is_empty());
        let attribute = &classified.attributes["UserId"];
        assert_eq!(attribute.data_type, Some(DataType::BigInt));
        assert!(attribute.references.is_none());
    }

    #[test]
    fn test_foreign_key_takes_referenced_key_type() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::typed(DataType::Text).references("User").into(),
        )]);
        let options = DefineOptions::new().with_primary_key_type(DataType::Uuid);
        let classified = classify_task(&mut definitions, &options).unwrap();
        assert_eq!(
            classified.attributes["UserId"].data_type,
            Some(DataType::Uuid)
        );
    }

    #[test]
    fn test_references_key() {
        let mut definitions = users_and_tasks(vec![(
            "UserEmail",
            FieldAttributes::new()
                .references("User")
                .with_references_key("email")
                .into(),
        )]);
        definitions["User"]
            .fields
            .insert("email".into(), DataType::string(200).into());
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();

        let rel = &classified.relationships_one[0];
        assert_eq!(rel.references_key, "email");
        assert_eq!(rel.as_name, None);
        assert_eq!(
            classified.attributes["UserEmail"].data_type,
            Some(DataType::string(200))
        );
    }

    #[test]
    fn test_default_cascade_policies() {
        let mut definitions = users_and_tasks(vec![(
            "UserId",
            FieldAttributes::new()
                .references("User")
                .with_on_update(ReferentialAction::Restrict)
                .into(),
        )]);
        let options = DefineOptions::new()
            .with_on_delete(ReferentialAction::Cascade)
            .with_on_update(ReferentialAction::Cascade);
        let classified = classify_task(&mut definitions, &options).unwrap();

        let rel = &classified.relationships_one[0];
        assert_eq!(rel.on_delete, Some(ReferentialAction::Cascade));
        assert_eq!(rel.on_update, Some(ReferentialAction::Restrict));
    }

    #[test]
    fn test_default_fields_and_suppression() {
        let mut definitions = users_and_tasks(vec![("moon", FieldSpec::Omitted)]);
        let options = DefineOptions::new()
            .with_field("moon", DataType::String(None))
            .with_field("sun", DataType::Boolean)
            .with_field_fn("star", |ctx| {
                if ctx.entity == "Task" {
                    FieldSpec::Omitted
                } else {
                    DataType::Text.into()
                }
            });
        let classified = classify_task(&mut definitions, &options).unwrap();

        let names: Vec<&str> = classified.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, ["name", "id", "sun"]);
    }

    #[test]
    fn test_labels() {
        let mut definitions = users_and_tasks(vec![
            ("numberOfUnits", DataType::Integer.into()),
            ("WorkerId", FieldAttributes::new().references("User").into()),
            (
                "note",
                FieldAttributes::typed(DataType::Text).with_label("Remarks").into(),
            ),
        ]);
        let options = DefineOptions::new().with_labels(true);
        let classified = classify_task(&mut definitions, &options).unwrap();

        let label = |field: &str| classified.attributes[field].label.clone().unwrap();
        assert_eq!(label("id"), "ID");
        assert_eq!(label("name"), "Name");
        assert_eq!(label("numberOfUnits"), "Number Of Units");
        assert_eq!(label("WorkerId"), "Worker");
        assert_eq!(label("note"), "Remarks");
    }

    #[test]
    fn test_many_to_many_declarations() {
        let mut definitions = users_and_tasks(vec![]);
        definitions["Task"].many_to_many.insert(
            "User".into(),
            ManyToManyOptions::new().through("Assignment").with_as("Owners").into(),
        );
        definitions["Task"]
            .many_to_many
            .insert("Tag".into(), ManyToManySpec::Disabled);
        let classified = classify_task(&mut definitions, &DefineOptions::default()).unwrap();

        assert_eq!(classified.relationships_many.len(), 1);
        let rel = &classified.relationships_many[0];
        assert_eq!(rel.entity_a, "Task");
        assert_eq!(rel.entity_b, "User");
        assert_eq!(rel.through, Some(Through::Name("Assignment".into())));
        assert_eq!(rel.as_name.as_deref(), Some("Owners"));
    }

    #[test]
    fn test_classification_keeps_settled_entity() {
        let mut definitions = Definitions::new();
        definitions.insert(
            "Tag".into(),
            EntityDefinition::new()
                .with_field("slug", FieldAttributes::typed(DataType::Text).primary_key())
                .with_field("title", DataType::string(80))
                .with_field("weight", DataType::Float),
        );
        let options = DefineOptions::new().with_auto_associate(true);
        let keys = prepare(&mut definitions, &options);
        let classified = classify("Tag", &definitions["Tag"], &definitions, &keys, &options).unwrap();

        let shape: Vec<(&str, Option<DataType>)> = classified
            .attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), attr.data_type.clone()))
            .collect();
        assert_eq!(
            shape,
            [
                ("slug", Some(DataType::Text)),
                ("title", Some(DataType::string(80))),
                ("weight", Some(DataType::Float)),
            ]
        );
        assert!(classified.attributes["slug"].primary_key);
        assert!(classified.relationships_one.is_empty());
    }
}
