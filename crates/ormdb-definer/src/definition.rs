//! Declarative entity definitions.
//!
//! These are the caller-facing inputs of a definition call. They can be built
//! in code with the `with_*` builders or deserialized from JSON/TOML files
//! (camelCase keys, shorthand type tokens, `false` as the suppression marker).

use crate::registry::ModelOptions;
use crate::types::{DataType, ReferentialAction};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Entity definitions keyed by entity name, in definition order.
pub type Definitions = IndexMap<String, EntityDefinition>;

/// One entity to be registered as a model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    /// Field specifications, in column order.
    pub fields: IndexMap<String, FieldSpec>,
    /// Options passed through to the registry.
    #[serde(default)]
    pub options: ModelOptions,
    /// Many-to-many declarations keyed by the other entity's name.
    #[serde(default)]
    pub many_to_many: IndexMap<String, ManyToManySpec>,
    /// Name of the primary key field, filled in by key resolution.
    #[serde(skip)]
    pub primary_key: Option<String>,
}

/// Specification of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Shorthand: just a type token.
    Type(DataType),
    /// Full attribute object.
    Attributes(Box<FieldAttributes>),
    /// Suppression marker. Removes the field, including a default field of
    /// the same name.
    Omitted,
}

/// Attributes of a field given in object form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAttributes {
    /// Storage type. Reference fields get theirs from the referenced key.
    #[serde(rename = "type", default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub allow_null: Option<bool>,
    /// Entity this field points to.
    #[serde(default)]
    pub reference: Reference,
    /// `"one"` or `"many"`: whether the referenced side sees one or many of
    /// this entity. Validated during classification.
    #[serde(default)]
    pub reference_type: Option<String>,
    /// Field on the referenced entity, defaulting to its primary key.
    #[serde(default)]
    pub references_key: Option<String>,
    /// Label of the association from this entity to the referenced one.
    #[serde(rename = "as", default)]
    pub as_name: Option<String>,
    /// Label of the association from the referenced entity back to this one.
    #[serde(default)]
    pub as_reverse: Option<String>,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
    /// Human readable label.
    #[serde(default)]
    pub label: Option<String>,
    /// Any other attribute, passed through to the registry.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Reference declaration of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Reference {
    /// No explicit reference: eligible for naming-convention inference.
    #[default]
    Auto,
    /// `reference: false`: never a relationship.
    Suppressed,
    /// Points to the named entity.
    Entity(String),
}

/// A many-to-many declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum ManyToManySpec {
    /// Declared as `false`; ignored.
    Disabled,
    /// Declared as `true` or with options.
    Enabled(ManyToManyOptions),
}

/// Options of a many-to-many declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManyToManyOptions {
    /// Join entity to use or create.
    #[serde(default)]
    pub through: Option<Through>,
    /// Label of the association from the declaring entity.
    #[serde(rename = "as", default)]
    pub as_name: Option<String>,
    /// Label of the association from the other entity.
    #[serde(default)]
    pub as_reverse: Option<String>,
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

/// The join entity of a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Through {
    /// A named entity. Reused if registered, created otherwise.
    Name(String),
    /// An inline definition whose fields are added to the synthesized join
    /// entity.
    Definition(Box<EntityDefinition>),
}

impl EntityDefinition {
    /// Create an entity definition with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.insert(name.into(), spec.into());
        self
    }

    /// Set the registry options.
    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare a many-to-many relationship with another entity.
    pub fn with_many_to_many(
        mut self,
        other: impl Into<String>,
        spec: impl Into<ManyToManySpec>,
    ) -> Self {
        self.many_to_many.insert(other.into(), spec.into());
        self
    }

    /// Type of the given field, if it declares one.
    pub fn field_type(&self, name: &str) -> Option<&DataType> {
        self.fields.get(name).and_then(FieldSpec::data_type)
    }

    /// Names of entities this definition uses as an explicit join entity.
    pub fn through_names(&self) -> impl Iterator<Item = &str> {
        self.many_to_many.values().filter_map(|spec| match spec {
            ManyToManySpec::Enabled(ManyToManyOptions {
                through: Some(Through::Name(name)),
                ..
            }) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl FieldSpec {
    /// Declared storage type.
    pub fn data_type(&self) -> Option<&DataType> {
        match self {
            FieldSpec::Type(ty) => Some(ty),
            FieldSpec::Attributes(attrs) => attrs.data_type.as_ref(),
            FieldSpec::Omitted => None,
        }
    }

    /// Check if the field is flagged as the primary key.
    pub fn is_primary_key(&self) -> bool {
        matches!(self, FieldSpec::Attributes(attrs) if attrs.primary_key)
    }

    /// Check if the field is the suppression marker.
    pub fn is_omitted(&self) -> bool {
        matches!(self, FieldSpec::Omitted)
    }

    /// Object form of the spec. Shorthand types expand to attributes with
    /// only a type.
    pub fn to_attributes(&self) -> Option<FieldAttributes> {
        match self {
            FieldSpec::Type(ty) => Some(FieldAttributes::typed(ty.clone())),
            FieldSpec::Attributes(attrs) => Some((**attrs).clone()),
            FieldSpec::Omitted => None,
        }
    }
}

impl From<DataType> for FieldSpec {
    fn from(ty: DataType) -> Self {
        FieldSpec::Type(ty)
    }
}

impl From<FieldAttributes> for FieldSpec {
    fn from(attrs: FieldAttributes) -> Self {
        FieldSpec::Attributes(Box::new(attrs))
    }
}

impl FieldAttributes {
    /// Create attributes with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create attributes with a storage type.
    pub fn typed(data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// Flag as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Point at another entity.
    pub fn references(mut self, entity: impl Into<String>) -> Self {
        self.reference = Reference::Entity(entity.into());
        self
    }

    /// Opt out of reference inference.
    pub fn no_reference(mut self) -> Self {
        self.reference = Reference::Suppressed;
        self
    }

    /// Set the reference type token (`"one"` or `"many"`).
    pub fn with_reference_type(mut self, reference_type: impl Into<String>) -> Self {
        self.reference_type = Some(reference_type.into());
        self
    }

    /// Point at a specific key of the referenced entity.
    pub fn with_references_key(mut self, key: impl Into<String>) -> Self {
        self.references_key = Some(key.into());
        self
    }

    /// Label of the association to the referenced entity.
    pub fn with_as(mut self, name: impl Into<String>) -> Self {
        self.as_name = Some(name.into());
        self
    }

    /// Label of the association back from the referenced entity.
    pub fn with_as_reverse(mut self, name: impl Into<String>) -> Self {
        self.as_reverse = Some(name.into());
        self
    }

    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn with_allow_null(mut self, allow_null: bool) -> Self {
        self.allow_null = Some(allow_null);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl ManyToManySpec {
    /// A declaration with default options.
    pub fn enabled() -> Self {
        ManyToManySpec::Enabled(ManyToManyOptions::default())
    }
}

impl From<bool> for ManyToManySpec {
    fn from(enabled: bool) -> Self {
        if enabled {
            ManyToManySpec::enabled()
        } else {
            ManyToManySpec::Disabled
        }
    }
}

impl From<ManyToManyOptions> for ManyToManySpec {
    fn from(options: ManyToManyOptions) -> Self {
        ManyToManySpec::Enabled(options)
    }
}

impl ManyToManyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use (or create) the named join entity.
    pub fn through(mut self, name: impl Into<String>) -> Self {
        self.through = Some(Through::Name(name.into()));
        self
    }

    /// Add the fields of an inline definition to the synthesized join entity.
    pub fn through_definition(mut self, definition: EntityDefinition) -> Self {
        self.through = Some(Through::Definition(Box::new(definition)));
        self
    }

    pub fn with_as(mut self, name: impl Into<String>) -> Self {
        self.as_name = Some(name.into());
        self
    }

    pub fn with_as_reverse(mut self, name: impl Into<String>) -> Self {
        self.as_reverse = Some(name.into());
        self
    }

    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

// Object forms are deserialized directly so errors inside them keep their
// message instead of collapsing into an untagged mismatch.
impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(false) => Ok(FieldSpec::Omitted),
            serde_json::Value::Bool(true) => Err(D::Error::custom(
                "`true` is not a field specification; use a type or an object",
            )),
            serde_json::Value::String(token) => token
                .parse()
                .map(FieldSpec::Type)
                .map_err(D::Error::custom),
            value @ serde_json::Value::Object(_) => FieldAttributes::deserialize(value)
                .map(|attrs| FieldSpec::Attributes(Box::new(attrs)))
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a type token, an attribute object or `false`, found {}",
                other
            ))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Flag(bool),
    Entity(String),
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RawReference>::deserialize(deserializer)? {
            None | Some(RawReference::Flag(true)) => Reference::Auto,
            Some(RawReference::Flag(false)) => Reference::Suppressed,
            Some(RawReference::Entity(name)) => Reference::Entity(name),
        })
    }
}

impl<'de> Deserialize<'de> for ManyToManySpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(enabled) => Ok(enabled.into()),
            value @ serde_json::Value::Object(_) => ManyToManyOptions::deserialize(value)
                .map(ManyToManySpec::Enabled)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected `true`, `false` or an options object, found {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let task = EntityDefinition::new()
            .with_field("name", DataType::string(50))
            .with_field("UserId", FieldAttributes::new().references("User"))
            .with_many_to_many("Tag", true);

        assert_eq!(task.fields.len(), 2);
        assert_eq!(task.field_type("name"), Some(&DataType::string(50)));
        assert_eq!(task.field_type("UserId"), None);
        assert_eq!(task.many_to_many["Tag"], ManyToManySpec::enabled());
        assert!(task.primary_key.is_none());
    }

    #[test]
    fn test_field_order_is_preserved() {
        let entity = EntityDefinition::new()
            .with_field("zeta", DataType::Text)
            .with_field("alpha", DataType::Text)
            .with_field("mid", DataType::Text);

        let names: Vec<&str> = entity.fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_deserialize_shorthand_and_object_fields() {
        let entity: EntityDefinition = serde_json::from_str(
            r#"{
                "fields": {
                    "name": "STRING(50)",
                    "WorkerId": { "reference": "User", "referenceType": "one", "as": "Worker" },
                    "legacyId": { "type": "INTEGER", "reference": false },
                    "moon": false
                }
            }"#,
        )
        .unwrap();

        assert_eq!(entity.fields["name"], FieldSpec::Type(DataType::string(50)));
        assert!(entity.fields["moon"].is_omitted());

        let worker = entity.fields["WorkerId"].to_attributes().unwrap();
        assert_eq!(worker.reference, Reference::Entity("User".into()));
        assert_eq!(worker.reference_type.as_deref(), Some("one"));
        assert_eq!(worker.as_name.as_deref(), Some("Worker"));

        let legacy = entity.fields["legacyId"].to_attributes().unwrap();
        assert_eq!(legacy.reference, Reference::Suppressed);
        assert_eq!(legacy.data_type, Some(DataType::Integer));
    }

    #[test]
    fn test_deserialize_keeps_extra_attributes() {
        let spec: FieldSpec =
            serde_json::from_str(r#"{ "type": "TEXT", "comment": "free form", "unique": true }"#)
                .unwrap();
        let attrs = spec.to_attributes().unwrap();
        assert_eq!(attrs.extra["comment"], serde_json::json!("free form"));
        assert_eq!(attrs.extra["unique"], serde_json::json!(true));
    }

    #[test]
    fn test_deserialize_many_to_many() {
        let entity: EntityDefinition = serde_json::from_str(
            r#"{
                "fields": {},
                "manyToMany": {
                    "User": true,
                    "Tag": false,
                    "Task": { "through": "Join", "as": "DoBefores", "asReverse": "DoAfters" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(entity.many_to_many["User"], ManyToManySpec::enabled());
        assert_eq!(entity.many_to_many["Tag"], ManyToManySpec::Disabled);
        let through: Vec<&str> = entity.through_names().collect();
        assert_eq!(through, ["Join"]);
    }

    #[test]
    fn test_invalid_action_keeps_token_context() {
        let err = serde_json::from_str::<EntityDefinition>(
            r#"{"fields":{"UserId":{"reference":"User","onDelete":"bogus"}}}"#,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("invalid token 'bogus'"), "{}", err);
        assert!(!err.contains("untagged"), "{}", err);
    }

    #[test]
    fn test_invalid_action_in_many_to_many_options() {
        let err = serde_json::from_str::<ManyToManySpec>(r#"{ "onUpdate": "sideways" }"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid token 'sideways'"), "{}", err);
    }

    #[test]
    fn test_true_is_not_a_field() {
        let result = serde_json::from_str::<FieldSpec>("true");
        assert!(result.is_err());
    }

    #[test]
    fn test_primary_key_flag() {
        assert!(FieldSpec::from(FieldAttributes::typed(DataType::Uuid).primary_key()).is_primary_key());
        assert!(!FieldSpec::from(DataType::Uuid).is_primary_key());
        assert!(!FieldSpec::Omitted.is_primary_key());
    }
}
