//! Options of a definition call.

use crate::definition::{Definitions, EntityDefinition, FieldSpec};
use crate::error::Result;
use crate::folder;
use crate::types::{DataType, ReferentialAction};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Default name of a synthesized primary key.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// What a computed option value gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionContext<'a> {
    /// Name of the entity being defined.
    pub entity: &'a str,
    /// Its definition.
    pub definition: &'a EntityDefinition,
    /// Every definition of the call.
    pub definitions: &'a Definitions,
}

/// An option that is either a literal or computed per entity.
pub enum Value<T> {
    Literal(T),
    Computed(Arc<dyn Fn(&DefinitionContext<'_>) -> T + Send + Sync>),
}

impl<T: Clone> Value<T> {
    /// Wrap a function computing the value from the entity being defined.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&DefinitionContext<'_>) -> T + Send + Sync + 'static,
    {
        Value::Computed(Arc::new(f))
    }

    /// Resolve the value for an entity.
    pub fn resolve(&self, ctx: &DefinitionContext<'_>) -> T {
        match self {
            Value::Literal(value) => value.clone(),
            Value::Computed(f) => f(ctx),
        }
    }
}

impl<T> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Value::Literal(value)
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        match self {
            Value::Literal(value) => Value::Literal(value.clone()),
            Value::Computed(f) => Value::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Value::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Options of folder loading.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Prefix entity names with their parent directory names.
    pub flatten_prefix: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            flatten_prefix: false,
        }
    }
}

/// Options of a definition call.
#[derive(Debug, Clone)]
pub struct DefineOptions {
    /// Name of synthesized primary keys. `None` disables key synthesis.
    pub primary_key: Option<Value<String>>,
    /// Type of synthesized primary keys, also used for foreign keys whose
    /// target key type is unknown.
    pub primary_key_type: DataType,
    /// Extra attributes merged into synthesized primary keys.
    pub primary_key_attributes: IndexMap<String, serde_json::Value>,
    /// Put synthesized primary keys first instead of last.
    pub primary_key_first: bool,
    /// Give join entities a synthesized primary key.
    pub primary_key_through: bool,
    /// Infer references from field names matching `<Entity><Key>`.
    pub auto_associate: bool,
    /// Give join entities `belongs_to` associations to both sides.
    pub associate_through: bool,
    /// Fields added to every entity that does not mention them.
    pub fields: IndexMap<String, Value<FieldSpec>>,
    /// Attach human readable labels to every attribute.
    pub labels: bool,
    /// Use entity names as table names. `None` defers to the registry.
    pub freeze_table_name: Option<bool>,
    /// Lower camel case names for synthesized join entities.
    pub camel_through: bool,
    /// Do not add default fields to synthesized join entities.
    pub skip_fields_on_through: bool,
    /// Default delete action of relationships.
    pub on_delete: Option<ReferentialAction>,
    /// Default update action of relationships.
    pub on_update: Option<ReferentialAction>,
    /// Options of folder loading.
    pub load_options: LoadOptions,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            primary_key: Some(Value::Literal(DEFAULT_PRIMARY_KEY.to_string())),
            primary_key_type: DataType::Integer,
            primary_key_attributes: IndexMap::new(),
            primary_key_first: false,
            primary_key_through: false,
            auto_associate: false,
            associate_through: false,
            fields: IndexMap::new(),
            labels: false,
            freeze_table_name: None,
            camel_through: false,
            skip_fields_on_through: false,
            on_delete: None,
            on_update: None,
            load_options: LoadOptions::default(),
        }
    }
}

impl DefineOptions {
    /// Create options with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name of synthesized primary keys.
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(Value::Literal(name.into()));
        self
    }

    /// Do not synthesize primary keys.
    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = None;
        self
    }

    /// Compute the name of synthesized primary keys per entity.
    pub fn with_primary_key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&DefinitionContext<'_>) -> String + Send + Sync + 'static,
    {
        self.primary_key = Some(Value::computed(f));
        self
    }

    /// Set the type of synthesized primary keys.
    pub fn with_primary_key_type(mut self, data_type: DataType) -> Self {
        self.primary_key_type = data_type;
        self
    }

    /// Add an extra attribute to synthesized primary keys.
    pub fn with_primary_key_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.primary_key_attributes.insert(name.into(), value.into());
        self
    }

    /// Put synthesized primary keys first.
    pub fn with_primary_key_first(mut self, first: bool) -> Self {
        self.primary_key_first = first;
        self
    }

    /// Give join entities a primary key.
    pub fn with_primary_key_through(mut self, enabled: bool) -> Self {
        self.primary_key_through = enabled;
        self
    }

    /// Infer references from field names.
    pub fn with_auto_associate(mut self, enabled: bool) -> Self {
        self.auto_associate = enabled;
        self
    }

    /// Associate join entities with both sides.
    pub fn with_associate_through(mut self, enabled: bool) -> Self {
        self.associate_through = enabled;
        self
    }

    /// Add a default field.
    pub fn with_field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.fields.insert(name.into(), Value::Literal(spec.into()));
        self
    }

    /// Add a default field computed per entity. Returning
    /// [`FieldSpec::Omitted`] skips the field for that entity.
    pub fn with_field_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&DefinitionContext<'_>) -> FieldSpec + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Value::computed(f));
        self
    }

    /// Attach labels.
    pub fn with_labels(mut self, enabled: bool) -> Self {
        self.labels = enabled;
        self
    }

    /// Freeze table names.
    pub fn with_freeze_table_name(mut self, freeze: bool) -> Self {
        self.freeze_table_name = Some(freeze);
        self
    }

    /// Camel case join entity names.
    pub fn with_camel_through(mut self, enabled: bool) -> Self {
        self.camel_through = enabled;
        self
    }

    /// Skip default fields on synthesized join entities.
    pub fn with_skip_fields_on_through(mut self, enabled: bool) -> Self {
        self.skip_fields_on_through = enabled;
        self
    }

    /// Set the default delete action.
    pub fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Set the default update action.
    pub fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Set the folder loading options.
    pub fn with_load_options(mut self, load_options: LoadOptions) -> Self {
        self.load_options = load_options;
        self
    }
}

/// `primaryKey` in an options file: a key name, or `false` for no
/// synthesized keys. `true` keeps the default name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeySetting {
    Enabled(bool),
    Name(String),
}

/// Serialized form of [`DefineOptions`], read from JSON or TOML.
///
/// Computed values cannot be expressed here; set them on the converted
/// options instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OptionsFile {
    pub primary_key: Option<PrimaryKeySetting>,
    pub primary_key_type: Option<DataType>,
    #[serde(default)]
    pub primary_key_attributes: IndexMap<String, serde_json::Value>,
    pub primary_key_first: Option<bool>,
    pub primary_key_through: Option<bool>,
    pub auto_associate: Option<bool>,
    pub associate_through: Option<bool>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    pub labels: Option<bool>,
    pub freeze_table_name: Option<bool>,
    pub camel_through: Option<bool>,
    pub skip_fields_on_through: Option<bool>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
    pub load_options: Option<LoadOptions>,
}

impl OptionsFile {
    /// Read an options file. The format follows the extension (`.json` or
    /// `.toml`).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        folder::read_document(path.as_ref())
    }
}

impl From<OptionsFile> for DefineOptions {
    fn from(file: OptionsFile) -> Self {
        let defaults = DefineOptions::default();
        Self {
            primary_key: match file.primary_key {
                Some(PrimaryKeySetting::Name(name)) => Some(Value::Literal(name)),
                Some(PrimaryKeySetting::Enabled(false)) => None,
                Some(PrimaryKeySetting::Enabled(true)) | None => defaults.primary_key,
            },
            primary_key_type: file.primary_key_type.unwrap_or(defaults.primary_key_type),
            primary_key_attributes: file.primary_key_attributes,
            primary_key_first: file.primary_key_first.unwrap_or(defaults.primary_key_first),
            primary_key_through: file
                .primary_key_through
                .unwrap_or(defaults.primary_key_through),
            auto_associate: file.auto_associate.unwrap_or(defaults.auto_associate),
            associate_through: file.associate_through.unwrap_or(defaults.associate_through),
            fields: file
                .fields
                .into_iter()
                .map(|(name, spec)| (name, Value::Literal(spec)))
                .collect(),
            labels: file.labels.unwrap_or(defaults.labels),
            freeze_table_name: file.freeze_table_name,
            camel_through: file.camel_through.unwrap_or(defaults.camel_through),
            skip_fields_on_through: file
                .skip_fields_on_through
                .unwrap_or(defaults.skip_fields_on_through),
            on_delete: file.on_delete,
            on_update: file.on_update,
            load_options: file.load_options.unwrap_or(defaults.load_options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for<'a>(
        entity: &'a str,
        definition: &'a EntityDefinition,
        definitions: &'a Definitions,
    ) -> DefinitionContext<'a> {
        DefinitionContext {
            entity,
            definition,
            definitions,
        }
    }

    fn primary_key_for(options: &DefineOptions, entity: &str) -> Option<String> {
        let definition = EntityDefinition::new();
        let definitions = Definitions::new();
        options
            .primary_key
            .as_ref()
            .map(|key| key.resolve(&context_for(entity, &definition, &definitions)))
    }

    #[test]
    fn test_defaults() {
        let options = DefineOptions::default();
        assert_eq!(primary_key_for(&options, "User").as_deref(), Some("id"));
        assert_eq!(options.primary_key_type, DataType::Integer);
        assert!(!options.primary_key_first);
        assert!(options.freeze_table_name.is_none());
        assert!(options.load_options.recursive);
    }

    #[test]
    fn test_computed_primary_key() {
        let options = DefineOptions::new().with_primary_key_fn(|ctx| format!("{}Id", ctx.entity));
        assert_eq!(primary_key_for(&options, "User").as_deref(), Some("UserId"));
        assert_eq!(format!("{:?}", options.primary_key), "Some(Computed(..))");

        let options = DefineOptions::new().without_primary_key();
        assert_eq!(primary_key_for(&options, "User"), None);
    }

    #[test]
    fn test_options_file_disables_primary_key() {
        let file: OptionsFile = serde_json::from_str(r#"{ "primaryKey": false }"#).unwrap();
        assert_eq!(file.primary_key, Some(PrimaryKeySetting::Enabled(false)));
        assert_eq!(primary_key_for(&DefineOptions::from(file), "User"), None);

        let file: OptionsFile = toml::from_str("primaryKey = true").unwrap();
        assert_eq!(primary_key_for(&DefineOptions::from(file), "User").as_deref(), Some("id"));
    }

    #[test]
    fn test_options_file_conversion() {
        let file: OptionsFile = serde_json::from_str(
            r#"{
                "primaryKey": "uid",
                "primaryKeyType": "UUID",
                "primaryKeyFirst": true,
                "fields": { "moon": "STRING" },
                "onDelete": "cascade",
                "loadOptions": { "flattenPrefix": true }
            }"#,
        )
        .unwrap();
        let options = DefineOptions::from(file);
        let definition = EntityDefinition::new();
        let definitions = Definitions::new();

        assert_eq!(primary_key_for(&options, "User").as_deref(), Some("uid"));
        assert_eq!(options.primary_key_type, DataType::Uuid);
        assert!(options.primary_key_first);
        assert!(!options.auto_associate);
        assert_eq!(options.on_delete, Some(ReferentialAction::Cascade));
        assert!(options.load_options.flatten_prefix);
        assert!(options.load_options.recursive);
        assert_eq!(
            options.fields["moon"].resolve(&context_for("User", &definition, &definitions)),
            FieldSpec::Type(DataType::String(None))
        );
    }

    #[test]
    fn test_options_file_from_toml() {
        let file: OptionsFile = toml::from_str(
            r#"
            autoAssociate = true
            freezeTableName = true

            [primaryKeyAttributes]
            comment = "surrogate"
            "#,
        )
        .unwrap();
        assert_eq!(file.auto_associate, Some(true));
        assert_eq!(file.freeze_table_name, Some(true));
        assert_eq!(file.primary_key_attributes["comment"], "surrogate");
    }

    #[test]
    fn test_options_file_rejects_unknown_keys() {
        let result = serde_json::from_str::<OptionsFile>(r#"{ "primaryKeys": "id" }"#);
        assert!(result.is_err());
    }
}
