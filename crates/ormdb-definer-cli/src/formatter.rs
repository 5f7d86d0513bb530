//! Output formatters for defined catalogs.

use clap::ValueEnum;
use comfy_table::Table;
use ormdb_definer::{Catalog, Model};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII tables, one per model
    Table,
    /// JSON document of the whole catalog
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format every model of a catalog.
    fn format_catalog(&self, catalog: &Catalog) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_catalog(&self, catalog: &Catalog) -> String {
        if catalog.is_empty() {
            return "No models".to_string();
        }

        catalog
            .models()
            .map(format_model_as_table)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_catalog(&self, catalog: &Catalog) -> String {
        serde_json::to_string_pretty(catalog).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }
}

fn format_model_as_table(model: &Model) -> String {
    let mut attributes = Table::new();
    attributes.set_header(vec!["Attribute", "Type", "Null", "Key", "References", "Label"]);
    for (name, attribute) in &model.attributes {
        let key = if attribute.primary_key {
            if attribute.auto_increment {
                "PK, auto"
            } else {
                "PK"
            }
        } else {
            ""
        };
        let references = attribute
            .references
            .as_ref()
            .map(|r| format!("{}.{}", r.entity, r.key))
            .unwrap_or_default();
        attributes.add_row(vec![
            name.clone(),
            attribute
                .data_type
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            if attribute.allow_null { "yes" } else { "no" }.to_string(),
            key.to_string(),
            references,
            attribute.label.clone().unwrap_or_default(),
        ]);
    }

    let mut output = format!("{} ({})\n{}", model.name, model.table_name, attributes);

    if !model.associations.is_empty() {
        let mut associations = Table::new();
        associations.set_header(vec!["Association", "Kind", "Target", "Foreign Key", "Through"]);
        for association in model.associations.values() {
            associations.add_row(vec![
                association.label.clone(),
                association.kind.to_string(),
                association.target.clone(),
                association.foreign_key.clone(),
                association.through.clone().unwrap_or_default(),
            ]);
        }
        output.push('\n');
        output.push_str(&associations.to_string());
    }

    output
}
