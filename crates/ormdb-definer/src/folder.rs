//! Loading definitions from a folder tree.
//!
//! Every `.json` or `.toml` file holds one entity definition, named after the
//! file stem. Entries are visited in file name order so the resulting map is
//! deterministic.

use crate::config::LoadOptions;
use crate::definition::{Definitions, EntityDefinition};
use crate::error::{DefinerError, Error, Result};
use heck::ToUpperCamelCase;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported definition file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("json") {
            Some(Format::Json)
        } else if extension.eq_ignore_ascii_case("toml") {
            Some(Format::Toml)
        } else {
            None
        }
    }
}

/// Read a JSON or TOML document, picking the format from the extension.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = Format::from_path(path)
        .ok_or_else(|| Error::parse(path, "expected a .json or .toml file"))?;
    let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    match format {
        Format::Json => serde_json::from_str(&text).map_err(|err| Error::parse(path, err)),
        Format::Toml => toml::from_str(&text).map_err(|err| Error::parse(path, err)),
    }
}

/// Load one definition file.
pub fn load_definition(path: &Path, name: &str) -> Result<EntityDefinition> {
    let document: serde_json::Value = read_document(path)?;
    if !document.get("fields").is_some_and(serde_json::Value::is_object) {
        return Err(DefinerError::missing_fields(name).into());
    }
    serde_json::from_value(document).map_err(|err| Error::parse(path, err))
}

/// Load every definition under `root` into one map.
pub fn load_definitions(root: &Path, options: &LoadOptions) -> Result<Definitions> {
    let mut definitions = Definitions::new();
    load_dir(root, &mut Vec::new(), options, &mut definitions)?;
    debug!(root = %root.display(), count = definitions.len(), "loaded definitions");
    Ok(definitions)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(|err| Error::io(dir, err))?;
    entries.sort();
    Ok(entries)
}

fn load_dir(
    dir: &Path,
    prefix: &mut Vec<String>,
    options: &LoadOptions,
    definitions: &mut Definitions,
) -> Result<()> {
    for path in sorted_entries(dir)? {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if options.recursive {
                prefix.push(file_name.to_upper_camel_case());
                load_dir(&path, prefix, options, definitions)?;
                prefix.pop();
            }
            continue;
        }

        if Format::from_path(&path).is_none() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let name = if options.flatten_prefix {
            format!("{}{}", prefix.concat(), stem)
        } else {
            stem.to_string()
        };
        if definitions.contains_key(&name) {
            return Err(DefinerError::duplicate_entity(&name).into());
        }

        let definition = load_definition(&path, &name)?;
        debug!(entity = %name, path = %path.display(), "loaded definition");
        definitions.insert(name, definition);
    }
    Ok(())
}
