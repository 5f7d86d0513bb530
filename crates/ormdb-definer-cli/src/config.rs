//! Command-line arguments.

use crate::formatter::OutputFormat;
use clap::Parser;
use ormdb_definer::{DefineOptions, LoadOptions, OptionsFile};
use std::path::PathBuf;

/// Command-line arguments for the definer.
#[derive(Parser, Debug)]
#[command(name = "ormdb-define")]
#[command(version, about = "Define ORMDB models from a folder of definitions", long_about = None)]
pub struct Args {
    /// Folder holding one JSON or TOML definition file per entity.
    pub path: PathBuf,

    /// Options file (JSON or TOML). Flags given on the command line win.
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Name of synthesized primary keys.
    #[arg(long)]
    pub primary_key: Option<String>,

    /// Put synthesized primary keys first.
    #[arg(long)]
    pub primary_key_first: bool,

    /// Infer references from `<Entity>Id` field names.
    #[arg(long)]
    pub auto_associate: bool,

    /// Attach human readable labels to attributes.
    #[arg(long)]
    pub labels: bool,

    /// Use entity names as table names.
    #[arg(long)]
    pub freeze_table_name: bool,

    /// Lower camel case join entity names.
    #[arg(long)]
    pub camel_through: bool,

    /// Prefix entity names with their folder names.
    #[arg(long)]
    pub flatten_prefix: bool,

    /// Do not descend into subfolders.
    #[arg(long)]
    pub no_recursive: bool,

    /// Add createdAt/updatedAt columns to every model.
    #[arg(long)]
    pub timestamps: bool,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,
}

impl Args {
    /// Build the definition options: the options file, if any, with the
    /// command-line flags applied on top.
    pub fn define_options(&self) -> ormdb_definer::Result<DefineOptions> {
        let mut options = match &self.options {
            Some(path) => DefineOptions::from(OptionsFile::from_path(path)?),
            None => DefineOptions::default(),
        };

        if let Some(primary_key) = &self.primary_key {
            options = options.with_primary_key(primary_key.clone());
        }
        if self.primary_key_first {
            options = options.with_primary_key_first(true);
        }
        if self.auto_associate {
            options = options.with_auto_associate(true);
        }
        if self.labels {
            options = options.with_labels(true);
        }
        if self.freeze_table_name {
            options = options.with_freeze_table_name(true);
        }
        if self.camel_through {
            options = options.with_camel_through(true);
        }

        let mut load_options: LoadOptions = options.load_options.clone();
        if self.flatten_prefix {
            load_options.flatten_prefix = true;
        }
        if self.no_recursive {
            load_options.recursive = false;
        }
        Ok(options.with_load_options(load_options))
    }
}
