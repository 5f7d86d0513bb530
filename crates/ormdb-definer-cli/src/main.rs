//! ORMDB Definer Command-Line Tool
//!
//! Defines the models of a definition folder into an in-memory catalog and
//! prints the result.

mod config;
mod formatter;

use clap::Parser;
use config::Args;
use formatter::{create_formatter, Formatter};
use ormdb_definer::{define_from_folder, Catalog};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr so JSON output stays parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ormdb_define=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = create_formatter(args.format);

    match run(&args, formatter.as_ref()) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, formatter: &dyn Formatter) -> ormdb_definer::Result<String> {
    let options = args.define_options()?;
    let mut catalog = Catalog::new().with_timestamps(args.timestamps);

    let defined = define_from_folder(&mut catalog, &args.path, &options)?;
    info!(
        path = %args.path.display(),
        models = defined.models.len(),
        join_models = defined.join_models.len(),
        "definition folder loaded"
    );

    Ok(formatter.format_catalog(&catalog))
}
