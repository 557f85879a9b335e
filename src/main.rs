use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use converge::cli::{self, Command};
use converge::output::{self, ImportReport};
use converge::registry::{AdapterRegistry, ImportItem};
use converge::types::SystemEntity;

/// Extensions considered importable when expanding directories.
const IMPORTABLE_EXTENSIONS: [&str; 4] = ["csv", "tsv", "json", "tm7"];

/// Expand paths: directories are walked for importable files, plain files
/// pass through untouched.
fn expand_paths(paths: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();
    for path in paths {
        if Path::new(path).is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(std::result::Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let importable = entry
                    .path()
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .is_some_and(|ext| IMPORTABLE_EXTENSIONS.contains(&ext.as_str()));
                if importable {
                    expanded.push(entry.path().display().to_string());
                }
            }
        } else {
            expanded.push(path.clone());
        }
    }
    expanded
}

fn load_catalog(path: &str) -> Result<Vec<SystemEntity>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read entity catalog '{path}'"))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse entity catalog '{path}'"))
}

fn write_output(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output to '{path}'"))?;
            eprintln!("Output written to {path}");
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse args early to get verbose flag for logging initialization
    let args = cli::Args::parse();

    // RUST_LOG wins over --verbose when set
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("converge=debug")
    } else {
        EnvFilter::new("converge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let registry = AdapterRegistry::new();

    match args.command {
        Command::Detect { target } => {
            let content = fs::read_to_string(&target)
                .with_context(|| format!("Failed to read '{target}'"))?;
            match registry.detect_format(Some(&target), Some(&content)) {
                Some(format_id) => {
                    write_output(&format!("{format_id}\n"), args.output.as_deref())?;
                }
                None => bail!("Format not detected for '{target}'; specify one with import --format"),
            }
        }

        Command::Import { target, format, entities } => {
            let content = fs::read_to_string(&target)
                .with_context(|| format!("Failed to read '{target}'"))?;
            let mut item = ImportItem::new(target.clone(), content).with_file_name(target.clone());
            if let Some(format_id) = format {
                item = item.with_hint(format_id);
            }
            let outcome = registry.import_item(&item);
            debug!(item = %outcome.item_id, success = outcome.success, "import finished");

            let reconciliation = match (&entities, &outcome.analysis, &outcome.format) {
                (Some(catalog_path), Some(analysis), Some(format_id)) => {
                    let catalog = load_catalog(catalog_path)?;
                    registry
                        .get(format_id)
                        .map(|adapter| adapter.map_to_entities(analysis, &catalog))
                }
                _ => None,
            };

            let report = ImportReport { outcome: &outcome, reconciliation: reconciliation.as_ref() };
            let rendered = output::render_import(&report, &args.format_output)?;
            write_output(&rendered, args.output.as_deref())?;

            if !outcome.success {
                bail!(
                    "Import of '{target}' failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Command::Batch { paths, format } => {
            let mut items = Vec::new();
            for path in expand_paths(&paths) {
                match fs::read_to_string(&path) {
                    Ok(content) => {
                        let mut item =
                            ImportItem::new(path.clone(), content).with_file_name(path.clone());
                        if let Some(format_id) = &format {
                            item = item.with_hint(format_id.clone());
                        }
                        items.push(item);
                    }
                    Err(e) => warn!(path = %path, error = %e, "skipping unreadable file"),
                }
            }
            if items.is_empty() {
                bail!("No importable files found");
            }

            let outcomes = registry.batch_import(&items);
            let rendered = output::render_batch(&outcomes, &args.format_output)?;
            write_output(&rendered, args.output.as_deref())?;
        }
    }

    Ok(())
}
