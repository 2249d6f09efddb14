pub mod copy;
pub mod replace;

use crate::config::LoadMethod;
use crate::layout::Layout;
use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use tokio_postgres::Client;
use tracing::{error, info, warn};

impl LoadMethod {
    /// The one capability a load strategy has: put this file's rows into
    /// the named table, or say why not.
    pub async fn load(
        &self,
        client: &Client,
        path: &Path,
        table: &str,
    ) -> Result<FileOutcome> {
        match self {
            LoadMethod::Replace => replace::load_file(client, path, table).await,
            LoadMethod::Copy => copy::load_file(client, path, table).await,
        }
    }
}

/// Result of loading one CSV file.
pub enum FileOutcome {
    Loaded { rows: u64 },
    /// Streaming copy found no destination table; nothing was created.
    SkippedMissingTable,
}

/// Per-run load counters, reported in the stage's closing log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sorted `*.csv` files under `data_dir`; empty if the directory is missing.
pub fn list_csvs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/*.csv", data_dir.display());
    let mut files = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for CSV discovery")? {
        match entry {
            Ok(p) if p.is_file() => files.push(p),
            Ok(_) => {}
            Err(e) => warn!("cannot read glob entry: {:?}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Destination table name for a CSV file: the file stem, verbatim.
pub fn table_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Load every CSV in `data/` into its same-named table, one file at a time.
///
/// A failure on one file is logged and skips only that file;
/// connection-level errors propagate.
pub async fn load_all(
    client: &Client,
    layout: &Layout,
    method: LoadMethod,
) -> Result<LoadSummary> {
    let files = list_csvs(&layout.data_dir)?;
    info!(
        "loading {} CSV file(s) from `{}` with the {} strategy",
        files.len(),
        layout.data_dir.display(),
        method.as_str()
    );

    let mut summary = LoadSummary::default();
    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(table) = table_name(&path) else {
            warn!("cannot derive a table name from `{}`; skipping", file_name);
            summary.skipped += 1;
            continue;
        };
        info!(" -> {} -> table `{}`", file_name, table);

        match method.load(client, &path, &table).await {
            Ok(FileOutcome::Loaded { rows }) => {
                info!("    loaded {} row(s) into `{}`", rows, table);
                summary.loaded += 1;
            }
            Ok(FileOutcome::SkippedMissingTable) => {
                warn!(
                    "table `{}` does not exist; skipping {} (create it first or set LOAD_METHOD=pandas)",
                    table, file_name
                );
                summary.skipped += 1;
            }
            Err(e) => {
                error!("    load of {} failed: {:#}", file_name, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "load stage done: {} loaded, {} skipped, {} failed",
        summary.loaded, summary.skipped, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn list_csvs_is_sorted_and_filtered() {
        let tmp = tempdir().unwrap();
        for name in ["zeta.csv", "alpha.csv", "notes.txt", "mid.csv"] {
            fs::write(tmp.path().join(name), "a,b\n1,2\n").unwrap();
        }
        let files = list_csvs(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha.csv", "mid.csv", "zeta.csv"]);
    }

    #[test]
    fn list_csvs_of_missing_dir_is_empty() {
        let tmp = tempdir().unwrap();
        let files = list_csvs(&tmp.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn table_name_is_the_file_stem() {
        assert_eq!(
            table_name(Path::new("/data/sales_2024.csv")).unwrap(),
            "sales_2024"
        );
    }
}
