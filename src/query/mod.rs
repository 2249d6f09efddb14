//! Query batch runner: execute every `*.sql` file in a directory and export
//! each result set to `{prefix}{stem}.csv`.

use anyhow::{Context, Result};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_postgres::{Client, SimpleQueryMessage};
use tracing::{error, info, warn};

/// Per-directory counters, reported in the stage's closing log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QuerySummary {
    pub executed: usize,
    pub failed: usize,
}

/// Sorted `*.sql` files in `sql_dir`.
pub fn list_queries(sql_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.sql", sql_dir.display());
    let mut files = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for query discovery")? {
        match entry {
            Ok(p) if p.is_file() => files.push(p),
            Ok(_) => {}
            Err(e) => warn!("cannot read glob entry: {:?}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Result CSV name for one query file: `{prefix}{stem}.csv`.
pub fn result_file_name(prefix: &str, query_path: &Path) -> Option<String> {
    query_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| format!("{}{}.csv", prefix, stem))
}

/// Run every query file in `sql_dir`, writing one result CSV per file into
/// `out_dir`. A SQL error in one file is logged and does not stop the rest.
/// A missing directory skips the whole stage with a warning.
pub async fn run_dir(
    client: &Client,
    sql_dir: &Path,
    prefix: &str,
    out_dir: &Path,
) -> Result<QuerySummary> {
    if !sql_dir.is_dir() {
        warn!("query directory `{}` does not exist; skipping", sql_dir.display());
        return Ok(QuerySummary::default());
    }

    let files = list_queries(sql_dir)?;
    info!(
        "executing {} query file(s) from `{}`",
        files.len(),
        sql_dir.display()
    );

    let mut summary = QuerySummary::default();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!(" -> executing {}", name);
        match run_one(client, &path, prefix, out_dir).await {
            Ok((out_name, rows)) => {
                info!("    exported: {} ({} row(s))", out_name, rows);
                summary.executed += 1;
            }
            Err(e) => {
                error!("    {} failed: {:#}", name, e);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

async fn run_one(
    client: &Client,
    path: &Path,
    prefix: &str,
    out_dir: &Path,
) -> Result<(String, usize)> {
    let out_name = result_file_name(prefix, path)
        .with_context(|| format!("`{}` has no usable file stem", path.display()))?;
    let sql_text =
        fs::read_to_string(path).with_context(|| format!("reading `{}`", path.display()))?;

    // The simple-query protocol returns every value as text, which is
    // exactly the shape a CSV export needs.
    let messages = client
        .simple_query(&sql_text)
        .await
        .with_context(|| format!("executing `{}`", path.display()))?;
    let (headers, rows) = collect_rows(messages);

    let out_path = out_dir.join(&out_name);
    write_result_csv(&out_path, &headers, &rows)
        .with_context(|| format!("writing `{}`", out_path.display()))?;
    Ok((out_name, rows.len()))
}

fn collect_rows(
    messages: Vec<SimpleQueryMessage>,
) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for msg in messages {
        match msg {
            SimpleQueryMessage::RowDescription(columns) => {
                headers = columns.iter().map(|c| c.name().to_string()).collect();
            }
            SimpleQueryMessage::Row(row) => {
                if headers.is_empty() {
                    headers = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                rows.push(
                    (0..row.len())
                        .map(|i| row.get(i).map(str::to_string))
                        .collect(),
                );
            }
            SimpleQueryMessage::CommandComplete(_) => {}
            _ => {}
        }
    }
    (headers, rows)
}

/// Write one result set as CSV, NULLs as empty cells. A statement that
/// produced no row set yields an empty file.
pub fn write_result_csv(
    out_path: &Path,
    headers: &[String],
    rows: &[Vec<Option<String>>],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(out_path)?;
    if !headers.is_empty() {
        writer.write_record(headers)?;
    }
    for row in rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn result_file_name_joins_prefix_and_stem() {
        assert_eq!(
            result_file_name("val_", Path::new("queries/check_rows.sql")).unwrap(),
            "val_check_rows.csv"
        );
        assert_eq!(
            result_file_name("ana_", Path::new("top_products.sql")).unwrap(),
            "ana_top_products.csv"
        );
    }

    #[test]
    fn list_queries_is_sorted() {
        let tmp = tempdir().unwrap();
        for name in ["20_totals.sql", "10_counts.sql", "readme.md"] {
            fs::write(tmp.path().join(name), "SELECT 1;").unwrap();
        }
        let files = list_queries(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["10_counts.sql", "20_totals.sql"]);
    }

    #[test]
    fn write_result_csv_renders_nulls_as_empty_cells() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("out.csv");
        write_result_csv(
            &out,
            &["id".into(), "name".into()],
            &[
                vec![Some("1".into()), Some("ana".into())],
                vec![Some("2".into()), None],
            ],
        )
        .unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(text, "id,name\n1,ana\n2,\n");
    }

    #[test]
    fn write_result_csv_with_no_row_set_is_an_empty_file() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("empty.csv");
        write_result_csv(&out, &[], &[]).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }
}
