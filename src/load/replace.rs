//! Replace strategy: read the whole CSV into memory, drop and recreate the
//! destination table, and bulk-insert the rows. Destructive by contract.

use super::FileOutcome;
use crate::db::quote_ident;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio_postgres::types::ToSql;
use tokio_postgres::Client;
use tracing::debug;

/// Keep multi-row INSERT statements well under the wire-protocol limit of
/// 65535 bind parameters.
const MAX_PARAMS_PER_INSERT: usize = 8192;

/// Narrowest SQL type that accepts every non-empty value of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bigint,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Bigint => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }
}

/// One CSV file held in memory. Empty cells are `None` and load as NULL.
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

pub async fn load_file(client: &Client, path: &Path, table: &str) -> Result<FileOutcome> {
    let data = read_csv(path)?;
    if data.headers.is_empty() {
        bail!("`{}` has no header row", path.display());
    }
    let types = infer_column_types(&data);
    debug!("inferred column types for `{}`: {:?}", table, types);

    let quoted = quote_ident(table);
    client
        .execute(format!("DROP TABLE IF EXISTS {}", quoted).as_str(), &[])
        .await
        .with_context(|| format!("dropping table {}", quoted))?;
    client
        .execute(build_create_table(table, &data.headers, &types).as_str(), &[])
        .await
        .with_context(|| format!("creating table {}", quoted))?;

    let cols = data.headers.len();
    let rows_per_batch = (MAX_PARAMS_PER_INSERT / cols).max(1);
    let mut inserted: u64 = 0;
    for chunk in data.rows.chunks(rows_per_batch) {
        let sql = build_insert(table, &data.headers, chunk.len());
        let mut owned: Vec<Box<dyn ToSql + Sync>> = Vec::with_capacity(chunk.len() * cols);
        for row in chunk {
            if row.len() != cols {
                bail!(
                    "row with {} field(s) does not match header width {}",
                    row.len(),
                    cols
                );
            }
            for (cell, ty) in row.iter().zip(&types) {
                owned.push(bind_value(cell.as_deref(), *ty)?);
            }
        }
        let params: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref()).collect();
        inserted += client
            .execute(sql.as_str(), &params)
            .await
            .with_context(|| format!("inserting into {}", quoted))?;
    }

    Ok(FileOutcome::Loaded { rows: inserted })
}

/// Read a CSV file fully into memory, mapping empty cells to `None`.
pub fn read_csv(path: &Path) -> Result<CsvTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening `{}`", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of `{}`", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading `{}`", path.display()))?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok(CsvTable { headers, rows })
}

/// Infer one type per column over all of its non-empty values.
pub fn infer_column_types(data: &CsvTable) -> Vec<ColumnType> {
    (0..data.headers.len())
        .map(|col| {
            infer_column_type(
                data.rows
                    .iter()
                    .filter_map(|row| row.get(col).and_then(|c| c.as_deref())),
            )
        })
        .collect()
}

fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut seen_any = false;
    let mut int_ok = true;
    let mut float_ok = true;
    let mut bool_ok = true;
    for v in values {
        seen_any = true;
        int_ok = int_ok && v.trim().parse::<i64>().is_ok();
        float_ok = float_ok && v.trim().parse::<f64>().is_ok();
        bool_ok = bool_ok && parse_bool(v).is_some();
        if !int_ok && !float_ok && !bool_ok {
            return ColumnType::Text;
        }
    }
    if !seen_any {
        // all-empty column; TEXT accepts anything a later run might bring
        return ColumnType::Text;
    }
    if int_ok {
        ColumnType::Bigint
    } else if float_ok {
        ColumnType::Double
    } else if bool_ok {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" => Some(true),
        "false" | "f" => Some(false),
        _ => None,
    }
}

fn bind_value(cell: Option<&str>, ty: ColumnType) -> Result<Box<dyn ToSql + Sync>> {
    Ok(match (cell, ty) {
        (None, ColumnType::Bigint) => Box::new(None::<i64>),
        (None, ColumnType::Double) => Box::new(None::<f64>),
        (None, ColumnType::Boolean) => Box::new(None::<bool>),
        (None, ColumnType::Text) => Box::new(None::<String>),
        (Some(v), ColumnType::Bigint) => Box::new(
            v.trim()
                .parse::<i64>()
                .with_context(|| format!("`{}` is not a BIGINT", v))?,
        ),
        (Some(v), ColumnType::Double) => Box::new(
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("`{}` is not a DOUBLE PRECISION", v))?,
        ),
        (Some(v), ColumnType::Boolean) => Box::new(
            parse_bool(v).with_context(|| format!("`{}` is not a BOOLEAN", v))?,
        ),
        (Some(v), ColumnType::Text) => Box::new(v.to_string()),
    })
}

pub fn build_create_table(table: &str, headers: &[String], types: &[ColumnType]) -> String {
    let columns: Vec<String> = headers
        .iter()
        .zip(types)
        .map(|(h, t)| format!("{} {}", quote_ident(h), t.sql()))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        columns.join(", ")
    )
}

pub fn build_insert(table: &str, headers: &[String], row_count: usize) -> String {
    let cols = headers.len();
    let column_list: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
    let mut groups = Vec::with_capacity(row_count);
    for r in 0..row_count {
        let placeholders: Vec<String> =
            (1..=cols).map(|c| format!("${}", r * cols + c)).collect();
        groups.push(format!("({})", placeholders.join(", ")));
    }
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        column_list.join(", "),
        groups.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn col(values: &[&str]) -> ColumnType {
        infer_column_type(values.iter().copied())
    }

    #[test]
    fn integer_columns_become_bigint() {
        assert_eq!(col(&["1", "-42", "0"]), ColumnType::Bigint);
    }

    #[test]
    fn mixed_numeric_columns_become_double() {
        assert_eq!(col(&["1", "2.5"]), ColumnType::Double);
    }

    #[test]
    fn boolean_columns_are_detected() {
        assert_eq!(col(&["true", "F", "t"]), ColumnType::Boolean);
    }

    #[test]
    fn anything_else_falls_back_to_text() {
        assert_eq!(col(&["1", "apple"]), ColumnType::Text);
        assert_eq!(col(&[]), ColumnType::Text);
    }

    #[test]
    fn create_table_quotes_table_and_columns() {
        let sql = build_create_table(
            "orders",
            &["id".into(), "total".into()],
            &[ColumnType::Bigint, ColumnType::Double],
        );
        assert_eq!(
            sql,
            "CREATE TABLE \"orders\" (\"id\" BIGINT, \"total\" DOUBLE PRECISION)"
        );
    }

    #[test]
    fn insert_numbers_placeholders_across_rows() {
        let sql = build_insert("t", &["a".into(), "b".into()], 2);
        assert_eq!(
            sql,
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn read_csv_maps_empty_cells_to_none() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("sample.csv");
        fs::write(&path, "id,name\n1,ana\n2,\n").unwrap();
        let data = read_csv(&path).unwrap();
        assert_eq!(data.headers, vec!["id", "name"]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[1][1], None);
    }

    #[test]
    fn inference_runs_per_column() {
        let data = CsvTable {
            headers: vec!["id".into(), "label".into()],
            rows: vec![
                vec![Some("1".into()), Some("x".into())],
                vec![Some("2".into()), None],
            ],
        };
        assert_eq!(
            infer_column_types(&data),
            vec![ColumnType::Bigint, ColumnType::Text]
        );
    }
}
