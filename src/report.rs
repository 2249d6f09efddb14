//! Summary workbook: one sheet per source CSV and per result CSV, rebuilt
//! wholesale on every run.

use crate::layout::Layout;
use crate::load::list_csvs;
use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;
use tracing::{error, info};

/// Spreadsheet formats cap sheet names at 31 characters.
const SHEET_NAME_MAX: usize = 31;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub sheets: usize,
    pub skipped: usize,
}

/// Build `outputs/summary_analysis.xlsx` from every source CSV and every
/// result CSV present right now. A file that cannot be turned into a sheet
/// is logged and left out; failing to save the workbook is a stage error.
pub fn build(layout: &Layout) -> Result<ReportSummary> {
    info!("generating {}", layout.workbook_path().display());
    let sources = list_csvs(&layout.data_dir)?;
    let results = list_csvs(&layout.outputs_dir)?;

    let mut workbook = Workbook::new();
    let mut namer = SheetNamer::default();
    let mut summary = ReportSummary::default();

    for path in sources.iter().chain(results.iter()) {
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        let sheet_name = namer.assign(stem);
        match add_sheet(&mut workbook, path, &sheet_name) {
            Ok(rows) => {
                info!("  sheet `{}` ({} row(s))", sheet_name, rows);
                summary.sheets += 1;
            }
            Err(e) => {
                error!("  cannot write sheet for {}: {:#}", path.display(), e);
                summary.skipped += 1;
            }
        }
    }

    workbook
        .save(layout.workbook_path())
        .with_context(|| format!("saving `{}`", layout.workbook_path().display()))?;
    Ok(summary)
}

fn add_sheet(workbook: &mut Workbook, path: &Path, sheet_name: &str) -> Result<usize> {
    // Read the file fully before touching the workbook so an unreadable CSV
    // never leaves a half-built sheet behind.
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening `{}`", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of `{}`", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading `{}`", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;
    write_grid(worksheet, &headers, &rows)?;
    Ok(rows.len())
}

fn write_grid(worksheet: &mut Worksheet, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, header.as_str())?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            worksheet.write_string(r as u32 + 1, col as u16, cell.as_str())?;
        }
    }
    Ok(())
}

/// Derives 31-character sheet names from file stems, disambiguating
/// truncation collisions with a numeric suffix instead of silently
/// dropping a sheet. Uniqueness is case-insensitive, as in Excel.
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn assign(&mut self, stem: &str) -> String {
        let base = truncate_chars(stem, SHEET_NAME_MAX);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }
        for n in 2.. {
            let suffix = format!("_{}", n);
            let keep = SHEET_NAME_MAX.saturating_sub(suffix.len());
            let candidate = format!("{}{}", truncate_chars(stem, keep), suffix);
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
        }
        unreachable!()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn short_stems_pass_through() {
        let mut namer = SheetNamer::default();
        assert_eq!(namer.assign("sales"), "sales");
    }

    #[test]
    fn long_stems_are_truncated_to_31_chars() {
        let mut namer = SheetNamer::default();
        let name = namer.assign("a_very_long_dataset_name_that_keeps_going");
        assert_eq!(name.chars().count(), 31);
        assert_eq!(name, "a_very_long_dataset_name_that_k");
    }

    #[test]
    fn truncation_collisions_get_numeric_suffixes() {
        let mut namer = SheetNamer::default();
        let first = namer.assign("a_very_long_dataset_name_that_keeps_going");
        let second = namer.assign("a_very_long_dataset_name_that_kept_going");
        assert_ne!(first, second);
        assert_eq!(second, "a_very_long_dataset_name_that_2");
        assert!(second.chars().count() <= 31);
    }

    #[test]
    fn uniqueness_is_case_insensitive() {
        let mut namer = SheetNamer::default();
        assert_eq!(namer.assign("Sales"), "Sales");
        assert_eq!(namer.assign("sales"), "sales_2");
    }

    #[test]
    fn workbook_collects_source_and_result_sheets() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        layout.ensure_outputs().unwrap();
        fs::create_dir_all(&layout.data_dir).unwrap();
        fs::write(layout.data_dir.join("cities.csv"), "name,pop\noslo,717710\n").unwrap();
        fs::write(
            layout.outputs_dir.join("val_counts.csv"),
            "table,rows\ncities,1\n",
        )
        .unwrap();

        let summary = build(&layout).unwrap();
        assert_eq!(summary, ReportSummary { sheets: 2, skipped: 0 });
        assert!(layout.workbook_path().is_file());
    }

    #[test]
    fn unreadable_files_are_skipped_not_fatal() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        layout.ensure_outputs().unwrap();
        fs::create_dir_all(&layout.data_dir).unwrap();
        // ragged rows make the csv reader error out mid-file
        fs::write(layout.data_dir.join("bad.csv"), "a,b\n1,2,3\n").unwrap();
        fs::write(layout.data_dir.join("good.csv"), "a,b\n1,2\n").unwrap();

        let summary = build(&layout).unwrap();
        assert_eq!(summary, ReportSummary { sheets: 1, skipped: 1 });
        assert!(layout.workbook_path().is_file());
    }
}
