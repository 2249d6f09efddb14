use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of one pipeline run, relative to a base directory.
///
/// Inputs (`data/`, the query dirs) are expected to pre-exist; output
/// directories are created by [`Layout::ensure_outputs`].
#[derive(Debug, Clone)]
pub struct Layout {
    pub data_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub val_queries_dir: PathBuf,
    pub ana_queries_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Layout {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Layout {
            data_dir: base.join("data"),
            outputs_dir: base.join("outputs"),
            val_queries_dir: base.join("queries_validation"),
            ana_queries_dir: base.join("queries_analysis"),
            log_dir: base.join("run_logs"),
        }
    }

    /// Create `outputs/` and `run_logs/` if they are missing.
    pub fn ensure_outputs(&self) -> Result<()> {
        for dir in [&self.outputs_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating directory `{}`", dir.display()))?;
        }
        Ok(())
    }

    /// Path of the append-only run log.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("run_all.log")
    }

    /// Path of the summary workbook.
    pub fn workbook_path(&self) -> PathBuf {
        self.outputs_dir.join("summary_analysis.xlsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_derives_all_dirs_from_base() {
        let layout = Layout::new("/srv/etl");
        assert_eq!(layout.data_dir, Path::new("/srv/etl/data"));
        assert_eq!(layout.outputs_dir, Path::new("/srv/etl/outputs"));
        assert_eq!(layout.val_queries_dir, Path::new("/srv/etl/queries_validation"));
        assert_eq!(layout.ana_queries_dir, Path::new("/srv/etl/queries_analysis"));
        assert_eq!(layout.log_file(), Path::new("/srv/etl/run_logs/run_all.log"));
        assert_eq!(
            layout.workbook_path(),
            Path::new("/srv/etl/outputs/summary_analysis.xlsx")
        );
    }

    #[test]
    fn ensure_outputs_creates_missing_dirs() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        layout.ensure_outputs().unwrap();
        assert!(layout.outputs_dir.is_dir());
        assert!(layout.log_dir.is_dir());
        // input dirs are not auto-created
        assert!(!layout.data_dir.exists());
    }
}
