use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use tempfile::Builder;

use crate::error::DashError;

/// Directory that receives user-requested exports.
#[derive(Debug, Clone)]
pub struct ExportStore {
    root: Utf8PathBuf,
}

impl ExportStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// `<root>/<stem>_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn timestamped_path(&self, stem: &str, ext: &str, at: DateTime<Local>) -> Utf8PathBuf {
        self.root
            .join(format!("{stem}_{}.{ext}", at.format("%Y%m%d_%H%M%S")))
    }

    pub fn write_export(&self, stem: &str, ext: &str, content: &[u8]) -> Result<Utf8PathBuf, DashError> {
        let path = self.timestamped_path(stem, ext, Local::now());
        Self::write_bytes_atomic(&path, content)?;
        Ok(path)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DashError> {
        let parent = path
            .parent()
            .ok_or_else(|| DashError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DashError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("patho-dash-export")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DashError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| DashError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| DashError::Filesystem(err.error.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamped_names() {
        let store = ExportStore::new(Utf8PathBuf::from("/tmp/exports"));
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let path = store.timestamped_path("samples", "csv", at);
        assert!(path.ends_with("samples_20240309_140507.csv"));
    }
}
