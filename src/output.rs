use std::io::{self, Write};

use serde::Serialize;

use crate::legacy::interactions::InteractionRow;
use crate::paging::PagedResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub path: String,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub gene: String,
    pub ensembl_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionsResult {
    pub gene: String,
    pub interactions: Vec<InteractionRow>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_page(result: &PagedResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_lookup(result: &LookupResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_interactions(result: &InteractionsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Status line text shown under the results table.
pub fn summary_line(result: &PagedResult, page_size: u32) -> String {
    format!(
        "Displaying {} out of {} results (page {}/{})",
        result.records.len(),
        result.total_items,
        result.current_page,
        result.page_count(page_size)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_result_serializes_path_as_string() {
        let local = ExportResult {
            path: "/tmp/exports/samples_20240309_140507.csv".to_string(),
            bytes: 120,
            records: Some(2),
        };
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["path"], "/tmp/exports/samples_20240309_140507.csv");
        assert_eq!(json["bytes"], 120);
        assert_eq!(json["records"], 2);

        let remote = ExportResult {
            records: None,
            ..local
        };
        let json = serde_json::to_value(&remote).unwrap();
        assert!(json.get("records").is_none());
    }

    #[test]
    fn summary_reports_counts_and_pages() {
        let result = PagedResult {
            records: Vec::new(),
            total_items: 250,
            current_page: 2,
        };
        assert_eq!(
            summary_line(&result, 100),
            "Displaying 0 out of 250 results (page 2/3)"
        );
    }
}
