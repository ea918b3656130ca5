use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Row cap the sample API enforces on bulk exports.
pub const EXPORT_ROW_CAP: usize = 20_000;

#[derive(Debug, Error, Diagnostic)]
pub enum DashError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("sample API base URL is not configured (set API_URL or api_url in patho-dash.json)")]
    #[diagnostic(help("use --legacy to browse the per-gene XML pages instead"))]
    MissingApiUrl,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("request failed{}", status_suffix(.status))]
    RequestFailed { status: Option<u16> },

    #[error("result set too large (export cap is {} rows)", EXPORT_ROW_CAP)]
    #[diagnostic(help("narrow the filters: fewer genes, a patient id or a tighter age range"))]
    ResultSetTooLarge,

    #[error("failed to decode sample listing: {0}")]
    Decode(String),

    #[error("protein atlas request failed: {0}")]
    AtlasHttp(String),

    #[error("protein atlas returned status {status}: {message}")]
    AtlasStatus { status: u16, message: String },

    #[error("failed to parse protein atlas document: {0}")]
    AtlasParse(String),

    #[error("gene not found in lookup table: {0}")]
    GeneNotFound(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DashError {
    /// Short message for the dashboard status line.
    pub fn user_message(&self) -> String {
        match self {
            DashError::ResultSetTooLarge => format!(
                "Too many results, please apply more filters (max {EXPORT_ROW_CAP})"
            ),
            DashError::RequestFailed { .. } => "Request failed".to_string(),
            other => other.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_mentions_status_when_known() {
        let err = DashError::RequestFailed { status: Some(502) };
        assert_eq!(err.to_string(), "request failed with status 502");

        let err = DashError::RequestFailed { status: None };
        assert_eq!(err.to_string(), "request failed");
    }

    #[test]
    fn too_large_has_distinct_user_message() {
        let too_large = DashError::ResultSetTooLarge.user_message();
        let failed = DashError::RequestFailed { status: Some(500) }.user_message();
        assert!(too_large.contains("more filters"));
        assert_ne!(too_large, failed);
    }
}
