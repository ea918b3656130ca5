use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::error::DashError;

pub const LOOKUP_URL: &str = "https://www.proteinatlas.org/search?format=tsv";

pub trait AtlasClient: Send + Sync {
    fn lookup_tsv(&self) -> Result<String, DashError>;
    fn gene_xml(&self, ensembl_id: &str) -> Result<String, DashError>;
    fn interaction_html(&self, ensembl_id: &str, gene: &str) -> Result<String, DashError>;
}

#[derive(Clone)]
pub struct AtlasHttpClient {
    client: Client,
    version: String,
}

impl AtlasHttpClient {
    pub fn new(version: &str, timeout: Duration) -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("patho-dash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::AtlasHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| DashError::AtlasHttp(err.to_string()))?;
        Ok(Self {
            client,
            version: version.to_string(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, DashError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| DashError::AtlasHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "protein atlas request failed".to_string());
            return Err(DashError::AtlasStatus { status, message });
        }
        response
            .text()
            .map_err(|err| DashError::AtlasHttp(err.to_string()))
    }
}

impl AtlasClient for AtlasHttpClient {
    fn lookup_tsv(&self) -> Result<String, DashError> {
        self.get_text(LOOKUP_URL)
    }

    fn gene_xml(&self, ensembl_id: &str) -> Result<String, DashError> {
        self.get_text(&gene_xml_url(ensembl_id, &self.version))
    }

    fn interaction_html(&self, ensembl_id: &str, gene: &str) -> Result<String, DashError> {
        self.get_text(&interaction_url(ensembl_id, gene, &self.version))
    }
}

fn host(version: &str) -> &str {
    if version == "latest" { "www" } else { version }
}

pub fn gene_xml_url(ensembl_id: &str, version: &str) -> String {
    format!("https://{}.proteinatlas.org/{ensembl_id}.xml", host(version))
}

pub fn interaction_url(ensembl_id: &str, gene: &str, version: &str) -> String {
    format!(
        "https://{}.proteinatlas.org/{ensembl_id}-{gene}/interaction",
        host(version)
    )
}

#[derive(Debug, Deserialize)]
struct LookupRow {
    #[serde(rename = "Gene")]
    gene: String,
    #[serde(rename = "Ensembl")]
    ensembl: String,
}

/// Gene symbol to Ensembl id, from the atlas TSV search export.
#[derive(Debug, Clone, Default)]
pub struct GeneLookup {
    entries: BTreeMap<String, String>,
}

impl GeneLookup {
    pub fn parse_tsv(content: &str) -> Result<Self, DashError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut entries = BTreeMap::new();
        for row in reader.deserialize::<LookupRow>() {
            let row = row.map_err(|err| DashError::AtlasParse(err.to_string()))?;
            let gene = row.gene.trim();
            if gene.is_empty() {
                continue;
            }
            entries
                .entry(gene.to_string())
                .or_insert_with(|| row.ensembl.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn fetch<A: AtlasClient + ?Sized>(client: &A) -> Result<Self, DashError> {
        Self::parse_tsv(&client.lookup_tsv()?)
    }

    pub fn ensembl_for(&self, gene: &str) -> Result<&str, DashError> {
        self.entries
            .get(gene)
            .map(String::as_str)
            .ok_or_else(|| DashError::GeneNotFound(gene.to_string()))
    }

    /// Sorted gene symbols, as offered in the gene picker.
    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_url_maps_latest_to_www() {
        assert_eq!(
            gene_xml_url("ENSG00000151491", "latest"),
            "https://www.proteinatlas.org/ENSG00000151491.xml"
        );
        assert_eq!(
            gene_xml_url("ENSG00000151491", "v22"),
            "https://v22.proteinatlas.org/ENSG00000151491.xml"
        );
        assert_eq!(
            interaction_url("ENSG00000151491", "EPS8", "latest"),
            "https://www.proteinatlas.org/ENSG00000151491-EPS8/interaction"
        );
    }
}
