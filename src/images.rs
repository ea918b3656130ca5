use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::DashError;

pub trait ImageFetcher: Send + Sync {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DashError>;
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
    base_url: String,
}

impl HttpImageFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("patho-dash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::ConfigParse(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| DashError::ConfigParse(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DashError> {
        let url = resolve_image_url(&self.base_url, url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| DashError::AtlasHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(DashError::AtlasStatus {
                status,
                message: format!("image download failed: {url}"),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| DashError::AtlasHttp(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Manifest entries may be relative to the image host.
pub fn resolve_image_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// Archive member name: last URL path segment, or `image_<n>.jpg` when empty.
pub fn image_file_name(url: &str, index: usize) -> String {
    let path = url.split(['?', '#']).next().unwrap_or("");
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("image_{index}.jpg"),
    }
}

/// Downloads `urls` one after another into an in-memory zip archive.
/// Duplicate member names get a numeric prefix.
pub fn bundle_images<F: ImageFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
) -> Result<Vec<u8>, DashError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();

    for (idx, url) in urls.iter().enumerate() {
        let number = idx + 1;
        let bytes = fetcher.fetch_image(url)?;
        let mut name = image_file_name(url, number);
        if !used.insert(name.clone()) {
            name = format!("{number}_{name}");
            used.insert(name.clone());
        }
        // images are already compressed
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file(name.as_str(), options)
            .map_err(|err| DashError::Export(err.to_string()))?;
        zip.write_all(&bytes)
            .map_err(|err| DashError::Export(err.to_string()))?;
        info!(url = %url, bytes = bytes.len(), "image added to bundle");
    }

    let cursor = zip
        .finish()
        .map_err(|err| DashError::Export(err.to_string()))?;
    Ok(cursor.into_inner())
}
