use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{info, warn};

use crate::domain::Endpoint;
use crate::error::DashError;
use crate::flatten::ListingPage;
use crate::query::QueryParams;

pub trait ListingClient: Send + Sync {
    /// Issues one GET against `endpoint` and returns the body of a 200 response.
    fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Vec<u8>, DashError>;
}

#[derive(Clone)]
pub struct HttpListingClient {
    client: Client,
    base_url: String,
}

impl HttpListingClient {
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

    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        endpoint_url(&self.base_url, endpoint)
    }
}

impl ListingClient for HttpListingClient {
    fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Vec<u8>, DashError> {
        let url = self.endpoint_url(endpoint);
        info!(%endpoint, page = params.page(), "sample API request");

        let response = self
            .client
            .get(&url)
            .query(&params.to_pairs())
            .send()
            .map_err(|err| {
                warn!(%endpoint, url = %url, error = %err, "sample API request failed");
                DashError::RequestFailed { status: None }
            })?;

        check_status(response.status())?;
        let bytes = response.bytes().map_err(|err| {
            warn!(%endpoint, error = %err, "failed to read sample API response body");
            DashError::RequestFailed { status: None }
        })?;
        Ok(bytes.to_vec())
    }
}

/// Maps a response status onto the listing error taxonomy.
pub fn check_status(status: StatusCode) -> Result<(), DashError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::PAYLOAD_TOO_LARGE => Err(DashError::ResultSetTooLarge),
        other => Err(DashError::RequestFailed {
            status: Some(other.as_u16()),
        }),
    }
}

pub fn endpoint_url(base_url: &str, endpoint: Endpoint) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}{}", endpoint.path())
    } else {
        format!("{base_url}/{}", endpoint.path())
    }
}

pub fn decode_page(body: &[u8]) -> Result<ListingPage, DashError> {
    serde_json::from_slice(body).map_err(|err| DashError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_mapping() {
        assert!(check_status(StatusCode::OK).is_ok());
        assert_matches!(
            check_status(StatusCode::PAYLOAD_TOO_LARGE),
            Err(DashError::ResultSetTooLarge)
        );
        assert_matches!(
            check_status(StatusCode::NOT_FOUND),
            Err(DashError::RequestFailed { status: Some(404) })
        );
        assert_matches!(
            check_status(StatusCode::NO_CONTENT),
            Err(DashError::RequestFailed { status: Some(204) })
        );
    }

    #[test]
    fn endpoint_url_joins_with_single_slash() {
        assert_eq!(
            endpoint_url("http://localhost:8000/", Endpoint::Images),
            "http://localhost:8000/api/samples/images"
        );
        assert_eq!(
            endpoint_url("http://localhost:8000", Endpoint::List),
            "http://localhost:8000/api/samples"
        );
    }

    #[test]
    fn decode_rejects_malformed_body() {
        assert_matches!(decode_page(b"<html>"), Err(DashError::Decode(_)));
    }
}
