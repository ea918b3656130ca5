use std::collections::BTreeSet;
use std::sync::Mutex;

use assert_matches::assert_matches;

use patho_dash::api::ListingClient;
use patho_dash::domain::{AgeRange, Endpoint, FilterModel, gene_selection};
use patho_dash::error::DashError;
use patho_dash::flatten::FlattenedRecord;
use patho_dash::paging::{ApiSource, PagedResult, RecordSource, clamp_page, paginate};
use patho_dash::query::QueryParams;

const LISTING: &str = include_str!("fixtures/listing_page.json");

enum Reply {
    Body(&'static str),
    TooLarge,
    Status(u16),
}

struct RecordingClient {
    reply: Reply,
    requests: Mutex<Vec<(Endpoint, Vec<(String, String)>)>>,
}

impl RecordingClient {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(Endpoint, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ListingClient for RecordingClient {
    fn fetch(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Vec<u8>, DashError> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint, params.to_pairs()));
        match self.reply {
            Reply::Body(body) => Ok(body.as_bytes().to_vec()),
            Reply::TooLarge => Err(DashError::ResultSetTooLarge),
            Reply::Status(status) => Err(DashError::RequestFailed {
                status: Some(status),
            }),
        }
    }
}

fn tp53_filters() -> (FilterModel, BTreeSet<String>) {
    let filters = FilterModel {
        age: AgeRange::new(0, 100).unwrap(),
        ..FilterModel::default()
    };
    (filters, gene_selection(["TP53"]))
}

#[test]
fn tp53_page_end_to_end() {
    let source = ApiSource::new(RecordingClient::new(Reply::Body(LISTING)), 100);
    let (filters, genes) = tp53_filters();

    let outcome = source.assemble(&filters, &genes, 1);
    assert!(outcome.error.is_none());

    let requests = source.client().requests();
    assert_eq!(requests.len(), 1);
    let (endpoint, pairs) = &requests[0];
    assert_eq!(*endpoint, Endpoint::List);
    let sent: BTreeSet<(&str, &str)> = pairs
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    assert_eq!(
        sent,
        BTreeSet::from([
            ("genes[]", "TP53"),
            ("perPage", "100"),
            ("page", "1"),
            ("ageFrom", "0"),
            ("ageTo", "100"),
        ])
    );

    let page = outcome.page;
    assert_eq!(page.total_items, 1);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.records.len(), 1);
    let record = &page.records[0];
    assert_eq!(record.gene_name, "TP53");
    assert_eq!(record.patient_id, 2110);
    assert_eq!(record.patient_age, Some(71));
    assert_eq!(record.tissue_description, "ABC");
    assert_eq!(record.image_urls().len(), 3);
}

#[test]
fn too_large_yields_empty_page_and_error() {
    let source = ApiSource::new(RecordingClient::new(Reply::TooLarge), 100);
    let (filters, genes) = tp53_filters();

    let outcome = source.assemble(&filters, &genes, 4);
    assert_eq!(outcome.page, PagedResult::empty());
    assert_matches!(outcome.error, Some(DashError::ResultSetTooLarge));
}

#[test]
fn other_status_is_request_failure() {
    let source = ApiSource::new(RecordingClient::new(Reply::Status(500)), 100);
    let outcome = source.assemble(&FilterModel::default(), &BTreeSet::new(), 1);
    assert!(outcome.page.records.is_empty());
    assert_matches!(
        outcome.error,
        Some(DashError::RequestFailed { status: Some(500) })
    );
}

#[test]
fn malformed_body_is_decode_error() {
    let source = ApiSource::new(RecordingClient::new(Reply::Body("{\"data\": 3}")), 100);
    let outcome = source.assemble(&FilterModel::default(), &BTreeSet::new(), 1);
    assert_matches!(outcome.error, Some(DashError::Decode(_)));
}

#[test]
fn download_uses_first_page_and_endpoint() {
    let source = ApiSource::new(RecordingClient::new(Reply::Body("a,b\n")), 100);
    let (filters, genes) = tp53_filters();

    let body = source.download(Endpoint::Csv, &filters, &genes).unwrap();
    assert_eq!(body, b"a,b\n");
    let requests = source.client().requests();
    assert_eq!(requests[0].0, Endpoint::Csv);
    assert!(
        requests[0]
            .1
            .contains(&("page".to_string(), "1".to_string()))
    );
}

#[test]
fn clamp_page_bounds() {
    assert_eq!(clamp_page(10, 250, 100), 3);
    assert_eq!(clamp_page(0, 250, 100), 1);
    assert_eq!(clamp_page(-4, 250, 100), 1);
    assert_eq!(clamp_page(2, 250, 100), 2);
    assert_eq!(clamp_page(5, 0, 100), 1);
}

fn numbered(count: i64) -> Vec<FlattenedRecord> {
    (1..=count)
        .map(|id| FlattenedRecord {
            staining: String::new(),
            intensity: String::new(),
            quantity: String::new(),
            location: String::new(),
            patient_id: id,
            patient_age: None,
            patient_sex: String::new(),
            gene_name: "TP53".to_string(),
            tissue_description: String::new(),
            images: String::new(),
        })
        .collect()
}

#[test]
fn paginate_slices_in_memory_records() {
    let page = paginate(numbered(25), 3, 10);
    assert_eq!(page.total_items, 25);
    assert_eq!(page.current_page, 3);
    let ids: Vec<_> = page.records.iter().map(|r| r.patient_id).collect();
    assert_eq!(ids, (21..=25).collect::<Vec<_>>());

    let past_end = paginate(numbered(25), 99, 10);
    assert_eq!(past_end.current_page, 3);
    assert_eq!(past_end.records.len(), 5);
}

/// Serves `total_items` patients, numbered from 1, 100 per page.
struct PagedServer {
    total_items: u64,
    pages: Mutex<Vec<i64>>,
}

impl ListingClient for PagedServer {
    fn fetch(&self, _endpoint: Endpoint, params: &QueryParams) -> Result<Vec<u8>, DashError> {
        let page = params.page().unwrap();
        self.pages.lock().unwrap().push(page);
        let first = (page - 1) * 100 + 1;
        let last = (page * 100).min(self.total_items as i64);
        let data = (first..=last)
            .map(|id| {
                serde_json::json!({
                    "patient": {"id": id, "age": 50, "sex": "Male"},
                    "gene": {"name": "TP53"},
                    "samples": []
                })
            })
            .collect::<Vec<_>>();
        let body = serde_json::json!({"totalItems": self.total_items, "data": data});
        Ok(body.to_string().into_bytes())
    }
}

#[test]
fn page_past_the_end_loads_last_page() {
    let source = ApiSource::new(
        PagedServer {
            total_items: 250,
            pages: Mutex::new(Vec::new()),
        },
        100,
    );

    let outcome = source.assemble(&FilterModel::default(), &BTreeSet::new(), 10);
    assert!(outcome.error.is_none());
    assert_eq!(*source.client().pages.lock().unwrap(), vec![10, 3]);

    let page = outcome.page;
    assert_eq!(page.current_page, 3);
    assert_eq!(page.total_items, 250);
    let ids: Vec<_> = page.records.iter().map(|r| r.patient_id).collect();
    assert_eq!(ids, (201..=250).collect::<Vec<_>>());
}

#[test]
fn page_within_range_is_fetched_once() {
    let source = ApiSource::new(
        PagedServer {
            total_items: 250,
            pages: Mutex::new(Vec::new()),
        },
        100,
    );

    let outcome = source.assemble(&FilterModel::default(), &BTreeSet::new(), 2);
    assert_eq!(*source.client().pages.lock().unwrap(), vec![2]);
    assert_eq!(outcome.page.current_page, 2);
    assert_eq!(outcome.page.records.len(), 100);
    assert_eq!(outcome.page.records[0].patient_id, 101);
}
