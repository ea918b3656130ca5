use std::collections::BTreeSet;

use serde::Serialize;
use tracing::info;

use crate::api::{ListingClient, decode_page};
use crate::domain::{Endpoint, FilterModel};
use crate::error::DashError;
use crate::flatten::{FlattenedRecord, ListingPage, flatten};
use crate::query;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult {
    pub records: Vec<FlattenedRecord>,
    pub total_items: u64,
    pub current_page: u32,
}

impl PagedResult {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_items: 0,
            current_page: 1,
        }
    }

    pub fn page_count(&self, page_size: u32) -> u32 {
        page_count(self.total_items, page_size)
    }
}

impl Default for PagedResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of one fetch-flatten cycle. On failure `page` is empty and `error` is set.
#[derive(Debug)]
pub struct PageOutcome {
    pub page: PagedResult,
    pub error: Option<DashError>,
}

impl PageOutcome {
    pub fn success(page: PagedResult) -> Self {
        Self { page, error: None }
    }

    pub fn failure(error: DashError) -> Self {
        Self {
            page: PagedResult::empty(),
            error: Some(error),
        }
    }
}

/// Anything able to produce one page of flattened records for a filter set.
pub trait RecordSource {
    fn page_size(&self) -> u32;

    fn assemble(&self, filters: &FilterModel, genes: &BTreeSet<String>, page: u32) -> PageOutcome;
}

pub struct ApiSource<C: ListingClient> {
    client: C,
    page_size: u32,
}

impl<C: ListingClient> ApiSource<C> {
    pub fn new(client: C, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetches a server-side export (`csv`, `excel` or `images`) for the same filters.
    pub fn download(
        &self,
        endpoint: Endpoint,
        filters: &FilterModel,
        genes: &BTreeSet<String>,
    ) -> Result<Vec<u8>, DashError> {
        let params = query::build(filters, genes, 1, self.page_size);
        self.client.fetch(endpoint, &params)
    }
}

impl<C: ListingClient> RecordSource for ApiSource<C> {
    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn assemble(&self, filters: &FilterModel, genes: &BTreeSet<String>, page: u32) -> PageOutcome {
        assemble(&self.client, filters, genes, page, self.page_size)
    }
}

pub fn assemble<C: ListingClient + ?Sized>(
    client: &C,
    filters: &FilterModel,
    genes: &BTreeSet<String>,
    page: u32,
    page_size: u32,
) -> PageOutcome {
    let requested = page.max(1);
    let mut current_page = requested;
    let mut listing = match fetch_listing(client, filters, genes, current_page, page_size) {
        Ok(listing) => listing,
        Err(err) => return PageOutcome::failure(err),
    };

    // Past the last page: fetch the last one so records and label agree.
    let last = page_count(listing.total_items, page_size);
    if current_page > last {
        info!(requested, last, "requested page past the end, loading last page");
        current_page = last;
        listing = match fetch_listing(client, filters, genes, current_page, page_size) {
            Ok(listing) => listing,
            Err(err) => return PageOutcome::failure(err),
        };
    }

    let records = listing.data.iter().map(flatten).collect::<Vec<_>>();
    info!(
        page = current_page,
        records = records.len(),
        total_items = listing.total_items,
        "assembled sample page"
    );
    PageOutcome::success(PagedResult {
        records,
        total_items: listing.total_items,
        current_page: clamp_page(i64::from(current_page), listing.total_items, page_size),
    })
}

fn fetch_listing<C: ListingClient + ?Sized>(
    client: &C,
    filters: &FilterModel,
    genes: &BTreeSet<String>,
    page: u32,
    page_size: u32,
) -> Result<ListingPage, DashError> {
    let params = query::build(filters, genes, page, page_size);
    client
        .fetch(Endpoint::List, &params)
        .and_then(|body| decode_page(&body))
}

/// Number of pages for `total_items`; never less than one.
pub fn page_count(total_items: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Clamps a requested page into `[1, page_count]`.
pub fn clamp_page(requested: i64, total_items: u64, page_size: u32) -> u32 {
    let last = i64::from(page_count(total_items, page_size));
    requested.clamp(1, last) as u32
}

/// Applies the same paging math to records that are already in memory.
pub fn paginate(
    records: Vec<FlattenedRecord>,
    requested: i64,
    page_size: u32,
) -> PagedResult {
    let total_items = records.len() as u64;
    let current_page = clamp_page(requested, total_items, page_size);
    let size = page_size.max(1) as usize;
    let start = (current_page as usize - 1) * size;
    let records = records.into_iter().skip(start).take(size).collect();
    PagedResult {
        records,
        total_items,
        current_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 100), 1);
        assert_eq!(page_count(100, 100), 1);
        assert_eq!(page_count(101, 100), 2);
        assert_eq!(page_count(250, 100), 3);
    }

    #[test]
    fn clamp_handles_extremes() {
        assert_eq!(clamp_page(i64::MIN, 10, 5), 1);
        assert_eq!(clamp_page(i64::MAX, 10, 5), 2);
        assert_eq!(clamp_page(2, 0, 5), 1);
    }
}
