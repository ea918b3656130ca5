use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::FilterModel;
use crate::paging::{PageOutcome, PagedResult, RecordSource, clamp_page};

/// Sequence tag handed out for every listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    seq: u64,
    page: u32,
}

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Per-session view state. The filters and gene selection live as long as the
/// session; `result` and `last_error` are replaced wholesale on every apply or
/// page change.
#[derive(Debug, Default)]
pub struct SessionState {
    filters: FilterModel,
    genes: BTreeSet<String>,
    result: PagedResult,
    last_error: Option<String>,
    issued: u64,
    displayed: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FilterModel {
        &self.filters
    }

    pub fn genes(&self) -> &BTreeSet<String> {
        &self.genes
    }

    pub fn result(&self) -> &PagedResult {
        &self.result
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn displayed_seq(&self) -> u64 {
        self.displayed
    }

    /// Registers a new request for `page`; any older ticket becomes stale.
    pub fn begin(&mut self, page: u32) -> RequestTicket {
        self.issued += 1;
        RequestTicket {
            seq: self.issued,
            page,
        }
    }

    /// Installs `outcome` if `ticket` is the latest issued request.
    /// Returns `false` when the response was stale and dropped.
    pub fn complete(&mut self, ticket: RequestTicket, outcome: PageOutcome) -> bool {
        if ticket.seq != self.issued {
            debug!(
                seq = ticket.seq,
                latest = self.issued,
                "discarding stale listing response"
            );
            return false;
        }
        self.displayed = ticket.seq;
        self.last_error = outcome.error.map(|err| err.user_message());
        self.result = outcome.page;
        true
    }

    /// Replaces the filters and reloads from the first page.
    pub fn apply(
        &mut self,
        source: &dyn RecordSource,
        filters: FilterModel,
        genes: BTreeSet<String>,
    ) -> bool {
        self.filters = filters;
        self.genes = genes;
        self.load(source, 1)
    }

    /// Moves to `page`, clamped against the last known total.
    pub fn goto_page(&mut self, source: &dyn RecordSource, page: i64) -> bool {
        let page = clamp_page(page, self.result.total_items, source.page_size());
        self.load(source, page)
    }

    pub fn next_page(&mut self, source: &dyn RecordSource) -> bool {
        let page = i64::from(self.result.current_page) + 1;
        self.goto_page(source, page)
    }

    pub fn prev_page(&mut self, source: &dyn RecordSource) -> bool {
        let page = i64::from(self.result.current_page) - 1;
        self.goto_page(source, page)
    }

    fn load(&mut self, source: &dyn RecordSource, page: u32) -> bool {
        let ticket = self.begin(page);
        let outcome = source.assemble(&self.filters, &self.genes, ticket.page);
        self.complete(ticket, outcome)
    }
}
