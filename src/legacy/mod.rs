//! Protein atlas ingestion: per-gene XML documents and interaction pages,
//! filtered and paginated in memory.

pub mod atlas;
pub mod document;
pub mod filter;
pub mod interactions;
pub mod markup;

use std::collections::BTreeSet;

use tracing::info;

use crate::domain::FilterModel;
use crate::error::DashError;
use crate::flatten::{FlattenedRecord, flatten};
use crate::paging::{PageOutcome, RecordSource, paginate};

use self::atlas::{AtlasClient, GeneLookup};
use self::document::{GeneDocument, parse_gene_xml};
use self::filter::LocalFilter;
use self::interactions::{InteractionRow, parse_interactions};

pub struct LegacySource<A: AtlasClient> {
    client: A,
    lookup: GeneLookup,
    page_size: u32,
}

impl<A: AtlasClient> LegacySource<A> {
    /// Downloads the gene lookup table once and keeps it for the session.
    pub fn connect(client: A, page_size: u32) -> Result<Self, DashError> {
        let lookup = GeneLookup::fetch(&client)?;
        info!(genes = lookup.len(), "loaded gene lookup table");
        Ok(Self::with_lookup(client, lookup, page_size))
    }

    pub fn with_lookup(client: A, lookup: GeneLookup, page_size: u32) -> Self {
        Self {
            client,
            lookup,
            page_size: page_size.max(1),
        }
    }

    pub fn lookup(&self) -> &GeneLookup {
        &self.lookup
    }

    pub fn document(&self, gene: &str) -> Result<GeneDocument, DashError> {
        let ensembl = self.lookup.ensembl_for(gene)?;
        parse_gene_xml(&self.client.gene_xml(ensembl)?)
    }

    pub fn interactions(&self, gene: &str) -> Result<Vec<InteractionRow>, DashError> {
        let ensembl = self.lookup.ensembl_for(gene)?;
        let html = self.client.interaction_html(ensembl, gene)?;
        Ok(parse_interactions(&html))
    }

    /// Every record for `genes` that passes `filters`, in gene order.
    pub fn records(
        &self,
        filters: &FilterModel,
        genes: &BTreeSet<String>,
    ) -> Result<Vec<FlattenedRecord>, DashError> {
        let filter = LocalFilter::new(filters)?;
        let mut records = Vec::new();
        for gene in genes {
            let document = self.document(gene)?;
            let before = records.len();
            records.extend(filter.apply(document.entries.iter().map(flatten).collect()));
            info!(
                gene = %gene,
                patients = document.entries.len(),
                matched = records.len() - before,
                "parsed gene document"
            );
        }
        Ok(records)
    }
}

impl<A: AtlasClient> RecordSource for LegacySource<A> {
    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn assemble(&self, filters: &FilterModel, genes: &BTreeSet<String>, page: u32) -> PageOutcome {
        match self.records(filters, genes) {
            Ok(records) => PageOutcome::success(paginate(records, i64::from(page), self.page_size)),
            Err(err) => PageOutcome::failure(err),
        }
    }
}
