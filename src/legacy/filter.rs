use regex::{Regex, RegexBuilder};

use crate::domain::{AgeRange, FilterModel, Sex};
use crate::error::DashError;
use crate::flatten::FlattenedRecord;

/// A [`FilterModel`] compiled for in-memory matching of legacy records.
#[derive(Debug, Clone)]
pub struct LocalFilter {
    filters: FilterModel,
    location: Option<Regex>,
    tissue_description: Option<Regex>,
}

impl LocalFilter {
    pub fn new(filters: &FilterModel) -> Result<Self, DashError> {
        Ok(Self {
            filters: filters.clone(),
            location: compile(filters.location.as_deref(), "location")?,
            tissue_description: compile(filters.tissue_description.as_deref(), "tissue description")?,
        })
    }

    pub fn matches(&self, record: &FlattenedRecord) -> bool {
        let filters = &self.filters;
        if filters.patient_id.is_some_and(|id| id != record.patient_id) {
            return false;
        }
        if filters.sex != Sex::Any && !filters.sex.to_string().eq_ignore_ascii_case(&record.patient_sex) {
            return false;
        }
        if !age_matches(&filters.age, record.patient_age) {
            return false;
        }
        if !filters.staining.is_empty() && !filters.staining.contains(&record.staining) {
            return false;
        }
        if !filters.intensity.is_empty() && !filters.intensity.contains(&record.intensity) {
            return false;
        }
        if !filters.quantity.is_empty()
            && !filters.quantity.iter().any(|q| q.matches(&record.quantity))
        {
            return false;
        }
        if let Some(re) = &self.location
            && !re.is_match(&record.location)
        {
            return false;
        }
        if let Some(re) = &self.tissue_description
            && !re.is_match(&record.tissue_description)
        {
            return false;
        }
        true
    }

    pub fn apply(&self, records: Vec<FlattenedRecord>) -> Vec<FlattenedRecord> {
        records.into_iter().filter(|record| self.matches(record)).collect()
    }
}

/// Records without an age only pass an unconstrained range.
fn age_matches(range: &AgeRange, age: Option<u32>) -> bool {
    match age {
        Some(age) => range.contains(age),
        None => *range == AgeRange::default(),
    }
}

fn compile(pattern: Option<&str>, field: &str) -> Result<Option<Regex>, DashError> {
    let Some(pattern) = pattern.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|err| DashError::InvalidFilter(format!("invalid {field} pattern: {err}")))
}
