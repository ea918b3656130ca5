use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::FilterModel;

pub const PARAM_PER_PAGE: &str = "perPage";
pub const PARAM_PAGE: &str = "page";
pub const PARAM_GENES: &str = "genes[]";
pub const PARAM_PATIENT_ID: &str = "patientId";
pub const PARAM_SEX: &str = "sex";
pub const PARAM_AGE_FROM: &str = "ageFrom";
pub const PARAM_AGE_TO: &str = "ageTo";
pub const PARAM_STAININGS: &str = "stainings[]";
pub const PARAM_INTENSITIES: &str = "intensities[]";
pub const PARAM_QUANTITIES: &str = "quantities[]";
pub const PARAM_LOCATION: &str = "location";
pub const PARAM_TISSUE_DESCRIPTION: &str = "tissueDescription";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
    /// List elements; `None` marks a null entry.
    List(Vec<Option<String>>),
}

/// Query string for one listing request. Built by [`build`], read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams(BTreeMap<&'static str, ParamValue>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn page(&self) -> Option<i64> {
        match self.0.get(PARAM_PAGE) {
            Some(ParamValue::Int(page)) => Some(*page),
            _ => None,
        }
    }

    /// Flattens into `(key, value)` pairs, repeating list keys once per element.
    /// Null list elements are sent as empty values.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            match value {
                ParamValue::Int(number) => pairs.push((key.to_string(), number.to_string())),
                ParamValue::Text(text) => pairs.push((key.to_string(), text.clone())),
                ParamValue::List(items) => {
                    for item in items {
                        pairs.push((key.to_string(), item.clone().unwrap_or_default()));
                    }
                }
            }
        }
        pairs
    }
}

pub fn build(
    filters: &FilterModel,
    genes: &BTreeSet<String>,
    page: u32,
    page_size: u32,
) -> QueryParams {
    let mut params = BTreeMap::new();
    params.insert(PARAM_PER_PAGE, ParamValue::Int(i64::from(page_size)));
    params.insert(PARAM_PAGE, ParamValue::Int(i64::from(page)));

    if !genes.is_empty() {
        params.insert(PARAM_GENES, text_list(genes.iter()));
    }
    if let Some(patient_id) = filters.patient_id {
        params.insert(PARAM_PATIENT_ID, ParamValue::Int(patient_id));
    }
    if let Some(sex) = filters.sex.query_value() {
        params.insert(PARAM_SEX, ParamValue::Text(sex.to_string()));
    }

    params.insert(PARAM_AGE_FROM, ParamValue::Int(i64::from(filters.age.lower())));
    params.insert(PARAM_AGE_TO, ParamValue::Int(i64::from(filters.age.upper())));

    if !filters.staining.is_empty() {
        params.insert(PARAM_STAININGS, text_list(filters.staining.iter()));
    }
    if !filters.intensity.is_empty() {
        params.insert(PARAM_INTENSITIES, text_list(filters.intensity.iter()));
    }
    if !filters.quantity.is_empty() {
        let items = filters
            .quantity
            .iter()
            .map(|quantity| quantity.query_value())
            .collect();
        params.insert(PARAM_QUANTITIES, ParamValue::List(items));
    }
    if let Some(location) = filters.location.as_ref().filter(|v| !v.is_empty()) {
        params.insert(PARAM_LOCATION, ParamValue::Text(location.clone()));
    }
    if let Some(tissue) = filters.tissue_description.as_ref().filter(|v| !v.is_empty()) {
        params.insert(PARAM_TISSUE_DESCRIPTION, ParamValue::Text(tissue.clone()));
    }

    QueryParams(params)
}

fn text_list<'a>(values: impl Iterator<Item = &'a String>) -> ParamValue {
    ParamValue::List(values.map(|value| Some(value.clone())).collect())
}
