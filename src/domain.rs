use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::DashError;

pub const AGE_MAX: u8 = 120;

pub const STAINING_OPTIONS: &[&str] = &["Low", "Medium", "High", "Not detected"];
pub const INTENSITY_OPTIONS: &[&str] = &["Weak", "Moderate", "Strong", "Negative"];
pub const QUANTITY_OPTIONS: &[&str] = &["75%-25%", ">75%", "None", "<25%"];

/// UI text that selects samples with no recorded quantity.
pub const QUANTITY_NOT_RECORDED: &str = "None";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Sex {
    Male,
    Female,
    #[default]
    Any,
}

impl Sex {
    /// Wire value for the `sex` parameter; `None` when unconstrained.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            Sex::Male => Some("MALE"),
            Sex::Female => Some("FEMALE"),
            Sex::Any => None,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
            Sex::Any => write!(f, "Any"),
        }
    }
}

impl FromStr for Sex {
    type Err = DashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "any" | "" => Ok(Sex::Any),
            _ => Err(DashError::InvalidFilter(format!("unknown sex: {value}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    from: u8,
    to: u8,
}

impl AgeRange {
    pub fn new(from: u8, to: u8) -> Result<Self, DashError> {
        if from > to || to > AGE_MAX {
            return Err(DashError::InvalidFilter(format!(
                "age range {from}-{to} must satisfy 0 <= from <= to <= {AGE_MAX}"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn lower(&self) -> u8 {
        self.from
    }

    pub fn upper(&self) -> u8 {
        self.to
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= u32::from(self.from) && age <= u32::from(self.to)
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self {
            from: 0,
            to: AGE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantityFilter {
    Recorded(String),
    NotRecorded,
}

impl QuantityFilter {
    /// Element of the `quantities[]` list; `None` is sent as a null entry.
    pub fn query_value(&self) -> Option<String> {
        match self {
            QuantityFilter::Recorded(value) => Some(value.clone()),
            QuantityFilter::NotRecorded => None,
        }
    }

    pub fn matches(&self, quantity: &str) -> bool {
        match self {
            QuantityFilter::Recorded(value) => value == quantity,
            QuantityFilter::NotRecorded => quantity.trim().is_empty(),
        }
    }
}

impl fmt::Display for QuantityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityFilter::Recorded(value) => write!(f, "{value}"),
            QuantityFilter::NotRecorded => write!(f, "{QUANTITY_NOT_RECORDED}"),
        }
    }
}

impl FromStr for QuantityFilter {
    type Err = DashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DashError::InvalidFilter("empty quantity".to_string()));
        }
        if trimmed == QUANTITY_NOT_RECORDED {
            return Ok(QuantityFilter::NotRecorded);
        }
        Ok(QuantityFilter::Recorded(trimmed.to_string()))
    }
}

/// Validated constraints applied to a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterModel {
    pub patient_id: Option<i64>,
    pub sex: Sex,
    pub age: AgeRange,
    pub staining: BTreeSet<String>,
    pub intensity: BTreeSet<String>,
    pub quantity: BTreeSet<QuantityFilter>,
    pub location: Option<String>,
    pub tissue_description: Option<String>,
}

/// Raw filter values as typed into the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterInput {
    pub patient_id: String,
    pub sex: Sex,
    pub age_from: u8,
    pub age_to: u8,
    pub staining: Vec<String>,
    pub intensity: Vec<String>,
    pub quantity: Vec<String>,
    pub location: String,
    pub tissue_description: String,
}

impl Default for FilterInput {
    fn default() -> Self {
        Self {
            patient_id: String::new(),
            sex: Sex::Any,
            age_from: 0,
            age_to: AGE_MAX,
            staining: Vec::new(),
            intensity: Vec::new(),
            quantity: Vec::new(),
            location: String::new(),
            tissue_description: String::new(),
        }
    }
}

impl TryFrom<FilterInput> for FilterModel {
    type Error = DashError;

    fn try_from(input: FilterInput) -> Result<Self, Self::Error> {
        Ok(FilterModel {
            patient_id: parse_patient_id(&input.patient_id)?,
            sex: input.sex,
            age: AgeRange::new(input.age_from, input.age_to)?,
            staining: category_set(&input.staining),
            intensity: category_set(&input.intensity),
            quantity: input
                .quantity
                .iter()
                .filter(|value| !value.trim().is_empty())
                .map(|value| value.parse::<QuantityFilter>())
                .collect::<Result<BTreeSet<_>, DashError>>()?,
            location: non_blank(input.location),
            tissue_description: non_blank(input.tissue_description),
        })
    }
}

pub fn parse_patient_id(value: &str) -> Result<Option<i64>, DashError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| DashError::InvalidFilter(format!("patient id must be numeric: {value}")))
}

/// Normalizes a gene selection: trims symbols and drops blanks.
pub fn gene_selection<I, S>(genes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    genes
        .into_iter()
        .map(|gene| gene.as_ref().trim().to_string())
        .filter(|gene| !gene.is_empty())
        .collect()
}

fn category_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Endpoint {
    List,
    Csv,
    Excel,
    Images,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::List => "api/samples",
            Endpoint::Excel => "api/samples/download",
            Endpoint::Csv => "api/samples/download/csv",
            Endpoint::Images => "api/samples/images",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::List => write!(f, "list"),
            Endpoint::Csv => write!(f, "csv"),
            Endpoint::Excel => write!(f, "excel"),
            Endpoint::Images => write!(f, "images"),
        }
    }
}
