use crate::error::DashError;
use crate::flatten::{Gene, ListingEntry, Patient, Sample};
use crate::legacy::markup::{self, Element};

/// Pathology records and names parsed from one per-gene atlas XML document.
#[derive(Debug, Clone, Default)]
pub struct GeneDocument {
    pub name: String,
    pub synonyms: Vec<String>,
    pub entries: Vec<ListingEntry>,
}

impl GeneDocument {
    /// Gene name followed by its synonyms.
    pub fn names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        names.extend(self.synonyms.iter().cloned());
        names
    }
}

pub fn parse_gene_xml(xml: &str) -> Result<GeneDocument, DashError> {
    let entry = markup::first(xml, "entry")
        .ok_or_else(|| DashError::AtlasParse("missing <entry> element".to_string()))?;
    let name = direct_text(entry.inner, "name")
        .ok_or_else(|| DashError::AtlasParse("missing gene <name>".to_string()))?;
    let synonyms = markup::elements(entry.inner, "synonym")
        .iter()
        .map(Element::text)
        .filter(|text| !text.is_empty())
        .collect();

    let mut entries = Vec::new();
    for expression in markup::elements(entry.inner, "tissueExpression") {
        if !is_pathology(&expression) {
            continue;
        }
        for patient in markup::elements(expression.inner, "patient") {
            entries.push(parse_patient(&patient, &name)?);
        }
    }

    Ok(GeneDocument {
        name,
        synonyms,
        entries,
    })
}

fn is_pathology(expression: &Element<'_>) -> bool {
    let tagged = ["assayType", "type"]
        .iter()
        .filter_map(|attr| expression.attr(attr))
        .any(|value| value.eq_ignore_ascii_case("pathology"));
    tagged
        || markup::elements(expression.inner, "summary")
            .iter()
            .any(|summary| {
                summary
                    .attr("type")
                    .is_some_and(|value| value.eq_ignore_ascii_case("pathology"))
            })
}

fn parse_patient(patient: &Element<'_>, gene: &str) -> Result<ListingEntry, DashError> {
    let inner = patient.inner;
    let id_text = markup::first_text(inner, "patientId")
        .ok_or_else(|| DashError::AtlasParse("patient without <patientId>".to_string()))?;
    let id = id_text
        .parse::<i64>()
        .map_err(|_| DashError::AtlasParse(format!("non-numeric patientId: {id_text}")))?;

    let mut staining = String::new();
    let mut intensity = String::new();
    for level in markup::elements(inner, "level") {
        match level.attr("type").as_deref() {
            Some("staining") => staining = level.text(),
            Some("intensity") => intensity = level.text(),
            _ => {}
        }
    }

    let samples = markup::elements(inner, "sample")
        .iter()
        .flat_map(parse_sample)
        .collect();

    Ok(ListingEntry {
        staining,
        intensity,
        quantity: markup::first_text(inner, "quantity").unwrap_or_default(),
        location: markup::first_text(inner, "location").unwrap_or_default(),
        patient: Patient {
            id,
            age: markup::first_text(inner, "age").and_then(|age| age.parse().ok()),
            sex: markup::first_text(inner, "sex").unwrap_or_default(),
        },
        gene: Gene {
            name: gene.to_string(),
        },
        samples,
    })
}

/// One [`Sample`] per linked image; a sample without images keeps its description.
fn parse_sample(sample: &Element<'_>) -> Vec<Sample> {
    let tissue_description = markup::elements(sample.inner, "snomed")
        .iter()
        .filter_map(|snomed| snomed.attr("tissueDescription"))
        .filter(|desc| !desc.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let urls = markup::elements(sample.inner, "imageUrl")
        .iter()
        .map(Element::text)
        .filter(|url| !url.is_empty())
        .collect::<Vec<_>>();
    if urls.is_empty() {
        return vec![Sample {
            img: String::new(),
            tissue_description,
        }];
    }
    urls.into_iter()
        .map(|img| Sample {
            img,
            tissue_description: tissue_description.clone(),
        })
        .collect()
}

/// Text of the first `tag` that appears before any nested section.
fn direct_text(doc: &str, tag: &str) -> Option<String> {
    let boundary = ["<tissueExpression", "<rnaExpression", "<antibody"]
        .iter()
        .filter_map(|pat| markup::to_lower(doc).find(&markup::to_lower(pat)))
        .min()
        .unwrap_or(doc.len());
    markup::first_text(&doc[..boundary], tag)
}
