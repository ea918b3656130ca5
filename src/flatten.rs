use serde::{Deserialize, Deserializer, Serialize};

pub const IMAGE_SEPARATOR: &str = ", ";

/// Envelope returned by the sample listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub data: Vec<ListingEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub staining: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub intensity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub quantity: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    pub patient: Patient,
    pub gene: Gene,
    #[serde(default)]
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sex: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gene {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub img: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tissue_description: String,
}

/// One display/export row. Field names double as the CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedRecord {
    pub staining: String,
    pub intensity: String,
    pub quantity: String,
    pub location: String,
    pub patient_id: i64,
    pub patient_age: Option<u32>,
    pub patient_sex: String,
    pub gene_name: String,
    pub tissue_description: String,
    pub images: String,
}

impl FlattenedRecord {
    pub const COLUMNS: [&'static str; 10] = [
        "staining",
        "intensity",
        "quantity",
        "location",
        "patientId",
        "patientAge",
        "patientSex",
        "geneName",
        "tissueDescription",
        "images",
    ];

    pub fn image_urls(&self) -> Vec<String> {
        split_images(&self.images)
    }
}

pub fn flatten(entry: &ListingEntry) -> FlattenedRecord {
    let images = entry
        .samples
        .iter()
        .map(|sample| sample.img.as_str())
        .collect::<Vec<_>>();

    FlattenedRecord {
        staining: entry.staining.clone(),
        intensity: entry.intensity.clone(),
        quantity: entry.quantity.clone(),
        location: entry.location.clone(),
        patient_id: entry.patient.id,
        patient_age: entry.patient.age,
        patient_sex: entry.patient.sex.clone(),
        gene_name: entry.gene.name.clone(),
        tissue_description: longest_description(&entry.samples).to_string(),
        images: join_images(&images),
    }
}

/// Longest description by character count; the earliest sample wins ties.
pub fn longest_description(samples: &[Sample]) -> &str {
    let mut best = "";
    let mut best_len = 0usize;
    for sample in samples {
        let len = sample.tissue_description.chars().count();
        if len > best_len {
            best = &sample.tissue_description;
            best_len = len;
        }
    }
    best
}

pub fn join_images<S: AsRef<str>>(urls: &[S]) -> String {
    urls.iter()
        .map(|url| url.as_ref())
        .collect::<Vec<_>>()
        .join(IMAGE_SEPARATOR)
}

pub fn split_images(joined: &str) -> Vec<String> {
    joined
        .split(IMAGE_SEPARATOR)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(img: &str, desc: &str) -> Sample {
        Sample {
            img: img.to_string(),
            tissue_description: desc.to_string(),
        }
    }

    #[test]
    fn longest_description_keeps_first_on_tie() {
        let samples = vec![sample("a", "AB"), sample("b", "CD"), sample("c", "E")];
        assert_eq!(longest_description(&samples), "AB");
    }

    #[test]
    fn longest_description_counts_characters() {
        let samples = vec![sample("a", "ééé"), sample("b", "abcd")];
        assert_eq!(longest_description(&samples), "abcd");
    }

    #[test]
    fn duplicate_images_are_kept() {
        let entry = ListingEntry {
            samples: vec![sample("http://x/a.jpg", ""), sample("http://x/a.jpg", "")],
            ..ListingEntry::default()
        };
        let record = flatten(&entry);
        assert_eq!(record.images, "http://x/a.jpg, http://x/a.jpg");
        assert_eq!(record.image_urls().len(), 2);
    }

    #[test]
    fn sample_without_image_keeps_its_slot() {
        let entry = ListingEntry {
            samples: vec![sample("http://x/a.jpg", "Colon"), sample("", "Breast")],
            ..ListingEntry::default()
        };
        let record = flatten(&entry);
        assert_eq!(record.images, "http://x/a.jpg, ");
        assert_eq!(record.image_urls(), vec!["http://x/a.jpg"]);
    }
}
