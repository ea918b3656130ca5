use patho_dash::api::decode_page;
use patho_dash::flatten::{ListingEntry, Sample, flatten, join_images, longest_description, split_images};

#[test]
fn longest_description_picks_abc() {
    let samples = ["A", "ABC", "AB"]
        .iter()
        .map(|desc| Sample {
            img: String::new(),
            tissue_description: desc.to_string(),
        })
        .collect::<Vec<_>>();
    assert_eq!(longest_description(&samples), "ABC");
}

#[test]
fn image_join_split_round_trip() {
    let urls = vec![
        "http://images.proteinatlas.org/1/a.jpg".to_string(),
        "http://images.proteinatlas.org/1/b.jpg".to_string(),
    ];
    assert_eq!(split_images(&join_images(&urls)), urls);
    assert!(split_images("").is_empty());
}

#[test]
fn nulls_in_listing_become_blank_fields() {
    let body = br#"{
        "totalItems": 1,
        "data": [{
            "staining": "Low",
            "intensity": null,
            "quantity": null,
            "location": "Nuclear",
            "patient": {"id": 7, "age": null, "sex": "Female"},
            "gene": {"name": "EPS8"},
            "samples": []
        }]
    }"#;
    let page = decode_page(body).unwrap();
    let record = flatten(&page.data[0]);
    assert_eq!(record.intensity, "");
    assert_eq!(record.quantity, "");
    assert_eq!(record.patient_age, None);
    assert_eq!(record.tissue_description, "");
    assert_eq!(record.images, "");
}

#[test]
fn serialized_record_uses_column_names() {
    let record = flatten(&ListingEntry::default());
    let json = serde_json::to_value(&record).unwrap();
    let object = json.as_object().unwrap();
    for column in patho_dash::flatten::FlattenedRecord::COLUMNS {
        assert!(object.contains_key(column), "missing {column}");
    }
}
