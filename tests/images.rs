use std::io::{Cursor, Read};
use std::sync::Mutex;

use assert_matches::assert_matches;

use patho_dash::error::DashError;
use patho_dash::images::{ImageFetcher, bundle_images};

#[derive(Default)]
struct DummyFetcher {
    fetched: Mutex<Vec<String>>,
}

impl ImageFetcher for DummyFetcher {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DashError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if url.contains("missing") {
            return Err(DashError::AtlasStatus {
                status: 404,
                message: format!("image download failed: {url}"),
            });
        }
        Ok(url.as_bytes().to_vec())
    }
}

#[test]
fn bundle_contains_each_image_in_order() {
    let fetcher = DummyFetcher::default();
    let urls = vec![
        "http://h/1/a.jpg".to_string(),
        "http://h/2/a.jpg".to_string(),
        "http://h/2/b.jpg".to_string(),
    ];
    let bytes = bundle_images(&fetcher, &urls).unwrap();
    assert_eq!(*fetcher.fetched.lock().unwrap(), urls);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"a.jpg".to_string()));
    assert!(names.contains(&"2_a.jpg".to_string()));
    assert!(names.contains(&"b.jpg".to_string()));

    let mut content = String::new();
    archive
        .by_name("2_a.jpg")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "http://h/2/a.jpg");
}

#[test]
fn failed_download_aborts_bundle() {
    let fetcher = DummyFetcher::default();
    let urls = vec!["http://h/ok.jpg".to_string(), "http://h/missing.jpg".to_string()];
    assert_matches!(
        bundle_images(&fetcher, &urls),
        Err(DashError::AtlasStatus { status: 404, .. })
    );
}

#[test]
fn empty_page_gives_empty_archive() {
    let bytes = bundle_images(&DummyFetcher::default(), &[]).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 0);
}
