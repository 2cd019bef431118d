//! Report fixtures and mock image endpoints

use serde_json::json;
use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creation timestamp used by every fixture record
pub const CREATED: &str = "2023-12-25T10:30:45";

/// Filename prefix derived from [`CREATED`]
pub const TOKEN: &str = "20231225-103045";

/// Deterministic image body of `len` bytes
pub fn image_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A report with one record per `(id, url)` pair, all created at [`CREATED`]
pub fn report_json(images: &[(u64, String)]) -> String {
    let results: Vec<_> = images
        .iter()
        .map(|(id, url)| {
            json!({
                "id": id,
                "created": CREATED,
                "attached_images": [{ "id": id, "original": url }]
            })
        })
        .collect();
    json!({ "count": results.len(), "results": results }).to_string()
}

/// Write a report file into `dir` and return its path
pub fn write_report(dir: &Path, images: &[(u64, String)]) -> PathBuf {
    let path = dir.join("report.json");
    std::fs::write(&path, report_json(images)).unwrap_or_else(|e| panic!("write report: {e}"));
    path
}

/// Serve `/img/{id}.jpg` with a `len`-byte body, expecting exactly `hits` requests
pub async fn mount_image(server: &MockServer, id: u64, len: usize, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/img/{id}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_bytes(len)))
        .expect(hits)
        .mount(server)
        .await;
}

/// Serve `/img/{id}.jpg` with a bare status code
pub async fn mount_status(server: &MockServer, id: u64, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/img/{id}.jpg")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// URL of `/img/{id}.jpg` on the mock server
pub fn image_url(server: &MockServer, id: u64) -> String {
    format!("{}/img/{}.jpg", server.uri(), id)
}

/// Expected destination file name of image `id`
pub fn expected_name(id: u64) -> String {
    format!("{TOKEN}-{id}.jpg")
}
