//! URL builders over locally cached account metadata
//!
//! The user exports two documents from a logged-in browser session:
//! - the *info* document, listing children and their enrollments
//! - a *center* document, listing the classes of one center
//!
//! From these the builders produce the report and album endpoints whose JSON the
//! user then saves and feeds to the downloader.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One enrollment of a child in a center's class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Center id
    pub center_id: u64,
    /// Class id within the center
    pub belong_to_class: u64,
}

/// A child entry of the info document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Child {
    /// Child id
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Enrollments, possibly empty
    #[serde(default)]
    pub enrollment: Vec<Enrollment>,
}

/// The info document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InfoDocument {
    /// Children of the account
    #[serde(default)]
    pub children: Vec<Child>,
}

/// A class entry of the center document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassRef {
    /// Class id
    pub id: u64,
}

/// The center document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CenterDocument {
    /// Center id
    pub id: u64,
    /// Classes of the center
    #[serde(default)]
    pub classes: Vec<ClassRef>,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(Error::NotFound(format!("'{}'", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl InfoDocument {
    /// Read an info document from disk
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

impl CenterDocument {
    /// Read a center document from disk
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

/// Unique center ids across all enrollments, in first-seen order
pub fn center_ids(info: &InfoDocument) -> Vec<u64> {
    let mut ids: Vec<u64> = Vec::new();
    for enrollment in info.children.iter().flat_map(|c| &c.enrollment) {
        if !ids.contains(&enrollment.center_id) {
            ids.push(enrollment.center_id);
        }
    }
    ids
}

fn base(api: &ApiConfig) -> &str {
    api.base_url.trim_end_matches('/')
}

/// Report listing endpoint of one child
pub fn child_report_url(api: &ApiConfig, child_id: u64) -> String {
    format!(
        "{}/api/v1_2/children/{}/reports/?page_size={}",
        base(api),
        child_id,
        api.page_size
    )
}

/// Album listing endpoint of one class
pub fn class_album_url(api: &ApiConfig, center_id: u64, class_id: u64) -> String {
    format!(
        "{}/api/v1_2/centers/{}/classes/{}/albums/?page_size={}",
        base(api),
        center_id,
        class_id,
        api.page_size
    )
}

/// Report endpoints for every child of the info document
pub fn report_urls(api: &ApiConfig, info: &InfoDocument) -> Vec<String> {
    info.children
        .iter()
        .map(|child| child_report_url(api, child.id))
        .collect()
}

/// Album endpoints for every enrolled class of the info document
pub fn enrollment_album_urls(api: &ApiConfig, info: &InfoDocument) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for e in info.children.iter().flat_map(|c| &c.enrollment) {
        let url = class_album_url(api, e.center_id, e.belong_to_class);
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Album endpoints for every class of a center document
pub fn center_urls(api: &ApiConfig, center: &CenterDocument) -> Vec<String> {
    center
        .classes
        .iter()
        .map(|class| class_album_url(api, center.id, class.id))
        .collect()
}

/// Commands that hand a URL to the desktop's default browser, tried in order
#[cfg(target_os = "macos")]
const OPENERS: &[(&str, &[&str])] = &[("open", &[])];

#[cfg(windows)]
const OPENERS: &[(&str, &[&str])] = &[("cmd", &["/C", "start", ""])];

#[cfg(not(any(target_os = "macos", windows)))]
const OPENERS: &[(&str, &[&str])] = &[
    ("xdg-open", &[]),
    ("gio", &["open"]),
    ("sensible-browser", &[]),
];

/// Open `url` in the system browser without waiting for it to exit
pub fn open_in_browser(url: &str) -> Result<()> {
    for (program, args) in OPENERS {
        let Ok(binary) = which::which(program) else {
            continue;
        };
        std::process::Command::new(binary)
            .args(*args)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        tracing::debug!(url, opener = program, "Opened URL in browser");
        return Ok(());
    }
    let tried: Vec<&str> = OPENERS.iter().map(|(program, _)| *program).collect();
    Err(Error::Other(format!(
        "no browser opener found (tried {})",
        tried.join(", ")
    )))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str = r#"{
        "id": 1,
        "children": [
            { "id": 10, "name": "A", "enrollment": [
                { "center_id": 100, "belong_to_class": 1000 },
                { "center_id": 200, "belong_to_class": 2000 }
            ]},
            { "id": 11, "enrollment": [
                { "center_id": 100, "belong_to_class": 1000 }
            ]},
            { "id": 12 }
        ]
    }"#;

    fn api() -> ApiConfig {
        ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            page_size: 50,
        }
    }

    #[test]
    fn test_center_ids_unique_in_order() {
        let info: InfoDocument = serde_json::from_str(INFO).unwrap();
        assert_eq!(center_ids(&info), vec![100, 200]);
    }

    #[test]
    fn test_report_urls_per_child() {
        let info: InfoDocument = serde_json::from_str(INFO).unwrap();
        assert_eq!(
            report_urls(&api(), &info),
            vec![
                "https://api.example.com/api/v1_2/children/10/reports/?page_size=50",
                "https://api.example.com/api/v1_2/children/11/reports/?page_size=50",
                "https://api.example.com/api/v1_2/children/12/reports/?page_size=50",
            ]
        );
    }

    #[test]
    fn test_enrollment_album_urls_deduplicated() {
        let info: InfoDocument = serde_json::from_str(INFO).unwrap();
        assert_eq!(
            enrollment_album_urls(&api(), &info),
            vec![
                "https://api.example.com/api/v1_2/centers/100/classes/1000/albums/?page_size=50",
                "https://api.example.com/api/v1_2/centers/200/classes/2000/albums/?page_size=50",
            ]
        );
    }

    #[test]
    fn test_center_urls() {
        let center: CenterDocument =
            serde_json::from_str(r#"{ "id": 7, "name": "x", "classes": [{"id": 1}, {"id": 2}] }"#)
                .unwrap();
        let urls = center_urls(&api(), &center);
        assert_eq!(urls.len(), 2);
        assert!(urls[1].ends_with("/centers/7/classes/2/albums/?page_size=50"));
    }

    #[test]
    fn test_load_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            InfoDocument::load(&dir.path().join("info.json")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_load_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("center.json");
        std::fs::write(&path, r#"{ "classes": [] }"#).unwrap();
        assert!(matches!(
            CenterDocument::load(&path),
            Err(Error::Serialization(_))
        ));
    }
}
