//! HTTP client ↔ server end-to-end tests.
//!
//! These tests start a real `pzmod-server` in-process on a random port and
//! drive the real `HttpBackend` and `CatalogClient` against it. No mocks.

use pzmod_catalog::{CatalogBackend, CatalogClient, CatalogConfig, CatalogError, HttpBackend};
use pzmod_core::{
    detect_problems, expand_children, install_collection, missing_dependencies_of, CancelToken,
    ConfigStore, InstalledSet, MemoryStore, Problem,
};
use pzmod_server::{Catalog, TestServer};
use serde_json::{json, Value};

const KEY: &str = "e2e-key";

fn package(id: &str, title: &str, description: &str, children: &[&str]) -> Value {
    let children: Vec<Value> = children
        .iter()
        .map(|c| json!({ "publishedfileid": c, "file_type": 0 }))
        .collect();
    json!({
        "publishedfileid": id,
        "file_type": 0,
        "title": title,
        "file_description": description,
        "file_size": 1024,
        "children": children,
    })
}

fn collection(id: &str, title: &str, children: &[&str]) -> Value {
    let mut row = package(id, title, "", children);
    row["file_type"] = json!(2);
    row
}

fn start(rows: Vec<Value>) -> TestServer {
    TestServer::start(Catalog::from_rows(rows, Some(KEY.to_owned())))
}

fn config(server: &TestServer, key: &str) -> CatalogConfig {
    CatalogConfig::new(key).with_url(&server.url)
}

fn ids(range: std::ops::Range<u32>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}

/// Plain GET over a raw socket; returns the response body.
fn raw_get(url: &str) -> String {
    use std::io::{Read, Write};
    let addr = url.trim_start_matches("http://");
    let (host, path) = addr.split_once('/').unwrap();
    let mut stream = std::net::TcpStream::connect(host).unwrap();
    write!(
        stream,
        "GET /{path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    raw.split_once("\r\n\r\n").unwrap().1.to_owned()
}

// --- Tests ---

#[test]
fn http_e2e_health() {
    let server = start(vec![]);
    let resp = raw_get(&format!("{}/health", server.url));
    assert_eq!(resp, r#"{"status":"ok"}"#);
}

#[test]
fn http_e2e_batch_with_missing_row() {
    let server = start(vec![package("1", "One", "Mod ID: one", &[])]);
    let backend = HttpBackend::new(config(&server, KEY));

    let rows = backend
        .fetch_batch(&["1".to_owned(), "2".to_owned()])
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].is_found());
    assert_eq!(rows[0].size_bytes, 1024);
    assert_eq!(rows[0].parse().mods, vec!["one"]);
    assert!(!rows[1].is_found());
}

#[test]
fn http_e2e_string_file_size_accepted() {
    let mut row = package("1", "One", "", &[]);
    row["file_size"] = json!("4096");
    let server = start(vec![row]);
    let client = CatalogClient::from_config(&config(&server, KEY));
    let entry = client.fetch_one("1").unwrap().unwrap();
    assert_eq!(entry.size_bytes, 4096);
}

#[test]
fn http_e2e_wrong_key_is_credential_error() {
    let server = start(vec![package("1", "One", "", &[])]);
    let client = CatalogClient::from_config(&config(&server, "wrong"));
    let err = client.fetch_many(&["1".to_owned()]).unwrap_err();
    assert!(matches!(err, CatalogError::Unauthorized));
    assert!(err.is_credential_error());
    assert_eq!(server.catalog.request_count(), 0);
}

#[test]
fn http_e2e_oversized_batch_rejected_by_server() {
    let server = start(vec![]);
    let backend = HttpBackend::new(config(&server, KEY));
    let err = backend.fetch_batch(&ids(0..11)).unwrap_err();
    assert!(matches!(err, CatalogError::Http(ref m) if m.contains("400")));
}

#[test]
fn http_e2e_client_chunks_and_partitions() {
    let rows: Vec<Value> = (0..25)
        .filter(|i| i % 5 != 0)
        .map(|i| package(&i.to_string(), "m", "", &[]))
        .collect();
    let server = start(rows);
    let client = CatalogClient::from_config(&config(&server, KEY));

    let requested = ids(0..25);
    let result = client.fetch_many(&requested).unwrap();
    assert_eq!(server.catalog.request_count(), 3);
    assert_eq!(result.found.len(), 20);
    assert_eq!(result.missing, vec!["0", "5", "10", "15", "20"]);

    let mut all: Vec<String> = result.found.iter().map(|e| e.id.clone()).collect();
    all.extend(result.missing.iter().cloned());
    all.sort();
    let mut expected = requested.clone();
    expected.sort();
    assert_eq!(all, expected);
}

#[test]
fn http_e2e_cache_serves_repeat_fetches() {
    let server = start(vec![package("1", "One", "", &[])]);
    let client = CatalogClient::from_config(&config(&server, KEY));

    client.fetch_one("1").unwrap().unwrap();
    client.fetch_one("1").unwrap().unwrap();
    assert_eq!(server.catalog.request_count(), 1);

    // Missing IDs are not cached.
    assert!(client.fetch_one("404").unwrap().is_none());
    assert!(client.fetch_one("404").unwrap().is_none());
    assert_eq!(server.catalog.request_count(), 3);
}

#[test]
fn http_e2e_collection_with_missing_child() {
    let server = start(vec![
        collection("100", "Pack", &["200", "201"]),
        package("200", "A mod", "Mod ID: A", &[]),
    ]);
    let cfg = config(&server, KEY);
    let client = CatalogClient::from_config(&cfg);
    let installed = InstalledSet::new(&["100"], &[], &[]);

    let root = client.fetch_one("100").unwrap().unwrap();
    assert!(root.is_collection());

    let children = expand_children(&client, &root).unwrap();
    assert_eq!(children.found.len(), 1);
    assert_eq!(children.found[0].id, "200");
    assert_eq!(children.found[0].parse().mods, vec!["A"]);
    assert_eq!(children.missing, vec!["201"]);

    let deps = missing_dependencies_of(&client, &root, &installed.items).unwrap();
    assert_eq!(deps.missing_ids(), vec!["200"]);
    assert_eq!(deps.unfetchable, vec!["201"]);

    let report = detect_problems(&client, &installed, cfg.workers).unwrap();
    assert!(report.problems.contains(&Problem::UnfetchableDependency {
        required_by: "100".to_owned(),
        id: "201".to_owned(),
    }));
}

#[test]
fn http_e2e_install_collection_writes_store() {
    let server = start(vec![
        collection("100", "Pack", &["200", "300"]),
        package("200", "A mod", "Mod ID: A", &["210"]),
        package("210", "A dep", "Mod ID: Adep", &[]),
        package("300", "Town", "Mod ID: town\nMap Folder: Town", &[]),
    ]);
    let cfg = config(&server, KEY);
    let client = CatalogClient::from_config(&cfg);
    let mut store = MemoryStore::new();

    let report =
        install_collection(&client, &mut store, "100", cfg.workers, &CancelToken::new()).unwrap();
    assert_eq!(report.added, vec!["200", "300"]);
    assert!(report.failures.is_empty());
    assert!(report.missing.is_empty());

    assert_eq!(store.get("WorkshopItems").as_deref(), Some("200;210;300"));
    assert_eq!(store.get("Mods").as_deref(), Some("200\\A;300\\town"));
    assert_eq!(store.get("Map").as_deref(), Some("Town"));
}
