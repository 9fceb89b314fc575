//! Reference HTTP server for the workshop details protocol.
//!
//! Serves `GET /IPublishedFileService/GetDetails/v1/` from an in-memory
//! catalog of raw detail rows, answering the same JSON shape, batch limit and
//! credential check as the real service. Rows are loaded from a fixture file
//! holding a JSON array of `publishedfiledetails` objects.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

pub const DETAILS_PATH: &str = "/IPublishedFileService/GetDetails/v1/";
/// Most IDs accepted in one details request.
pub const MAX_IDS: usize = 10;
pub const RESULT_OK: i64 = 1;
pub const RESULT_NOT_FOUND: i64 = 9;

/// Raw detail rows keyed by published file ID.
pub struct Catalog {
    rows: RwLock<BTreeMap<String, Value>>,
    api_key: Option<String>,
    requests: AtomicUsize,
}

impl Catalog {
    /// An empty catalog. With `api_key` set, requests must carry a matching `key`.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            api_key,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn from_rows(rows: Vec<Value>, api_key: Option<String>) -> Self {
        let catalog = Self::new(api_key);
        for row in rows {
            catalog.insert(row);
        }
        catalog
    }

    /// Load rows from a JSON array file.
    pub fn load(path: &Path, api_key: Option<String>) -> Result<Self, String> {
        let data = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let rows: Vec<Value> = serde_json::from_str(&data)
            .map_err(|e| format!("invalid fixture file {}: {e}", path.display()))?;
        Ok(Self::from_rows(rows, api_key))
    }

    /// Insert or replace a row. Rows without a `publishedfileid` are dropped;
    /// rows without a `result` are served as found.
    pub fn insert(&self, mut row: Value) {
        let Some(id) = row_id(&row) else {
            warn!("ignoring fixture row without publishedfileid");
            return;
        };
        if let Some(obj) = row.as_object_mut() {
            obj.entry("result").or_insert(json!(RESULT_OK));
        }
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, row);
    }

    pub fn remove(&self, id: &str) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Details requests answered so far, rejected ones excluded.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn accepts_key(&self, key: Option<&str>) -> bool {
        match &self.api_key {
            Some(expected) => key == Some(expected.as_str()),
            None => true,
        }
    }

    /// One row per requested ID, in request order.
    pub fn details(&self, ids: &[String]) -> Value {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let details: Vec<Value> = ids
            .iter()
            .map(|id| {
                rows.get(id).cloned().unwrap_or_else(|| {
                    json!({ "publishedfileid": id, "result": RESULT_NOT_FOUND })
                })
            })
            .collect();
        json!({ "response": { "publishedfiledetails": details } })
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("publishedfileid")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decoded query parameters of a details request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DetailsQuery {
    pub key: Option<String>,
    pub include_children: bool,
    /// IDs ordered by their `publishedfileids[N]` index.
    pub ids: Vec<String>,
}

/// Parse a query string such as
/// `key=K&includechildren=true&publishedfileids%5B0%5D=1`.
pub fn parse_details_query(query: &str) -> DetailsQuery {
    let mut out = DetailsQuery::default();
    let mut indexed: BTreeMap<usize, String> = BTreeMap::new();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(raw_name);
        let value = decode(raw_value);
        match name.as_str() {
            "key" => out.key = Some(value),
            "includechildren" => out.include_children = value == "true" || value == "1",
            _ => {
                if let Some(idx) = name
                    .strip_prefix("publishedfileids[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .and_then(|n| n.parse::<usize>().ok())
                {
                    indexed.insert(idx, value);
                }
            }
        }
    }
    out.ids = indexed.into_values().collect();
    out
}

fn decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or(spaced)
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn respond_json(req: tiny_http::Request, body: &Value) {
    let mut resp = Response::from_string(body.to_string());
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        resp = resp.with_header(header);
    }
    let _ = req.respond(resp);
}

fn handle_details(catalog: &Catalog, req: tiny_http::Request, query: &str) {
    let query = parse_details_query(query);
    if !catalog.accepts_key(query.key.as_deref()) {
        warn!("rejected details request: bad key");
        respond_err(req, 401, "unauthorized");
        return;
    }
    if query.ids.len() > MAX_IDS {
        respond_err(req, 400, &format!("at most {MAX_IDS} ids per request"));
        return;
    }
    debug!("details for {} ids", query.ids.len());
    respond_json(req, &catalog.details(&query.ids));
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(catalog: &Catalog, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    match (&method, path) {
        (Method::Get, p) if p == DETAILS_PATH || p == DETAILS_PATH.trim_end_matches('/') => {
            handle_details(catalog, req, query);
        }
        (Method::Get, "/health") => {
            let _ = req.respond(Response::from_string(r#"{"status":"ok"}"#));
        }
        (_, p) if p == DETAILS_PATH => respond_err(req, 405, "method not allowed"),
        _ => respond_err(req, 404, "not found"),
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(
    catalog: &Arc<Catalog>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::http(addr)?;
    info!("listening on {addr}");
    for request in server.incoming_requests() {
        handle_request(catalog, request);
    }
    Ok(())
}

/// A test helper that serves a [`Catalog`] on a random port in a background thread.
///
/// Drop the `TestServer` to stop the server.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub catalog: Arc<Catalog>,
    server: Arc<Server>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    /// Bind `127.0.0.1:0` and start serving `catalog`.
    pub fn start(catalog: Catalog) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("not an IP addr")
            .port();
        let url = format!("http://127.0.0.1:{port}");

        let catalog = Arc::new(catalog);
        let srv = Arc::clone(&server);
        let served = Arc::clone(&catalog);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&served, request);
            }
        });

        Self {
            url,
            port,
            catalog,
            server,
            handle: Some(handle),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
