use crate::entry::WireResponse;
use crate::{CatalogBackend, CatalogConfig, CatalogError, Entry};

/// Path of the batched details endpoint, relative to `api_url`.
pub const DETAILS_PATH: &str = "/IPublishedFileService/GetDetails/v1/";

/// HTTP-based catalog backend.
///
/// Issues one `GET` per batch:
/// `GET {api_url}/IPublishedFileService/GetDetails/v1/?key=..&includechildren=true&publishedfileids[0]=..`
/// and expects `{"response":{"publishedfiledetails":[...]}}` back.
pub struct HttpBackend {
    config: CatalogConfig,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(config: CatalogConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();
        Self { config, agent }
    }

    fn details_url(&self) -> String {
        format!("{}{DETAILS_PATH}", self.config.api_url)
    }

    fn status_error(code: u16, url: &str) -> CatalogError {
        match code {
            401 | 403 => CatalogError::Unauthorized,
            _ => CatalogError::Http(format!("HTTP {code} for {url}")),
        }
    }
}

impl CatalogBackend for HttpBackend {
    fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Entry>, CatalogError> {
        let url = self.details_url();
        tracing::debug!("GET {url} ({} ids)", ids.len());

        let mut req = self
            .agent
            .get(&url)
            .query("key", self.config.api_key.as_str())
            .query("includechildren", "true");
        for (idx, id) in ids.iter().enumerate() {
            req = req.query(format!("publishedfileids[{idx}]"), id.as_str());
        }

        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => return Err(Self::status_error(code, &url)),
            Err(ureq::Error::Timeout(t)) => {
                return Err(CatalogError::Timeout(format!("{t:?} for {url}")));
            }
            Err(e) => return Err(CatalogError::Http(e.to_string())),
        };

        let code = resp.status().as_u16();
        if !(200..300).contains(&code) {
            return Err(Self::status_error(code, &url));
        }

        let reader = resp.into_body().into_reader();
        let parsed: WireResponse = serde_json::from_reader(reader)
            .map_err(|e| CatalogError::Serialization(format!("invalid details response: {e}")))?;
        Ok(parsed
            .response
            .publishedfiledetails
            .into_iter()
            .map(Entry::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// Answers every connection with the same canned response and records
    /// the request target of each one.
    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        paths: Arc<Mutex<Vec<String>>>,
    }

    impl MockServer {
        fn start(status: u16, body: &str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let paths: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
            let body = body.to_owned();

            let paths_clone = Arc::clone(&paths);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                            break;
                        }
                    }
                    if let Some(path) = request_line.split_whitespace().nth(1) {
                        paths_clone.lock().unwrap().push(path.to_owned());
                    }

                    let response = format!(
                        "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes());
                    let _ = stream.flush();
                }
            });

            MockServer {
                addr,
                _handle: handle,
                paths,
            }
        }

        fn paths(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }
    }

    fn backend(url: &str) -> HttpBackend {
        HttpBackend::new(CatalogConfig::new("secret-key").with_url(url))
    }

    fn decode_brackets(path: &str) -> String {
        path.replace("%5B", "[").replace("%5D", "]")
    }

    const TWO_ROWS: &str = r#"{"response":{"publishedfiledetails":[
        {"result":1,"publishedfileid":"1","file_type":0,"file_size":"2048","title":"One",
         "file_description":"Mod ID: One"},
        {"result":9,"publishedfileid":"2"}
    ]}}"#;

    #[test]
    fn http_decodes_rows_with_status() {
        let server = MockServer::start(200, TWO_ROWS);
        let rows = backend(&server.addr)
            .fetch_batch(&["1".to_owned(), "2".to_owned()])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_found());
        assert_eq!(rows[0].size_bytes, 2048);
        assert_eq!(rows[0].parse().mods, vec!["One"]);
        assert!(!rows[1].is_found());
    }

    #[test]
    fn http_query_carries_key_children_flag_and_ids() {
        let server = MockServer::start(200, TWO_ROWS);
        backend(&server.addr)
            .fetch_batch(&["1".to_owned(), "2".to_owned()])
            .unwrap();

        let paths = server.paths();
        assert_eq!(paths.len(), 1);
        let path = decode_brackets(&paths[0]);
        assert!(path.starts_with(DETAILS_PATH), "{path}");
        assert!(path.contains("key=secret-key"));
        assert!(path.contains("includechildren=true"));
        assert!(path.contains("publishedfileids[0]=1"));
        assert!(path.contains("publishedfileids[1]=2"));
    }

    #[test]
    fn http_401_is_credential_error() {
        let server = MockServer::start(401, "");
        let err = backend(&server.addr)
            .fetch_batch(&["1".to_owned()])
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unauthorized));
    }

    #[test]
    fn http_500_is_transport_error() {
        let server = MockServer::start(500, "");
        let err = backend(&server.addr)
            .fetch_batch(&["1".to_owned()])
            .unwrap_err();
        assert!(matches!(err, CatalogError::Http(ref m) if m.contains("500")));
    }

    #[test]
    fn http_malformed_body_is_serialization_error() {
        let server = MockServer::start(200, "{\"nope\":true}");
        let err = backend(&server.addr)
            .fetch_batch(&["1".to_owned()])
            .unwrap_err();
        assert!(matches!(err, CatalogError::Serialization(_)));
    }

    #[test]
    fn http_connection_refused_returns_error() {
        let err = backend("http://127.0.0.1:1")
            .fetch_batch(&["1".to_owned()])
            .unwrap_err();
        assert!(!err.is_credential_error());
    }

    #[test]
    fn http_slow_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(std::time::Duration::from_secs(3));
                drop(stream);
            }
        });

        let mut config = CatalogConfig::new("k").with_url(&addr);
        config.timeout_secs = 1;
        let err = HttpBackend::new(config)
            .fetch_batch(&["1".to_owned()])
            .unwrap_err();
        assert!(
            matches!(err, CatalogError::Timeout(_) | CatalogError::Http(_)),
            "unexpected error: {err}"
        );
    }
}
