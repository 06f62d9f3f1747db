//! The `BulkSink` capability the indexer stage ships documents
//! through: a batch of serialized JSON documents in, a success/HTTP-status
//! outcome out. Grounded in `threads/elasticsearch.cpp`'s `elastic::
//! bulkRequest`, reimplemented over `ureq` (blocking HTTP, matching this
//! crate's thread-per-stage — not async — concurrency model).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::settings::{EsProtocol, IndexerEndpoint};

const INDEX_BASENAME: &str = "wifibeat";

/// Outcome of one bulk-insert attempt against one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkResponse {
    pub http_status: u16,
    pub errors: bool,
}

impl BulkResponse {
    pub fn is_success(self) -> bool {
        self.http_status == 200 && !self.errors
    }
}

/// A long-lived client for one configured indexer endpoint.
pub trait BulkSink: Send {
    /// Ships `documents` (already-serialized JSON strings, one per line of
    /// an ndjson bulk body) to `index_basename`.
    fn bulk_insert(&mut self, documents: &[String], index_basename: &str) -> BulkResponse;

    fn describe(&self) -> String;
}

/// A `BulkSink` backed by one HTTP host from `output.elasticsearch.hosts`.
pub struct HttpBulkSink {
    url: String,
    username: String,
    password: String,
}

impl HttpBulkSink {
    /// Opens (really: just validates the address of) a connection to one
    /// configured host. Grounded in `elasticsearch::init_function`, which
    /// probes each host and skips unreachable ones rather than failing the
    /// whole stage.
    pub fn open(
        protocol: EsProtocol,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<HttpBulkSink, String> {
        let scheme = match protocol {
            EsProtocol::Http => "http",
            EsProtocol::Https => return Err("HTTPS isn't supported for connecting to ElasticSearch yet.".to_string()),
        };
        let url = format!("{scheme}://{host}:{port}");
        Ok(HttpBulkSink {
            url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl BulkSink for HttpBulkSink {
    fn bulk_insert(&mut self, documents: &[String], index_basename: &str) -> BulkResponse {
        let mut body = String::new();
        for doc in documents {
            body.push_str(&format!("{{\"index\":{{\"_index\":\"{index_basename}\"}}}}\n"));
            body.push_str(doc);
            body.push('\n');
        }

        let endpoint = format!("{}/{}/_bulk", self.url, index_basename);
        let mut request = ureq::post(&endpoint).set("Content-Type", "application/x-ndjson");
        if !self.username.is_empty() {
            let credentials = format!("{}:{}", self.username, self.password);
            let encoded = BASE64.encode(credentials.as_bytes());
            request = request.set("Authorization", &format!("Basic {encoded}"));
        }

        match request.send_string(&body) {
            Ok(response) => {
                let status = response.status();
                let errors = response
                    .into_string()
                    .map(|body| body.contains("\"errors\":true"))
                    .unwrap_or(true);
                BulkResponse {
                    http_status: status,
                    errors,
                }
            }
            Err(ureq::Error::Status(status, _)) => BulkResponse {
                http_status: status,
                errors: true,
            },
            Err(_) => BulkResponse {
                http_status: 0,
                errors: true,
            },
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Opens a sink for every reachable endpoint host in `endpoint`; logs and
/// skips unreachable ones (per §4.8, init only fails if none could open).
pub fn open_endpoints(endpoint: &IndexerEndpoint) -> Vec<Box<dyn BulkSink>> {
    let mut sinks: Vec<Box<dyn BulkSink>> = Vec::new();
    for (host, port) in &endpoint.hosts {
        match HttpBulkSink::open(
            endpoint.protocol,
            host,
            *port,
            &endpoint.username,
            &endpoint.password,
        ) {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => log::error!("failed connecting to indexer endpoint {host}:{port}: {e}"),
        }
    }
    sinks
}

pub const DEFAULT_INDEX_BASENAME: &str = INDEX_BASENAME;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_matches_known_vector() {
        assert_eq!(BASE64.encode(b"admin:changeme"), "YWRtaW46Y2hhbmdlbWU=");
    }
}
