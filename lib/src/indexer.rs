//! Indexer stage: parses queued frames, attaches the beat envelope,
//! batches the resulting documents, and ships each batch to one configured
//! endpoint's hosts in order until one accepts it.
//!
//! Grounded in `threads/elasticsearch.cpp`'s `recurring()` (drain, parse,
//! batch, try-each-host-once, log-and-drop on total failure): no retry
//! across ticks, per the Non-goal on indexer retry/backoff.

use serde_json::Value;

use crate::beat::BeatInfo;
use crate::errors::StageInitError;
use crate::parser;
use crate::settings::IndexerEndpoint;
use crate::sink::{self, BulkSink, DEFAULT_INDEX_BASENAME};
use crate::stage::{StageContext, StageWork};

/// C9. One stage per configured `output.elasticsearch` endpoint (which may
/// itself list several hosts to try in order).
pub struct IndexerStageWork {
    endpoint: IndexerEndpoint,
    beat: BeatInfo,
    sinks: Vec<Box<dyn BulkSink>>,
}

impl IndexerStageWork {
    pub fn new(endpoint: IndexerEndpoint, beat: BeatInfo) -> Self {
        IndexerStageWork {
            endpoint,
            beat,
            sinks: Vec::new(),
        }
    }

    /// Test hook: inject already-open sinks instead of dialing real hosts.
    #[cfg(test)]
    pub fn with_sinks(endpoint: IndexerEndpoint, beat: BeatInfo, sinks: Vec<Box<dyn BulkSink>>) -> Self {
        IndexerStageWork { endpoint, beat, sinks }
    }

    fn serialize(&self, doc: Value) -> Option<String> {
        let Value::Object(mut map) = doc else {
            return None;
        };
        map.insert(
            "beat".into(),
            serde_json::to_value(&self.beat).unwrap_or(Value::Null),
        );
        serde_json::to_string(&Value::Object(map)).ok()
    }
}

impl StageWork for IndexerStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        if !self.sinks.is_empty() {
            // Preloaded by `with_sinks` for tests.
            return Ok(());
        }
        self.sinks = sink::open_endpoints(&self.endpoint);
        if self.sinks.is_empty() {
            return Err(StageInitError::NoReachableIndexer);
        }
        Ok(())
    }

    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let handles = ctx.drain_input();
        if handles.is_empty() {
            return Ok(());
        }

        let mut documents = Vec::with_capacity(handles.len());
        for handle in &handles {
            match parser::parse(handle) {
                Ok(doc) => {
                    if let Some(text) = self.serialize(doc) {
                        documents.push(text);
                    }
                }
                Err(e) => {
                    log::warn!("dropping frame that failed to parse: {e}");
                }
            }
        }

        let bulk_max_size = self.endpoint.bulk_max_size.max(1);
        for chunk in documents.chunks(bulk_max_size) {
            let mut shipped = false;
            for sink in self.sinks.iter_mut() {
                let response = sink.bulk_insert(chunk, DEFAULT_INDEX_BASENAME);
                if response.is_success() {
                    shipped = true;
                    break;
                }
                log::warn!(
                    "indexer endpoint {} rejected batch: http {} errors={}",
                    sink.describe(),
                    response.http_status,
                    response.errors
                );
            }
            if !shipped {
                log::error!(
                    "all indexer endpoints failed for a batch of {} documents; dropping it",
                    chunk.len()
                );
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("indexer({} host(s))", self.endpoint.hosts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Frame, PacketHandle};
    use crate::queue::PacketQueue;
    use crate::settings::EsProtocol;
    use crate::sink::BulkResponse;
    use std::sync::{Arc, Mutex};

    struct MockSink {
        name: &'static str,
        responses: std::vec::IntoIter<BulkResponse>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl BulkSink for MockSink {
        fn bulk_insert(&mut self, _documents: &[String], _index_basename: &str) -> BulkResponse {
            self.calls.lock().unwrap().push(self.name);
            self.responses.next().unwrap_or(BulkResponse {
                http_status: 0,
                errors: true,
            })
        }

        fn describe(&self) -> String {
            self.name.to_string()
        }
    }

    fn beacon_frame() -> Frame {
        let mut data = vec![0x80, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[1u8; 6]);
        data.extend_from_slice(&[2u8; 6]);
        data.extend_from_slice(&[3u8; 6]);
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(&[0u8; 8]);
        data.extend_from_slice(&[100, 0]);
        data.extend_from_slice(&[0x01, 0x00]);
        Frame::new(105, data)
    }

    fn endpoint() -> IndexerEndpoint {
        IndexerEndpoint {
            protocol: EsProtocol::Http,
            hosts: vec![("a".into(), 9200), ("b".into(), 9200)],
            username: String::new(),
            password: String::new(),
            enabled: true,
            bulk_max_size: 50,
        }
    }

    #[test]
    fn falls_through_to_next_host_on_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink_a = MockSink {
            name: "A",
            responses: vec![BulkResponse { http_status: 500, errors: true }].into_iter(),
            calls: Arc::clone(&calls),
        };
        let sink_b = MockSink {
            name: "B",
            responses: vec![BulkResponse { http_status: 200, errors: false }].into_iter(),
            calls: Arc::clone(&calls),
        };

        let mut work = IndexerStageWork::with_sinks(
            endpoint(),
            BeatInfo::current("1.0.0"),
            vec![Box::new(sink_a), Box::new(sink_b)],
        );
        work.init_function().unwrap();

        let mut ctx = StageContext::for_test();
        ctx.queue
            .sender()
            .push(PacketHandle::new(beacon_frame()));

        work.recurring(&mut ctx).unwrap();

        let seen = calls.lock().unwrap().clone();
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn parser_failure_drops_frame_without_crashing() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = MockSink {
            name: "A",
            responses: vec![BulkResponse { http_status: 200, errors: false }].into_iter(),
            calls: Arc::clone(&calls),
        };
        let mut work = IndexerStageWork::with_sinks(
            endpoint(),
            BeatInfo::current("1.0.0"),
            vec![Box::new(sink)],
        );
        work.init_function().unwrap();

        let mut ctx = StageContext::for_test();
        ctx.queue
            .sender()
            .push(PacketHandle::new(Frame::new(105, vec![])));

        work.recurring(&mut ctx).unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn no_reachable_endpoint_fails_init() {
        let mut unreachable = endpoint();
        unreachable.protocol = EsProtocol::Https; // every host open() rejects https
        let mut work = IndexerStageWork::new(unreachable, BeatInfo::current("1.0.0"));
        assert!(work.init_function().is_err());
    }
}
