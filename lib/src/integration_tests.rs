//! End-to-end pipeline tests: real `StageRuntime` threads wired the same
//! way `Topology::wire` connects them, driven without `pcap` via
//! [`crate::source::PrebuiltSourceFactory`] and without real HTTP via
//! [`crate::sink::BulkSink`] test doubles.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::beat::BeatInfo;
use crate::decryption::DecryptionStageWork;
use crate::indexer::IndexerStageWork;
use crate::packet::{Frame, PacketHandle};
use crate::persistence::PersistenceStageWork;
use crate::settings::{DecryptionKey, EsProtocol, IndexerEndpoint};
use crate::sink::{BulkResponse, BulkSink};
use crate::source::{FileReaderStageWork, PrebuiltSourceFactory, VecPacketSource};
use crate::stage::StageRuntime;

fn beacon_frame() -> Frame {
    let mut data = vec![0x80, 0x00, 0x00, 0x00]; // mgmt/beacon
    data.extend_from_slice(&[1u8; 6]); // ra/da
    data.extend_from_slice(&[2u8; 6]); // ta/sa
    data.extend_from_slice(&[3u8; 6]); // bssid
    data.extend_from_slice(&[0x00, 0x00]); // seq ctrl
    data.extend_from_slice(&[0u8; 8]); // timestamp
    data.extend_from_slice(&[100, 0]); // beacon interval
    data.extend_from_slice(&[0x01, 0x00]); // capabilities
    data.extend_from_slice(&[0, 4, b't', b'e', b's', b't']); // SSID IE
    Frame::new(105, data) // 105 == pcap::Linktype::IEEE802_11 (no radiotap)
}

struct RecordingSink {
    name: &'static str,
    responses: Arc<Mutex<std::vec::IntoIter<BulkResponse>>>,
    received: Arc<Mutex<Vec<Vec<String>>>>,
}

impl BulkSink for RecordingSink {
    fn bulk_insert(&mut self, documents: &[String], _index_basename: &str) -> BulkResponse {
        self.received.lock().unwrap().push(documents.to_vec());
        self.responses
            .lock()
            .unwrap()
            .next()
            .unwrap_or(BulkResponse { http_status: 0, errors: true })
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }
}

fn endpoint() -> IndexerEndpoint {
    IndexerEndpoint {
        protocol: EsProtocol::Http,
        hosts: vec![("mock-a".into(), 9200), ("mock-b".into(), 9200)],
        username: String::new(),
        password: String::new(),
        enabled: true,
        bulk_max_size: 50,
    }
}

fn wait_for<F: Fn() -> bool>(deadline: Duration, predicate: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

/// S1: three beacons read from a file source through persistence, all three
/// shipped as documents with no decryption fields present.
#[test]
fn s1_three_beacons_become_three_documents() {
    let frames = vec![beacon_frame(), beacon_frame(), beacon_frame()];
    let factory = PrebuiltSourceFactory(Some(Box::new(VecPacketSource::new(frames))));
    let mut reader = StageRuntime::new("file-reader", Box::new(FileReaderStageWork::new(Box::new(factory))));
    let mut persistence = StageRuntime::new("persistence", Box::new(PersistenceStageWork::new()));

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink {
        name: "mock",
        responses: Arc::new(Mutex::new(vec![BulkResponse { http_status: 200, errors: false }].into_iter())),
        received: Arc::clone(&received),
    };
    let mut indexer = StageRuntime::new(
        "indexer",
        Box::new(IndexerStageWork::with_sinks(endpoint(), BeatInfo::current("1.0.0"), vec![Box::new(sink)])),
    );

    reader.add_downstream(persistence.input_sender());
    persistence.add_downstream(indexer.input_sender());

    indexer.init(1_000).unwrap();
    persistence.init(100).unwrap();
    reader.init(1).unwrap();

    indexer.start().unwrap();
    persistence.start().unwrap();
    reader.start().unwrap();

    assert!(wait_for(Duration::from_secs(2), || {
        received.lock().unwrap().iter().map(Vec::len).sum::<usize>() >= 3
    }));

    reader.stop(false).unwrap();
    persistence.stop(true).unwrap();
    indexer.stop(true).unwrap();

    let batches = received.lock().unwrap();
    let documents: Vec<&String> = batches.iter().flatten().collect();
    assert_eq!(documents.len(), 3);
    for doc in documents {
        let parsed: serde_json::Value = serde_json::from_str(doc).unwrap();
        assert_eq!(parsed["wlan"]["fc"]["type_subtype"], "Beacon");
        assert!(parsed["wlan_mgt"]["fixed"]["beacon"].is_number());
        assert!(parsed["@timestamp"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(parsed.get("wep").is_none());
        assert!(parsed.get("tkip").is_none());
        assert!(parsed.get("ccmp").is_none());
        assert!(parsed.get("data").is_none());
    }
}

/// S2: a configured network loads its PMK at init (decryption is not a
/// passthrough), an unprotected management frame passes through untouched,
/// and the indexer falls through from a failing host to a succeeding one.
#[test]
fn s2_decrypter_loaded_and_falls_through_to_second_host() {
    let keys = vec![DecryptionKey {
        essid: "foo".into(),
        bssid: "aa:bb:cc:dd:ee:ff".into(),
        passphrase: "abcdefgh".into(),
    }];
    let mut decryption = StageRuntime::new("decryption", Box::new(DecryptionStageWork::new(keys)));

    let received_a = Arc::new(Mutex::new(Vec::new()));
    let received_b = Arc::new(Mutex::new(Vec::new()));
    let sink_a = RecordingSink {
        name: "A",
        responses: Arc::new(Mutex::new(vec![BulkResponse { http_status: 500, errors: true }].into_iter())),
        received: Arc::clone(&received_a),
    };
    let sink_b = RecordingSink {
        name: "B",
        responses: Arc::new(Mutex::new(vec![BulkResponse { http_status: 200, errors: false }].into_iter())),
        received: Arc::clone(&received_b),
    };
    let mut indexer = StageRuntime::new(
        "indexer",
        Box::new(IndexerStageWork::with_sinks(
            endpoint(),
            BeatInfo::current("1.0.0"),
            vec![Box::new(sink_a), Box::new(sink_b)],
        )),
    );

    decryption.add_downstream(indexer.input_sender());

    decryption.init(1_000_000).unwrap();
    indexer.init(1_000).unwrap();
    indexer.start().unwrap();
    decryption.start().unwrap();

    decryption.input_sender().push(PacketHandle::new(beacon_frame()));

    assert!(wait_for(Duration::from_secs(2), || {
        !received_b.lock().unwrap().is_empty()
    }));

    decryption.stop(true).unwrap();
    indexer.stop(true).unwrap();

    assert_eq!(received_a.lock().unwrap().len(), 1);
    assert_eq!(received_b.lock().unwrap().len(), 1);
}

/// S5: after `stop(false)` (the non-draining path `main`'s signal handler
/// drives for source stages), a file reader's status leaves `Running`
/// quickly and the indexer still drains whatever already reached it.
#[test]
fn s5_stop_leaves_running_promptly_and_tail_stage_drains() {
    let frames = vec![beacon_frame()];
    let factory = PrebuiltSourceFactory(Some(Box::new(VecPacketSource::new(frames))));
    let mut reader = StageRuntime::new("file-reader", Box::new(FileReaderStageWork::new(Box::new(factory))));

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink {
        name: "mock",
        responses: Arc::new(Mutex::new(vec![BulkResponse { http_status: 200, errors: false }].into_iter())),
        received: Arc::clone(&received),
    };
    let mut indexer = StageRuntime::new(
        "indexer",
        Box::new(IndexerStageWork::with_sinks(endpoint(), BeatInfo::current("1.0.0"), vec![Box::new(sink)])),
    );

    reader.add_downstream(indexer.input_sender());
    indexer.init(1_000).unwrap();
    reader.init(1).unwrap();
    indexer.start().unwrap();
    reader.start().unwrap();

    // The one-frame file reader reaches EOF and stops itself well within
    // 100ms on its own; this assertion exercises the same non-Running
    // transition the signal-driven shutdown path relies on.
    assert!(wait_for(Duration::from_millis(200), || {
        !matches!(reader.status(), crate::stage::StageStatus::Running)
    }));

    indexer.stop(true).unwrap();
    assert!(wait_for(Duration::from_secs(1), || {
        indexer.is_drained()
    }));
    assert_eq!(received.lock().unwrap().iter().map(Vec::len).sum::<usize>(), 1);
}
