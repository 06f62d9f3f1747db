//! File writer stage: one per interface with a non-empty PCAP prefix.
//! Writes every frame it sees to a timestamped capture file, then forwards
//! it unchanged down the primary path.
//!
//! Grounded in `capture.rs`'s use of `pcap::Capture::savefile` for on-disk
//! dumps, with the filename scheme taken from
//! `config/outputBase.h`/`threads/fileWriter.cpp`.

use std::path::PathBuf;

use chrono::Local;
use pcap::{Capture, Linktype, Savefile};

use crate::errors::StageInitError;
use crate::stage::{StageContext, StageWork};

/// Builds `"{prefix}-{iface}_{YYYY}-{M}-{D}_{H}.{M}.{S}.pcap"` using local
/// time at the moment the stage initializes (§6).
pub fn build_filename(prefix: &str, iface: &str) -> String {
    let now = Local::now();
    format!(
        "{prefix}-{iface}_{y}-{mo}-{d}_{h}.{mi}.{s}.pcap",
        y = now.format("%Y"),
        mo = now.format("%m"),
        d = now.format("%d"),
        h = now.format("%H"),
        mi = now.format("%M"),
        s = now.format("%S"),
    )
}

/// Capability a file-writer stage writes through; lets tests swap in a
/// recording double instead of touching the filesystem.
pub trait PcapWriter: Send {
    fn write(&mut self, linktype: i32, data: &[u8]);
}

/// Wraps a `pcap::Savefile` opened against a dead/radiotap-link capture
/// handle, matching how a live `Capture` opens dump files.
pub struct SavefilePcapWriter {
    savefile: Savefile,
}

impl SavefilePcapWriter {
    pub fn open(path: &PathBuf) -> Result<SavefilePcapWriter, StageInitError> {
        let dead = Capture::dead(Linktype::IEEE802_11_RADIOTAP)
            .map_err(|e| StageInitError::FileWriterOpen {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;
        let savefile = dead.savefile(path).map_err(|e| StageInitError::FileWriterOpen {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        Ok(SavefilePcapWriter { savefile })
    }
}

impl PcapWriter for SavefilePcapWriter {
    fn write(&mut self, _linktype: i32, data: &[u8]) {
        let header = pcap::PacketHeader {
            ts: libc_timeval_now(),
            caplen: data.len() as u32,
            len: data.len() as u32,
        };
        let packet = pcap::Packet::new(&header, data);
        self.savefile.write(&packet);
    }
}

fn libc_timeval_now() -> libc::timeval {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    libc::timeval {
        tv_sec: now.as_secs() as libc::time_t,
        tv_usec: now.subsec_micros() as libc::suseconds_t,
    }
}

/// C6. Drains its queue every tick, writes each frame to disk, then
/// forwards every handle unchanged.
pub struct FileWriterStageWork {
    path: PathBuf,
    writer: Option<Box<dyn PcapWriter>>,
    open: Box<dyn FnMut(&PathBuf) -> Result<Box<dyn PcapWriter>, StageInitError> + Send>,
}

impl FileWriterStageWork {
    pub fn new(prefix: &str, iface: &str) -> Self {
        let path = PathBuf::from(build_filename(prefix, iface));
        FileWriterStageWork {
            path,
            writer: None,
            open: Box::new(|path| Ok(Box::new(SavefilePcapWriter::open(path)?))),
        }
    }

    /// Test hook: inject a recording writer instead of opening a real file.
    #[cfg(test)]
    pub fn with_writer(path: PathBuf, writer: Box<dyn PcapWriter>) -> Self {
        FileWriterStageWork {
            path,
            writer: Some(writer),
            open: Box::new(|_| unreachable!("writer preloaded in test")),
        }
    }
}

impl StageWork for FileWriterStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        if self.writer.is_none() {
            self.writer = Some((self.open)(&self.path)?);
        }
        Ok(())
    }

    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let writer = self.writer.as_mut().expect("file writer missing");
        for handle in ctx.drain_input() {
            writer.write(handle.frame.linktype, &handle.frame.data);
            ctx.send_downstream(handle);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file-writer({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Frame, PacketHandle};
    use crate::queue::PacketQueue;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingWriter {
        written: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl PcapWriter for RecordingWriter {
        fn write(&mut self, _linktype: i32, data: &[u8]) {
            self.written.lock().unwrap().push(data.to_vec());
        }
    }

    #[test]
    fn filename_matches_expected_pattern() {
        let name = build_filename("capture", "wlan0");
        assert!(name.starts_with("capture-wlan0_"));
        assert!(name.ends_with(".pcap"));
    }

    #[test]
    fn writes_then_forwards_every_handle() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = RecordingWriter {
            written: Arc::clone(&written),
        };
        let mut work = FileWriterStageWork::with_writer(
            PathBuf::from("test.pcap"),
            Box::new(writer),
        );
        work.init_function().unwrap();

        let downstream = PacketQueue::new();
        let mut ctx = StageContext::for_test();
        ctx.downstream.push(downstream.sender());
        ctx.queue
            .sender()
            .push(PacketHandle::new(Frame::new(127, vec![9, 9, 9])));

        work.recurring(&mut ctx).unwrap();

        assert_eq!(written.lock().unwrap().len(), 1);
        assert_eq!(downstream.drain_all().len(), 1);
    }
}
