//! Packet source adapters: live capture and file reader.
//!
//! `PacketSource` is the capability that yields one frame at a time with
//! selectable readiness; grounded in `create_live_capture`/
//! `create_offline_capture` (`lib/src/capture.rs`) for how a `pcap::Capture`
//! is opened and driven, generalized here to 802.11 link types instead of
//! a fixed BPF filter.

use std::path::PathBuf;

use pcap::{Active, Capture, Linktype, Offline};

use crate::errors::StageInitError;
use crate::packet::{Frame, PacketHandle};
use crate::stage::{StageContext, StageWork};

/// One poll of a [`PacketSource`]: a frame, "nothing right now", or
/// permanent end of stream (file sources only).
pub enum SourcePoll {
    Frame(Frame),
    NotReady,
    Eof,
}

/// The capability a capture/file-reader stage is driven by. A concrete
/// implementation wraps a `pcap::Capture` in either active or offline mode.
pub trait PacketSource: Send {
    fn poll(&mut self) -> Result<SourcePoll, String>;
}

fn validate_link_type(linktype: Linktype) -> Result<(), StageInitError> {
    if linktype == Linktype::IEEE802_11 || linktype == Linktype::IEEE802_11_RADIOTAP {
        Ok(())
    } else {
        Err(StageInitError::UnsupportedLinkType(linktype))
    }
}

/// Wraps a `pcap::Capture<Active>` opened in immediate, non-blocking mode.
pub struct LivePacketSource {
    cap: Capture<Active>,
    linktype: i32,
}

impl LivePacketSource {
    /// Opens `iface` in promiscuous, immediate, non-blocking mode; applies
    /// `filter` (a BPF-style expression) when present; rejects non-802.11
    /// link types.
    pub fn open(iface: &str, filter: Option<&str>) -> Result<LivePacketSource, StageInitError> {
        let devices = pcap::Device::list()
            .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?;
        let device = devices
            .into_iter()
            .find(|d| d.name == iface)
            .ok_or_else(|| StageInitError::InvalidInterface(iface.to_string()))?;

        let mut cap = Capture::from_device(device)
            .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?
            .promisc(true)
            .immediate_mode(true)
            .open()
            .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?
            .setnonblock()
            .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?;

        let linktype = cap.get_datalink();
        validate_link_type(linktype)?;

        if let Some(filter) = filter {
            cap.filter(filter, true)
                .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?;
        }

        Ok(LivePacketSource {
            cap,
            linktype: linktype.0,
        })
    }
}

impl PacketSource for LivePacketSource {
    fn poll(&mut self) -> Result<SourcePoll, String> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(SourcePoll::Frame(Frame::new(
                self.linktype,
                packet.data.to_vec(),
            ))),
            Err(pcap::Error::TimeoutExpired) => Ok(SourcePoll::NotReady),
            Err(pcap::Error::NoMorePackets) => Ok(SourcePoll::NotReady),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Wraps a `pcap::Capture<Offline>` (reads from a `.pcap` file).
pub struct FilePacketSource {
    cap: Capture<Offline>,
    linktype: i32,
}

impl FilePacketSource {
    pub fn open(path: &PathBuf) -> Result<FilePacketSource, StageInitError> {
        if !path.exists() {
            return Err(StageInitError::FileNotFound(path.display().to_string()));
        }
        let cap = Capture::from_file(path)
            .map_err(|e| StageInitError::CaptureOpen(e.to_string()))?;
        let linktype = cap.get_datalink();
        validate_link_type(linktype)?;
        Ok(FilePacketSource {
            cap,
            linktype: linktype.0,
        })
    }
}

impl PacketSource for FilePacketSource {
    fn poll(&mut self) -> Result<SourcePoll, String> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(SourcePoll::Frame(Frame::new(
                self.linktype,
                packet.data.to_vec(),
            ))),
            Err(pcap::Error::NoMorePackets) => Ok(SourcePoll::Eof),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// An in-memory `PacketSource` used by tests (scenarios S1-S3, S5): a
/// preloaded sequence of frames, `Eof` once exhausted.
pub struct VecPacketSource {
    frames: std::vec::IntoIter<Frame>,
}

impl VecPacketSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        VecPacketSource {
            frames: frames.into_iter(),
        }
    }
}

impl PacketSource for VecPacketSource {
    fn poll(&mut self) -> Result<SourcePoll, String> {
        match self.frames.next() {
            Some(frame) => Ok(SourcePoll::Frame(frame)),
            None => Ok(SourcePoll::Eof),
        }
    }
}

/// A factory so `init_function` can construct its `PacketSource` lazily
/// (the trait object can't be cloned, and stages are built before they are
/// initialized).
pub trait PacketSourceFactory: Send {
    fn open(&mut self) -> Result<Box<dyn PacketSource>, StageInitError>;
}

/// C4: live capture adapter. `recurring` never terminates itself; the
/// supervisor stops it on shutdown.
pub struct CaptureStageWork {
    factory: Box<dyn PacketSourceFactory>,
    source: Option<Box<dyn PacketSource>>,
}

impl CaptureStageWork {
    pub fn new(factory: Box<dyn PacketSourceFactory>) -> Self {
        CaptureStageWork {
            factory,
            source: None,
        }
    }
}

impl StageWork for CaptureStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        self.source = Some(self.factory.open()?);
        Ok(())
    }

    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let source = self.source.as_mut().expect("capture source missing");
        match source.poll()? {
            SourcePoll::Frame(frame) => {
                ctx.send_downstream(PacketHandle::new(frame));
            }
            SourcePoll::NotReady | SourcePoll::Eof => {}
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "capture".to_string()
    }
}

/// C4: file reader adapter. Calls `ThreadFinished()` on EOF.
pub struct FileReaderStageWork {
    factory: Box<dyn PacketSourceFactory>,
    source: Option<Box<dyn PacketSource>>,
}

impl FileReaderStageWork {
    pub fn new(factory: Box<dyn PacketSourceFactory>) -> Self {
        FileReaderStageWork {
            factory,
            source: None,
        }
    }
}

impl StageWork for FileReaderStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        self.source = Some(self.factory.open()?);
        Ok(())
    }

    fn recurring(
        &mut self,
        ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let source = self.source.as_mut().expect("file reader source missing");
        match source.poll()? {
            SourcePoll::Frame(frame) => {
                ctx.send_downstream(PacketHandle::new(frame));
            }
            SourcePoll::NotReady => {}
            SourcePoll::Eof => {
                ctx.request_stop();
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "file-reader".to_string()
    }
}

/// Opens a live interface by name/filter, lazily (used by the topology
/// builder so init failures surface through `StageRuntime::init`).
pub struct LiveSourceFactory {
    pub iface: String,
    pub filter: Option<String>,
}

impl PacketSourceFactory for LiveSourceFactory {
    fn open(&mut self) -> Result<Box<dyn PacketSource>, StageInitError> {
        Ok(Box::new(LivePacketSource::open(
            &self.iface,
            self.filter.as_deref(),
        )?))
    }
}

/// Opens a capture file by path, lazily.
pub struct FileSourceFactory {
    pub path: PathBuf,
}

impl PacketSourceFactory for FileSourceFactory {
    fn open(&mut self) -> Result<Box<dyn PacketSource>, StageInitError> {
        Ok(Box::new(FilePacketSource::open(&self.path)?))
    }
}

/// Wraps an already-built `PacketSource` (e.g. [`VecPacketSource`]) so
/// tests can drive `CaptureStageWork`/`FileReaderStageWork` without pcap.
pub struct PrebuiltSourceFactory(pub Option<Box<dyn PacketSource>>);

impl PacketSourceFactory for PrebuiltSourceFactory {
    fn open(&mut self) -> Result<Box<dyn PacketSource>, StageInitError> {
        self.0
            .take()
            .ok_or_else(|| StageInitError::CaptureOpen("source already taken".to_string()))
    }
}
