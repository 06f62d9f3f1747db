//! Core of the wifibeat packet-processing pipeline: the stage-graph runtime
//! and the 802.11 frame parser.
//!
//! Config loading, the radio/link primitives, the packet source, and the
//! indexer sink each sit behind a capability trait the core consumes;
//! concrete, grounded implementations of those traits live here too so
//! this is a runnable crate rather than just a pipeline skeleton.

pub mod beat;
pub mod channel_control;
pub mod crypto;
pub mod decryption;
pub mod errors;
pub mod file_writer;
pub mod hopper;
pub mod indexer;
pub mod packet;
pub mod parser;
pub mod persistence;
pub mod queue;
pub mod settings;
pub mod sink;
pub mod source;
pub mod stage;
pub mod topology;

#[cfg(test)]
mod integration_tests;

pub use beat::BeatInfo;
pub use channel_control::{ChannelControl, HtMode};
pub use packet::{DecryptedState, Frame, PacketHandle};
pub use settings::Settings;
pub use stage::{StageContext, StageRuntime, StageStatus, StageWork};
pub use topology::Topology;
