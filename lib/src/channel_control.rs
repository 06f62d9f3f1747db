//! The `ChannelControl` capability the channel hopper consumes.
//!
//! Bringing an interface up/down, building the netlink `nl80211` message to
//! actually switch the radio's channel, and the ioctl plumbing to resolve a
//! device index are external radio/link-layer primitives this crate treats
//! as an injected collaborator. What lives here is the capability boundary
//! the hopper stage is written against, plus the one pure piece of that
//! primitive set worth keeping in-crate: the channel-to-frequency table,
//! since it is a pure function with no ioctl/netlink dependency.

/// HT channel-width mode applied alongside a channel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtMode {
    NoHt,
    Ht20,
    Ht40Minus,
    Ht40Plus,
}

/// Capability the channel hopper drives; a concrete implementation talks to
/// the kernel (netlink `nl80211`) on Linux.
pub trait ChannelControl: Send {
    /// 2.4/5/6 GHz channel number -> center frequency in MHz, or `None` for
    /// an invalid channel number (channel 0 in this table).
    fn channel_to_freq(&self, channel: u32) -> Option<u32>;

    /// Switch `iface` to `freq` MHz with the given HT mode.
    fn set(&mut self, iface: &str, freq: u32, ht_mode: HtMode) -> Result<(), String>;
}

/// The channel/frequency mapping from `utils::wifi::channel2frequency`,
/// usable by any `ChannelControl` implementation (and directly by tests).
pub fn channel2frequency(channel: u32) -> Option<u32> {
    if channel == 0 {
        return None;
    }
    if channel < 14 {
        return Some(2407 + channel * 5);
    }
    if channel == 14 {
        return Some(2484);
    }
    if channel >= 183 {
        return Some(4000 + channel * 5);
    }
    Some((channel + 1000) * 5)
}

/// A `ChannelControl` that records every requested switch instead of
/// touching the kernel; used by tests (scenario S3) and by any environment
/// lacking netlink privileges.
#[derive(Default)]
pub struct RecordingChannelControl {
    pub applied: Vec<(String, u32, HtMode)>,
}

impl ChannelControl for RecordingChannelControl {
    fn channel_to_freq(&self, channel: u32) -> Option<u32> {
        channel2frequency(channel)
    }

    fn set(&mut self, iface: &str, freq: u32, ht_mode: HtMode) -> Result<(), String> {
        self.applied.push((iface.to_string(), freq, ht_mode));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_2_4ghz() {
        assert_eq!(channel2frequency(1), Some(2412));
        assert_eq!(channel2frequency(6), Some(2437));
        assert_eq!(channel2frequency(11), Some(2462));
        assert_eq!(channel2frequency(14), Some(2484));
    }

    #[test]
    fn channel_invalid_is_none() {
        assert_eq!(channel2frequency(0), None);
    }

    #[test]
    fn channel_5ghz() {
        assert_eq!(channel2frequency(36), Some((36 + 1000) * 5));
    }
}
