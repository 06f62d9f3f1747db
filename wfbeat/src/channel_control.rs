//! The production `ChannelControl` implementation. Shells out to `iw`,
//! `ip`, and `iwconfig` to drive interface state and channel switches
//! rather than binding netlink directly.

use std::process::Command;

use wifibeat_core::{channel_control::channel2frequency, ChannelControl, HtMode};

fn ht_mode_token(ht_mode: HtMode) -> &'static str {
    match ht_mode {
        HtMode::NoHt => "NOHT",
        HtMode::Ht20 => "HT20",
        HtMode::Ht40Plus => "HT40+",
        HtMode::Ht40Minus => "HT40-",
    }
}

fn run(cmd: &mut Command) -> Result<(), String> {
    let status = cmd.status().map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{cmd:?} exited with {status}"))
    }
}

/// Brings `iface` down, into monitor mode, and back up, before any capture
/// stage opens a sniffer on it. Best-effort: a capture interface already in
/// monitor mode (the common case on a dedicated sniffing NIC) tolerates
/// these calls being no-ops.
pub fn prepare_interface(iface: &str) -> Result<(), String> {
    run(Command::new("ip").args(["link", "set", "dev", iface, "down"]))?;
    run(Command::new("iwconfig").args([iface, "mode", "monitor"]))?;
    run(Command::new("ip").args(["link", "set", "dev", iface, "up"]))?;
    Ok(())
}

/// Talks to the kernel through `iw dev <iface> set freq <freq> <ht-mode>`
/// rather than issuing the netlink `nl80211` channel-set call directly.
#[derive(Default)]
pub struct ShellChannelControl;

impl ChannelControl for ShellChannelControl {
    fn channel_to_freq(&self, channel: u32) -> Option<u32> {
        channel2frequency(channel)
    }

    fn set(&mut self, iface: &str, freq: u32, ht_mode: HtMode) -> Result<(), String> {
        run(Command::new("iw").args([
            "dev",
            iface,
            "set",
            "freq",
            &freq.to_string(),
            ht_mode_token(ht_mode),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ht_mode_tokens_match_iw_vocabulary() {
        assert_eq!(ht_mode_token(HtMode::NoHt), "NOHT");
        assert_eq!(ht_mode_token(HtMode::Ht40Plus), "HT40+");
    }

    #[test]
    fn delegates_channel_to_freq_to_the_shared_table() {
        let control = ShellChannelControl::default();
        assert_eq!(control.channel_to_freq(6), Some(2437));
    }
}
