//! Settings loader: YAML -> [`Settings`].
//!
//! Grounded in `config/configuration.cpp`: dispatch by known top-level key,
//! one parse function per key, config-fatal on the first bad value. Unknown
//! top-level keys are ignored, matching the original's dispatch-by-key
//! switch which simply never visits keys it doesn't recognize.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde_yaml::Value;

use crate::channel_control::HtMode;
use crate::errors::ConfigError;

/// `decryption.keys`, one per AP. Grounded in `config/decryptionKeys.h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionKey {
    pub essid: String,
    pub bssid: String,
    pub passphrase: String,
}

/// `wifibeat.interfaces.devices`, one entry per channel in the hop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSetting {
    pub channel: u32,
    /// Dwell time in milliseconds; already unit-converted from `s` if the
    /// YAML spelled it out in seconds (Open Question resolution in §9).
    pub dwell_ms: u32,
    pub ht_mode: HtMode,
}

pub type ChannelPlan = Vec<ChannelSetting>;

pub const DEFAULT_HOP_DWELL_MS: u32 = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsProtocol {
    Http,
    Https,
}

/// `output.elasticsearch`, one connection entry (hosts/creds/bulk size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerEndpoint {
    pub protocol: EsProtocol,
    pub hosts: Vec<(String, u16)>,
    pub username: String,
    pub password: String,
    pub enabled: bool,
    pub bulk_max_size: usize,
}

impl Default for IndexerEndpoint {
    fn default() -> Self {
        IndexerEndpoint {
            protocol: EsProtocol::Http,
            hosts: Vec::new(),
            username: String::new(),
            password: String::new(),
            enabled: true,
            bulk_max_size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentQueueSettings {
    pub enabled: bool,
    pub max_size: u32,
    pub directory: String,
}

impl Default for PersistentQueueSettings {
    fn default() -> Self {
        PersistentQueueSettings {
            enabled: false,
            max_size: 1000,
            directory: "/var/lib/wifibeat/queue".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcapOutputSettings {
    pub enabled: bool,
    pub prefix: String,
}

/// The read-only settings value produced by loading the YAML file (§3,
/// §6). Passed by reference into the topology builder; never mutated
/// after load (Design Note: no global mutable configuration singleton).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub files_to_read: Vec<String>,
    pub persistent_queue: PersistentQueueSettings,
    pub indexers: Vec<IndexerEndpoint>,
    pub channel_hopping: HashMap<String, ChannelPlan>,
    pub interface_filters: HashMap<String, String>,
    pub decryption_keys: Vec<DecryptionKey>,
    pub logging_level: String,
    pub pcap_output: PcapOutputSettings,
}

impl Settings {
    /// Loads and parses a YAML settings file from `path` (§4.11).
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses the YAML text of a settings file directly; split out from
    /// [`Settings::load`] so tests can exercise parsing without touching
    /// the filesystem.
    pub fn parse(text: &str) -> Result<Settings, ConfigError> {
        let root: Value = serde_yaml::from_str(text)?;
        let mut settings = Settings::default();

        let Value::Mapping(map) = root else {
            return Ok(settings);
        };

        for (key, value) in &map {
            let Some(key) = key.as_str() else { continue };
            if value.is_null() {
                continue;
            }
            match key {
                "wifibeat.files" => parse_files(value, &mut settings)?,
                "queues.persistent" => parse_persistent_queue(value, &mut settings)?,
                "output.elasticsearch" => parse_elasticsearch(value, &mut settings)?,
                "wifibeat.interfaces.devices" => parse_devices(value, &mut settings)?,
                "wifibeat.interfaces.filters" => parse_filters(value, &mut settings)?,
                "decryption.keys" => parse_decryption_keys(value, &mut settings)?,
                "logging.level" => parse_logging_level(value, &mut settings)?,
                "wifibeat.output.pcap" => parse_pcap_output(value, &mut settings)?,
                _ => {
                    log::trace!("ignoring unrecognized configuration key '{key}'");
                }
            }
        }

        Ok(settings)
    }
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Parses a YAML `enabled`-style boolean field. Accepts both an unquoted
/// YAML boolean scalar (`enabled: true`, parsed by serde_yaml as
/// `Value::Bool`) and the string spelling (`enabled: "true"`), matching
/// yaml-cpp's `as<string>()` coercion in the original (which accepts both
/// since yaml-cpp stores everything as a scalar string internally).
fn parse_bool_field(v: &Value) -> Result<bool, ConfigError> {
    match v {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidPersistentEnabled),
        },
        _ => Err(ConfigError::InvalidPersistentEnabled),
    }
}

fn parse_files(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let text = as_str(value)
        .ok_or_else(|| ConfigError::Invalid("wifibeat.files was supposed to be a string.".into()))?;
    for token in text.split(' ') {
        if token.is_empty() || token.starts_with('#') {
            continue;
        }
        settings.files_to_read.push(token.to_string());
    }
    Ok(())
}

fn parse_persistent_queue(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Err(ConfigError::InvalidPersistentEnabled);
    };
    let mut pq = PersistentQueueSettings::default();
    for (k, v) in map {
        match k.as_str() {
            Some("enabled") => {
                pq.enabled = parse_bool_field(v)?;
            }
            Some("max_size") => {
                let n = match v {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                };
                match n {
                    Some(0) => pq.enabled = false,
                    Some(n) => pq.max_size = n as u32,
                    None => return Err(ConfigError::InvalidPersistentEnabled),
                }
            }
            Some("directory") => {
                if let Some(s) = v.as_str() {
                    pq.directory = s.to_string();
                }
            }
            _ => {}
        }
    }
    settings.persistent_queue = pq;
    Ok(())
}

fn parse_elasticsearch(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Ok(());
    };
    let mut conn = IndexerEndpoint::default();
    for (k, v) in map {
        if v.is_null() {
            continue;
        }
        match k.as_str() {
            Some("protocol") => {
                let proto = v.as_str().unwrap_or_default().to_lowercase();
                match proto.as_str() {
                    "" => {}
                    "http" => conn.protocol = EsProtocol::Http,
                    "https" => return Err(ConfigError::HttpsUnsupported),
                    other => {
                        return Err(ConfigError::Invalid(format!(
                            "Unknown Elastic protocol: {other}"
                        )))
                    }
                }
            }
            Some("hosts") => {
                let Value::Sequence(seq) = v else {
                    return Err(ConfigError::Invalid(
                        "Invalid ElasticSearch host value, it was supposed to be a sequence"
                            .into(),
                    ));
                };
                for item in seq {
                    let host = item.as_str().unwrap_or_default();
                    let parts: Vec<&str> = host.split(':').collect();
                    if parts.len() != 2 {
                        return Err(ConfigError::InvalidPort {
                            host: host.to_string(),
                            port: -1,
                        });
                    }
                    let port: i64 = parts[1].parse().map_err(|_| ConfigError::InvalidPort {
                        host: host.to_string(),
                        port: -1,
                    })?;
                    if !(1..=65535).contains(&port) {
                        return Err(ConfigError::InvalidPort {
                            host: host.to_string(),
                            port,
                        });
                    }
                    conn.hosts.push((parts[0].to_string(), port as u16));
                }
            }
            Some("username") => conn.username = v.as_str().unwrap_or_default().to_string(),
            Some("password") => conn.password = v.as_str().unwrap_or_default().to_string(),
            Some("bulk_size") => {
                if let Some(n) = v.as_u64() {
                    conn.bulk_max_size = n as usize;
                }
            }
            Some("enabled") => {
                conn.enabled = parse_bool_field(v)?;
            }
            _ => {}
        }
    }
    if !conn.hosts.is_empty() && conn.enabled {
        settings.indexers.push(conn);
    }
    Ok(())
}

/// Matches `^\d+(:\d+(ms|s))?$` (§9 Open Question: only the single-channel
/// branch of the original's split-by-`:` logic is actually reachable;
/// treat anything else as config-fatal rather than silently falling back).
fn channel_spec_regex() -> Regex {
    Regex::new(r"^(\d+)(?::(\d+)(ms|s))?$").unwrap()
}

fn parse_devices(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Ok(());
    };
    let re = channel_spec_regex();
    for (card, entries) in map {
        let Some(card) = card.as_str() else { continue };
        if card.is_empty() || card.starts_with('#') {
            continue;
        }
        let Value::Sequence(seq) = entries else {
            return Err(ConfigError::InvalidChannelSpec(card.to_string()));
        };
        let mut plan = ChannelPlan::new();
        for item in seq {
            let spec = item.as_str().unwrap_or_default();
            let caps = re
                .captures(spec)
                .ok_or_else(|| ConfigError::InvalidChannelSpec(spec.to_string()))?;
            let channel: u32 = caps[1]
                .parse()
                .map_err(|_| ConfigError::InvalidChannelSpec(spec.to_string()))?;
            let dwell_ms = match (caps.get(2), caps.get(3)) {
                (Some(n), Some(unit)) => {
                    let n: u32 = n
                        .as_str()
                        .parse()
                        .map_err(|_| ConfigError::InvalidChannelSpec(spec.to_string()))?;
                    if n == 0 {
                        return Err(ConfigError::InvalidChannelSpec(spec.to_string()));
                    }
                    match unit.as_str() {
                        "s" => n.saturating_mul(1000),
                        _ => n,
                    }
                }
                _ => DEFAULT_HOP_DWELL_MS,
            };
            if channel < 1 {
                return Err(ConfigError::InvalidChannelSpec(spec.to_string()));
            }
            plan.push(ChannelSetting {
                channel,
                dwell_ms,
                ht_mode: HtMode::NoHt,
            });
        }
        settings.channel_hopping.insert(card.to_string(), plan);
    }
    Ok(())
}

fn parse_filters(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Ok(());
    };
    for (k, v) in map {
        let Some(key) = k.as_str() else { continue };
        if key.is_empty() || key.starts_with('#') {
            continue;
        }
        if let Some(filter) = v.as_str() {
            settings
                .interface_filters
                .insert(key.to_string(), filter.to_string());
        }
    }
    Ok(())
}

fn bssid_regex() -> Regex {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").unwrap()
}

fn parse_decryption_keys(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Ok(());
    };
    let re = bssid_regex();
    for (essid, v) in map {
        let Some(essid) = essid.as_str() else { continue };
        let spec = v
            .as_str()
            .ok_or_else(|| ConfigError::InvalidBssid(essid.to_string()))?;
        let (bssid, passphrase) = spec
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidBssid(spec.to_string()))?;
        if !re.is_match(bssid) {
            return Err(ConfigError::InvalidBssid(bssid.to_string()));
        }
        settings.decryption_keys.push(DecryptionKey {
            essid: essid.to_string(),
            bssid: bssid.to_string(),
            passphrase: passphrase.to_string(),
        });
    }
    Ok(())
}

fn parse_logging_level(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let s = value
        .as_str()
        .ok_or_else(|| ConfigError::InvalidLoggingLevel("<non-scalar>".to_string()))?;
    match s {
        "debug" | "info" | "notice" | "warning" | "warn" | "error" | "critical" | "alert" => {
            settings.logging_level = s.to_string();
            Ok(())
        }
        other => Err(ConfigError::InvalidLoggingLevel(other.to_string())),
    }
}

fn parse_pcap_output(value: &Value, settings: &mut Settings) -> Result<(), ConfigError> {
    let Value::Mapping(map) = value else {
        return Ok(());
    };
    let mut pcap = PcapOutputSettings::default();
    for (k, v) in map {
        if v.is_null() {
            continue;
        }
        match k.as_str() {
            Some("enabled") => {
                pcap.enabled = parse_bool_field(v)?;
            }
            Some("prefix") => {
                if let Some(s) = v.as_str() {
                    pcap.prefix = s.to_string();
                }
            }
            _ => {}
        }
    }
    settings.pcap_output = pcap;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_files_ignoring_comments() {
        let s = Settings::parse("wifibeat.files: a.pcap #comment b.pcap\n").unwrap();
        assert_eq!(s.files_to_read, vec!["a.pcap", "b.pcap"]);
    }

    #[test]
    fn persistent_enabled_bad_value_is_config_fatal() {
        let err = Settings::parse("queues.persistent:\n  enabled: maybe\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "queues.persistent.enabled value is invalid. Must be true or false."
        );
    }

    #[test]
    fn https_is_rejected() {
        let err = Settings::parse(
            "output.elasticsearch:\n  protocol: https\n  hosts: [\"localhost:9200\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::HttpsUnsupported));
    }

    #[test]
    fn devices_single_channel_default_dwell() {
        let s = Settings::parse("wifibeat.interfaces.devices:\n  wlan0: [\"6\"]\n").unwrap();
        let plan = &s.channel_hopping["wlan0"];
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].channel, 6);
        assert_eq!(plan[0].dwell_ms, DEFAULT_HOP_DWELL_MS);
    }

    #[test]
    fn devices_seconds_unit_converted_to_ms() {
        let s =
            Settings::parse("wifibeat.interfaces.devices:\n  wlan0: [\"1:2s\", \"6:300ms\"]\n")
                .unwrap();
        let plan = &s.channel_hopping["wlan0"];
        assert_eq!(plan[0].dwell_ms, 2000);
        assert_eq!(plan[1].dwell_ms, 300);
    }

    #[test]
    fn invalid_channel_spec_rejected() {
        let err =
            Settings::parse("wifibeat.interfaces.devices:\n  wlan0: [\"abc\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidChannelSpec(_)));
    }

    #[test]
    fn decryption_key_bad_bssid_rejected() {
        let err = Settings::parse("decryption.keys:\n  home: not-a-mac/password1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBssid(_)));
    }

    #[test]
    fn decryption_key_parses() {
        let s = Settings::parse(
            "decryption.keys:\n  home: aa:bb:cc:dd:ee:ff/abcdefgh\n",
        )
        .unwrap();
        assert_eq!(s.decryption_keys.len(), 1);
        assert_eq!(s.decryption_keys[0].essid, "home");
        assert_eq!(s.decryption_keys[0].bssid, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let s = Settings::parse("some.unknown.key: 42\n").unwrap();
        assert!(s.files_to_read.is_empty());
    }
}
