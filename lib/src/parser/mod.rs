//! The frame-to-document parser. Turns a [`PacketHandle`] into
//! the JSON document the indexer ships downstream.

pub mod capabilities;
pub mod codes;
pub mod data;
pub mod dot11;
pub mod ht;
pub mod ie;
pub mod mgmt;
pub mod radiotap;
pub mod rsn;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};

use crate::errors::ParseError;
use crate::packet::PacketHandle;
use dot11::{Dot11Header, FrameType};

/// `pcap::Linktype::IEEE802_11_RADIOTAP.0`; kept as a bare constant so this
/// module does not need to depend on the `pcap` crate just for one tag.
const LINKTYPE_IEEE802_11_RADIOTAP: i32 = 127;

fn format_timestamp(timestamp_ns: u128) -> String {
    let secs = (timestamp_ns / 1_000_000_000) as i64;
    let nanos = (timestamp_ns % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a captured frame into the normative document shape (§4.9).
/// Every step is fatal to the frame on failure.
pub fn parse(handle: &PacketHandle) -> Result<Value, ParseError> {
    let data = &handle.frame.data;
    if data.is_empty() {
        return Err(ParseError::TooShort);
    }

    let radiotap_len = if handle.frame.linktype == LINKTYPE_IEEE802_11_RADIOTAP {
        radiotap::header_length(data)?
    } else {
        0
    };
    let mac_data = data.get(radiotap_len..).ok_or(ParseError::RadiotapTruncated(radiotap_len))?;

    let header = Dot11Header::parse(mac_data)?;
    let body = mac_data.get(header.header_len..).unwrap_or(&[]);

    let mut doc = Map::new();
    doc.insert("@timestamp".into(), json!(format_timestamp(handle.timestamp_ns)));
    doc.insert("radiotap".into(), json!({}));
    doc.insert("wlan".into(), header.to_json());

    match header.frame_type {
        FrameType::Management => {
            let fixed_len = mgmt::fixed_parameter_len(header.subtype).min(body.len());
            let fixed = mgmt::parse_fixed_parameters(header.subtype, &body[..fixed_len]);
            let mut wlan_mgt = Map::new();
            let tagged = ie::parse_information_elements(&body[fixed_len..], &mut wlan_mgt)?;
            if let Some(fixed) = fixed {
                wlan_mgt.insert("fixed".into(), fixed);
            }
            wlan_mgt.insert("tagged".into(), json!(tagged));
            doc.insert("wlan_mgt".into(), Value::Object(wlan_mgt));
        }
        FrameType::Control => {
            doc.insert("control".into(), json!({}));
        }
        FrameType::Data => {
            if let Some(qos_control) = header.qos_control(mac_data) {
                doc.insert("qos".into(), data::parse_qos(qos_control));
            }
        }
    }

    Ok(Value::Object(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Frame;

    fn addr(n: u8) -> [u8; 6] {
        [n; 6]
    }

    fn beacon_frame() -> Vec<u8> {
        // Frame control: type=0 (mgmt) subtype=8 (beacon)
        let mut data = vec![0x80, 0x00, 0x00, 0x00];
        data.extend_from_slice(&addr(1)); // ra
        data.extend_from_slice(&addr(2)); // ta/sa
        data.extend_from_slice(&addr(3)); // bssid
        data.extend_from_slice(&[0x00, 0x00]); // seq ctrl
        data.extend_from_slice(&[0u8; 8]); // timestamp
        data.extend_from_slice(&[100, 0]); // beacon interval = 100
        data.extend_from_slice(&[0x01, 0x00]); // capabilities (ess)
        data.extend_from_slice(&[0, 4, b't', b'e', b's', b't']); // SSID IE
        data
    }

    #[test]
    fn parses_beacon_without_radiotap() {
        let handle = PacketHandle::with_timestamp(Frame { linktype: 105, data: beacon_frame() }, 0);
        let doc = parse(&handle).unwrap();
        assert_eq!(doc["wlan"]["fc"]["type_subtype"], json!("Beacon"));
        assert_eq!(doc["wlan_mgt"]["ssid"], json!("test"));
        assert_eq!(doc["wlan_mgt"]["fixed"]["beacon"], json!(100));
    }

    #[test]
    fn rejects_empty_data() {
        let handle = PacketHandle::with_timestamp(Frame { linktype: 105, data: vec![] }, 0);
        assert!(matches!(parse(&handle), Err(ParseError::TooShort)));
    }

    #[test]
    fn control_frame_emits_empty_control_object() {
        let mut data = vec![0xd4, 0x00, 0x00, 0x00]; // ACK, no TA
        data.extend_from_slice(&addr(1));
        let handle = PacketHandle::with_timestamp(Frame { linktype: 105, data }, 0);
        let doc = parse(&handle).unwrap();
        assert_eq!(doc["control"], json!({}));
    }
}
