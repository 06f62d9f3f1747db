//! The 802.11 MAC header (§4.9 step 3): frame control, duration, addresses,
//! sequence control, and the canonical da/sa/ta/bssid/sta derivation.
//!
//! Grounded in the bit-level parsing style of `decryption.rs`'s
//! `HeaderView`/`parse_header`, generalized here to cover the full address
//! set and the fields the document parser needs rather than just enough to
//! locate a CCMP payload.

use serde_json::{json, Map, Value};

use crate::errors::ParseError;

/// Frame type as carried in the frame-control field (§4.9 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management,
    Control,
    Data,
}

impl FrameType {
    fn from_bits(bits: u8) -> Option<FrameType> {
        match bits {
            0 => Some(FrameType::Management),
            1 => Some(FrameType::Control),
            2 => Some(FrameType::Data),
            _ => None,
        }
    }

    pub fn as_index(self) -> usize {
        match self {
            FrameType::Management => 0,
            FrameType::Control => 1,
            FrameType::Data => 2,
        }
    }
}

fn mac_string(bytes: &[u8]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}

/// The decoded 802.11 MAC header plus the offset of the frame body that
/// follows it. Control frames only populate `ra`/`ta`; data/management
/// frames additionally populate the da/sa/bssid/sta mapping (§4.9 step 3).
pub struct Dot11Header {
    pub version: u8,
    pub frame_type: FrameType,
    pub subtype: u8,
    pub duration: u16,
    pub to_ds: bool,
    pub from_ds: bool,
    pub more_frag: bool,
    pub retry: bool,
    pub pwr_mgmt: bool,
    pub more_data: bool,
    pub protected: bool,
    pub order: bool,
    pub ra: String,
    pub ta: Option<String>,
    pub da: Option<String>,
    pub sa: Option<String>,
    pub bssid: Option<String>,
    pub sta: Option<String>,
    pub wds: bool,
    pub frag: u16,
    pub seq: u16,
    /// Offset, relative to the start of the MAC header, of the frame body
    /// (the first byte after addresses/seq-control/QoS-control).
    pub header_len: usize,
}

/// Control-frame subtypes that carry a transmitter-address field in
/// addition to the receiver address (§4.9 step 3: "control frames with a
/// transmitter-address variant").
fn control_has_ta(subtype: u8) -> bool {
    matches!(subtype, 7 | 8 | 9 | 10 | 11 | 14 | 15)
}

impl Dot11Header {
    pub fn parse(data: &[u8]) -> Result<Dot11Header, ParseError> {
        if data.len() < 10 {
            return Err(ParseError::Dot11Truncated);
        }
        let fc0 = data[0];
        let fc1 = data[1];
        let version = fc0 & 0x03;
        let frame_type = FrameType::from_bits((fc0 >> 2) & 0x03).ok_or(ParseError::Dot11Truncated)?;
        let subtype = (fc0 >> 4) & 0x0f;
        let to_ds = fc1 & 0x01 != 0;
        let from_ds = fc1 & 0x02 != 0;
        let more_frag = fc1 & 0x04 != 0;
        let retry = fc1 & 0x08 != 0;
        let pwr_mgmt = fc1 & 0x10 != 0;
        let more_data = fc1 & 0x20 != 0;
        let protected = fc1 & 0x40 != 0;
        let order = fc1 & 0x80 != 0;
        let duration = u16::from_le_bytes([data[2], data[3]]);
        let ra = mac_string(&data[4..10]);

        if frame_type == FrameType::Control {
            let mut header_len = 10;
            let ta = if control_has_ta(subtype) {
                if data.len() < 16 {
                    return Err(ParseError::Dot11Truncated);
                }
                header_len = 16;
                Some(mac_string(&data[10..16]))
            } else {
                None
            };
            return Ok(Dot11Header {
                version,
                frame_type,
                subtype,
                duration,
                to_ds,
                from_ds,
                more_frag,
                retry,
                pwr_mgmt,
                more_data,
                protected,
                order,
                ra,
                ta,
                da: None,
                sa: None,
                bssid: None,
                sta: None,
                wds: false,
                frag: 0,
                seq: 0,
                header_len,
            });
        }

        if data.len() < 24 {
            return Err(ParseError::Dot11Truncated);
        }
        let addr2 = mac_string(&data[10..16]);
        let addr3 = mac_string(&data[16..22]);
        let seq_ctrl = u16::from_le_bytes([data[22], data[23]]);
        let frag = seq_ctrl & 0x0f;
        let seq = seq_ctrl >> 4;

        let mut header_len = 24;
        let wds = to_ds && from_ds;
        let (da, sa, ta, bssid, sta) = match (to_ds, from_ds) {
            (false, false) => (ra.clone(), addr2.clone(), addr2.clone(), addr3.clone(), None),
            (false, true) => (ra.clone(), addr3.clone(), addr2.clone(), addr2.clone(), Some(ra.clone())),
            (true, false) => (addr3.clone(), addr2.clone(), addr2.clone(), ra.clone(), Some(addr2.clone())),
            (true, true) => {
                if data.len() < 30 {
                    return Err(ParseError::Dot11Truncated);
                }
                header_len = 30;
                let addr4 = mac_string(&data[24..30]);
                (addr2.clone(), addr4, addr3.clone(), String::new(), None)
            }
        };

        let is_qos_data = frame_type == FrameType::Data && subtype & 0x08 != 0;
        if is_qos_data {
            if data.len() < header_len + 2 {
                return Err(ParseError::Dot11Truncated);
            }
            header_len += 2;
        }

        let bssid = if wds { None } else { Some(bssid) };

        Ok(Dot11Header {
            version,
            frame_type,
            subtype,
            duration,
            to_ds,
            from_ds,
            more_frag,
            retry,
            pwr_mgmt,
            more_data,
            protected,
            order,
            ra,
            ta: Some(ta),
            da: Some(da),
            sa: Some(sa),
            bssid,
            sta,
            wds,
            frag,
            seq,
            header_len,
        })
    }

    pub fn qos_control<'a>(&self, data: &'a [u8]) -> Option<&'a [u8; 2]> {
        if self.frame_type == FrameType::Data && self.subtype & 0x08 != 0 {
            let start = self.header_len - 2;
            data.get(start..start + 2)?.try_into().ok()
        } else {
            None
        }
    }

    pub fn type_subtype_name(&self) -> &'static str {
        crate::parser::codes::TYPE_SUBTYPE_NAMES[self.frame_type.as_index()][self.subtype as usize]
    }

    /// Builds the `wlan` top-level document object (§4.9 step 3).
    pub fn to_json(&self) -> Value {
        let mut fc = Map::new();
        fc.insert("version".into(), json!(self.version));
        fc.insert("type".into(), json!(self.frame_type.as_index()));
        fc.insert("subtype".into(), json!(self.subtype));
        fc.insert("type_subtype".into(), json!(self.type_subtype_name()));
        fc.insert("tods".into(), json!(self.to_ds));
        fc.insert("fromds".into(), json!(self.from_ds));
        fc.insert(
            "ds".into(),
            json!((self.from_ds as u8) * 10 + self.to_ds as u8),
        );
        fc.insert("frag".into(), json!(self.more_frag));
        fc.insert("retry".into(), json!(self.retry));
        fc.insert("pwrmgt".into(), json!(self.pwr_mgmt));
        fc.insert("moredata".into(), json!(self.more_data));
        fc.insert("protected".into(), json!(self.protected));
        fc.insert("order".into(), json!(self.order));

        let mut wlan = Map::new();
        wlan.insert("fc".into(), Value::Object(fc));
        wlan.insert("duration".into(), json!(self.duration));
        wlan.insert("ra".into(), json!(self.ra));
        if let Some(ta) = &self.ta {
            wlan.insert("ta".into(), json!(ta));
        }
        if let Some(da) = &self.da {
            wlan.insert("da".into(), json!(da));
        }
        if let Some(sa) = &self.sa {
            wlan.insert("sa".into(), json!(sa));
        }
        if let Some(bssid) = &self.bssid {
            wlan.insert("bssid".into(), json!(bssid));
        }
        if let Some(sta) = &self.sta {
            wlan.insert("sta".into(), json!(sta));
        }
        if self.wds {
            wlan.insert("wds".into(), json!(true));
        }
        if self.frame_type != FrameType::Control {
            wlan.insert("frag_number".into(), json!(self.frag));
            wlan.insert("seq_number".into(), json!(self.seq));
        }
        Value::Object(wlan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> [u8; 6] {
        [n; 6]
    }

    fn beacon_header() -> Vec<u8> {
        let mut data = vec![0x80, 0x00, 0x00, 0x00];
        data.extend_from_slice(&addr(1)); // ra/da
        data.extend_from_slice(&addr(2)); // ta/sa
        data.extend_from_slice(&addr(3)); // bssid
        data.extend_from_slice(&[0x10, 0x00]); // seq ctrl
        data
    }

    #[test]
    fn beacon_is_management_type_0_subtype_8() {
        let header = Dot11Header::parse(&beacon_header()).unwrap();
        assert_eq!(header.frame_type, FrameType::Management);
        assert_eq!(header.subtype, 8);
        assert_eq!(header.type_subtype_name(), "Beacon");
        assert_eq!(header.bssid.as_deref(), Some(mac_string(&addr(3)).as_str()));
    }

    #[test]
    fn tods_fromds_mapping_matches_table() {
        // tods=1, fromds=0: da=a3 ta=a2 sa=a2 bssid=a1 sta=a2
        let mut data = vec![0x08, 0x01, 0x00, 0x00]; // type=data(2) subtype=0, tods=1
        data.extend_from_slice(&addr(1));
        data.extend_from_slice(&addr(2));
        data.extend_from_slice(&addr(3));
        data.extend_from_slice(&[0x00, 0x00]);
        let header = Dot11Header::parse(&data).unwrap();
        assert_eq!(header.da.as_deref(), Some(mac_string(&addr(3)).as_str()));
        assert_eq!(header.ta.as_deref(), Some(mac_string(&addr(2)).as_str()));
        assert_eq!(header.sa.as_deref(), Some(mac_string(&addr(2)).as_str()));
        assert_eq!(header.bssid.as_deref(), Some(mac_string(&addr(1)).as_str()));
        assert_eq!(header.sta.as_deref(), Some(mac_string(&addr(2)).as_str()));
    }

    #[test]
    fn qos_data_header_includes_qos_control_offset() {
        let mut data = vec![0x88, 0x00, 0x00, 0x00]; // type=data subtype=8 (QoS data)
        data.extend_from_slice(&addr(1));
        data.extend_from_slice(&addr(2));
        data.extend_from_slice(&addr(3));
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(&[0x05, 0x00]); // QoS control, tid=5
        let header = Dot11Header::parse(&data).unwrap();
        assert_eq!(header.header_len, 26);
        let qos = header.qos_control(&data).unwrap();
        assert_eq!(qos[0], 0x05);
    }

    #[test]
    fn control_frame_without_ta_is_ra_only() {
        let mut data = vec![0xb4, 0x00, 0x00, 0x00]; // type=control(1) subtype=11 RTS has TA... use ACK(13) instead
        data[0] = 0xd4; // subtype 13 = ACK, no TA
        data.extend_from_slice(&addr(1));
        let header = Dot11Header::parse(&data).unwrap();
        assert_eq!(header.frame_type, FrameType::Control);
        assert!(header.ta.is_none());
    }
}
