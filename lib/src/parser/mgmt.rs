//! Per-subtype management-frame fixed-parameter decode (§4.9 step 4),
//! grounded in the subtype switch of `ParseDot11ManagementFrame` in
//! `utils/tins.cpp`.

use serde_json::{json, Value};

use super::capabilities::parse_capabilities;
use super::codes::{reason_code_text, status_code_text};

const ASSOC_REQUEST: u8 = 0;
const ASSOC_RESPONSE: u8 = 1;
const PROBE_RESPONSE: u8 = 5;
const BEACON: u8 = 8;
const AUTHENTICATION: u8 = 11;
const DEAUTHENTICATION: u8 = 12;

fn status_code_json(code: u16) -> Value {
    let mut v = json!({ "status_code": code });
    if let Some(text) = status_code_text(code) {
        v["status_code_parsed"] = json!(text);
    }
    v
}

/// Builds `wlan_mgt.fixed.*` for the subtypes §4.9 step 4 names. Returns
/// `None` for subtypes with no normative fixed-parameter decode (probe
/// request, disassociation, action, ...): those frames still get their
/// information elements parsed, just no `fixed` object.
pub fn parse_fixed_parameters(subtype: u8, body: &[u8]) -> Option<Value> {
    match subtype {
        s if s == ASSOC_REQUEST => {
            if body.len() < 4 {
                return None;
            }
            let listen_ival = u16::from_le_bytes([body[2], body[3]]);
            Some(json!({
                "listen_ival": listen_ival,
                "capabilities": parse_capabilities(u16::from_le_bytes([body[0], body[1]])),
            }))
        }
        s if s == ASSOC_RESPONSE => {
            if body.len() < 6 {
                return None;
            }
            let ci = u16::from_le_bytes([body[0], body[1]]);
            let status_code = u16::from_le_bytes([body[2], body[3]]);
            let aid = u16::from_le_bytes([body[4], body[5]]);
            let mut fixed = status_code_json(status_code);
            fixed["aid"] = json!(aid);
            fixed["capabilities"] = parse_capabilities(ci);
            Some(fixed)
        }
        s if s == PROBE_RESPONSE || s == BEACON => {
            if body.len() < 12 {
                return None;
            }
            let timestamp = u64::from_le_bytes(body[0..8].try_into().ok()?);
            let beacon_interval = u16::from_le_bytes([body[8], body[9]]);
            let ci = u16::from_le_bytes([body[10], body[11]]);
            Some(json!({
                "timestamp": timestamp,
                "timestamp_hex": format!("0x{:016x}", timestamp),
                "beacon": beacon_interval,
                "beacon_interval_usec": beacon_interval as u32 * 1024,
                "capabilities": parse_capabilities(ci),
            }))
        }
        s if s == AUTHENTICATION => {
            if body.len() < 6 {
                return None;
            }
            let alg = u16::from_le_bytes([body[0], body[1]]);
            let auth_seq = u16::from_le_bytes([body[2], body[3]]);
            let status_code = u16::from_le_bytes([body[4], body[5]]);
            let mut fixed = status_code_json(status_code);
            fixed["auth_seq"] = json!(auth_seq);
            fixed["auth"] = json!({
                "alg": alg,
                "type": if alg == 0 { "Open" } else { "Shared" },
            });
            Some(fixed)
        }
        s if s == DEAUTHENTICATION => {
            if body.len() < 2 {
                return None;
            }
            let reason_code = u16::from_le_bytes([body[0], body[1]]);
            let mut fixed = json!({ "reason_code": reason_code });
            if let Some(text) = reason_code_text(reason_code) {
                fixed["reason_code_parsed"] = json!(text);
            }
            Some(fixed)
        }
        _ => None,
    }
}

/// Byte offset of the tagged-parameters region relative to the start of the
/// fixed-parameter block, per subtype (§4.9 step 4).
pub fn fixed_parameter_len(subtype: u8) -> usize {
    match subtype {
        s if s == ASSOC_REQUEST => 4,
        s if s == ASSOC_RESPONSE => 6,
        s if s == PROBE_RESPONSE || s == BEACON => 12,
        s if s == AUTHENTICATION => 6,
        s if s == DEAUTHENTICATION => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deauthentication_reason_code_7_parses() {
        let fixed = parse_fixed_parameters(DEAUTHENTICATION, &[7, 0]).unwrap();
        assert_eq!(fixed["reason_code"], json!(7));
        assert_eq!(
            fixed["reason_code_parsed"],
            json!("Class 3 frame received from nonassociated STA")
        );
    }

    #[test]
    fn authentication_alg_zero_is_open() {
        let fixed = parse_fixed_parameters(AUTHENTICATION, &[0, 0, 1, 0, 0, 0]).unwrap();
        assert_eq!(fixed["auth"]["type"], json!("Open"));
    }

    #[test]
    fn beacon_interval_usec_is_interval_times_1024() {
        let mut body = vec![0u8; 8];
        body.extend_from_slice(&[10, 0]); // interval = 10
        body.extend_from_slice(&[0, 0]); // capabilities
        let fixed = parse_fixed_parameters(BEACON, &body).unwrap();
        assert_eq!(fixed["beacon_interval_usec"], json!(10240));
    }

    #[test]
    fn unsupported_subtype_has_no_fixed_parameters() {
        assert!(parse_fixed_parameters(4, &[]).is_none());
    }
}
