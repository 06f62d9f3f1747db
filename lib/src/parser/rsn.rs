//! RSN information element (IE 48) decode (§4.9.2, §4.9.4).

use serde_json::{json, Value};

const RSN_OUI: u32 = 0x000fac;

fn cipher_suite(suite_type: u8) -> Value {
    let (type_val, value_parsed): (Option<u32>, Option<&str>) = match suite_type {
        1 => (Some(1), Some("WEP40")),
        2 => (Some(2), Some("TKIP")),
        4 => (Some(4), Some("CCM")),
        5 => (Some(5), Some("WEP104")),
        _ => (None, None),
    };
    match type_val {
        Some(t) => json!({
            "type": t,
            "value": (RSN_OUI << 8) | t,
            "value_parsed": value_parsed.unwrap(),
        }),
        None => json!({ "type": "unknown" }),
    }
}

fn akm_suite(suite_type: u8) -> Value {
    match suite_type {
        1 => json!({ "oui": RSN_OUI, "type": 1, "value": (RSN_OUI << 8) | 1, "value_parsed": "EAP" }),
        2 => json!({ "oui": RSN_OUI, "type": 2, "value": (RSN_OUI << 8) | 2, "value_parsed": "PSK" }),
        _ => json!({ "oui": RSN_OUI, "type": "unknown" }),
    }
}

/// Parses an RSN information element body (IE 48).
///
/// Layout: version(2 LE), group cipher suite(4: oui+type), pairwise count(2
/// LE) + pairwise suites(4 each), akm count(2 LE) + akm suites(4 each), then
/// an optional trailing RSN capabilities field (2 LE).
pub fn parse_rsn(data: &[u8]) -> Option<Value> {
    if data.len() < 8 {
        return None;
    }
    let version = u16::from_le_bytes([data[0], data[1]]);
    let gcs = cipher_suite(data[5]);

    let mut offset = 6;
    if data.len() < offset + 2 {
        return None;
    }
    let pcs_count = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2;
    let mut pcs_list = Vec::with_capacity(pcs_count);
    for _ in 0..pcs_count {
        if data.len() < offset + 4 {
            return None;
        }
        pcs_list.push(cipher_suite(data[offset + 3]));
        offset += 4;
    }

    if data.len() < offset + 2 {
        return Some(json!({
            "version": version,
            "gcs": gcs,
            "pcs": { "count": pcs_count, "list": pcs_list },
            "akms": { "count": 0, "list": [] },
        }));
    }
    let akm_count = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2;
    let mut akm_list = Vec::with_capacity(akm_count);
    for _ in 0..akm_count {
        if data.len() < offset + 4 {
            break;
        }
        akm_list.push(akm_suite(data[offset + 3]));
        offset += 4;
    }

    let mut rsn = json!({
        "version": version,
        "gcs": gcs,
        "pcs": { "count": pcs_count, "list": pcs_list },
        "akms": { "count": akm_list.len(), "list": akm_list },
    });

    if data.len() >= offset + 2 {
        let capa = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let bit = |n: u16| (capa >> n) & 1 != 0;
        let ptksa_rc = ((capa >> 3) & 1) * 2 + ((capa >> 2) & 1);
        let gtksa_rc = ((capa >> 5) & 1) * 2 + ((capa >> 4) & 1);
        let mut capabilities = json!({
            "preauth": bit(0),
            "no_pairwise": bit(1),
            "ptksa_replay_counter": ptksa_rc,
            "gtksa_replay_counter": gtksa_rc,
            "mfpr": bit(6),
            "mfpc": bit(7),
            "jmr": bit(8),
            "peerkey": bit(9),
        });
        if let Some(obj) = capabilities.as_object_mut() {
            if ptksa_rc == 0 || ptksa_rc == 3 {
                obj.insert("ptksa_replay_counter_parsed".into(), json!(if ptksa_rc == 0 { 1 } else { 16 }));
            }
            if gtksa_rc == 0 || gtksa_rc == 3 {
                obj.insert("gtksa_replay_counter_parsed".into(), json!(if gtksa_rc == 0 { 1 } else { 16 }));
            }
        }
        rsn["capabilities"] = capabilities;
    }

    Some(rsn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut v = vec![1u8, 0]; // version 1
        v.extend_from_slice(&[0x00, 0x0f, 0xac, 4]); // gcs CCMP
        v.extend_from_slice(&[1, 0]); // pairwise count
        v.extend_from_slice(&[0x00, 0x0f, 0xac, 4]); // pairwise CCMP
        v.extend_from_slice(&[1, 0]); // akm count
        v.extend_from_slice(&[0x00, 0x0f, 0xac, 2]); // akm PSK
        v.extend_from_slice(&[0x00, 0x00]); // capabilities
        v
    }

    #[test]
    fn decodes_ccmp_psk() {
        let rsn = parse_rsn(&sample()).unwrap();
        assert_eq!(rsn["gcs"]["value_parsed"], json!("CCM"));
        assert_eq!(rsn["akms"]["list"][0]["value_parsed"], json!("PSK"));
    }
}
