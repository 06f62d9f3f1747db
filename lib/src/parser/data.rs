//! QoS data-frame field decode (§4.9 step 4, data group).

use serde_json::{json, Value};

/// Decodes a 2-byte QoS control field into `qos.*`. `wep`/`tkip`/`ccmp`/
/// `data` sub-objects are intentionally omitted this release: the
/// underlying parser does not yet expose the corresponding crypto headers
/// (§4.9 step 4: "a null result for any of these must not be set").
pub fn parse_qos(qos_control: &[u8; 2]) -> Value {
    let b0 = qos_control[0];
    let tid = (b0 & 0x0f) as u32;
    json!({
        "tid": tid,
        "priority": tid % 8,
        "ack": (b0 >> 5) & 0x03,
        "amsdupresent": (b0 >> 7) & 1 != 0,
        "eosp": (b0 >> 4) & 1 != 0,
        "bit4": (b0 >> 4) & 1 != 0,
        "ps_buf_state": qos_control[1],
        "txop_dur_request": qos_control[1],
        "buf_state_indicated": (b0 >> 4) & 1 != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_and_priority_match() {
        let qos = parse_qos(&[5, 0]);
        assert_eq!(qos["tid"], json!(5));
        assert_eq!(qos["priority"], json!(5));
    }
}
