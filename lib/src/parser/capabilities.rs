//! 16-bit capability-information decode (§4.9.1).

use serde_json::{json, Value};

/// Decodes the capability-information field carried in assoc-request,
/// assoc-response, probe-response/beacon fixed parameters.
pub fn parse_capabilities(ci: u16) -> Value {
    let bit = |n: u32| (ci >> n) & 1 != 0;
    json!({
        "ess": bit(0),
        "ibss": bit(1),
        "cfpoll": { "ap": bit(2) },
        "privacy": bit(4),
        "preamble": bit(5),
        "pbcc": bit(6),
        "agility": bit(7),
        "spec_man": bit(8),
        "short_slot_time": bit(10),
        "apsd": bit(11),
        "radio_measurement": bit(12),
        "dsss_ofdm": bit(13),
        "del_blk_ack": bit(14),
        "imm_blk_ack": bit(15),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ess_is_bit_0() {
        let caps = parse_capabilities(0x0001);
        assert_eq!(caps["ess"], json!(true));
        assert_eq!(caps["ibss"], json!(false));
    }

    #[test]
    fn privacy_is_bit_4() {
        let caps = parse_capabilities(0x0010);
        assert_eq!(caps["privacy"], json!(true));
    }
}
