//! Information-element tag/length/value iteration and per-tag decoders
//! (§4.9.2), grounded in `ParseDot11ManagementOptions` of `utils/tins.cpp`.

use serde_json::{json, Map, Value};

use super::{ht, rsn};
use crate::errors::ParseError;

const IE_ESSID: u8 = 0;
const IE_SUPPORTED_RATES: u8 = 1;
const IE_DS_PARAM_SET: u8 = 3;
const IE_TIM: u8 = 5;
const IE_COUNTRY_INFO: u8 = 7;
const IE_ERP_INFO42: u8 = 42;
const IE_HT_CAPA_D110: u8 = 45;
const IE_ERP_INFO47: u8 = 47;
const IE_RSN_INFORMATION: u8 = 48;
const IE_EXT_SUPPORTED_RATES: u8 = 50;
const IE_AP_CHANNEL_REPORT: u8 = 51;
const IE_HT_INFO_D110: u8 = 61;
const IE_EXTENDED_CAPA: u8 = 127;
const IE_VENDOR: u8 = 221;

fn rate_value(raw: u8) -> f64 {
    if raw == 0xff {
        -1.0
    } else {
        let v = if raw > 0x80 { raw - 0x80 } else { raw };
        v as f64 / 2.0
    }
}

fn parse_rates(data: &[u8]) -> (Vec<u8>, Vec<f64>) {
    let raw: Vec<u8> = data.iter().filter(|&&b| b != 0xff).copied().collect();
    let values: Vec<f64> = data.iter().map(|&b| rate_value(b)).collect();
    (raw, values)
}

fn oui_name(oui: [u8; 3]) -> Option<&'static str> {
    match oui {
        [0x00, 0x10, 0x18] => Some("Broadcom"),
        [0x00, 0x50, 0xf2] => Some("Microsoft"),
        [0x00, 0x0c, 0x43] => Some("RalinkTe"),
        [0x00, 0x90, 0x4c] => Some("Epigram"),
        [0x00, 0x03, 0x7f] => Some("AtherosC"),
        [0x00, 0x13, 0x92] => Some("RuckusWi"),
        _ => None,
    }
}

fn parse_vendor(data: &[u8], wlan_mgt: &mut Map<String, Value>, tag: &mut Map<String, Value>) {
    if data.len() < 4 {
        tag.insert("invalid".into(), json!("too short, expected at least 4 bytes long"));
        return;
    }
    let oui = [data[0], data[1], data[2]];
    let vendor_type = data[3];
    tag.insert("oui".into(), json!((oui[0] as u32) << 16 | (oui[1] as u32) << 8 | oui[2] as u32));
    tag.insert(
        "oui_parsed".into(),
        json!(format!("{:02x}-{:02x}-{:02x}", oui[0], oui[1], oui[2])),
    );

    let Some(name) = oui_name(oui) else { return };
    let mut vendor = Map::new();
    vendor.insert("name".into(), json!(name));

    if name == "Microsoft" && vendor_type == 2 && data.len() >= 8 {
        let byte6 = data[6];
        let ap = json!({
            "u_apsd": (byte6 >> 7) & 1 != 0,
            "parameter_set_count": byte6 % 16,
            "reserved": ((byte6 >> 4) & 1) as u32 + ((byte6 >> 5) & 1) as u32 * 2 + ((byte6 >> 6) & 1) as u32 * 4,
        });
        let mut wme = Map::new();
        wme.insert("subtype".into(), json!(data[4]));
        wme.insert("version".into(), json!(data[5]));
        wme.insert("qos_info".into(), json!({ "ap": ap }));
        wme.insert("reserved".into(), json!(data[7]));

        if data.len() > 8 && data.len() % 4 == 0 {
            let mut acp = Vec::new();
            let mut i = 8;
            while i + 4 <= data.len() {
                let byte = data[i];
                let item = json!({
                    "aci_aifsn": byte,
                    "aci": ((byte >> 5) & 1) as u32 + ((byte >> 6) & 1) as u32 * 2,
                    "acm": (byte >> 4) & 1 != 0,
                    "aifsn": byte % 16,
                    "ecw": {
                        "min": data[i + 1] % 16,
                        "max": data[i + 1] / 16,
                        "value": data[i + 1],
                    },
                    "txop_limit": (data[i + 3] as u32) * 256 + data[i + 2] as u32,
                });
                acp.push(item);
                i += 4;
            }
            wme.insert("acp".into(), json!({ "acp": acp }));
        }
        if let Some(wlan_mgt_wfa) = wlan_mgt.get_mut("wfa") {
            *wlan_mgt_wfa = json!({ "ie": { "type": vendor_type, "wme": wme } });
        } else {
            wlan_mgt.insert("wfa".into(), json!({ "ie": { "type": vendor_type, "wme": wme } }));
        }
    }

    tag.insert("vendor".into(), Value::Object(vendor));
}

/// Iterates the tagged parameters of a management frame body, populating
/// `wlan_mgt` per the IE table in §4.9.2 and returning the ordered `tagged[]`
/// entries.
pub fn parse_information_elements(
    mut body: &[u8],
    wlan_mgt: &mut Map<String, Value>,
) -> Result<Vec<Value>, ParseError> {
    let mut tagged = Vec::new();
    let mut mcsset: Vec<Value> = Vec::new();
    let mut ht_obj: Map<String, Value> = Map::new();

    while body.len() >= 2 {
        let number = body[0];
        let length = body[1] as usize;
        if body.len() < 2 + length {
            return Err(ParseError::IeTruncated { tag: number, len: length });
        }
        let value = &body[2..2 + length];
        let mut tag = Map::new();
        tag.insert("number".into(), json!(number));
        tag.insert("length".into(), json!(length));

        match number {
            n if n == IE_ESSID => {
                if length == 0 {
                    wlan_mgt.insert("ssid_broadcast".into(), json!(true));
                } else {
                    if length > 32 {
                        tag.insert("ssid_too_long".into(), json!(true));
                    }
                    wlan_mgt.insert("ssid".into(), json!(String::from_utf8_lossy(value)));
                }
            }
            n if n == IE_SUPPORTED_RATES => {
                if !value.is_empty() {
                    let (raw, values) = parse_rates(value);
                    wlan_mgt.insert("supported_rates".into(), json!(raw));
                    wlan_mgt.insert("supported_rates_mbit".into(), json!(values));
                }
            }
            n if n == IE_DS_PARAM_SET => {
                if !value.is_empty() {
                    wlan_mgt.insert("ds".into(), json!({ "current_channel": value[0] }));
                }
            }
            n if n == IE_TIM => {
                if value.len() >= 3 {
                    let bitmapctl = value[2];
                    wlan_mgt.insert(
                        "tim".into(),
                        json!({
                            "dtim_count": value[0],
                            "dtim_period": value[1],
                            "partial_virtual_bitmap": value[3..],
                            "bmapctl": {
                                "value": bitmapctl,
                                "multicast": bitmapctl % 2,
                                "offset": bitmapctl / 2,
                            },
                        }),
                    );
                } else {
                    tag.insert("invalid".into(), json!("incorrect length, should be >= 3"));
                }
            }
            n if n == IE_COUNTRY_INFO => {
                if value.len() >= 3 {
                    let code = String::from_utf8_lossy(&value[0..2]).to_string();
                    let mut fnm = Vec::new();
                    let mut i = 3;
                    while i + 3 <= value.len() {
                        fnm.push(json!({ "fcn": value[i], "nc": value[i + 1], "mtpl": value[i + 2] }));
                        i += 3;
                    }
                    wlan_mgt.insert(
                        "country_info".into(),
                        json!({ "code": code, "environment": value[2], "fnm": fnm }),
                    );
                }
            }
            n if n == IE_ERP_INFO42 || n == IE_ERP_INFO47 => {
                if value.len() == 1 {
                    let b = value[0];
                    wlan_mgt.insert(
                        "erp_info".into(),
                        json!({
                            "erp_present": b & 1 != 0,
                            "use_protection": (b >> 1) & 1 != 0,
                            "barker_preamble_mode": (b >> 2) & 1 != 0,
                            "reserved": b / 8,
                        }),
                    );
                }
            }
            n if n == IE_HT_CAPA_D110 => {
                let (capabilities, ampduparam) = ht::parse_ht_capabilities(value);
                if let Some(c) = capabilities {
                    ht_obj.insert("capabilities".into(), c);
                }
                if let Some(a) = ampduparam {
                    ht_obj.insert("ampduparam".into(), a);
                }
                if value.len() >= 19 {
                    mcsset.push(ht::parse_mcs_set(value, 3, number as u32));
                }
                if let Some(htex) = ht::parse_htex(value) {
                    wlan_mgt.insert("htex".into(), json!({ "capabilities": htex }));
                }
                if let Some(txbf) = ht::parse_txbf(value) {
                    wlan_mgt.insert("txbf".into(), txbf);
                }
                if let Some(asel) = ht::parse_asel(value) {
                    wlan_mgt.insert("asel".into(), asel);
                }
            }
            n if n == IE_RSN_INFORMATION => {
                if let Some(rsn) = rsn::parse_rsn(value) {
                    wlan_mgt.insert("rsn".into(), rsn);
                }
            }
            n if n == IE_EXT_SUPPORTED_RATES => {
                if !value.is_empty() {
                    let (raw, values) = parse_rates(value);
                    wlan_mgt.insert("extended_supported_rates".into(), json!(raw));
                    wlan_mgt.insert("extended_supported_rates_mbit".into(), json!(values));
                }
            }
            n if n == IE_AP_CHANNEL_REPORT => {
                if value.len() > 1 {
                    wlan_mgt.insert(
                        "ap_channel_report".into(),
                        json!({
                            "operating_class": value[0],
                            "channel_list": value[1..],
                        }),
                    );
                }
            }
            n if n == IE_HT_INFO_D110 => {
                if value.len() == 22 {
                    if let Some(info) = ht::parse_ht_info(value) {
                        ht_obj.insert("info".into(), info);
                    }
                    mcsset.push(ht::parse_mcs_set(value, 6, number as u32));
                } else {
                    tag.insert(
                        "invalid".into(),
                        json!("Invalid length, expected 22 bytes. Report this frame along with pcap"),
                    );
                }
            }
            n if n == IE_EXTENDED_CAPA => {
                if value.len() == 1 {
                    let b = value[0];
                    let bit = |n: u32| (b >> n) & 1 != 0;
                    wlan_mgt.insert(
                        "extcap".into(),
                        json!({
                            "b0": bit(0), "20_40_coex_mgt": bit(0),
                            "b1": bit(1), "on_demand_beacon": bit(1),
                            "b2": bit(2), "ext_chan_switch": bit(2),
                            "b3": bit(3), "wave_indication": bit(3),
                            "b4": bit(4), "psmp_capa": bit(4),
                            "b5": bit(5),
                            "b6": bit(6), "spsmp": bit(6),
                            "b7": bit(7), "event": bit(7),
                        }),
                    );
                }
            }
            n if n == IE_VENDOR => {
                parse_vendor(value, wlan_mgt, &mut tag);
            }
            _ => {
                tag.insert("unknown".into(), json!("please report this frame"));
            }
        }

        tagged.push(Value::Object(tag));
        body = &body[2 + length..];
    }

    if !ht_obj.is_empty() || !mcsset.is_empty() {
        if !mcsset.is_empty() {
            ht_obj.insert("mcsset".into(), json!(mcsset));
        }
        wlan_mgt.insert("ht".into(), Value::Object(ht_obj));
    }

    Ok(tagged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ie(number: u8, value: &[u8]) -> Vec<u8> {
        let mut v = vec![number, value.len() as u8];
        v.extend_from_slice(value);
        v
    }

    #[test]
    fn ssid_zero_length_sets_broadcast_flag() {
        let mut wlan_mgt = Map::new();
        let body = ie(0, &[]);
        parse_information_elements(&body, &mut wlan_mgt).unwrap();
        assert_eq!(wlan_mgt["ssid_broadcast"], json!(true));
    }

    #[test]
    fn ssid_decodes_to_string() {
        let mut wlan_mgt = Map::new();
        let body = ie(0, b"mynet");
        parse_information_elements(&body, &mut wlan_mgt).unwrap();
        assert_eq!(wlan_mgt["ssid"], json!("mynet"));
    }

    #[test]
    fn unknown_tag_is_flagged() {
        let mut wlan_mgt = Map::new();
        let body = ie(200, &[1, 2, 3]);
        let tagged = parse_information_elements(&body, &mut wlan_mgt).unwrap();
        assert_eq!(tagged[0]["unknown"], json!("please report this frame"));
    }

    #[test]
    fn ds_param_set_reads_current_channel() {
        let mut wlan_mgt = Map::new();
        let body = ie(3, &[6]);
        parse_information_elements(&body, &mut wlan_mgt).unwrap();
        assert_eq!(wlan_mgt["ds"]["current_channel"], json!(6));
    }

    #[test]
    fn vendor_broadcom_oui_is_named() {
        let mut wlan_mgt = Map::new();
        let body = ie(221, &[0x00, 0x10, 0x18, 0x02, 0xaa]);
        let tagged = parse_information_elements(&body, &mut wlan_mgt).unwrap();
        assert_eq!(tagged[0]["vendor"]["name"], json!("Broadcom"));
    }
}
