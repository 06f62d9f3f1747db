//! HT capabilities (IE 45) and HT information (IE 61) bit layout (§4.9.3,
//! §4.9.5). Transcribed bit-for-bit from `utils/tins.cpp`'s
//! `ParseDot11ManagementOptions` HT branches and `ParseMCSSet`.

use serde_json::{json, Value};

/// IE 45 bytes 0-2: `ht.capabilities.*` and `ht.ampduparam.*`.
pub fn parse_ht_capabilities(data: &[u8]) -> (Option<Value>, Option<Value>) {
    let capabilities = if data.len() >= 2 {
        let byte0 = data[0];
        let byte1 = data[1];
        let bit0 = |n: u32| (byte0 >> n) & 1 != 0;
        let bit1 = |n: u32| (byte1 >> n) & 1 != 0;
        let sm = ((byte0 >> 3) & 1) * 2 + ((byte0 >> 2) & 1);
        let rxstbc = ((byte1 >> 1) & 1) * 2 + (byte1 & 1);
        let mut capa = json!({
            "ldpccoding": bit0(0),
            "width": bit0(1),
            "width_mhz": if bit0(1) { 40 } else { 20 },
            "sm": sm,
            "green": bit0(4),
            "short20": bit0(5),
            "short40": bit0(6),
            "txstbc": bit0(7),
            "rxstbc": rxstbc,
            "delayedblockack": bit1(2),
            "amsdu": bit1(3),
            "dsscck": bit1(4),
            "psmp": bit1(5),
            "40mhzintolerant": bit1(6),
            "lsig": bit1(7),
        });
        if let Some(obj) = capa.as_object_mut() {
            if sm == 3 {
                obj.insert("sm_parsed".into(), json!("power save disabled"));
            }
            if rxstbc == 0 {
                obj.insert("rxstbc_parsed".into(), json!("disabled"));
            }
            if bit1(3) {
                obj.insert("max_amsdu_length".into(), json!(7935));
            }
        }
        Some(capa)
    } else {
        None
    };

    let ampduparam = if data.len() >= 3 {
        let byte2 = data[2];
        let maxlength = ((byte2 >> 1) & 1) * 2 + (byte2 & 1);
        let mpdudensity = ((byte2 >> 4) & 1) * 4 + ((byte2 >> 3) & 1) * 2 + ((byte2 >> 2) & 1);
        let reserved = ((byte2 >> 7) & 1) * 4 + ((byte2 >> 6) & 1) * 2 + ((byte2 >> 5) & 1);
        let mut param = json!({
            "maxlength": maxlength,
            "mpdudensity": mpdudensity,
            "reserved": reserved,
        });
        if let Some(obj) = param.as_object_mut() {
            if maxlength == 3 {
                obj.insert("maxlength_parsed".into(), json!(65535));
            }
            if mpdudensity == 6 {
                obj.insert("mpdudensity_usec".into(), json!(8));
            }
        }
        Some(param)
    } else {
        None
    };

    (capabilities, ampduparam)
}

/// IE 61 bytes 0-5: `ht.info.*`.
pub fn parse_ht_info(data: &[u8]) -> Option<Value> {
    if data.len() < 6 {
        return None;
    }
    let byte1 = data[1];
    let byte2 = data[2];
    let byte4 = data[4];
    let byte5 = data[5];

    let channeloffset = (byte1 & 1) + ((byte1 >> 1) & 1) * 2;
    let secchanneloffset_parsed = match channeloffset {
        0 => "NoHT",
        1 => "HT+",
        2 => "Reserved",
        _ => "HT-",
    };
    let value = ((byte1 >> 5) & 1) + ((byte1 >> 6) & 1) * 2 + ((byte1 >> 7) & 1) * 4;
    let om = (byte2 & 1) + ((byte2 >> 1) & 1) * 2;
    let operatingmode_parsed = match om {
        0 => "All STAs are - 20/40 MHz HT or in a 20/40 MHz BSS or are 20 MHz HT in a 20 MHz BSS",
        1 => "HT non-member protection mode",
        2 => "Only HT STAs in the BSS, however, there exists at least one 20 MHz STA",
        _ => "HT mixed mode",
    };

    Some(json!({
        "primary channel": data[0],
        "delim1": byte1,
        "secchanneloffset": channeloffset,
        "secchanneloffset_parsed": secchanneloffset_parsed,
        "channelwidth": (byte1 >> 2) & 1 != 0,
        "channelwidth_parsed": if (byte1 >> 2) & 1 != 0 {
            "Any channel width in the STA's Supported Channel Width Set"
        } else {
            "20MHz channel width only"
        },
        "rifs": (byte1 >> 3) & 1 != 0,
        "psmponly": (byte1 >> 4) & 1 != 0,
        "value": value,
        "ssi_ms": (value as u32 + 1) * 5,
        "operatingmode": om,
        "operatingmode_parsed": operatingmode_parsed,
        "greenfield": (byte2 >> 2) & 1 != 0,
        "burstlim": (byte2 >> 3) & 1 != 0,
        "obssnonht": (byte2 >> 4) & 1 != 0,
        "reserved1": (byte2 as u32 / 32) + (data[3] as u32 * 8),
        "reserved2": byte4 % 64,
        "dualbeacon": (byte4 >> 6) & 1 != 0,
        "dualcts": (byte4 >> 7) & 1 != 0,
        "secondarybeacon": byte5 & 1 != 0,
        "lsigprotsupport": (byte5 >> 1) & 1 != 0,
        "pco": { "active": (byte5 >> 2) & 1 != 0, "phase": (byte5 >> 3) & 1 != 0 },
        "reserved3": byte5 / 16,
    }))
}

/// MCS set block (§4.9.5), 15+1 bytes from `offset` (3 for IE 45, 6 for IE
/// 61). The `byte7[offset + 4]` indexing in the original `ParseMCSSet` reads
/// outside an 8-bit bitset for the IE-61 call (`offset=6` → index 10); both
/// call sites are treated here as the evidently-intended `byte7` bit 7.
pub fn parse_mcs_set(data: &[u8], offset: usize, tag: u32) -> Value {
    if data.len() < offset + 16 {
        return json!({ "failed": "MCS Set parsing failure, report this frame.", "tag": tag });
    }
    let b = &data[offset..offset + 16];
    let stream_amount = (b[0] as u32 + b[1] as u32 + b[2] as u32 + b[3] as u32) / 0xff;
    let byte7 = b[4];
    let bit7 = |n: u32| (byte7 >> n) & 1 != 0;

    let b39to52: u32 = (bit7(7) as u32) + (b[5] as u32 * 2) + ((b[6] as u32 % 32) * 512);
    let mut b53to76: u64 = (bit7(7) as u64 * 2) + (bit7(6) as u64 * 2) + (bit7(5) as u64);
    b53to76 += (b[6] as u64 / 32) + (b[7] as u64 * 8) + (b[8] as u64 * 2048) + ((b[9] as u64 % 32) * 524288);

    let highestdatarate = b[10] as u32 + (b[11] as u32 % 4) * 256;
    let byte15 = b[12];

    json!({
        "rxbitmask": {
            "0to7": b[0],
            "8to15": b[1],
            "16to23": b[2],
            "24to31": b[3],
            "stream_amount": stream_amount,
            "32": bit7(0),
            "33to38": (b[4] % 128) / 2,
            "39to52": b39to52,
            "53to76": b53to76,
        },
        "highestdatarate": highestdatarate,
        "txsetdefined": byte15 & 1 != 0,
        "txrxmcsnotequal": (byte15 >> 1) & 1 != 0,
        "txmaxss": ((byte15 >> 3) & 1) * 2 + ((byte15 >> 2) & 1),
        "txunequalmod": (byte15 >> 4) & 1 != 0,
        "tag": tag,
    })
}

/// IE 45 bytes 21-24: `txbf.*` (§4.9.3).
pub fn parse_txbf(data: &[u8]) -> Option<Value> {
    if data.len() < 25 {
        return None;
    }
    let byte21 = data[21];
    let byte22 = data[22];
    let byte23 = data[23];
    let byte24 = data[24];
    let bit = |byte: u8, n: u32| (byte >> n) & 1 != 0;

    let calibration = (bit(byte21, 7) as u32) * 2 + bit(byte21, 6) as u32;
    let mingroup = bit(byte23, 1) as u32 + bit(byte23, 2) as u32 * 2;
    let csinumant = bit(byte23, 3) as u32 + bit(byte23, 4) as u32 * 2;
    let maxant_uncompressed = bit(byte23, 5) as u32 + bit(byte23, 6) as u32 * 2;
    let maxant_compressed = bit(byte23, 7) as u32 + bit(byte24, 0) as u32 * 2;
    let maxrows = bit(byte24, 1) as u32 + bit(byte24, 2) as u32 * 2;
    let channelest = bit(byte24, 3) as u32 + bit(byte24, 4) as u32 * 2;
    let reserved = bit(byte24, 5) as u32 + bit(byte24, 6) as u32 * 2 + bit(byte24, 7) as u32 * 4;

    let mut txbf = json!({
        "txbf": bit(byte21, 0),
        "rxss": bit(byte21, 1),
        "txss": bit(byte21, 2),
        "rxndp": bit(byte21, 3),
        "txndp": bit(byte21, 4),
        "impltxbf": bit(byte21, 5),
        "calibration": calibration,
        "rcsi": (bit(byte22, 4) as u32) * 2 + bit(byte21, 3) as u32,
        "mingroup": mingroup,
        "csinumant": csinumant,
        "csinumant_parsed": csinumant + 1,
        "channelest": channelest,
        "channelest_parsed": channelest + 1,
        "reserved": reserved,
    });
    if calibration == 0 {
        txbf["calibration_parsed"] = json!("incapable");
    }

    let csi = json!({
        "value": bit(byte22, 0),
        "maxrows": maxrows,
        "maxrows_parsed": maxrows + 1,
    });
    let uncompressed = json!({
        "tbf": bit(byte22, 1),
        "rbf": (bit(byte22, 6) as u32) * 2 + bit(byte21, 5) as u32,
        "maxant": maxant_uncompressed,
        "maxant_parsed": maxant_uncompressed + 1,
    });
    let compressed = json!({
        "tbf": bit(byte22, 2),
        "bf": bit(byte22, 7) as u32 + (bit(byte23, 0) as u32) * 2,
        "maxant": maxant_compressed,
        "maxant_parsed": maxant_compressed + 1,
    });
    txbf["fm"] = json!({ "compressed": compressed, "uncompressed": uncompressed });
    txbf["csi"] = csi;
    Some(txbf)
}

/// IE 45 byte 25: `asel.*` (§4.9.3).
pub fn parse_asel(data: &[u8]) -> Option<Value> {
    if data.len() < 26 {
        return None;
    }
    let byte25 = data[25];
    let bit = |n: u32| (byte25 >> n) & 1 != 0;
    Some(json!({
        "capable": bit(0),
        "txcsi": bit(1),
        "txif": bit(2),
        "csi": bit(3),
        "if": bit(4),
        "rx": bit(5),
        "sppdu": bit(6),
        "reserved": bit(7),
    }))
}

/// IE 19-20: `ht.htex.capabilities.*` (§4.9.3).
pub fn parse_htex(data: &[u8]) -> Option<Value> {
    if data.len() < 21 {
        return None;
    }
    let byte19 = data[19];
    let byte20 = data[20];
    Some(json!({
        "pco": (byte19 >> 4) & 1 != 0,
        "transtime": ((byte19 >> 2) & 1) as u32 * 2 + ((byte19 >> 1) & 1) as u32,
        "mcs": ((byte20 >> 1) & 1) as u32 * 2 + (byte20 & 1) as u32,
        "htc": (byte20 >> 2) & 1 != 0,
        "rdresponder": (byte20 >> 3) & 1 != 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_bit_selects_40mhz() {
        let (capa, _) = parse_ht_capabilities(&[0x02, 0x00]);
        assert_eq!(capa.unwrap()["width_mhz"], json!(40));
    }

    #[test]
    fn ampduparam_maxlength_3_parses_to_65535() {
        let (_, ampdu) = parse_ht_capabilities(&[0, 0, 0x03]);
        assert_eq!(ampdu.unwrap()["maxlength_parsed"], json!(65535));
    }

    #[test]
    fn mcs_set_too_short_reports_failure() {
        let result = parse_mcs_set(&[0u8; 5], 3, 45);
        assert_eq!(result["failed"], json!("MCS Set parsing failure, report this frame."));
    }

    #[test]
    fn mcs_set_stream_amount_counts_0xff_bytes() {
        let mut data = vec![0u8; 3];
        data.extend_from_slice(&[0xffu8, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let result = parse_mcs_set(&data, 3, 45);
        assert_eq!(result["rxbitmask"]["stream_amount"], json!(2));
    }
}
