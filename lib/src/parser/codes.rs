//! The normative status-code (104 entries) and reason-code (67 entries)
//! text tables, transcribed verbatim from `utils/tins.cpp`'s
//! `statusCodeTranslation`/`reasonCodeTranslation` arrays (IEEE 802.11
//! Annex, management-frame status/reason codes).

/// Index `n` is the textual meaning of status code `n`; empty string where
/// the source table also left the slot blank.
pub const STATUS_CODES: [&str; 104] = [
    "Successful", "Unspecified failure", "TDLS wakeup schedule rejected but alternative schedule provided", "TDLS wakeup schedule rejected",
    "Reserved", "Security disabled", "Unacceptable lifetime", "Not in same BSS", "Reserved", "Reserved",
    "Cannot support all requested capabilities in the Capability Information field", "Reassociation denied due to inability to confirm that association exists",
    "Association denied due to reason outside the scope of this standard", "Responding STA does not support the specified authentication algorithm",
    "Received an Authentication frame with authentication transaction sequence number out of expected sequence",
    "Authentication rejected because of challenge failure", "Authentication rejected due to timeout waiting for next frame in sequence",
    "Association denied because AP is unable to handle additional associated STAs",
    "Association denied due to requesting STA not supporting all of the data rates in the BSSBasicRateSet parameter",
    "Association denied due to requesting STA not supporting the short preamble option",
    "Association denied due to requesting STA not supporting the PBCC modulation option",
    "Association denied due to requesting STA not supporting the Channel Agility option",
    "Association request rejected because Spectrum Management capability is required",
    "Association request rejected because the information in the Power Capability element is unacceptable",
    "Association request rejected because the information in the Supported Channels element is unacceptable",
    "Association denied due to requesting STA not supporting the Short Slot Time option",
    "Association denied due to requesting STA not supporting the DSSS-OFDM option",
    "Reserved Association denied because the requesting STA does not support HT features", "R0KH unreachable",
    "Association denied because the requesting STA does not support the phased coexistence operation (PCO) transition time required by the AP",
    "Association request rejected temporarily; try again later", "Robust Management frame policy violation", "Unspecified, QoS-related failure",
    "Association denied because QoS AP or PCP has insufficient bandwidth to handle another QoS STA",
    "Association denied due to excessive frame loss rates and/or poor conditions on current operating channel",
    "Association (with QoS BSS) denied because the requesting STA does not support the QoS facility", "Reserved",
    "The request has been declined", "The request has not been successful as one or more parameters have invalid values",
    "The allocation or TS has not been created because the request cannot be honored; however, a suggested TSPEC/DMG TSPEC is provided so that the initiating STA may attempt to set another allocation or TSPEC/DMG TSPEC",
    "Invalid information element, i.e., an information element defined in this standard for which the content does not meet the specifications in Clause 7",
    "Invalid group cipher", "Invalid pairwise cipher", "Invalid AKMP", "Unsupported RSN information element version",
    "Invalid RSN information element capabilities", "Cipher suite rejected because of security policy",
    "The TS per allocation has not been created; however, the PCP/HC may be capable of creating a TS or allocation, in response to a request, after the time indicated in the TS Delay element",
    "Direct link is not allowed in the BSS by policy", "The Destination STA is not present within this BSS",
    "The Destination STA is not a QoS STA", "Association denied because the ListenInterval is too large", "Invalid FT Action frame count",
    "Invalid pairwise master key identifier (PMKID)", "Invalid MDIE", "Invalid FTIE", "Requested TCLAS processing is not supported by the PCP/AP",
    "The PCP/AP has insufficient TCLAS processing resources to satisfy the request",
    "The TS has not been created because the request cannot be honored; however, the PCP/HC suggests the STA to transition to other BSSs to setup the TS",
    "GAS Advertisement Protocol not supported", "No outstanding GAS request", "GAS Response not received from the Advertisement Server",
    "STA timed out waiting for GAS Query Response", "GAS Response is larger than query response length limit",
    "Request refused because home network does not support request", "Advertisement Server in the network is not currently reachable",
    "Reserved", "Request refused due to permissions received via SSPN interface", "Request refused because PCP/AP does not support unauthenticated access",
    "Reserved", "Reserved", "Reserved", "Invalid contents of RSNIE", "U-APSD Coexistence is not supported", "Requested U-APSD Coexistence mode is not supported",
    "Requested Interval/Duration value cannot be supported with U-APSD Coexistence", "Authentication is rejected because an Anti-Clogging Token is required",
    "Authentication is rejected because the offered finite cyclic group is not supported",
    "The TBTT adjustment request has not been successful because the STA could not find an alternative TBTT", "Transmission failure",
    "Requested TCLAS Not Supported", "TCLAS Resources Exhausted", "Rejected with Suggested BSS Transition", "Reject with recommended schedule",
    "Reject because no wakeup schedule specified", "Success, the destination STA is in power save mode", "FST pending, in process of admitting FST session",
    "Performing FST now", "FST pending, gap(s) in Block Ack window", "", "", "Reject because of U-PID setting",
    "(Re)association refused for some external reason", "(Re)association refused because of memory limits at the AP",
    "(Re)association refused because emergency services are not supported at the AP", "GAS query response not yet received",
    "Reject since the request is for transition to a frequency band subject to DSE procedures and FST initiator is a dependent STA",
    "Reserved", "Reserved", "The association has been denied; however, one or more Multi-band elements are included that can be used by the receiving STA to join the BSS",
    "The request failed due to a reservation conflict", "The request failed due to exceeded MAF limit", "The request failed due to exceeded MCCA track limit",
    "Association denied because the information in the Spectrum Management field is unacceptable",
];

/// Index `n` is the textual meaning of reason code `n`.
pub const REASON_CODES: [&str; 67] = [
    "", "Unspecified reason", "Previous authentication no longer valid", "Deauthenticated because sending STA is leaving (or has left) IBSS or ESS",
    "Disassociated due to inactivity", "Disassociated because AP is unable to handle all currently associated STAs",
    "Class 2 frame received from nonauthenticated STA", "Class 3 frame received from nonassociated STA", "Disassociated because sending STA is leaving (or has left) BSS",
    "STA requesting (re)association is not authenticated with responding STA", "Disassociated because the information in the Power Capability element is unacceptable",
    "Disassociated because the information in the Supported Channels element is unacceptable", "Reserved",
    "Invalid information element, i.e., an information element defined in this standard for which the content does not meet the specifications in Clause 7",
    "Message integrity code (MIC) failure", "4-Way Handshake timeout", "Group Key Handshake timeout",
    "Information element in 4-Way Handshake different from (Re)Association Request/Probe Response/Beacon frame", "Invalid group cipher",
    "Invalid pairwise cipher", "Invalid AKMP", "Unsupported RSN information element version", "Invalid RSN information element capabilities",
    "IEEE 802.1X authentication failed", "Cipher suite rejected because of the security policy",
    "TDLS direct-link teardown due to TDLS peer STA unreachable via the TDLS direct link", "TDLS direct-link teardown for unspecified reason",
    "Disassociated because session terminated by SSP request", "Disassociated because of lack of SSP roaming agreement",
    "Requested service rejected because of SSP cipher suite or AKM requirement ", "Requested service not authorized in this location",
    "TS deleted because QoS AP lacks sufficient bandwidth for this QoS STA due to a change in BSS service characteristics or operational mode",
    "Disassociated for unspecified, QoS-related reason", "Disassociated because QoS AP lacks sufficient bandwidth for this QoS STA",
    "Disassociated because excessive number of frames need to be acknowledged, but are not acknowledged due to AP transmissions and/or poor channel conditions",
    "Disassociated because STA is transmitting outside the limits of its TXOPs", "Requested from peer STA as the STA is leaving the BSS (or resetting)",
    "Requested from peer STA as it does not want to use the mechanism", "Requested from peer STA as the STA received frames using the mechanism for which a setup is required",
    "Requested from peer STA due to timeout", "Peer STA does not support the requested cipher suite", "Disassociated because authorized access limit reached",
    "Disassociated due to external service requirements", "Invalid FT Action frame count", "Invalid pairwise master key identifier (PMKI)", "Invalid MDE",
    "Invalid FTE", "SME cancels the mesh peering instance with the reason other than reaching the maximum number of peer mesh STAs",
    "The mesh STA has reached the supported maximum number of peer mesh STAs",
    "The received information violates the Mesh Configuration policy configured in the mesh STA profile",
    "The mesh STA has received a Mesh Peering Close message requesting to close the mesh peering",
    "The mesh STA has re-sent dot11MeshMaxRetries Mesh Peering Open messages, without receiving a Mesh Peering Confirm message",
    "The confirmTimer for the mesh peering instance times out", "The mesh STA fails to unwrap the GTK or the values in the wrapped contents do not match",
    "The mesh STA receives inconsistent information about the mesh parameters between Mesh Peering Management frames",
    "The mesh STA fails the authenticated mesh peering exchange because due to failure in selecting either the pairwise ciphersuite or group ciphersuite",
    "The mesh STA does not have proxy information for this external destination", "The mesh STA does not have forwarding information for this destination",
    "The mesh STA determines that the link to the next hop of an active path in its forwarding information is no longer usable",
    "The Deauthentication frame was sent because the MAC address of the STA already exists in the mesh BSS. See 11.3.3 (Additional mechanisms for an AP collocated with a mesh STA)",
    "The mesh STA performs channel switch to meet regulatory requirements", "The mesh STA performs channel switch with unspecified reason",
    "Reserved", "Reserved", "Reserved", "Reserved", "Reserved",
];

/// Translates a status code, `None` if out of range or the slot is blank.
pub fn status_code_text(code: u16) -> Option<&'static str> {
    STATUS_CODES
        .get(code as usize)
        .copied()
        .filter(|s| !s.is_empty())
}

/// Translates a reason code, `None` if out of range or the slot is blank.
pub fn reason_code_text(code: u16) -> Option<&'static str> {
    REASON_CODES
        .get(code as usize)
        .copied()
        .filter(|s| !s.is_empty())
}

/// 16 management-frame type/subtype display names, indexed `[type][subtype]`
/// (types 2 and 3 are data/reserved in the original's layout convention: 0
/// is management, 1 is control; indices 2/3 below cover data and the
/// invalid placeholder the original keeps for a 4-wide type table).
pub const TYPE_SUBTYPE_NAMES: [[&str; 16]; 4] = [
    [
        "Association Request", "Association Response", "Ressociation Request", "Reassociation Response",
        "Probe Request", "Probe Response", "Reserved", "Reserved",
        "Beacon", "Announcement Traffic Indication Message (ATIM)", "Disassociation", "Authentication",
        "Deauthentitcation", "Action", "Action No ACK", "Reserved",
    ],
    [
        "Reserved", "Reserved", "Reserved", "Reserved",
        "Reserved", "Reserved", "Reserved", "Control Wrapper",
        "Block ACK Request", "Block ACK", "PS-Poll", "Ready to send",
        "Clear to send", "Acknowledgement", "CF End", "CF End + CF ACK",
    ],
    [
        "Data", "Data + CF-ACK", "Data + CF-Poll", "Data + CF-Ack + CF-Poll",
        "Null function (No data)", "CF-ACK (No data)", "CF-Poll (No data)", "CF-ACK + CF-Poll (No data)",
        "QoS Data", "Reserved", "QoS Data + CF-Poll", "QoS Data + CF-ACK + CF-Poll",
        "QoS Null Data", "Reserved", "QoS Data + CF-Poll (no data)", "QoS CF-ACK + CF-Poll (no data):",
    ],
    ["Invalid"; 16],
];

pub const TYPE_NAMES: [&str; 4] = ["Management frame", "Control frame", "Data frame", "Invalid"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_0_is_successful() {
        assert_eq!(status_code_text(0), Some("Successful"));
    }

    #[test]
    fn reason_code_7_matches_scenario_s6() {
        assert_eq!(
            reason_code_text(7),
            Some("Class 3 frame received from nonassociated STA")
        );
    }

    #[test]
    fn blank_slots_translate_to_none() {
        assert_eq!(status_code_text(84), None);
        assert_eq!(reason_code_text(0), None);
    }

    #[test]
    fn beacon_is_type_0_subtype_8() {
        assert_eq!(TYPE_SUBTYPE_NAMES[0][8], "Beacon");
    }
}
