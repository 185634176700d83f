//! Marker probing and payload extraction from null-data scripts.

use crate::dispatch::VoutInfo;

/// The two-byte ASCII protocol marker.
pub const MARKER: &str = "tl";

/// The marker as it appears in script hex.
pub const MARKER_HEX: &str = "746c";

/// Hex offsets at which the marker may start, in probe priority. The spread
/// reflects historical variance in push-opcode encoding; transactions exist
/// on-chain at each of the three positions, so none may be dropped.
const MARKER_OFFSETS: [usize; 3] = [4, 5, 6];

/// A marker hit plus the decoded payload text that follows it.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ExtractedPayload {
    pub marker: String,
    pub payload: String,
}

/// Probes a null-data script's hex for the protocol marker and decodes the
/// payload behind it.
///
/// Returns `None` when the marker is absent from all three probe offsets,
/// when the payload hex is malformed, or when any payload byte falls outside
/// printable ASCII 0x20..=0x7E. Protocol payloads are printable by
/// construction, so a non-printable byte means foreign data or a
/// misalignment and the script is skipped rather than mis-decoded. Trailing
/// zero bytes are push padding and are stripped before the printable check.
pub fn extract_payload(script_hex: &str) -> Option<ExtractedPayload> {
    let hex = script_hex.to_ascii_lowercase();
    let off = MARKER_OFFSETS
        .into_iter()
        .find(|&off| hex.get(off..off + MARKER_HEX.len()) == Some(MARKER_HEX))?;

    let mut payload_hex = &hex[off + MARKER_HEX.len()..];
    while let Some(stripped) = payload_hex.strip_suffix("00") {
        payload_hex = stripped;
    }

    let bytes = hex::decode(payload_hex).ok()?;
    if bytes.iter().any(|b| !(0x20..=0x7e).contains(b)) {
        return None;
    }
    let payload = String::from_utf8(bytes).ok()?;
    Some(ExtractedPayload {
        marker: MARKER.to_owned(),
        payload,
    })
}

/// Scans a transaction's outputs for the first null-data script carrying the
/// marker. At most one protocol payload per transaction is honored.
pub fn first_payload(vouts: &[VoutInfo]) -> Option<ExtractedPayload> {
    vouts
        .iter()
        .filter_map(|v| v.script_hex.as_deref())
        .find_map(extract_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_tolerated_at_all_three_offsets() {
        // Offset 6: the documented literal vector.
        let hit = extract_payload("6a046a746c303000000000").unwrap();
        assert_eq!(hit.marker, "tl");
        assert_eq!(hit.payload, "00");

        // Offset 4.
        let hit = extract_payload("6a04746c3030").unwrap();
        assert_eq!(hit.payload, "00");

        // Offset 5 (nibble-shifted push prefix).
        let hit = extract_payload("6a0f0746c3030").unwrap();
        assert_eq!(hit.payload, "00");
    }

    #[test]
    fn marker_beyond_offset_six_is_rejected() {
        assert_eq!(extract_payload("6a0e6a6a6a6a746c3030"), None);
    }

    #[test]
    fn missing_marker_is_rejected() {
        assert_eq!(extract_payload("6a0401020304"), None);
        assert_eq!(extract_payload(""), None);
        assert_eq!(extract_payload("6a"), None);
    }

    #[test]
    fn non_printable_payload_is_rejected() {
        // 0x1f below the printable floor.
        assert_eq!(extract_payload("6a04746c301f"), None);
        // 0x7f above the printable ceiling.
        assert_eq!(extract_payload("6a04746c307f"), None);
        // Interior 0x00 is not padding and stays non-printable.
        assert_eq!(extract_payload("6a04746c300030"), None);
    }

    #[test]
    fn trailing_zero_padding_is_stripped() {
        let hit = extract_payload("6a04746c32334100000000").unwrap();
        assert_eq!(hit.payload, "23A");
    }

    #[test]
    fn odd_length_payload_hex_is_rejected() {
        assert_eq!(extract_payload("6a04746c303"), None);
    }

    #[test]
    fn uppercase_script_hex_is_tolerated() {
        let hit = extract_payload("6A04746C3030").unwrap();
        assert_eq!(hit.payload, "00");
    }
}
