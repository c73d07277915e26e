//! Dialect selection by device OS version.
//!
//! Remote inspectors changed wire dialects at iOS 12.2: from that version on,
//! every protocol message must travel inside the `Target` envelope. The
//! decision is made once at session start and never revisited.

/// First OS version whose inspector requires the `Target` envelope.
const TARGET_ENVELOPE_MIN: (u32, u32, u32) = (12, 2, 0);

/// Whether a device's reported OS version requires the targeted dialect.
///
/// Versions are compared numerically, component by component. Missing or
/// unparseable components compare as zero, so `"12.2"` equals `"12.2.0"` and
/// garbage input falls back to the legacy direct dialect.
pub fn targeted_dialect(version: &str) -> bool {
    parse_components(version) >= TARGET_ENVELOPE_MIN
}

fn parse_components(version: &str) -> (u32, u32, u32) {
    let mut parts = version
        .split('.')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}
