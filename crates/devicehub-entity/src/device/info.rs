//! Device label normalization applied before a session row is written.

/// Timezone labels rewritten to their common abbreviation.
const TIMEZONE_LABELS: &[(&str, &str)] = &[
    ("(Asia/Kolkata)", "(IST)"),
    ("(Asia/Calcutta)", "(IST)"),
];

/// Replace IANA timezone labels in a client-supplied device description.
pub fn normalize_device_info(raw: &str) -> String {
    TIMEZONE_LABELS
        .iter()
        .fold(raw.to_string(), |label, (from, to)| label.replace(from, to))
}
