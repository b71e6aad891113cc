/// Cleans a level label or country header exported from a spreadsheet.
///
/// Byte-order marks and zero-width spaces are dropped and inner whitespace is
/// collapsed. Case is preserved because country headers are matched exactly.
pub(crate) fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
