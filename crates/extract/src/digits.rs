//! Numeral script normalization.

/// Map a single character to its Western digit if it belongs to one of the
/// Arabic-Indic digit blocks.
fn western_digit(c: char) -> Option<char> {
    let offset = match c {
        // Eastern Arabic-Indic
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        // Extended Arabic-Indic (Persian, Urdu)
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Replace Arabic-Indic digits with `0-9`, leaving everything else intact.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| western_digit(c).unwrap_or(c))
        .collect()
}
