//! Phone-number extraction from free-form spreadsheet cells.
//!
//! Cells in real exports carry anything from a clean `3001234567` to
//! `"call 300-123-4567 or 3007654321"` to two numbers concatenated with no
//! delimiter at all. [`extract_numbers`] strips the noise and pulls out every
//! candidate of exactly [`PHONE_LEN`] digits.

/// Target phone-number length for the source locale (Colombian mobile
/// numbers: 10 digits, no country code).
pub const PHONE_LEN: usize = 10;

/// Extracts every candidate phone number of exactly [`PHONE_LEN`] digits
/// from a raw cell value.
///
/// All non-digit characters are stripped first, then the digit string is
/// scanned in non-overlapping [`PHONE_LEN`]-sized windows: on a match the
/// cursor advances past the whole window, so two numbers concatenated in one
/// cell come out as two candidates and a single long run is not re-matched
/// at every offset. Repeats within one cell are dropped.
///
/// For a digit string longer than [`PHONE_LEN`] with no delimiter evidence
/// this is a best-effort salvage (the first windows win), not a guaranteed
/// parse. Inputs with fewer than [`PHONE_LEN`] digits yield nothing.
pub fn extract_numbers(raw: &str) -> Vec<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < PHONE_LEN {
        return Vec::new();
    }
    if digits.len() == PHONE_LEN {
        return vec![digits];
    }

    let mut numbers: Vec<String> = Vec::new();
    let mut i = 0;
    while i + PHONE_LEN <= digits.len() {
        let window = &digits[i..i + PHONE_LEN];
        if !numbers.iter().any(|n| n == window) {
            numbers.push(window.to_string());
        }
        i += PHONE_LEN;
    }

    numbers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_nothing() {
        assert!(extract_numbers("").is_empty());
    }

    #[test]
    fn too_few_digits_yields_nothing() {
        assert!(extract_numbers("123456789").is_empty());
        assert!(extract_numbers("tel: 300-123").is_empty());
        assert!(extract_numbers("no digits here").is_empty());
    }

    #[test]
    fn exact_length_fast_path() {
        assert_eq!(extract_numbers("3001234567"), vec!["3001234567"]);
    }

    #[test]
    fn formatted_number_is_normalized() {
        assert_eq!(extract_numbers("(300) 123-4567"), vec!["3001234567"]);
        assert_eq!(extract_numbers("300 123 45 67"), vec!["3001234567"]);
    }

    #[test]
    fn two_delimited_numbers_in_one_cell() {
        assert_eq!(
            extract_numbers("3001234567 y 3007654321"),
            vec!["3001234567", "3007654321"]
        );
    }

    #[test]
    fn two_concatenated_numbers_no_delimiter() {
        assert_eq!(
            extract_numbers("30012345673007654321"),
            vec!["3001234567", "3007654321"]
        );
    }

    #[test]
    fn repeated_number_deduplicated_within_cell() {
        assert_eq!(
            extract_numbers("3001234567 / 3001234567"),
            vec!["3001234567"]
        );
    }

    #[test]
    fn order_follows_appearance() {
        assert_eq!(
            extract_numbers("3007654321, 3001234567"),
            vec!["3007654321", "3001234567"]
        );
    }

    #[test]
    fn trailing_partial_digits_are_dropped() {
        // 15 digits: one full window, the 5-digit tail is not a number
        assert_eq!(extract_numbers("300123456712345"), vec!["3001234567"]);
    }
}
