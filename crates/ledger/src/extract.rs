//! Amount extraction from free-text messages.

use regex::Regex;

/// Grouped-digit numerals: digits optionally separated every three places by
/// `,` or `.`, optionally followed by up to two decimal digits.
const AMOUNT_PATTERN: &str = r"[0-9]{1,3}(?:[,.]?[0-9]{3})*(?:[.,][0-9]{1,2})?";

/// Scans `text` for a plausible transaction amount.
///
/// Grouping separators are stripped before parsing, so `1,000.50` reads as
/// `100050`. A candidate qualifies only when it is an integer of at least
/// 1000 that is exactly divisible by 1000 (amounts in this domain are whole
/// thousands of the base currency). Two or more qualifying candidates make
/// the message too ambiguous to auto-record, typically because a
/// balance-after-transaction figure sits next to the transaction amount, so
/// the result is `None` rather than a guess.
pub fn extract_amount(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let Ok(pattern) = Regex::new(AMOUNT_PATTERN) else {
        return None;
    };

    let mut first: Option<f64> = None;
    for candidate in pattern.find_iter(text) {
        let cleaned = candidate.as_str().replace([',', '.'], "");
        let Ok(amount) = cleaned.parse::<f64>() else {
            continue;
        };
        if amount < 1000.0 || amount % 1000.0 != 0.0 {
            continue;
        }
        if first.is_some() {
            // Second qualifying amount: ignore the whole message.
            return None;
        }
        first = Some(amount);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_grouped_amount() {
        assert_eq!(extract_amount("Ban da nhan 150,000"), Some(150_000.0));
    }

    #[test]
    fn dot_grouped_amount() {
        assert_eq!(extract_amount("Thanh toan 100.000 VND"), Some(100_000.0));
    }

    #[test]
    fn ungrouped_amount() {
        assert_eq!(extract_amount("chuyen khoan 2000000"), Some(2_000_000.0));
    }

    #[test]
    fn two_amounts_are_ambiguous() {
        assert_eq!(
            extract_amount("100,000 VND chuyen, so du 5,230,000"),
            None
        );
    }

    #[test]
    fn no_digits() {
        assert_eq!(extract_amount("abc"), None);
        assert_eq!(extract_amount(""), None);
    }

    #[test]
    fn small_numbers_do_not_qualify() {
        assert_eq!(extract_amount("ma OTP 999"), None);
        assert_eq!(extract_amount("luc 12:30 ngay 5"), None);
    }

    #[test]
    fn non_thousand_multiples_do_not_qualify() {
        assert_eq!(extract_amount("phi 1,234"), None);
        // Decimal part folds into the digits when separators are stripped.
        assert_eq!(extract_amount("1,000.50"), None);
    }

    #[test]
    fn qualifying_amount_next_to_noise_digits() {
        // The OTP is below 1000 so only the real amount qualifies.
        assert_eq!(extract_amount("OTP 123, nhan 50,000 VND"), Some(50_000.0));
    }
}
