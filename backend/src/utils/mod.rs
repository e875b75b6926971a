//! # Utilities Module
//!
//! This module contains helper functions and utilities used
//! across the backend service.

/// Format an amount in minor units as a human-readable string.
///
/// Two decimal places, thousands separated by commas.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(format_amount(100, "INR"), "1.00 INR");
/// assert_eq!(format_amount(123_456_789, "INR"), "1,234,567.89 INR");
/// ```
pub fn format_amount(minor: i64, currency: &str) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let whole = abs / 100;
    let frac = abs % 100;

    let whole_str = whole.to_string();
    let mut grouped = String::with_capacity(whole_str.len() + whole_str.len() / 3);
    for (i, c) in whole_str.chars().enumerate() {
        if i > 0 && (whole_str.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{:02} {}", sign, grouped, frac, currency)
}

/// Hide all but the last four characters of an account number.
///
/// ```rust,ignore
/// assert_eq!(mask_account_number("123456789012"), "XXXXXXXX9012");
/// ```
pub fn mask_account_number(number: &str) -> String {
    let chars: Vec<char> = number.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() <= 4 {
        return "X".repeat(chars.len());
    }
    let visible = chars.len() - 4;
    let mut masked = "X".repeat(visible);
    masked.extend(&chars[visible..]);
    masked
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Light structural check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| format!("Invalid email: {}", email))?;

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(format!("Invalid email: {}", email));
    }
    Ok(())
}

/// Validate an ISO 4217 style code and return it upper-cased.
pub fn normalize_currency(code: &str) -> Result<String, String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(format!("Invalid currency code: {}", code))
    }
}

/// Largest amount a single asset or account may hold, in minor units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Percentages are applied as integers in millionths of a percent.
const PCT_SCALE: i128 = 1_000_000;

/// Sum amounts, capping at `i64::MAX` instead of overflowing.
pub fn total_amount<I: IntoIterator<Item = i64>>(values: I) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// `pct` percent of `value`, rounded down to a whole minor unit.
///
/// Computed in `i128` so amounts above 2^53 stay exact.
pub fn share_of(value: i64, pct: f64) -> i64 {
    let scaled_pct = (pct * PCT_SCALE as f64).round() as i128;
    let share = (i128::from(value) * scaled_pct).div_euclid(100 * PCT_SCALE);
    i64::try_from(share).unwrap_or(if share < 0 { i64::MIN } else { i64::MAX })
}

/// Truncate a string to a maximum length.
///
/// Useful for logging long identifiers.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let half = max_len.saturating_sub(3) / 2;
        let head: String = chars[..half].iter().collect();
        let tail: String = chars[chars.len() - half..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Reject blank required text fields, returning the trimmed value.
pub fn require_text(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(100, "INR"), "1.00 INR");
        assert_eq!(format_amount(0, "INR"), "0.00 INR");
        assert_eq!(format_amount(50, "USD"), "0.50 USD");
        assert_eq!(format_amount(123_456_789, "INR"), "1,234,567.89 INR");
        assert_eq!(format_amount(-100_000, "INR"), "-1,000.00 INR");
    }

    #[test]
    fn test_mask_account_number() {
        assert_eq!(mask_account_number("123456789012"), "XXXXXXXX9012");
        assert_eq!(mask_account_number("1234 5678"), "XXXX5678");
        assert_eq!(mask_account_number("123"), "XXX");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("asha@example.com").is_ok());
        assert!(validate_email("asha.k+vault@mail.example.in").is_ok());
        assert!(validate_email("asha").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("asha@example").is_err());
        assert!(validate_email("asha@@example.com").is_err());
        assert!(validate_email("as ha@example.com").is_err());
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("inr").unwrap(), "INR");
        assert!(normalize_currency("RUPEE").is_err());
        assert!(normalize_currency("12A").is_err());
    }

    #[test]
    fn test_share_of() {
        assert_eq!(share_of(10_000, 25.0), 2_500);
        assert_eq!(share_of(999, 33.33), 332);
        assert_eq!(share_of(0, 50.0), 0);
        assert_eq!(share_of(9_007_199_254_740_993, 100.0), 9_007_199_254_740_993);
        assert_eq!(share_of(9_007_199_254_740_993, 50.0), 4_503_599_627_370_496);
    }

    #[test]
    fn test_total_amount_saturates() {
        assert_eq!(total_amount([1, 2, 3]), 6);
        assert_eq!(total_amount([i64::MAX, 1]), i64::MAX);
        assert_eq!(total_amount(Vec::new()), 0);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate_string("abcdefghijklmnop", 10), "abc...nop");
    }
}
