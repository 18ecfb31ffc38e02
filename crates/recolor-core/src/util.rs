//! Numeric text conversions for document attributes.
//!
//! Effect documents always use `.` as the decimal separator regardless of the
//! machine that wrote them, so parsing never consults a locale.

/// Digits after the decimal point for every value written back to a document.
pub const COMMIT_DECIMALS: usize = 4;

/// Parses attribute or element text as `f32`, ignoring surrounding whitespace.
pub fn parse_f32(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok()
}

/// Parses attribute or element text as `i32`, ignoring surrounding whitespace.
pub fn parse_i32(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok()
}

/// Formats a value with [`COMMIT_DECIMALS`] fixed digits (`0.5` -> `"0.5000"`).
pub fn format_fixed(value: f32) -> String {
    format!("{:.*}", COMMIT_DECIMALS, value)
}

/// Returns the text that will be written for `value` together with the value a
/// later load would read back from it.
pub fn quantize(value: f32) -> (String, f32) {
    let text = format_fixed(value);
    let stored = parse_f32(&text).unwrap_or(value);
    (text, stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f32_invariant() {
        assert_eq!(parse_f32("0.25"), Some(0.25));
        assert_eq!(parse_f32("  1.5\n"), Some(1.5));
        assert_eq!(parse_f32("1e-1"), Some(0.1));
        assert_eq!(parse_f32("-3"), Some(-3.0));
        assert_eq!(parse_f32("0,25"), None);
        assert_eq!(parse_f32(""), None);
        assert_eq!(parse_f32("abc"), None);
    }

    #[test]
    fn test_parse_i32() {
        assert_eq!(parse_i32("-1"), Some(-1));
        assert_eq!(parse_i32(" -2 "), Some(-2));
        assert_eq!(parse_i32("1.0"), None);
        assert_eq!(parse_i32("x"), None);
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(0.5), "0.5000");
        assert_eq!(format_fixed(1.0), "1.0000");
        assert_eq!(format_fixed(0.123_456), "0.1235");
        assert_eq!(format_fixed(10.0), "10.0000");
    }

    #[test]
    fn test_quantize_matches_reparse() {
        let (text, stored) = quantize(0.333_333);
        assert_eq!(text, "0.3333");
        assert_eq!(stored, parse_f32("0.3333").unwrap());
    }
}
