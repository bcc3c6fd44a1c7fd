/// Parse a Screener value such as `"1,234 Cr."`, `"12.5 %"` or `"₹ 2,345"`.
///
/// Returns `None` for missing or empty text, anything that is not a number
/// once separators and units are stripped, and non-finite results. Callers
/// treat `None` as "source unavailable", never as zero.
pub fn parse_scalar(raw: Option<&str>) -> Option<f64> {
    let cleaned = raw?
        .replace(',', "")
        .replace('%', "")
        .replace("Cr.", "")
        .replace('₹', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crore_value() {
        assert_eq!(parse_scalar(Some("1,234.5 Cr.")), Some(1234.5));
        assert_eq!(parse_scalar(Some("₹ 19,12,345 Cr.")), Some(1912345.0));
    }

    #[test]
    fn test_parse_percentages() {
        assert_eq!(parse_scalar(Some("12.5 %")), Some(12.5));
        assert_eq!(parse_scalar(Some("-3%")), Some(-3.0));
        assert_eq!(parse_scalar(Some("0.45")), Some(0.45));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_scalar(Some("N/A")), None);
        assert_eq!(parse_scalar(Some("")), None);
        assert_eq!(parse_scalar(Some("   ")), None);
        assert_eq!(parse_scalar(Some("%")), None);
        assert_eq!(parse_scalar(Some("12 Lakh")), None);
        assert_eq!(parse_scalar(None), None);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(parse_scalar(Some("NaN")), None);
        assert_eq!(parse_scalar(Some("inf")), None);
    }
}
