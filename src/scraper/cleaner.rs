//! Value normalisation for scraped text fragments.
//!
//! Every function here fails closed: malformed input yields `0` (or `None`
//! where absence has to stay distinguishable from zero), never an error.

/// Parse a number after stripping thousands separators, parentheses and
/// whitespace. Only the leading numeric part is read, so trailing units
/// ("5.09%") are ignored.
/// "1,234.50" → 1234.5 | "(12)" → 12.0 | "N/A" → 0.0
pub fn to_number(text: &str) -> f64 {
    let cleaned = strip_separators(text);
    leading_float(&cleaned).unwrap_or(0.0)
}

/// Integer variant of [`to_number`]: base-10, stops at the first non-digit.
/// "1,200" → 1200 | "45.9" → 45 | "" → 0
pub fn to_int(text: &str) -> i64 {
    let cleaned = strip_separators(text);
    let bytes = cleaned.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let start_digits = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == start_digits {
        return 0;
    }
    cleaned[..end].parse().unwrap_or(0)
}

/// Percent whose sign comes from a separate direction hint rather than the
/// text. Any sign embedded in `text` is overridden.
/// ("1.2%", true) → -1.2 | ("-0.8 %", false) → 0.8
pub fn to_signed_percent(text: &str, is_negative: bool) -> f64 {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let magnitude = leading_float(&digits).unwrap_or(0.0).abs();
    if is_negative { -magnitude } else { magnitude }
}

/// Numeral inside the first `(...)` group, or `None` when the text has no
/// group at all. "Turnover (1,234,567)" → Some(1234567.0)
pub fn extract_parenthesized(text: &str) -> Option<f64> {
    let open = text.find('(')?;
    let close = text[open + 1..].find(')')? + open + 1;
    Some(to_number(&text[open + 1..close]))
}

/// First signed numeral in free text, with an optional trailing `%`.
/// "0.06 %" → 0.06 | "-3.5%" → -3.5 | "15.00% (FY:079-080)" → 15.0
pub fn parse_percent_change(text: &str) -> f64 {
    let cleaned = text.replace(',', "");
    let bytes = cleaned.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        let starts_number = b.is_ascii_digit()
            || (matches!(b, b'+' | b'-')
                && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit()));
        if starts_number {
            return leading_float(&cleaned[i..]).unwrap_or(0.0);
        }
    }
    0.0
}

/// Turn a free-text label into a snake key.
/// "52 Weeks High - Low" → "52_weeks_high_low" | "P/E Ratio" → "pe_ratio"
pub fn clean_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut in_gap = false;
    for c in label.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() || c == '-' {
            if !in_gap {
                key.push('_');
                in_gap = true;
            }
            continue;
        }
        in_gap = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            key.push(c);
        }
    }
    key
}

/// Collapse internal whitespace runs and trim.
pub fn clean_value(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalise_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

/// True when the text carries at least one digit.
pub fn looks_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn strip_separators(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')') && !c.is_whitespace())
        .collect()
}

fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut digits = 0;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number() {
        assert_eq!(to_number("1,234.50"), 1234.50);
        assert_eq!(to_number("  610.00 "), 610.0);
        assert_eq!(to_number("(1,000)"), 1000.0);
        assert_eq!(to_number("5.09%"), 5.09);
        assert_eq!(to_number("-2.5"), -2.5);
        assert_eq!(to_number(""), 0.0);
        assert_eq!(to_number("N/A"), 0.0);
        assert_eq!(to_number("-"), 0.0);
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int("1,200"), 1200);
        assert_eq!(to_int("45.9"), 45);
        assert_eq!(to_int(" 58 "), 58);
        assert_eq!(to_int("abc"), 0);
        assert_eq!(to_int(""), 0);
    }

    #[test]
    fn test_signed_percent_follows_hint() {
        assert_eq!(to_signed_percent("1.2%", true), -1.2);
        assert_eq!(to_signed_percent("1.2%", false), 1.2);
        assert_eq!(to_signed_percent("-0.8 %", false), 0.8);
        assert_eq!(to_signed_percent("+3.10", true), -3.1);
        assert_eq!(to_signed_percent("", true), 0.0);
    }

    #[test]
    fn test_extract_parenthesized() {
        assert_eq!(extract_parenthesized("Turnover (1,234,567)"), Some(1_234_567.0));
        assert_eq!(extract_parenthesized("32.10 (1.2%)"), Some(1.2));
        assert_eq!(extract_parenthesized("()"), Some(0.0));
        assert_eq!(extract_parenthesized("1,234"), None);
        assert_eq!(extract_parenthesized("(unclosed"), None);
    }

    #[test]
    fn test_parse_percent_change() {
        assert_eq!(parse_percent_change("0.06 %"), 0.06);
        assert_eq!(parse_percent_change("-3.5%"), -3.5);
        assert_eq!(parse_percent_change("15.00% (FY:079-080)"), 15.0);
        assert_eq!(parse_percent_change("Rs. -"), 0.0);
    }

    #[test]
    fn test_clean_key() {
        assert_eq!(clean_key("52 Weeks High - Low"), "52_weeks_high_low");
        assert_eq!(clean_key("P/E Ratio"), "pe_ratio");
        assert_eq!(clean_key("  Market   Price "), "market_price");
        assert_eq!(clean_key("% Change"), "_change");
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("  Commercial \n  Banks "), "Commercial Banks");
    }
}
