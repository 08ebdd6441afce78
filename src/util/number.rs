//! Numeric coercion and display helpers shared by every input boundary.
//!
//! Form fields arrive as free text. Everything that feeds the calculator
//! goes through [`parse_number_or_zero`] so the core arithmetic only ever
//! sees plain `f64` values.

use serde::Deserializer;

/// Reads the longest leading decimal literal of `raw` and returns it.
///
/// Accepts an optional sign, integer digits, an optional fraction and an
/// optional exponent, or the literal `Infinity`. Trailing garbage is
/// ignored (`"12.5 USD"` is `12.5`). Returns `None` when no digits are
/// present.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();

    let sign_len = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if trimmed[sign_len..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let mut end = sign_len;
    let int_digits = count_digits(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(bytes, end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(bytes, exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    trimmed[..end].parse::<f64>().ok().filter(|value| !value.is_nan())
}

/// Total variant of [`parse_number`]: anything non-numeric becomes `0.0`.
pub fn parse_number_or_zero(raw: &str) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Maps `NaN` to zero; every other value passes through unchanged.
pub fn or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .map(|rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
        .unwrap_or(0)
}

/// Rounds to two decimal places, ties to even, as MongoDB's `$round` does.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `$1,234.56`; negative amounts render as `-$1,234.56`.
pub fn format_currency(value: f64) -> String {
    let value = or_zero(value);
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// `12.34%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", or_zero(value))
}

/// Serde helper for numeric fields that may arrive as numbers, numeric
/// strings, empty strings or `null`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Lenient;

    impl<'de> serde::de::Visitor<'de> for Lenient {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, a numeric string or null")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value).filter(|v| !v.is_nan()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(parse_number(value))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(Lenient)
        }
    }

    deserializer.deserialize_any(Lenient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_literal_and_ignores_trailing_text() {
        assert_eq!(parse_number("12.5abc"), Some(12.5));
        assert_eq!(parse_number("  -3e2 "), Some(-300.0));
        assert_eq!(parse_number(".75"), Some(0.75));
        assert_eq!(parse_number("5."), Some(5.0));
        assert_eq!(parse_number("1e"), Some(1.0));
        assert_eq!(parse_number("Infinity"), Some(f64::INFINITY));
    }

    #[test]
    fn non_numeric_input_is_zero() {
        assert_eq!(parse_number_or_zero(""), 0.0);
        assert_eq!(parse_number_or_zero("   "), 0.0);
        assert_eq!(parse_number_or_zero("abc"), 0.0);
        assert_eq!(parse_number_or_zero("."), 0.0);
        assert_eq!(parse_number_or_zero("-"), 0.0);
        assert_eq!(parse_number_or_zero("$100"), 0.0);
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-42.126), "-$42.13");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(f64::NAN), "$0.00");
    }

    #[test]
    fn percent_uses_two_decimals() {
        assert_eq!(format_percent(40.0), "40.00%");
        assert_eq!(format_percent(-12.346), "-12.35%");
    }

    #[test]
    fn round2_rounds_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(-2.345_000_1), -2.35);
    }

    #[test]
    fn lenient_field_accepts_strings_numbers_and_null() {
        #[derive(serde::Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient_f64")]
            value: Option<f64>,
        }

        let parse = |json: &str| serde_json::from_str::<Row>(json).map(|row| row.value).ok();
        assert_eq!(parse(r#"{"value": 12}"#), Some(Some(12.0)));
        assert_eq!(parse(r#"{"value": "7.5"}"#), Some(Some(7.5)));
        assert_eq!(parse(r#"{"value": ""}"#), Some(None));
        assert_eq!(parse(r#"{"value": null}"#), Some(None));
        assert_eq!(parse(r#"{}"#), Some(None));
    }
}
