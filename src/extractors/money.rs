// src/extractors/money.rs

// --- Imports ---
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// --- Constants ---
/// Values above this are treated as misaligned vendor fields.
pub const DEFAULT_MONETARY_CEILING: i64 = 10_000_000;

// "US$" must be tried before "$".
const CURRENCY_MARKERS: &[&str] = &["R$", "US$", "BRL", "$"];

// Blank-cell placeholders emitted by the vendor export (compared lowercase).
const PLACEHOLDERS: &[&str] = &["-", "--", "n/a", "n/d", "na", "nd", "s/n", "s/v"];

// --- Data Structures ---

/// An amount as it arrives from the export or a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAmount<'a> {
    Missing,
    Text(&'a str),
    Number(BigDecimal),
}

impl<'a> From<&'a str> for RawAmount<'a> {
    fn from(value: &'a str) -> Self {
        RawAmount::Text(value)
    }
}

impl<'a> From<&'a String> for RawAmount<'a> {
    fn from(value: &'a String) -> Self {
        RawAmount::Text(value.as_str())
    }
}

impl<'a> From<Option<&'a str>> for RawAmount<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(RawAmount::Missing, RawAmount::Text)
    }
}

impl From<i64> for RawAmount<'_> {
    fn from(value: i64) -> Self {
        RawAmount::Number(BigDecimal::from(value))
    }
}

impl From<f64> for RawAmount<'_> {
    fn from(value: f64) -> Self {
        // Shortest round-trip rendering, so 1234.56 stays 1234.56.
        match BigDecimal::from_str(&value.to_string()) {
            Ok(number) => RawAmount::Number(number),
            Err(_) => RawAmount::Missing,
        }
    }
}

impl From<BigDecimal> for RawAmount<'_> {
    fn from(value: BigDecimal) -> Self {
        RawAmount::Number(value)
    }
}

/// Why a parsed amount was replaced by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonetaryAnomaly {
    Negative,
    AboveCeiling,
}

impl fmt::Display for MonetaryAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonetaryAnomaly::Negative => write!(f, "negative amount"),
            MonetaryAnomaly::AboveCeiling => write!(f, "amount above sanity ceiling"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAmount {
    pub value: BigDecimal,
    pub anomaly: Option<MonetaryAnomaly>,
}

impl ParsedAmount {
    fn zero() -> Self {
        Self { value: BigDecimal::zero(), anomaly: None }
    }

    fn rejected(anomaly: MonetaryAnomaly) -> Self {
        Self { value: BigDecimal::zero(), anomaly: Some(anomaly) }
    }
}

enum TextAmount {
    Blank,
    Unparseable,
    Value { digits: BigDecimal, negative: bool },
}

// --- Normalizer ---

/// Turns locale-formatted amounts into exact decimals and renders them back
/// in the fixed Brazilian display format.
#[derive(Debug, Clone)]
pub struct MonetaryNormalizer {
    ceiling: BigDecimal,
}

impl Default for MonetaryNormalizer {
    fn default() -> Self {
        Self::new(BigDecimal::from(DEFAULT_MONETARY_CEILING))
    }
}

impl MonetaryNormalizer {
    pub fn new(ceiling: BigDecimal) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> &BigDecimal {
        &self.ceiling
    }

    /// Parses an amount, mapping anything not meaningfully present to zero.
    pub fn parse<'a>(&self, value: impl Into<RawAmount<'a>>) -> BigDecimal {
        self.inspect(value).value
    }

    /// Like [`parse`](Self::parse) but reports whether a negative or
    /// out-of-range value was zeroed.
    pub fn inspect<'a>(&self, value: impl Into<RawAmount<'a>>) -> ParsedAmount {
        let (magnitude, negative) = match value.into() {
            RawAmount::Missing => return ParsedAmount::zero(),
            RawAmount::Number(number) => {
                let negative = number < BigDecimal::zero();
                (number, negative)
            }
            RawAmount::Text(text) => match parse_text(text) {
                TextAmount::Blank => return ParsedAmount::zero(),
                TextAmount::Unparseable => {
                    tracing::debug!("Unparseable monetary value '{}', using zero", text);
                    return ParsedAmount::zero();
                }
                TextAmount::Value { digits, negative } => (digits, negative),
            },
        };

        if negative && !magnitude.is_zero() {
            return ParsedAmount::rejected(MonetaryAnomaly::Negative);
        }
        if magnitude > self.ceiling {
            return ParsedAmount::rejected(MonetaryAnomaly::AboveCeiling);
        }
        ParsedAmount { value: magnitude.abs(), anomaly: None }
    }

    /// Renders `value` as `R$ 1.234,56`.
    pub fn format(&self, value: &BigDecimal) -> String {
        format_brl(value)
    }

    /// Renders `value` as `1234.56`, the form used for fingerprints and JSON.
    pub fn canonical(&self, value: &BigDecimal) -> String {
        canonical(value)
    }
}

// --- Free Functions ---

pub fn canonical(value: &BigDecimal) -> String {
    value.with_scale_round(2, RoundingMode::HalfUp).to_string()
}

pub fn format_brl(value: &BigDecimal) -> String {
    let plain = canonical(value);
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}R$ {},{}", sign, grouped, fraction)
}

fn parse_text(text: &str) -> TextAmount {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || PLACEHOLDERS.contains(&compact.to_lowercase().as_str()) {
        return TextAmount::Blank;
    }

    let (body, negative) = strip_affixes(&compact);
    if body.is_empty() {
        return TextAmount::Blank;
    }
    if !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        || !body.chars().any(|c| c.is_ascii_digit())
    {
        return TextAmount::Unparseable;
    }

    match normalize_separators(body).and_then(|plain| BigDecimal::from_str(&plain).ok()) {
        Some(digits) => TextAmount::Value { digits, negative },
        None => TextAmount::Unparseable,
    }
}

/// Peels currency markers, signs and accounting parentheses off both ends.
fn strip_affixes(text: &str) -> (&str, bool) {
    let mut rest = text;
    let mut negative = false;
    loop {
        let before = rest.len();
        if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            rest = inner;
            negative = true;
        }
        if let Some(r) = rest.strip_prefix('-') {
            rest = r;
            negative = true;
        }
        if let Some(r) = rest.strip_suffix('-') {
            rest = r;
            negative = true;
        }
        if let Some(r) = rest.strip_prefix('+') {
            rest = r;
        }
        for marker in CURRENCY_MARKERS {
            if let Some(r) = strip_prefix_ignore_case(rest, marker) {
                rest = r;
            }
            if let Some(r) = strip_suffix_ignore_case(rest, marker) {
                rest = r;
            }
        }
        if rest.len() == before {
            return (rest, negative);
        }
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let start = text.len().checked_sub(suffix.len())?;
    let tail = text.get(start..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..start])
}

/// Rewrites `1.234,56` / `1,234.56` / `1.500` into `1234.56` / `1500`.
fn normalize_separators(body: &str) -> Option<String> {
    let last_comma = body.rfind(',');
    let last_dot = body.rfind('.');

    let decimal = match (last_comma, last_dot) {
        (None, None) => None,
        (Some(comma), Some(dot)) => Some(if comma > dot { ',' } else { '.' }),
        (Some(_), None) => single_separator_role(body, ','),
        (None, Some(_)) => single_separator_role(body, '.'),
    };

    let mut plain = String::with_capacity(body.len());
    match decimal {
        None => plain.extend(body.chars().filter(|c| c.is_ascii_digit())),
        Some(separator) => {
            if body.matches(separator).count() > 1 {
                return None;
            }
            for c in body.chars() {
                if c == separator {
                    plain.push('.');
                } else if c.is_ascii_digit() {
                    plain.push(c);
                }
            }
        }
    }

    if plain.starts_with('.') {
        plain.insert(0, '0');
    }
    if plain.ends_with('.') {
        plain.pop();
    }
    (!plain.is_empty()).then_some(plain)
}

/// `None` when every occurrence of `separator` groups thousands.
fn single_separator_role(body: &str, separator: char) -> Option<char> {
    let mut groups = body.split(separator);
    let leading = groups.next().unwrap_or_default();
    let grouped = (1..=3).contains(&leading.len()) && groups.all(|group| group.len() == 3);
    if grouped {
        None
    } else {
        Some(separator)
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_brazilian_and_us_layouts_to_same_value() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.parse("1.234,56"), dec("1234.56"));
        assert_eq!(n.parse("1,234.56"), dec("1234.56"));
        assert_eq!(n.parse("1.234,56"), n.parse("1,234.56"));
        assert_eq!(n.parse("R$ 1.234.567,89"), dec("1234567.89"));
        assert_eq!(n.parse("US$ 1,234,567.89"), dec("1234567.89"));
    }

    #[test]
    fn single_separator_uses_grouping_heuristic() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.parse("1.500"), dec("1500"));
        assert_eq!(n.parse("1,234"), dec("1234"));
        assert_eq!(n.parse("12,5"), dec("12.5"));
        assert_eq!(n.parse("2500.5"), dec("2500.5"));
        assert_eq!(n.parse("1234,567"), dec("1234.567"));
        assert_eq!(n.parse("0,99"), dec("0.99"));
    }

    #[test]
    fn boundary_values_normalize_to_zero() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.parse(""), BigDecimal::zero());
        assert_eq!(n.parse("   "), BigDecimal::zero());
        assert_eq!(n.parse(None::<&str>), BigDecimal::zero());
        assert_eq!(n.parse("-"), BigDecimal::zero());
        assert_eq!(n.parse("N/A"), BigDecimal::zero());
        assert_eq!(n.parse("-50.00"), BigDecimal::zero());
        assert_eq!(n.parse("15000000"), BigDecimal::zero());
        assert_eq!(n.parse("abc"), BigDecimal::zero());
        assert_eq!(n.parse("1.2.3,4,5"), BigDecimal::zero());
    }

    #[test]
    fn anomalies_are_reported() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.inspect("-50.00").anomaly, Some(MonetaryAnomaly::Negative));
        assert_eq!(n.inspect("(120,00)").anomaly, Some(MonetaryAnomaly::Negative));
        assert_eq!(n.inspect("R$ 80,00-").anomaly, Some(MonetaryAnomaly::Negative));
        assert_eq!(n.inspect("15000000").anomaly, Some(MonetaryAnomaly::AboveCeiling));
        assert_eq!(n.inspect("10.000.000,00").anomaly, None);
        assert_eq!(n.inspect("N/A").anomaly, None);
        assert_eq!(n.inspect("garbage").anomaly, None);
        assert_eq!(n.inspect(-3i64).anomaly, Some(MonetaryAnomaly::Negative));
    }

    #[test]
    fn ceiling_is_configurable() {
        let n = MonetaryNormalizer::new(BigDecimal::from(1000));
        assert_eq!(n.parse("999,99"), dec("999.99"));
        assert_eq!(n.parse("1.000,01"), BigDecimal::zero());
    }

    #[test]
    fn numeric_input_passes_through() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.parse(1234.56f64), dec("1234.56"));
        assert_eq!(n.parse(42i64), dec("42"));
        assert_eq!(n.parse(f64::NAN), BigDecimal::zero());
    }

    #[test]
    fn format_is_fixed_brazilian_layout() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.format(&n.parse("R$ 2.000,00")), "R$ 2.000,00");
        assert_eq!(n.format(&n.parse("1,234.5")), "R$ 1.234,50");
        assert_eq!(n.format(&dec("1234567.891")), "R$ 1.234.567,89");
        assert_eq!(n.format(&dec("0.005")), "R$ 0,01");
        assert_eq!(n.format(&BigDecimal::zero()), "R$ 0,00");
        assert_eq!(n.format(&dec("999")), "R$ 999,00");
    }

    #[test]
    fn canonical_form_absorbs_formatting_differences() {
        let n = MonetaryNormalizer::default();
        assert_eq!(n.canonical(&n.parse("R$ 1.500,00")), "1500.00");
        assert_eq!(n.canonical(&n.parse("1500")), "1500.00");
        assert_eq!(n.canonical(&n.parse("1,500.0")), "1500.00");
    }
}
