//! Field-level parsers for raw cell text.
//!
//! The listing renders unreported figures as empty cells or the literal
//! string "None"; both map to absent, never to zero.

/// Parse a currency/number cell: "₹1,234.56" → 1234.56, "610.00" → 610.0.
///
/// Strips the rupee symbol and thousands separators. Anything that is
/// still not a plain number afterwards is absent — this never panics on
/// garbage input.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "None" {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != '₹' && *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a directional year-over-year cell: "⇡12%" → 12.0, "⇣7%" → -7.0.
///
/// The source only ever emits an integer magnitude after the glyph; a
/// cell without the glyph-percent pattern is absent.
pub fn parse_yoy(s: &str) -> Option<f64> {
    let at = s.find(['⇡', '⇣'])?;
    let glyph = s[at..].chars().next()?;
    let rest = s[at + glyph.len_utf8()..].trim_start();

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with('%') {
        return None;
    }

    let magnitude: f64 = digits.parse().ok()?;
    Some(if glyph == '⇣' { -magnitude } else { magnitude })
}
