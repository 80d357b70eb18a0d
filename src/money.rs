use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Serialize, Serializer};

/// A monetary amount held as whole cents.
///
/// Sums and balance comparisons run on integers so that several partial
/// purchases adding up to the budget compare equal to it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Round a dollar figure (as typed on the command line or in settings)
    /// to the nearest cent. Non-finite input becomes zero.
    pub fn from_dollars(dollars: f64) -> Self {
        if !dollars.is_finite() {
            return Cents::ZERO;
        }
        Cents((dollars * 100.0).round() as i64)
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a spreadsheet cell leniently. Currency symbols, thousands
    /// separators, quotes and surrounding whitespace are ignored and
    /// `(12.50)` reads as a negative. Anything unparseable is zero.
    pub fn parse_lenient(raw: &str) -> Self {
        let s: String = raw
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | '"') && !c.is_whitespace())
            .collect();
        if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
            return Cents(parse_decimal(inner).and_then(i64::checked_neg).unwrap_or(0));
        }
        parse_decimal(&s).map(Cents).unwrap_or_default()
    }
}

/// Exact decimal-to-cents conversion, rounding half away from zero on the
/// third fractional digit. Falls back to float parsing for exponent forms.
fn parse_decimal(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let (negative, body) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    // "-$5" arrives here as "-5" once the symbol is stripped.
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return parse_float_fallback(s);
    }

    let int_val: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
    let mut digits = frac_part.chars().map(|c| c as i64 - '0' as i64);
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().is_some_and(|d| d >= 5);

    let mut cents = int_val
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths)?;
    if round_up {
        cents = cents.checked_add(1)?;
    }
    Some(if negative { -cents } else { cents })
}

fn parse_float_fallback(s: &str) -> Option<i64> {
    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let cents = (value * 100.0).round();
    // i64::MAX as f64 rounds up to 2^63, which does not fit.
    if cents.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        *self = *self + rhs;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Cents {
        iter.copied().sum()
    }
}

/// Formats as a dollar amount with thousands separators: $1,234.56
impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let int_part = (abs / 100).to_string();
        let dec_part = abs % 100;

        let mut with_commas = String::new();
        for (i, c) in int_part.chars().rev().enumerate() {
            if i > 0 && i % 3 == 0 {
                with_commas.push(',');
            }
            with_commas.push(c);
        }
        let with_commas: String = with_commas.chars().rev().collect();

        if self.0 < 0 {
            write!(f, "-${with_commas}.{dec_part:02}")
        } else {
            write!(f, "${with_commas}.{dec_part:02}")
        }
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}
