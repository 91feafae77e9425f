use std::{fmt, ops::Neg, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};

/// Signed money amount backed by an exact decimal.
///
/// Ledger amounts can carry any number of fraction digits, so balances keep
/// full precision and only [`Display`](fmt::Display) rounds, always to two
/// decimals. Sums go through [`Money::checked_add`] and
/// [`Money::checked_sub`]: an amount past the decimal range is an error, not
/// a panic.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::parse_lenient("12.345").unwrap();
/// assert_eq!(amount.to_string(), "12.35");
/// assert_eq!(Money::parse_lenient("n/a"), Some(Money::ZERO));
/// assert_eq!(Money::parse_lenient("1e40"), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Creates an amount from an integer mantissa and a scale, e.g.
    /// `Money::new(1234, 2)` is `12.34`.
    #[must_use]
    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn decimal(self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// `self + rhs`, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `self - rhs`, `None` on overflow.
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Parses a ledger amount field.
    ///
    /// Reads the longest leading number: plain decimals (`"10"`, `"-0.5"`,
    /// `".5"`) with an optional exponent (`"1e3"`), so `"12abc"` is 12.
    /// Empty or non-numeric text is 0. Returns `None` only for a number too
    /// large to be represented.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let Some(literal) = numeric_prefix(s.trim()) else {
            return Some(Self::ZERO);
        };

        Decimal::from_str(literal)
            .or_else(|_| Decimal::from_scientific(literal))
            .ok()
            .or_else(|| shrink_scientific(literal))
            .map(Self)
    }

    /// Parses an optional field: a missing field is 0.
    #[must_use]
    pub fn parse_field(field: Option<&str>) -> Option<Self> {
        field.map_or(Some(Self::ZERO), Self::parse_lenient)
    }
}

/// Longest `[+-]?digits[.digits][(e|E)[+-]digits]` prefix holding at least
/// one mantissa digit.
fn numeric_prefix(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_digits = digits_from(end);
    end += int_digits;
    let mut digits = int_digits;

    if bytes.get(end) == Some(&b'.') {
        let frac_digits = digits_from(end + 1);
        if frac_digits > 0 {
            digits += frac_digits;
            end += 1 + frac_digits;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits_from(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    Some(&s[..end])
}

/// Value of a scientific literal whose negative exponent is beyond the
/// decimal scale. The mantissa is divided down until it reaches 0.
fn shrink_scientific(literal: &str) -> Option<Decimal> {
    let (mantissa, exponent) = literal.split_once(['e', 'E'])?;
    let exponent: i64 = exponent.parse().ok()?;
    if exponent >= 0 {
        return None;
    }

    let mut value = Decimal::from_str(mantissa).ok()?;
    for _ in 0..exponent.unsigned_abs() {
        if value.is_zero() {
            break;
        }
        value = value.checked_div(Decimal::TEN)?;
    }
    Some(value)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        // Avoid printing "-0.00" for amounts that round to zero.
        let rounded = if rounded.is_zero() {
            Decimal::ZERO
        } else {
            rounded
        };
        write!(f, "{rounded:.2}")
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}
