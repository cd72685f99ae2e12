//! Fractional order keys.
//!
//! Every record carries an arbitrary-precision decimal `order`. Relative
//! position between two records is decided by comparing these keys, so a
//! record can be placed between two neighbours without renumbering anything
//! else. Keys are never renormalized; precision grows as needed.

use crate::constants::ORDER_EPSILON;
use crate::error::GridError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// An arbitrary-precision decimal used purely for relative ordering.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey(BigDecimal);

fn epsilon() -> &'static BigDecimal {
    static EPSILON: OnceLock<BigDecimal> = OnceLock::new();
    EPSILON.get_or_init(|| {
        BigDecimal::from_str(ORDER_EPSILON).unwrap_or_else(|_| BigDecimal::new(1.into(), 20))
    })
}

fn floor(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(0);
    if &truncated > value {
        truncated - BigDecimal::from(1)
    } else {
        truncated
    }
}

fn ceil(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(0);
    if &truncated < value {
        truncated + BigDecimal::from(1)
    } else {
        truncated
    }
}

impl OrderKey {
    /// The zero key, used as the highest order of an empty buffer.
    pub fn zero() -> Self {
        Self(BigDecimal::from(0))
    }

    /// Key for the given integer position.
    pub fn from_integer(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }

    /// Parse a decimal string such as `"1.00000000000000000000"`.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidOrderKey`] when `raw` is not a decimal.
    pub fn parse(raw: &str) -> Result<Self, GridError> {
        BigDecimal::from_str(raw.trim())
            .map(Self)
            .map_err(|_| GridError::InvalidOrderKey(raw.to_string()))
    }

    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// The key one epsilon step below `self`.
    pub fn step_down(&self) -> Self {
        Self(&self.0 - epsilon())
    }

    /// The key one epsilon step above `self`.
    pub fn step_up(&self) -> Self {
        Self(&self.0 + epsilon())
    }

    /// The largest integer not greater than this key.
    pub fn floor(&self) -> Self {
        Self(floor(&self.0))
    }

    /// Estimated key for a record appended after `highest`: `ceil(highest) + 1`.
    pub fn after_highest(highest: &OrderKey) -> Self {
        Self(ceil(&highest.0) + BigDecimal::from(1))
    }

    /// Whether this key lies in the half-open band `(floor(anchor), anchor]`.
    ///
    /// Records in that band are the ones shifted down when a new record
    /// claims `anchor`.
    pub fn in_collision_band(&self, anchor: &OrderKey) -> bool {
        self.0 > floor(&anchor.0) && self.0 <= anchor.0
    }

    /// Render without exponent notation, e.g. `"2.99999999999999999999"`.
    pub fn to_plain_string(&self) -> String {
        plain_decimal(&self.0)
    }
}

/// Render a decimal in positional notation regardless of its exponent.
pub fn plain_decimal(value: &BigDecimal) -> String {
    let (digits, scale) = value.as_bigint_and_exponent();
    let raw = digits.to_string();
    let (sign, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest.to_string()),
        None => ("", raw),
    };
    if scale <= 0 {
        if magnitude == "0" {
            return "0".to_string();
        }
        let zeros = "0".repeat(usize::try_from(-scale).unwrap_or(0));
        return format!("{sign}{magnitude}{zeros}");
    }
    let scale = usize::try_from(scale).unwrap_or(0);
    let padded = if magnitude.len() <= scale {
        format!("{}{}", "0".repeat(scale - magnitude.len() + 1), magnitude)
    } else {
        magnitude
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

/// Return a key strictly between two neighbouring keys.
///
/// With both bounds present, the key sits one epsilon below `upper` when that
/// still clears `lower`, and at the exact midpoint otherwise. With one bound
/// missing, the key is one epsilon outside the present bound; with both
/// missing it is zero.
///
/// Bounds given in the wrong order are swapped. Equal bounds have no key
/// strictly between them, so the shared value stepped down is returned and
/// the collision is resolved by the caller shifting the existing records.
pub fn between(lower: Option<&OrderKey>, upper: Option<&OrderKey>) -> OrderKey {
    match (lower, upper) {
        (None, None) => OrderKey::zero(),
        (Some(lower), None) => lower.step_up(),
        (None, Some(upper)) => upper.step_down(),
        (Some(a), Some(b)) => {
            let (lower, upper) = if a <= b { (a, b) } else { (b, a) };
            if lower == upper {
                return upper.step_down();
            }
            let candidate = upper.step_down();
            if &candidate > lower {
                candidate
            } else {
                OrderKey(((&lower.0 + &upper.0) / BigDecimal::from(2)).normalized())
            }
        }
    }
}

/// Three-way comparison of two keys.
pub fn compare(a: &OrderKey, b: &OrderKey) -> Ordering {
    a.cmp(b)
}

/// Highest key among `keys`, or zero when there are none.
pub fn highest<'a, I>(keys: I) -> OrderKey
where
    I: IntoIterator<Item = &'a OrderKey>,
{
    keys.into_iter()
        .max()
        .cloned()
        .filter(|max| max > &OrderKey::zero())
        .unwrap_or_else(OrderKey::zero)
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

impl FromStr for OrderKey {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderKey {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderKey> for String {
    fn from(value: OrderKey) -> Self {
        value.to_plain_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> OrderKey {
        OrderKey::parse(raw).expect("order key")
    }

    #[test]
    fn appended_key_is_ceil_of_highest_plus_one() {
        let keys = [key("1"), key("5"), key("2.5")];
        let top = highest(keys.iter());
        assert_eq!(OrderKey::after_highest(&top).to_string(), "6");

        let fractional = [key("4.00000000000000000001")];
        let top = highest(fractional.iter());
        assert_eq!(OrderKey::after_highest(&top).to_string(), "6");
    }

    #[test]
    fn highest_of_empty_or_negative_keys_is_zero() {
        assert_eq!(highest(std::iter::empty()), OrderKey::zero());
        let negative = [key("-3")];
        assert_eq!(highest(negative.iter()), OrderKey::zero());
    }

    #[test]
    fn before_key_is_exactly_one_epsilon_below() {
        let placed = between(None, Some(&key("3")));
        assert_eq!(placed.to_string(), "2.99999999999999999999");
    }

    #[test]
    fn between_is_strictly_inside_for_distant_and_adjacent_bounds() {
        let lower = key("1");
        let upper = key("2");
        let mid = between(Some(&lower), Some(&upper));
        assert!(lower < mid && mid < upper);

        let tight_upper = lower.step_up();
        let tight = between(Some(&lower), Some(&tight_upper));
        assert!(lower < tight && tight < tight_upper);
        assert_eq!(tight.to_string(), "1.000000000000000000005");
    }

    #[test]
    fn repeated_insertion_against_the_newest_neighbour_never_repeats() {
        let lower = key("1");
        let mut upper = key("1.00000000000000000003");
        let mut seen = Vec::new();
        for _ in 0..64 {
            let next = between(Some(&lower), Some(&upper));
            assert!(lower < next && next < upper, "{next} not in ({lower}, {upper})");
            assert!(!seen.contains(&next));
            seen.push(next.clone());
            upper = next;
        }
    }

    #[test]
    fn collision_band_is_half_open_above_the_floor() {
        let anchor = key("3.5");
        assert!(key("3.5").in_collision_band(&anchor));
        assert!(key("3.1").in_collision_band(&anchor));
        assert!(!key("3").in_collision_band(&anchor));
        assert!(!key("3.6").in_collision_band(&anchor));
    }

    #[test]
    fn plain_string_covers_scales_and_signs() {
        assert_eq!(key("1.00000000000000000000").to_string(), "1.00000000000000000000");
        assert_eq!(key("-0.5").to_string(), "-0.5");
        assert_eq!(key("0.00000000000000000001").to_string(), "0.00000000000000000001");
        assert_eq!(key("1e3").to_string(), "1000");
        assert!(OrderKey::parse("abc").is_err());
    }

    #[test]
    fn serde_uses_plain_decimal_strings() {
        let json = serde_json::to_string(&key("2.5")).expect("serialize");
        assert_eq!(json, "\"2.5\"");
        let back: OrderKey = serde_json::from_str("\"7.25\"").expect("deserialize");
        assert_eq!(back, key("7.25"));
    }
}
