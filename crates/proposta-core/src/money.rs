//! Fixed-point quantities: BRL amounts, hours and percentages.
//!
//! All three are stored as integer hundredths so that snapshots round-trip
//! exactly and rounding is explicit. Rounding is half away from zero.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Divide rounding half away from zero. `den` must be positive.
fn div_round(num: i128, den: i128) -> i128 {
  let half = den / 2;
  if num >= 0 { (num + half) / den } else { (num - half) / den }
}

/// Parse a decimal with at most two fractional digits into hundredths.
fn parse_hundredths(s: &str) -> Option<i64> {
  let s = s.trim();
  let (neg, digits) = match s.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, s),
  };
  let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
  if int_part.is_empty() && frac_part.is_empty() {
    return None;
  }
  if frac_part.len() > 2
    || !int_part.bytes().all(|b| b.is_ascii_digit())
    || !frac_part.bytes().all(|b| b.is_ascii_digit())
  {
    return None;
  }
  let int: i64 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
  let mut frac: i64 = if frac_part.is_empty() { 0 } else { frac_part.parse().ok()? };
  if frac_part.len() == 1 {
    frac *= 10;
  }
  let value = int.checked_mul(100)?.checked_add(frac)?;
  Some(if neg { -value } else { value })
}

fn fmt_hundredths(v: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
  let sign = if v < 0 { "-" } else { "" };
  let abs = v.unsigned_abs();
  write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
}

macro_rules! hundredths {
  ($name:ident, $what:literal) => {
    impl $name {
      pub const ZERO: Self = Self(0);

      /// Build from an integer number of hundredths.
      pub const fn from_hundredths(v: i64) -> Self { Self(v) }

      pub const fn hundredths(self) -> i64 { self.0 }

      /// Build from a float, rounding to two decimals.
      pub fn from_f64(v: f64) -> Option<Self> {
        if !v.is_finite() {
          return None;
        }
        let scaled = (v * 100.0).round();
        if scaled.abs() > i64::MAX as f64 {
          return None;
        }
        Some(Self(scaled as i64))
      }

      pub fn as_f64(self) -> f64 { self.0 as f64 / 100.0 }

      pub fn is_negative(self) -> bool { self.0 < 0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hundredths(self.0, f)
      }
    }

    impl std::str::FromStr for $name {
      type Err = String;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hundredths(s)
          .map(Self)
          .ok_or_else(|| format!("invalid {}: {s:?}", $what))
      }
    }

    impl Serialize for $name {
      fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.as_f64())
      }
    }

    impl<'de> Deserialize<'de> for $name {
      fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct V;

        impl de::Visitor<'_> for V {
          type Value = $name;

          fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a {} as a number or decimal string", $what)
          }

          fn visit_i64<E: de::Error>(self, v: i64) -> Result<$name, E> {
            v.checked_mul(100)
              .map($name)
              .ok_or_else(|| E::custom("value out of range"))
          }

          fn visit_u64<E: de::Error>(self, v: u64) -> Result<$name, E> {
            i64::try_from(v)
              .ok()
              .and_then(|v| v.checked_mul(100))
              .map($name)
              .ok_or_else(|| E::custom("value out of range"))
          }

          fn visit_f64<E: de::Error>(self, v: f64) -> Result<$name, E> {
            $name::from_f64(v).ok_or_else(|| E::custom("value out of range"))
          }

          fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
            v.parse().map_err(E::custom)
          }
        }

        d.deserialize_any(V)
      }
    }
  };
}

/// An amount in Brazilian reais, held in centavos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Brl(i64);

/// A number of hours, held in hundredths of an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hours(i64);

/// A percentage, held in hundredths of a percent (`10.25%` is `1025`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent(i64);

hundredths!(Brl, "BRL amount");
hundredths!(Hours, "hour count");
hundredths!(Percent, "percentage");

impl Brl {
  /// `round(self × hours, 2)`; `None` on overflow.
  pub fn times_hours(self, hours: Hours) -> Option<Self> {
    let product = i128::from(self.0) * i128::from(hours.0);
    i64::try_from(div_round(product, 100)).ok().map(Self)
  }

  pub fn checked_sub(self, other: Self) -> Option<Self> {
    self.0.checked_sub(other.0).map(Self)
  }
}

impl Percent {
  /// `round(part / whole × 100, 2)`; `None` when `whole` is not positive.
  pub fn of_ratio(part: Brl, whole: Brl) -> Option<Self> {
    if whole.0 <= 0 {
      return None;
    }
    let scaled = i128::from(part.0) * 10_000;
    i64::try_from(div_round(scaled, i128::from(whole.0))).ok().map(Self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_and_formats_two_decimals() {
    assert_eq!("1234.5".parse::<Brl>().unwrap(), Brl::from_hundredths(123_450));
    assert_eq!("0.07".parse::<Brl>().unwrap(), Brl::from_hundredths(7));
    assert_eq!("-3".parse::<Brl>().unwrap(), Brl::from_hundredths(-300));
    assert!("1.234".parse::<Brl>().is_err());
    assert!("abc".parse::<Brl>().is_err());
    assert!(".".parse::<Brl>().is_err());
    assert_eq!(Brl::from_hundredths(123_405).to_string(), "1234.05");
    assert_eq!(Brl::from_hundredths(-5).to_string(), "-0.05");
  }

  #[test]
  fn hourly_times_hours_rounds_half_away_from_zero() {
    // 150.55 × 12.5 = 1881.875 → 1881.88
    let hourly = Brl::from_hundredths(15_055);
    let hours = Hours::from_hundredths(1_250);
    assert_eq!(hourly.times_hours(hours), Some(Brl::from_hundredths(188_188)));
  }

  #[test]
  fn percent_of_ratio() {
    let discount = Brl::from_hundredths(10_000);
    let before = Brl::from_hundredths(100_000);
    assert_eq!(Percent::of_ratio(discount, before), Some(Percent::from_hundredths(1_000)));

    // 1 / 3 → 33.33%
    let third = Percent::of_ratio(Brl::from_hundredths(100), Brl::from_hundredths(300));
    assert_eq!(third, Some(Percent::from_hundredths(3_333)));

    assert_eq!(Percent::of_ratio(discount, Brl::ZERO), None);
  }

  #[test]
  fn serde_accepts_numbers_and_strings() {
    let from_num: Brl = serde_json::from_str("1200.5").unwrap();
    let from_int: Brl = serde_json::from_str("900").unwrap();
    let from_str: Brl = serde_json::from_str("\"10.10\"").unwrap();
    assert_eq!(from_num, Brl::from_hundredths(120_050));
    assert_eq!(from_int, Brl::from_hundredths(90_000));
    assert_eq!(from_str, Brl::from_hundredths(1_010));
    assert_eq!(serde_json::to_string(&Brl::from_hundredths(90_000)).unwrap(), "900.0");
  }
}
