//! Fixed-precision decimal arithmetic on top of `BigDecimal`.
//!
//! Every operation is computed exactly and then rounded once to the context
//! precision (round half to even). A rounded result whose adjusted exponent
//! exceeds the context maximum is an overflow.

use anyhow::{anyhow, bail, Result};
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PRECISION: u64 = 100;
pub const DEFAULT_MAX_EXPONENT: i64 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("decimal overflow: adjusted exponent {exponent} exceeds {max_exponent}")]
    Overflow { exponent: i64, max_exponent: i64 },
}

pub type ArithResult<T> = std::result::Result<T, ArithmeticError>;

/// Precision and exponent range shared by every value of one computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalContext {
    precision: u64,
    max_exponent: i64,
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            max_exponent: DEFAULT_MAX_EXPONENT,
        }
    }
}

impl DecimalContext {
    pub fn new(precision: u64, max_exponent: i64) -> Result<Self> {
        if precision == 0 {
            bail!("Decimal precision must be at least one digit.");
        }
        if precision > u64::from(u32::MAX) {
            bail!("Decimal precision {precision} is too large.");
        }
        if max_exponent < 1 {
            bail!("Maximum exponent must be positive, got {max_exponent}.");
        }
        Ok(Self {
            precision,
            max_exponent,
        })
    }

    pub fn with_precision(precision: u64) -> Result<Self> {
        Self::new(precision, DEFAULT_MAX_EXPONENT)
    }

    pub fn precision(&self) -> u64 {
        self.precision
    }

    pub fn max_exponent(&self) -> i64 {
        self.max_exponent
    }

    /// Rounds an arbitrary value into this context.
    pub fn coerce(&self, value: &BigDecimal) -> ArithResult<BigDecimal> {
        self.round(value.clone())
    }

    pub fn add(&self, a: &BigDecimal, b: &BigDecimal) -> ArithResult<BigDecimal> {
        if a.is_zero() {
            return self.coerce(b);
        }
        if b.is_zero() {
            return self.coerce(a);
        }
        // An operand far below half an ulp of the other cannot change the
        // rounded sum, so skip materializing the aligned mantissa.
        let gap = adjusted_exponent(a) - adjusted_exponent(b);
        let limit = self.precision as i64 + 1;
        if gap > limit && a.digits() <= self.precision {
            return self.coerce(a);
        }
        if -gap > limit && b.digits() <= self.precision {
            return self.coerce(b);
        }
        self.round(a + b)
    }

    pub fn sub(&self, a: &BigDecimal, b: &BigDecimal) -> ArithResult<BigDecimal> {
        self.add(a, &-(b.clone()))
    }

    pub fn mul(&self, a: &BigDecimal, b: &BigDecimal) -> ArithResult<BigDecimal> {
        self.round(a * b)
    }

    /// Integer power, computed exactly and rounded once.
    pub fn powi(&self, base: &BigDecimal, exponent: u32) -> ArithResult<BigDecimal> {
        let mut product = BigDecimal::one();
        for _ in 0..exponent {
            product = &product * base;
        }
        self.round(product)
    }

    /// Division by a small positive integer.
    pub fn div_int(&self, value: &BigDecimal, divisor: u32) -> ArithResult<BigDecimal> {
        debug_assert!(divisor > 0, "division by zero");
        if value.is_zero() {
            return Ok(BigDecimal::zero());
        }
        let (mantissa, scale) = value.as_bigint_and_exponent();
        let divisor_digits = u64::from(divisor.ilog10()) + 1;
        // Widen so the quotient carries at least one guard digit.
        let shift = (self.precision + 1 + divisor_digits).saturating_sub(value.digits());
        let widened = mantissa * pow10(shift);
        let quotient = &widened / divisor;
        let remainder = &widened % divisor;
        let mut scale = scale + shift as i64;
        let quotient = if remainder.is_zero() {
            quotient
        } else {
            // Sticky digit: marks an inexact quotient for tie-breaking.
            scale += 1;
            match widened.sign() {
                Sign::Minus => quotient * 10u32 - 1u32,
                _ => quotient * 10u32 + 1u32,
            }
        };
        self.round(BigDecimal::new(quotient, scale))
    }

    pub fn parse(&self, literal: &str) -> Result<BigDecimal> {
        let value = BigDecimal::from_str(literal.trim())
            .map_err(|err| anyhow!("Invalid decimal literal {literal:?}: {err}"))?;
        Ok(self.round(value)?)
    }

    pub fn from_f64(&self, value: f64) -> Result<BigDecimal> {
        if !value.is_finite() {
            bail!("Cannot represent non-finite value {value} as a decimal.");
        }
        let converted = BigDecimal::from_f64(value)
            .ok_or_else(|| anyhow!("Failed to convert {value} to a decimal."))?;
        Ok(self.round(converted)?)
    }

    fn round(&self, value: BigDecimal) -> ArithResult<BigDecimal> {
        if value.is_zero() {
            return Ok(BigDecimal::zero());
        }
        let digits = value.digits();
        let (mantissa, scale) = value.as_bigint_and_exponent();
        let (mantissa, scale) = if digits > self.precision {
            let dropped = digits - self.precision;
            let mut rounded = round_half_even(&mantissa, dropped);
            let mut scale = scale - dropped as i64;
            // Carry out of the top digit, e.g. 999.5 -> 1000 at three digits.
            if rounded.abs() >= pow10(self.precision) {
                rounded = rounded / 10u32;
                scale -= 1;
            }
            (rounded, scale)
        } else {
            (mantissa, scale)
        };
        let rounded = BigDecimal::new(mantissa, scale);
        let exponent = adjusted_exponent(&rounded);
        if exponent > self.max_exponent {
            return Err(ArithmeticError::Overflow {
                exponent,
                max_exponent: self.max_exponent,
            });
        }
        Ok(rounded)
    }
}

/// Exponent of the leading digit: 0 for 1.5, 2 for 123, -3 for 0.0042.
pub fn adjusted_exponent(value: &BigDecimal) -> i64 {
    let (_, scale) = value.as_bigint_and_exponent();
    value.digits() as i64 - 1 - scale
}

/// Lossy export for plotting; values outside the `f64` range map to
/// infinities or NaN.
pub fn to_f64(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn pow10(exponent: u64) -> BigInt {
    BigInt::from(10u32).pow(exponent as u32)
}

fn round_half_even(mantissa: &BigInt, dropped: u64) -> BigInt {
    let divisor = pow10(dropped);
    let quotient = mantissa / &divisor;
    let remainder = mantissa - &quotient * &divisor;
    let twice = remainder.abs() * 2u32;
    let away = match twice.cmp(&divisor) {
        Ordering::Greater => true,
        Ordering::Equal => !(&quotient % 2u32).is_zero(),
        Ordering::Less => false,
    };
    if !away {
        return quotient;
    }
    match mantissa.sign() {
        Sign::Minus => quotient - 1u32,
        _ => quotient + 1u32,
    }
}

#[cfg(test)]
mod tests {
    use super::{adjusted_exponent, to_f64, ArithmeticError, DecimalContext};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(literal: &str) -> BigDecimal {
        BigDecimal::from_str(literal).expect("valid literal")
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn new_rejects_invalid_settings() {
        assert_err_contains(DecimalContext::new(0, 10), "at least one digit");
        assert_err_contains(DecimalContext::new(10, 0), "must be positive");
    }

    #[test]
    fn rounds_half_to_even() {
        let ctx = DecimalContext::with_precision(3).expect("context");
        assert_eq!(ctx.coerce(&dec("1.245")).expect("round"), dec("1.24"));
        assert_eq!(ctx.coerce(&dec("1.235")).expect("round"), dec("1.24"));
        assert_eq!(ctx.coerce(&dec("1.2451")).expect("round"), dec("1.25"));
        assert_eq!(ctx.coerce(&dec("-1.255")).expect("round"), dec("-1.26"));
        assert_eq!(ctx.coerce(&dec("-1.2549")).expect("round"), dec("-1.25"));
    }

    #[test]
    fn rounding_carry_keeps_precision() {
        let ctx = DecimalContext::with_precision(3).expect("context");
        let rounded = ctx.coerce(&dec("999.7")).expect("round");
        assert_eq!(rounded, dec("1000"));
        assert!(rounded.digits() <= 3);
    }

    #[test]
    fn division_by_six_is_correctly_rounded() {
        let ctx = DecimalContext::with_precision(5).expect("context");
        assert_eq!(ctx.div_int(&dec("1"), 6).expect("div"), dec("0.16667"));
        assert_eq!(ctx.div_int(&dec("-2"), 6).expect("div"), dec("-0.33333"));
        assert_eq!(ctx.div_int(&dec("0.3"), 2).expect("div"), dec("0.15"));
    }

    #[test]
    fn sticky_digit_breaks_false_ties() {
        // 1.00005 / 2 = 0.500025 exactly; at 5 digits this is a true tie.
        let ctx = DecimalContext::with_precision(5).expect("context");
        assert_eq!(ctx.div_int(&dec("1.00005"), 2).expect("div"), dec("0.50002"));
        // 1.000050001 / 2 lies just above the tie and must round up.
        let wide = DecimalContext::with_precision(10).expect("context");
        let value = wide.coerce(&dec("1.000050001")).expect("coerce");
        assert_eq!(ctx.div_int(&value, 2).expect("div"), dec("0.50003"));
    }

    #[test]
    fn negligible_addend_returns_larger_operand() {
        let ctx = DecimalContext::with_precision(10).expect("context");
        let big = dec("1E+50");
        let tiny = dec("-3E-20");
        assert_eq!(ctx.add(&big, &tiny).expect("add"), big);
        assert_eq!(ctx.add(&tiny, &big).expect("add"), big);
        assert_eq!(ctx.sub(&big, &tiny).expect("sub"), big);
    }

    #[test]
    fn close_operands_add_exactly_then_round() {
        let ctx = DecimalContext::with_precision(4).expect("context");
        assert_eq!(ctx.add(&dec("1.234"), &dec("0.0006")).expect("add"), dec("1.235"));
        assert_eq!(ctx.sub(&dec("1"), &dec("1")).expect("sub"), dec("0"));
    }

    #[test]
    fn overflow_is_reported_past_max_exponent() {
        let ctx = DecimalContext::new(10, 100).expect("context");
        let large = dec("1E+60");
        assert_eq!(
            ctx.mul(&large, &large),
            Err(ArithmeticError::Overflow {
                exponent: 120,
                max_exponent: 100
            })
        );
        assert!(ctx.mul(&large, &dec("1E+40")).is_ok());
        assert!(ctx.powi(&large, 2).is_err());
    }

    #[test]
    fn powi_rounds_once() {
        let ctx = DecimalContext::with_precision(3).expect("context");
        assert_eq!(ctx.powi(&dec("1.11"), 3).expect("pow"), dec("1.37"));
        assert_eq!(ctx.powi(&dec("7"), 0).expect("pow"), dec("1"));
    }

    #[test]
    fn parse_and_f64_conversions() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.parse(" -0.2 ").expect("parse"), dec("-0.2"));
        assert_err_contains(ctx.parse("mu"), "Invalid decimal literal");
        assert_err_contains(ctx.from_f64(f64::NAN), "non-finite");
        let converted = ctx.from_f64(0.5).expect("convert");
        assert_eq!(converted, dec("0.5"));
        assert!((to_f64(&dec("-1.25")) + 1.25).abs() < 1e-15);
    }

    #[test]
    fn adjusted_exponent_tracks_leading_digit() {
        assert_eq!(adjusted_exponent(&dec("1.5")), 0);
        assert_eq!(adjusted_exponent(&dec("123")), 2);
        assert_eq!(adjusted_exponent(&dec("0.00042")), -4);
    }
}
