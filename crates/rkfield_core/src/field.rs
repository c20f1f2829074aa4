//! The fixed right-hand side of the system:
//!
//! ```text
//! x' = mu*x - y + x*y^2
//! y' = x + mu*y + y^3
//! ```

use crate::decimal::{ArithResult, DecimalContext};
use crate::traits::PlanarField;
use bigdecimal::BigDecimal;

/// Signature shared by both derivative functions.
pub type Derivative =
    fn(&DecimalContext, &BigDecimal, &BigDecimal, &BigDecimal) -> ArithResult<BigDecimal>;

/// x' = mu*x - y + x*y^2
pub fn dx_dt(
    ctx: &DecimalContext,
    mu: &BigDecimal,
    x: &BigDecimal,
    y: &BigDecimal,
) -> ArithResult<BigDecimal> {
    let x = ctx.coerce(x)?;
    let y = ctx.coerce(y)?;
    let linear = ctx.sub(&ctx.mul(mu, &x)?, &y)?;
    let cubic = ctx.mul(&x, &ctx.powi(&y, 2)?)?;
    ctx.add(&linear, &cubic)
}

/// y' = x + mu*y + y^3
pub fn dy_dt(
    ctx: &DecimalContext,
    mu: &BigDecimal,
    x: &BigDecimal,
    y: &BigDecimal,
) -> ArithResult<BigDecimal> {
    let x = ctx.coerce(x)?;
    let y = ctx.coerce(y)?;
    let linear = ctx.add(&x, &ctx.mul(mu, &y)?)?;
    ctx.add(&linear, &ctx.powi(&y, 3)?)
}

/// The derivative functions used for the x- and y-updates.
/// Usually `f1 = dx_dt` and `f2 = dy_dt`.
#[derive(Clone, Copy)]
pub struct DerivativePair {
    pub f1: Derivative,
    pub f2: Derivative,
}

impl DerivativePair {
    pub fn new(f1: Derivative, f2: Derivative) -> Self {
        Self { f1, f2 }
    }
}

impl Default for DerivativePair {
    fn default() -> Self {
        Self::new(dx_dt, dy_dt)
    }
}

impl std::fmt::Debug for DerivativePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivativePair").finish_non_exhaustive()
    }
}

impl PlanarField for DerivativePair {
    fn dx(
        &self,
        ctx: &DecimalContext,
        mu: &BigDecimal,
        x: &BigDecimal,
        y: &BigDecimal,
    ) -> ArithResult<BigDecimal> {
        (self.f1)(ctx, mu, x, y)
    }

    fn dy(
        &self,
        ctx: &DecimalContext,
        mu: &BigDecimal,
        x: &BigDecimal,
        y: &BigDecimal,
    ) -> ArithResult<BigDecimal> {
        (self.f2)(ctx, mu, x, y)
    }
}

/// Both derivatives at one point. Values are forwarded untouched; any
/// coercion happens inside the field's own functions.
pub fn evaluate<F: PlanarField + ?Sized>(
    ctx: &DecimalContext,
    mu: &BigDecimal,
    point: (&BigDecimal, &BigDecimal),
    field: &F,
) -> ArithResult<(BigDecimal, BigDecimal)> {
    let (x, y) = point;
    Ok((field.dx(ctx, mu, x, y)?, field.dy(ctx, mu, x, y)?))
}

#[cfg(test)]
mod tests {
    use super::{dx_dt, dy_dt, evaluate, DerivativePair};
    use crate::decimal::DecimalContext;
    use bigdecimal::BigDecimal;
    use num_traits::Zero;
    use std::str::FromStr;

    fn dec(literal: &str) -> BigDecimal {
        BigDecimal::from_str(literal).expect("valid literal")
    }

    #[test]
    fn derivatives_match_hand_computation() {
        let ctx = DecimalContext::default();
        let (mu, x, y) = (dec("0.5"), dec("1.5"), dec("-0.25"));
        // 0.75 + 0.25 + 1.5 * 0.0625
        assert_eq!(dx_dt(&ctx, &mu, &x, &y).expect("dx"), dec("1.09375"));
        // 1.5 - 0.125 - 0.015625
        assert_eq!(dy_dt(&ctx, &mu, &x, &y).expect("dy"), dec("1.359375"));
    }

    #[test]
    fn derivatives_are_deterministic() {
        let ctx = DecimalContext::default();
        let mu = dec("-0.2");
        let x = dec("0.3333333333333333333333333333333333");
        let y = dec("-1.7");
        let first = (
            dx_dt(&ctx, &mu, &x, &y).expect("dx"),
            dy_dt(&ctx, &mu, &x, &y).expect("dy"),
        );
        for _ in 0..3 {
            let again = (
                dx_dt(&ctx, &mu, &x, &y).expect("dx"),
                dy_dt(&ctx, &mu, &x, &y).expect("dy"),
            );
            assert_eq!(first.0.as_bigint_and_exponent(), again.0.as_bigint_and_exponent());
            assert_eq!(first.1.as_bigint_and_exponent(), again.1.as_bigint_and_exponent());
        }
    }

    #[test]
    fn origin_is_a_fixed_point_for_every_mu() {
        let ctx = DecimalContext::default();
        let zero = BigDecimal::zero();
        for mu in ["-1.0", "-0.5", "-0.2", "0.0", "0.1", "0.5", "1.0"] {
            let mu = dec(mu);
            assert!(dx_dt(&ctx, &mu, &zero, &zero).expect("dx").is_zero());
            assert!(dy_dt(&ctx, &mu, &zero, &zero).expect("dy").is_zero());
        }
    }

    #[test]
    fn inputs_are_coerced_before_evaluation() {
        let ctx = DecimalContext::with_precision(4).expect("context");
        let mu = dec("0");
        let x = dec("1.00004");
        let y = dec("0");
        // x rounds to 1.000 before it reaches dy/dt = x.
        assert_eq!(dy_dt(&ctx, &mu, &x, &y).expect("dy"), dec("1"));
    }

    #[test]
    fn evaluate_forwards_to_both_functions() {
        let ctx = DecimalContext::with_precision(4).expect("context");
        let mu = dec("1");
        let (x, y) = (dec("2.00004"), dec("1"));
        let pair = DerivativePair::default();
        let (u, v) = evaluate(&ctx, &mu, (&x, &y), &pair).expect("evaluate");
        assert_eq!(u, dx_dt(&ctx, &mu, &x, &y).expect("dx"));
        assert_eq!(v, dy_dt(&ctx, &mu, &x, &y).expect("dy"));

        let swapped = DerivativePair::new(dy_dt, dx_dt);
        let (u, v) = evaluate(&ctx, &mu, (&x, &y), &swapped).expect("evaluate");
        assert_eq!(u, dy_dt(&ctx, &mu, &x, &y).expect("dy"));
        assert_eq!(v, dx_dt(&ctx, &mu, &x, &y).expect("dx"));
    }
}
