use crate::decimal::{ArithResult, ArithmeticError, DecimalContext};
use crate::traits::{PlanarField, Steppable};
use anyhow::{bail, Error};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Point (x, y) of the plane at time t.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub t: BigDecimal,
    pub x: BigDecimal,
    pub y: BigDecimal,
}

impl State {
    pub fn new(t: BigDecimal, x: BigDecimal, y: BigDecimal) -> Self {
        Self { t, x, y }
    }
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced(State),
    /// The state left the representable range of the context.
    Diverged(ArithmeticError),
}

/// Which derivative feeds the y-update in the third and fourth stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rk4Scheme {
    /// l3 and l4 are evaluated with the x-derivative, matching the
    /// published plots of this system.
    #[default]
    Reference,
    /// Textbook RK4: every y-stage uses the y-derivative.
    Classical,
}

impl FromStr for Rk4Scheme {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reference" => Ok(Rk4Scheme::Reference),
            "classical" => Ok(Rk4Scheme::Classical),
            other => bail!("Unknown RK4 scheme: {other}"),
        }
    }
}

/// Classic Runge-Kutta 4th Order Solver
#[derive(Debug, Clone, Copy)]
pub struct RK4 {
    ctx: DecimalContext,
    scheme: Rk4Scheme,
}

impl RK4 {
    pub fn new(ctx: DecimalContext, scheme: Rk4Scheme) -> Self {
        Self { ctx, scheme }
    }

    pub fn scheme(&self) -> Rk4Scheme {
        self.scheme
    }

    fn try_step(
        &self,
        field: &impl PlanarField,
        state: &State,
        h: &BigDecimal,
        mu: &BigDecimal,
    ) -> ArithResult<State> {
        let ctx = &self.ctx;
        let x = ctx.coerce(&state.x)?;
        let y = ctx.coerce(&state.y)?;

        // k1 = f(x, y)
        let k1 = field.dx(ctx, mu, &x, &y)?;
        let l1 = field.dy(ctx, mu, &x, &y)?;

        // k2 = f(x + h*k1/2, y + h*l1/2)
        let x2 = ctx.add(&x, &ctx.div_int(&ctx.mul(h, &k1)?, 2)?)?;
        let y2 = ctx.add(&y, &ctx.div_int(&ctx.mul(h, &l1)?, 2)?)?;
        let k2 = field.dx(ctx, mu, &x2, &y2)?;
        let l2 = field.dy(ctx, mu, &x2, &y2)?;

        // k3 = f(x + h*k2/2, y + h*l2/2)
        let x3 = ctx.add(&x, &ctx.div_int(&ctx.mul(h, &k2)?, 2)?)?;
        let y3 = ctx.add(&y, &ctx.div_int(&ctx.mul(h, &l2)?, 2)?)?;
        let (k3, l3) = self.late_stage(field, mu, &x3, &y3)?;

        // k4 = f(x + h*k3, y + h*l3)
        let x4 = ctx.add(&x, &ctx.mul(h, &k3)?)?;
        let y4 = ctx.add(&y, &ctx.mul(h, &l3)?)?;
        let (k4, l4) = self.late_stage(field, mu, &x4, &y4)?;

        // next = current + h*(k1 + 2k2 + 2k3 + k4)/6
        let k = weighted_slope(ctx, &k1, &k2, &k3, &k4)?;
        let l = weighted_slope(ctx, &l1, &l2, &l3, &l4)?;
        Ok(State {
            t: ctx.add(&state.t, h)?,
            x: ctx.add(&x, &ctx.mul(h, &k)?)?,
            y: ctx.add(&y, &ctx.mul(h, &l)?)?,
        })
    }

    fn late_stage(
        &self,
        field: &impl PlanarField,
        mu: &BigDecimal,
        x: &BigDecimal,
        y: &BigDecimal,
    ) -> ArithResult<(BigDecimal, BigDecimal)> {
        let k = field.dx(&self.ctx, mu, x, y)?;
        let l = match self.scheme {
            Rk4Scheme::Reference => k.clone(),
            Rk4Scheme::Classical => field.dy(&self.ctx, mu, x, y)?,
        };
        Ok((k, l))
    }
}

impl Steppable for RK4 {
    fn context(&self) -> &DecimalContext {
        &self.ctx
    }

    fn step(
        &self,
        field: &impl PlanarField,
        state: &State,
        h: &BigDecimal,
        mu: &BigDecimal,
    ) -> StepOutcome {
        match self.try_step(field, state, h, mu) {
            Ok(next) => StepOutcome::Advanced(next),
            Err(err) => StepOutcome::Diverged(err),
        }
    }
}

fn weighted_slope(
    ctx: &DecimalContext,
    s1: &BigDecimal,
    s2: &BigDecimal,
    s3: &BigDecimal,
    s4: &BigDecimal,
) -> ArithResult<BigDecimal> {
    let two = BigDecimal::from(2);
    let sum = ctx.add(s1, &ctx.mul(&two, s2)?)?;
    let sum = ctx.add(&sum, &ctx.mul(&two, s3)?)?;
    let sum = ctx.add(&sum, s4)?;
    ctx.div_int(&sum, 6)
}
