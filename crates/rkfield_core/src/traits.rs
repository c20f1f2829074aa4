use crate::decimal::{ArithResult, DecimalContext};
use crate::solvers::{State, StepOutcome};
use bigdecimal::BigDecimal;

/// A planar vector field parameterized by a scalar.
pub trait PlanarField {
    /// dx/dt at (x, y) for parameter mu.
    fn dx(
        &self,
        ctx: &DecimalContext,
        mu: &BigDecimal,
        x: &BigDecimal,
        y: &BigDecimal,
    ) -> ArithResult<BigDecimal>;

    /// dy/dt at (x, y) for parameter mu.
    fn dy(
        &self,
        ctx: &DecimalContext,
        mu: &BigDecimal,
        x: &BigDecimal,
        y: &BigDecimal,
    ) -> ArithResult<BigDecimal>;
}

/// A trait for solvers that can step a planar system forward.
pub trait Steppable {
    /// The decimal context every step is evaluated in.
    fn context(&self) -> &DecimalContext;

    /// Performs one step of size h from `state`.
    /// Returns the next state, or `Diverged` if the context overflowed.
    fn step(
        &self,
        field: &impl PlanarField,
        state: &State,
        h: &BigDecimal,
        mu: &BigDecimal,
    ) -> StepOutcome;
}
