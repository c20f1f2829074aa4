pub mod decimal;
pub mod field;
pub mod initial;
pub mod quiver;
pub mod solvers;
pub mod sweep;
pub mod trajectory;
/// The `rkfield_core` crate integrates the planar system
/// `x' = mu*x - y + x*y^2`, `y' = x + mu*y + y^3` with a fixed-step RK4
/// solver in arbitrary-precision decimal arithmetic.
///
/// Key components:
/// - **Decimal**: `DecimalContext`, the precision and exponent range every value is rounded into.
/// - **Traits**: `PlanarField` (the right-hand side), `Steppable` (solvers).
/// - **Solvers**: `RK4` with a reference and a classical stage scheme.
/// - **Trajectory**: the aggregation loop, which stops early when the state overflows.
/// - **Quiver / Initial / Sweep**: field sampling, randomized starting states and the mu sweep.
pub mod traits;

pub use decimal::{ArithmeticError, DecimalContext};
pub use field::{dx_dt, dy_dt, evaluate, DerivativePair};
pub use solvers::{Rk4Scheme, State, StepOutcome, RK4};
pub use sweep::{run_sweep, SweepConfig, SweepFrame};
pub use trajectory::{aggregate, Termination, Trajectory};
