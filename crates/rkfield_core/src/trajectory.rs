//! Repeated RK4 steps from one initial condition.

use crate::decimal::to_f64;
use crate::solvers::{State, StepOutcome};
use crate::traits::{PlanarField, Steppable};
use anyhow::{bail, Context, Result};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a trajectory stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    /// The step with this index overflowed; the states before it are kept.
    Diverged { step: usize },
}

/// Parallel t/x/y sequences sharing one mu and step size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub mu: BigDecimal,
    pub step_size: BigDecimal,
    pub t: Vec<BigDecimal>,
    pub x: Vec<BigDecimal>,
    pub y: Vec<BigDecimal>,
    pub termination: Termination,
}

impl Trajectory {
    fn seeded(initial: State, mu: BigDecimal, step_size: BigDecimal, capacity: usize) -> Self {
        let mut trajectory = Self {
            mu,
            step_size,
            t: Vec::with_capacity(capacity),
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            termination: Termination::Completed,
        };
        trajectory.push(initial);
        trajectory
    }

    fn push(&mut self, state: State) {
        self.t.push(state.t);
        self.x.push(state.x);
        self.y.push(state.y);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Always false: a trajectory holds at least its initial state.
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self.termination, Termination::Diverged { .. })
    }

    pub fn state(&self, index: usize) -> Option<State> {
        Some(State::new(
            self.t.get(index)?.clone(),
            self.x.get(index)?.clone(),
            self.y.get(index)?.clone(),
        ))
    }

    pub fn last_state(&self) -> Option<State> {
        self.state(self.len().checked_sub(1)?)
    }

    /// (x, y) sequences for plotting.
    pub fn xy_f64(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.x.iter().map(to_f64).collect(),
            self.y.iter().map(to_f64).collect(),
        )
    }
}

/// Integrates `steps` steps of size `h` from `initial`.
///
/// Overflow ends the trajectory early and is reported through
/// [`Trajectory::termination`], not as an error. Errors are reserved for
/// invalid configuration.
pub fn aggregate(
    stepper: &impl Steppable,
    field: &impl PlanarField,
    initial: &State,
    h: &BigDecimal,
    mu: &BigDecimal,
    steps: usize,
) -> Result<Trajectory> {
    if *h <= BigDecimal::zero() {
        bail!("Step size h must be positive, got {h}.");
    }
    let ctx = stepper.context();
    let h = ctx
        .coerce(h)
        .context("Step size does not fit the decimal context")?;
    let mut current = State::new(
        ctx.coerce(&initial.t)
            .context("Initial time does not fit the decimal context")?,
        ctx.coerce(&initial.x)
            .context("Initial x does not fit the decimal context")?,
        ctx.coerce(&initial.y)
            .context("Initial y does not fit the decimal context")?,
    );

    let mut trajectory = Trajectory::seeded(
        current.clone(),
        mu.clone(),
        h.clone(),
        steps.saturating_add(1).min(1 << 16),
    );
    for step in 0..steps {
        match stepper.step(field, &current, &h, mu) {
            StepOutcome::Advanced(next) => {
                trajectory.push(next.clone());
                current = next;
            }
            StepOutcome::Diverged(err) => {
                debug!(%mu, step, len = trajectory.len(), error = %err, "trajectory diverged");
                trajectory.termination = Termination::Diverged { step };
                break;
            }
        }
    }
    Ok(trajectory)
}
