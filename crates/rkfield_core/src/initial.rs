//! Randomized starting states on a bounded decimal grid.

use crate::solvers::State;
use anyhow::{bail, Result};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One trajectory request: starting state, step size and step count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialCondition {
    pub state: State,
    pub step_size: BigDecimal,
    pub steps: usize,
}

/// Coordinates `lower + resolution * k` for `k` in `0..cells`, on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConditionGrid {
    pub lower: BigDecimal,
    pub resolution: BigDecimal,
    pub cells: u32,
}

impl Default for InitialConditionGrid {
    fn default() -> Self {
        // -1.0, -0.9, ..., 1.0
        Self {
            lower: BigDecimal::new((-10).into(), 1),
            resolution: BigDecimal::new(1.into(), 1),
            cells: 21,
        }
    }
}

impl InitialConditionGrid {
    pub fn validate(&self) -> Result<()> {
        if self.cells == 0 {
            bail!("Initial condition grid needs at least one cell.");
        }
        if self.resolution <= BigDecimal::zero() {
            bail!("Initial condition resolution must be positive.");
        }
        Ok(())
    }

    /// Exact coordinate of cell `k`.
    pub fn coordinate(&self, k: u32) -> BigDecimal {
        &self.lower + &self.resolution * BigDecimal::from(k)
    }

    pub fn upper(&self) -> BigDecimal {
        self.coordinate(self.cells.saturating_sub(1))
    }
}

/// Endless source of initial conditions drawn uniformly from a grid.
pub struct InitialConditionGenerator<R: Rng> {
    rng: R,
    grid: InitialConditionGrid,
    step_size: BigDecimal,
    steps: usize,
}

impl<R: Rng> InitialConditionGenerator<R> {
    pub fn new(
        rng: R,
        grid: InitialConditionGrid,
        step_size: BigDecimal,
        steps: usize,
    ) -> Result<Self> {
        grid.validate()?;
        if step_size <= BigDecimal::zero() {
            bail!("Step size h must be positive, got {step_size}.");
        }
        Ok(Self {
            rng,
            grid,
            step_size,
            steps,
        })
    }

    pub fn sample(&mut self) -> InitialCondition {
        let k = self.rng.gen_range(0..self.grid.cells);
        let l = self.rng.gen_range(0..self.grid.cells);
        InitialCondition {
            state: State::new(
                BigDecimal::zero(),
                self.grid.coordinate(k),
                self.grid.coordinate(l),
            ),
            step_size: self.step_size.clone(),
            steps: self.steps,
        }
    }
}

impl InitialConditionGenerator<ChaCha8Rng> {
    pub fn seeded(
        seed: u64,
        grid: InitialConditionGrid,
        step_size: BigDecimal,
        steps: usize,
    ) -> Result<Self> {
        Self::new(ChaCha8Rng::seed_from_u64(seed), grid, step_size, steps)
    }
}

impl<R: Rng> Iterator for InitialConditionGenerator<R> {
    type Item = InitialCondition;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.sample())
    }
}
