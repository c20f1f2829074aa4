//! One field + trajectory overlay per value of mu.

use crate::decimal::{DecimalContext, DEFAULT_MAX_EXPONENT, DEFAULT_PRECISION};
use crate::field::DerivativePair;
use crate::initial::{InitialCondition, InitialConditionGenerator, InitialConditionGrid};
use crate::quiver::{sample_field, FieldAxis, VectorFieldSample};
use crate::solvers::{Rk4Scheme, RK4};
use crate::trajectory::{aggregate, Trajectory};
use anyhow::{bail, Context, Result};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Settings for a full parameter sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub mus: Vec<BigDecimal>,
    pub step_size: BigDecimal,
    pub steps: usize,
    pub trajectories: usize,
    pub precision: u64,
    pub max_exponent: i64,
    pub scheme: Rk4Scheme,
    pub field_axis: FieldAxis,
    pub initial_grid: InitialConditionGrid,
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let tenths = |digits: i64| BigDecimal::new(digits.into(), 1);
        Self {
            mus: [-10, -5, -2, 0, 1, 5, 10].into_iter().map(tenths).collect(),
            step_size: tenths(1),
            steps: 100,
            trajectories: 10,
            precision: DEFAULT_PRECISION,
            max_exponent: DEFAULT_MAX_EXPONENT,
            scheme: Rk4Scheme::default(),
            field_axis: FieldAxis::default(),
            initial_grid: InitialConditionGrid::default(),
            seed: None,
        }
    }
}

impl SweepConfig {
    pub fn context(&self) -> Result<DecimalContext> {
        DecimalContext::new(self.precision, self.max_exponent)
    }

    pub fn validate(&self) -> Result<()> {
        self.context()?;
        if self.mus.is_empty() {
            bail!("Sweep needs at least one value of mu.");
        }
        if self.step_size <= BigDecimal::zero() {
            bail!("Step size h must be positive, got {}.", self.step_size);
        }
        self.field_axis.validate()?;
        self.initial_grid.validate()?;
        Ok(())
    }

    /// `trajectories` initial conditions from a ChaCha stream seeded with `seed`.
    pub fn initial_conditions(&self, seed: u64) -> Result<Vec<InitialCondition>> {
        let generator = InitialConditionGenerator::seeded(
            seed,
            self.initial_grid.clone(),
            self.step_size.clone(),
            self.steps,
        )?;
        Ok(generator.take(self.trajectories).collect())
    }
}

/// Everything needed to draw the plot for one mu.
#[derive(Debug, Clone, Serialize)]
pub struct SweepFrame {
    pub mu: BigDecimal,
    pub field: Vec<VectorFieldSample>,
    pub trajectories: Vec<Trajectory>,
}

/// Runs every mu of `config` against the same initial conditions.
pub fn run_sweep<I>(config: &SweepConfig, initial_conditions: I) -> Result<Vec<SweepFrame>>
where
    I: IntoIterator<Item = InitialCondition>,
{
    config.validate()?;
    let ctx = config.context()?;
    let stepper = RK4::new(ctx, config.scheme);
    let field = DerivativePair::default();
    let conditions: Vec<InitialCondition> = initial_conditions.into_iter().collect();

    let mut frames = Vec::with_capacity(config.mus.len());
    for mu in &config.mus {
        let samples = sample_field(&ctx, &field, mu, &config.field_axis, &config.field_axis)
            .with_context(|| format!("Failed to sample the field for mu = {mu}"))?;
        let mut trajectories = Vec::with_capacity(conditions.len());
        for (index, condition) in conditions.iter().enumerate() {
            let trajectory = aggregate(
                &stepper,
                &field,
                &condition.state,
                &condition.step_size,
                mu,
                condition.steps,
            )
            .with_context(|| format!("Trajectory {index} failed for mu = {mu}"))?;
            trace!(%mu, index, len = trajectory.len(), "trajectory computed");
            trajectories.push(trajectory);
        }
        let diverged = trajectories.iter().filter(|t| t.is_diverged()).count();
        debug!(%mu, trajectories = trajectories.len(), diverged, "frame computed");
        frames.push(SweepFrame {
            mu: mu.clone(),
            field: samples,
            trajectories,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::{run_sweep, SweepConfig};
    use crate::initial::InitialCondition;
    use crate::quiver::FieldAxis;
    use crate::solvers::{Rk4Scheme, State};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(literal: &str) -> BigDecimal {
        BigDecimal::from_str(literal).expect("valid literal")
    }

    fn small_config() -> SweepConfig {
        SweepConfig {
            mus: vec![dec("-0.5"), dec("1.0")],
            steps: 8,
            trajectories: 3,
            precision: 40,
            field_axis: FieldAxis {
                min: -2.0,
                max: 2.0,
                samples: 4,
            },
            ..SweepConfig::default()
        }
    }

    #[test]
    fn default_config_matches_reference_sweep() {
        let config = SweepConfig::default();
        let expected: Vec<BigDecimal> = ["-1.0", "-0.5", "-0.2", "0.0", "0.1", "0.5", "1.0"]
            .iter()
            .map(|s| dec(s))
            .collect();
        assert_eq!(config.mus, expected);
        assert_eq!(config.step_size, dec("0.1"));
        assert_eq!(config.steps, 100);
        assert_eq!(config.trajectories, 10);
        assert_eq!(config.precision, 100);
        assert_eq!(config.scheme, Rk4Scheme::Reference);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let config: SweepConfig =
            serde_json::from_str(r#"{"mus": ["0.25"], "steps": 3, "scheme": "classical"}"#)
                .expect("config");
        assert_eq!(config.mus, vec![dec("0.25")]);
        assert_eq!(config.steps, 3);
        assert_eq!(config.scheme, Rk4Scheme::Classical);
        assert_eq!(config.trajectories, 10);
        assert_eq!(config.field_axis, FieldAxis::default());
    }

    #[test]
    fn validate_rejects_empty_sweep_and_bad_step() {
        let empty = SweepConfig {
            mus: Vec::new(),
            ..SweepConfig::default()
        };
        assert!(empty.validate().is_err());
        let backwards = SweepConfig {
            step_size: dec("-0.1"),
            ..SweepConfig::default()
        };
        assert!(backwards.validate().is_err());
        let no_digits = SweepConfig {
            precision: 0,
            ..SweepConfig::default()
        };
        assert!(no_digits.validate().is_err());
    }

    #[test]
    fn sweep_builds_one_frame_per_mu() {
        let config = small_config();
        let conditions = config.initial_conditions(3).expect("conditions");
        assert_eq!(conditions.len(), 3);
        let frames = run_sweep(&config, conditions).expect("sweep");
        assert_eq!(frames.len(), 2);
        for (frame, mu) in frames.iter().zip(&config.mus) {
            assert_eq!(&frame.mu, mu);
            assert_eq!(frame.field.len(), 16);
            assert_eq!(frame.trajectories.len(), 3);
            for trajectory in &frame.trajectories {
                assert_eq!(&trajectory.mu, mu);
                assert!(trajectory.len() >= 1 && trajectory.len() <= 9);
            }
        }
    }

    #[test]
    fn sweep_accepts_explicit_initial_conditions() {
        let config = small_config();
        let origin = InitialCondition {
            state: State::new(dec("0"), dec("0"), dec("0")),
            step_size: dec("0.1"),
            steps: 4,
        };
        let frames = run_sweep(&config, vec![origin]).expect("sweep");
        for frame in frames {
            assert_eq!(frame.trajectories[0].len(), 5);
        }
    }
}
