//! Core WASM system wrapper: an interactive stepper plus trajectory and
//! field queries for one value of mu.

use anyhow::{bail, Result};
use bigdecimal::BigDecimal;
use js_sys::Float64Array;
use num_traits::Zero;
use rkfield_core::decimal::{to_f64, DecimalContext};
use rkfield_core::quiver::{sample_field, FieldAxis, VectorFieldSample};
use rkfield_core::traits::Steppable;
use rkfield_core::{aggregate, DerivativePair, Rk4Scheme, State, StepOutcome, Termination, RK4};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmPlanarSystem {
    pub(crate) stepper: RK4,
    field: DerivativePair,
    mu: BigDecimal,
    state: State,
}

/// Trajectory sequences exported to JS as plain numbers.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryPayload {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub diverged_at: Option<usize>,
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

impl WasmPlanarSystem {
    fn build(mu: &str, precision: u32, scheme: &str) -> Result<Self> {
        let ctx = DecimalContext::with_precision(u64::from(precision))?;
        let scheme: Rk4Scheme = scheme.parse()?;
        Ok(Self {
            stepper: RK4::new(ctx, scheme),
            field: DerivativePair::default(),
            mu: ctx.parse(mu)?,
            state: State::new(BigDecimal::zero(), BigDecimal::zero(), BigDecimal::zero()),
        })
    }

    fn ctx(&self) -> &DecimalContext {
        self.stepper.context()
    }

    fn decimal(&self, value: f64) -> Result<BigDecimal> {
        self.ctx().from_f64(value)
    }

    fn assign_state(&mut self, state: &[f64]) -> Result<()> {
        if state.len() != 2 {
            bail!("State must have exactly 2 entries, got {}.", state.len());
        }
        self.state.x = self.decimal(state[0])?;
        self.state.y = self.decimal(state[1])?;
        Ok(())
    }

    fn advance(&mut self, dt: f64) -> Result<bool> {
        let h = self.decimal(dt)?;
        match self.stepper.step(&self.field, &self.state, &h, &self.mu) {
            StepOutcome::Advanced(next) => {
                self.state = next;
                Ok(true)
            }
            StepOutcome::Diverged(_) => Ok(false),
        }
    }

    fn trajectory(&self, steps: u32, dt: f64) -> Result<TrajectoryPayload> {
        let h = self.decimal(dt)?;
        let trajectory = aggregate(
            &self.stepper,
            &self.field,
            &self.state,
            &h,
            &self.mu,
            steps as usize,
        )?;
        let (x, y) = trajectory.xy_f64();
        Ok(TrajectoryPayload {
            t: trajectory.t.iter().map(to_f64).collect(),
            x,
            y,
            diverged_at: match trajectory.termination {
                Termination::Diverged { step } => Some(step),
                Termination::Completed => None,
            },
        })
    }

    fn field_samples(&self, min: f64, max: f64, samples: usize) -> Result<Vec<VectorFieldSample>> {
        let axis = FieldAxis { min, max, samples };
        sample_field(self.ctx(), &self.field, &self.mu, &axis, &axis)
    }
}

#[wasm_bindgen]
impl WasmPlanarSystem {
    #[wasm_bindgen(constructor)]
    pub fn new(mu: &str, precision: u32, scheme: &str) -> Result<WasmPlanarSystem, JsValue> {
        console_error_panic_hook::set_once();
        Self::build(mu, precision, scheme).map_err(to_js_error)
    }

    pub fn set_mu(&mut self, mu: &str) -> Result<(), JsValue> {
        self.mu = self.ctx().parse(mu).map_err(to_js_error)?;
        Ok(())
    }

    pub fn get_mu(&self) -> String {
        self.mu.to_string()
    }

    pub fn set_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        self.assign_state(state).map_err(to_js_error)
    }

    /// Sets the state from decimal literals, without a round trip through f64.
    pub fn set_state_exact(&mut self, x: &str, y: &str) -> Result<(), JsValue> {
        let x = self.ctx().parse(x).map_err(to_js_error)?;
        let y = self.ctx().parse(y).map_err(to_js_error)?;
        self.state.x = x;
        self.state.y = y;
        Ok(())
    }

    pub fn get_state(&self) -> Vec<f64> {
        vec![to_f64(&self.state.x), to_f64(&self.state.y)]
    }

    pub fn get_state_exact(&self) -> Vec<String> {
        vec![self.state.x.to_string(), self.state.y.to_string()]
    }

    pub fn set_t(&mut self, t: f64) -> Result<(), JsValue> {
        self.state.t = self.decimal(t).map_err(to_js_error)?;
        Ok(())
    }

    pub fn get_t(&self) -> f64 {
        to_f64(&self.state.t)
    }

    /// Returns false, leaving the state untouched, when the step overflows.
    pub fn step(&mut self, dt: f64) -> Result<bool, JsValue> {
        self.advance(dt).map_err(to_js_error)
    }

    pub fn compute_trajectory(&self, steps: u32, dt: f64) -> Result<JsValue, JsValue> {
        let payload = self.trajectory(steps, dt).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&payload)
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize trajectory: {err}")))
    }

    /// Interleaved x0, y0, x1, y1, ... for line rendering.
    pub fn trajectory_points(&self, steps: u32, dt: f64) -> Result<Float64Array, JsValue> {
        let payload = self.trajectory(steps, dt).map_err(to_js_error)?;
        let points: Vec<f64> = payload
            .x
            .iter()
            .zip(&payload.y)
            .flat_map(|(x, y)| [*x, *y])
            .collect();
        Ok(Float64Array::from(points.as_slice()))
    }

    pub fn sample_field(&self, min: f64, max: f64, samples: u32) -> Result<JsValue, JsValue> {
        let field = self
            .field_samples(min, max, samples as usize)
            .map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&field)
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize field: {err}")))
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::WasmPlanarSystem;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn rejects_unknown_scheme() {
        assert!(WasmPlanarSystem::new("0.0", 100, "tsit5").is_err());
    }

    #[wasm_bindgen_test]
    fn rejects_state_of_wrong_dimension() {
        let mut system = WasmPlanarSystem::new("0.0", 100, "reference").expect("system");
        assert!(system.set_state(&[1.0, 2.0, 3.0]).is_err());
    }

    #[wasm_bindgen_test]
    fn rejects_non_positive_step_for_trajectories() {
        let system = WasmPlanarSystem::new("0.0", 100, "reference").expect("system");
        assert!(system.compute_trajectory(5, 0.0).is_err());
        assert!(system.trajectory_points(5, -0.1).is_err());
    }

    #[wasm_bindgen_test]
    fn rejects_invalid_mu_literal() {
        let mut system = WasmPlanarSystem::new("0.5", 100, "reference").expect("system");
        assert!(system.set_mu("not a number").is_err());
        assert_eq!(system.get_mu(), "0.5");
    }
}
