use crate::decimal::{to_f64, DecimalContext};
use crate::field::evaluate;
use crate::traits::PlanarField;
use anyhow::{bail, Result};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldAxis {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl Default for FieldAxis {
    fn default() -> Self {
        Self {
            min: -2.0,
            max: 2.0,
            samples: 20,
        }
    }
}

impl FieldAxis {
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            bail!("Each axis range must be finite with max > min.");
        }
        if self.samples < 2 {
            bail!("Each axis needs at least 2 samples.");
        }
        Ok(())
    }

    /// Evenly spaced values from `min` to `max`, both included.
    pub fn values(&self) -> Vec<f64> {
        let last = self.samples.saturating_sub(1).max(1);
        let step = (self.max - self.min) / last as f64;
        (0..self.samples)
            .map(|i| {
                if i == last {
                    self.max
                } else {
                    self.min + step * i as f64
                }
            })
            .collect()
    }

    pub fn spacing(&self) -> f64 {
        (self.max - self.min) / self.samples.saturating_sub(1).max(1) as f64
    }
}

/// Position and derivative vector of one arrow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorFieldSample {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl VectorFieldSample {
    pub fn is_finite(&self) -> bool {
        self.u.is_finite() && self.v.is_finite()
    }

    pub fn magnitude(&self) -> f64 {
        self.u.hypot(self.v)
    }
}

/// Samples the field on the meshgrid of `x_axis` by `y_axis`.
///
/// Output is row-major: row index follows y, column index follows x.
/// Points whose derivative overflows get NaN components.
pub fn sample_field(
    ctx: &DecimalContext,
    field: &impl PlanarField,
    mu: &BigDecimal,
    x_axis: &FieldAxis,
    y_axis: &FieldAxis,
) -> Result<Vec<VectorFieldSample>> {
    x_axis.validate()?;
    y_axis.validate()?;

    let xs = x_axis
        .values()
        .into_iter()
        .map(|x| Ok((x, ctx.from_f64(x)?)))
        .collect::<Result<Vec<_>>>()?;
    let ys = y_axis
        .values()
        .into_iter()
        .map(|y| Ok((y, ctx.from_f64(y)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut samples = Vec::with_capacity(xs.len() * ys.len());
    for (y, y_dec) in &ys {
        for (x, x_dec) in &xs {
            let (u, v) = match evaluate(ctx, mu, (x_dec, y_dec), field) {
                Ok((u, v)) => (to_f64(&u), to_f64(&v)),
                Err(_) => (f64::NAN, f64::NAN),
            };
            samples.push(VectorFieldSample {
                x: *x,
                y: *y,
                u,
                v,
            });
        }
    }
    Ok(samples)
}
