//! SVG quiver plots with trajectory overlays.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use plotters::prelude::*;
use rkfield_core::quiver::{FieldAxis, VectorFieldSample};
use rkfield_core::{SweepFrame, Trajectory};
use std::path::{Path, PathBuf};

const PLOT_SIZE: (u32, u32) = (800, 800);
/// Longest arrow as a fraction of the grid spacing.
const ARROW_FILL: f64 = 0.9;
const HEAD_LENGTH: f64 = 0.3;
const HEAD_WIDTH: f64 = 0.4;

/// Shaft segment and head triangle of one arrow, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub shaft: [(f64, f64); 2],
    pub head: [(f64, f64); 3],
}

/// Data units per unit of derivative magnitude, so the longest finite arrow
/// spans `ARROW_FILL` grid cells.
pub fn arrow_scale(samples: &[VectorFieldSample], axis: &FieldAxis) -> f64 {
    let max_mag = samples
        .iter()
        .filter(|s| s.is_finite())
        .map(VectorFieldSample::magnitude)
        .fold(0.0_f64, f64::max);
    if max_mag > 0.0 {
        axis.spacing() * ARROW_FILL / max_mag
    } else {
        0.0
    }
}

pub fn arrow(sample: &VectorFieldSample, scale: f64) -> Option<Arrow> {
    if !sample.is_finite() {
        return None;
    }
    let dx = sample.u * scale;
    let dy = sample.v * scale;
    let len = dx.hypot(dy);
    if !len.is_finite() || len < 1e-12 {
        return None;
    }
    let (ex, ey) = (sample.x + dx, sample.y + dy);
    let (ux, uy) = (dx / len, dy / len);
    let head_len = len * HEAD_LENGTH;
    let head_w = head_len * HEAD_WIDTH;
    let (px, py) = (-uy, ux);
    let base = (ex - ux * head_len, ey - uy * head_len);
    Some(Arrow {
        shaft: [(sample.x, sample.y), (ex, ey)],
        head: [
            (ex, ey),
            (base.0 + px * head_w, base.1 + py * head_w),
            (base.0 - px * head_w, base.1 - py * head_w),
        ],
    })
}

/// Clips the segment `p0 -> p1` to the square view (Liang-Barsky). Endpoints
/// that are already inside come back unchanged.
fn clip_segment(
    p0: (f64, f64),
    p1: (f64, f64),
    axis: &FieldAxis,
) -> Option<((f64, f64), (f64, f64))> {
    if ![p0.0, p0.1, p1.0, p1.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-dx, p0.0 - axis.min),
        (dx, axis.max - p0.0),
        (-dy, p0.1 - axis.min),
        (dy, axis.max - p0.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| {
        if t == 0.0 {
            p0
        } else if t == 1.0 {
            p1
        } else {
            (p0.0 + t * dx, p0.1 + t * dy)
        }
    };
    Some((at(t0), at(t1)))
}

/// Pieces of a trajectory inside the view, each clipped at the edges. A
/// trajectory that leaves and re-enters yields several runs.
pub fn visible_runs(trajectory: &Trajectory, axis: &FieldAxis) -> Vec<Vec<(f64, f64)>> {
    let (xs, ys) = trajectory.xy_f64();
    let points: Vec<(f64, f64)> = xs.into_iter().zip(ys).collect();
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for pair in points.windows(2) {
        match clip_segment(pair[0], pair[1], axis) {
            Some((start, end)) => {
                if current.last() != Some(&start) {
                    flush_run(&mut runs, &mut current);
                    current.push(start);
                }
                current.push(end);
            }
            None => flush_run(&mut runs, &mut current),
        }
    }
    flush_run(&mut runs, &mut current);
    runs
}

fn flush_run(runs: &mut Vec<Vec<(f64, f64)>>, current: &mut Vec<(f64, f64)>) {
    if current.len() >= 2 {
        runs.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Formats mu like a float literal, always with a fractional part: `0.0`,
/// `-0.5`, `1.0`.
pub fn mu_label(mu: &BigDecimal) -> String {
    let text = mu.normalized().to_string();
    if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text
    } else {
        format!("{text}.0")
    }
}

pub fn frame_file_name(mu: &BigDecimal) -> String {
    format!("mu_{}.svg", mu_label(mu))
}

/// Draws one frame into `out_dir` and returns the written path.
pub fn render_frame(frame: &SweepFrame, axis: &FieldAxis, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(frame_file_name(&frame.mu));
    draw_frame(frame, axis, &path)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    Ok(path)
}

fn draw_frame(frame: &SweepFrame, axis: &FieldAxis, path: &Path) -> Result<()> {
    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("mu: {}", mu_label(&frame.mu)), ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(axis.min..axis.max, axis.min..axis.max)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()?;

    let scale = arrow_scale(&frame.field, axis);
    let arrows: Vec<Arrow> = frame
        .field
        .iter()
        .filter_map(|sample| arrow(sample, scale))
        .collect();
    chart.draw_series(
        arrows
            .iter()
            .map(|a| PathElement::new(a.shaft.to_vec(), &RED)),
    )?;
    chart.draw_series(
        arrows
            .iter()
            .map(|a| Polygon::new(a.head.to_vec(), RED.filled())),
    )?;

    for trajectory in &frame.trajectories {
        for run in visible_runs(trajectory, axis) {
            chart.draw_series(LineSeries::new(run, &BLUE))?;
        }
    }

    root.present()?;
    Ok(())
}
