//! Fixed-point interpolation weight grids.
//!
//! Every non-nearest kernel is precomputed on a grid of quantized fractional
//! offsets: cell `(qy, qx)` holds `taps * taps` integer weights for a sample
//! position `floor + (qx, qy) / FRAC_STEPS`. One-dimensional taps are
//! quantized to `FILTER_UNIT_1D` with the last tap absorbing the rounding
//! error, so every cell sums to exactly `WEIGHT_UNIT`.
//!
//! # Kernels
//!
//! | Kind | Taps | Window (relative to floor) |
//! |------|------|----------------------------|
//! | Nearest | 1 | round(x) |
//! | Bilinear | 2 | 0..=1 |
//! | Bicubic | 4 | -1..=2 (Catmull-Rom) |
//! | Lanczos A | 2A | -(A-1)..=A |

use crate::config::{
    FILTER_UNIT_1D, FRAC_STEPS, InterpolationKind, InterpolationParams, MARGIN_SLACK,
    WEIGHT_SHIFT, WEIGHT_UNIT,
};

/// Catmull-Rom tension
const CUBIC_A: f64 = -0.5;

/// Where a filter window starts and which weight cell applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterWindow {
    pub x0: i64,
    pub y0: i64,
    pub cell: u32,
}

/// Precomputed weight grid for one interpolation kernel.
#[derive(Debug, Clone)]
pub struct InterpolationFilter {
    kind: InterpolationKind,
    taps: usize,
    table: Vec<i32>,
}

impl InterpolationFilter {
    pub fn new(kind: InterpolationKind, lanczos_radius: usize) -> Self {
        let taps = tap_count(kind, lanczos_radius);
        if kind == InterpolationKind::Nearest {
            return Self {
                kind,
                taps,
                table: vec![WEIGHT_UNIT],
            };
        }

        let cell_len = taps * taps;
        let mut table = Vec::with_capacity(FRAC_STEPS * FRAC_STEPS * cell_len);
        let rows: Vec<Vec<i32>> = (0..FRAC_STEPS)
            .map(|q| {
                let frac = q as f64 / FRAC_STEPS as f64;
                quantize_taps(&kernel_1d(kind, lanczos_radius, frac))
            })
            .collect();
        for wy in &rows {
            for wx in &rows {
                for &cy in wy {
                    for &cx in wx {
                        table.push(cy * cx);
                    }
                }
            }
        }
        Self { kind, taps, table }
    }

    #[inline]
    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    #[inline]
    pub fn taps(&self) -> usize {
        self.taps
    }

    pub fn cell_count(&self) -> usize {
        self.table.len() / (self.taps * self.taps)
    }

    /// Weights of one cell, row-major taps x taps.
    #[inline]
    pub fn cell(&self, index: u32) -> &[i32] {
        let n = self.taps * self.taps;
        let start = index as usize * n;
        &self.table[start..start + n]
    }

    /// Window and weight cell for a continuous sample position.
    pub fn locate(&self, x: f64, y: f64) -> FilterWindow {
        if self.kind == InterpolationKind::Nearest {
            return FilterWindow {
                x0: (x + 0.5).floor() as i64,
                y0: (y + 0.5).floor() as i64,
                cell: 0,
            };
        }
        let (ix, qx) = split_fraction(x);
        let (iy, qy) = split_fraction(y);
        let back = (self.taps / 2) as i64 - 1;
        FilterWindow {
            x0: ix - back,
            y0: iy - back,
            cell: (qy * FRAC_STEPS + qx) as u32,
        }
    }

    /// Weighted sum over a window starting at `offset` in `data`, normalized
    /// and rounded but not clipped.
    #[inline]
    pub fn apply(&self, data: &[u16], offset: usize, stride: usize, cell: u32) -> i64 {
        let weights = self.cell(cell);
        let mut sum: i64 = 0;
        for j in 0..self.taps {
            let row = offset + j * stride;
            let w = &weights[j * self.taps..(j + 1) * self.taps];
            for (i, &c) in w.iter().enumerate() {
                sum += c as i64 * data[row + i] as i64;
            }
        }
        (sum + (1i64 << (WEIGHT_SHIFT - 1))) >> WEIGHT_SHIFT
    }
}

/// Luma and chroma filters of one geometry.
#[derive(Debug, Clone)]
pub struct FilterBank {
    luma: InterpolationFilter,
    chroma: InterpolationFilter,
}

impl FilterBank {
    pub fn new(params: &InterpolationParams) -> Self {
        Self {
            luma: InterpolationFilter::new(params.luma_filter, params.lanczos_radius),
            chroma: InterpolationFilter::new(params.chroma_filter, params.lanczos_radius),
        }
    }

    pub fn for_channel(&self, channel: usize) -> &InterpolationFilter {
        if channel == 0 { &self.luma } else { &self.chroma }
    }

    /// Face buffer margin needed by the widest filter.
    pub fn margin(&self) -> usize {
        margin_for_taps(self.luma.taps.max(self.chroma.taps))
    }
}

pub fn tap_count(kind: InterpolationKind, lanczos_radius: usize) -> usize {
    match kind {
        InterpolationKind::Nearest => 1,
        InterpolationKind::Bilinear => 2,
        InterpolationKind::Bicubic => 4,
        InterpolationKind::Lanczos => 2 * lanczos_radius,
    }
}

pub fn margin_for_taps(taps: usize) -> usize {
    taps / 2 + MARGIN_SLACK
}

/// Integer part and quantized fraction; a fraction that rounds up to a whole
/// sample carries into the integer part.
#[inline]
fn split_fraction(v: f64) -> (i64, usize) {
    let base = v.floor();
    let mut i = base as i64;
    let mut q = ((v - base) * FRAC_STEPS as f64).round() as usize;
    if q >= FRAC_STEPS {
        i += 1;
        q = 0;
    }
    (i, q)
}

/// Floating-point kernel weights for sample offsets relative to floor(x).
fn kernel_1d(kind: InterpolationKind, lanczos_radius: usize, frac: f64) -> Vec<f64> {
    match kind {
        InterpolationKind::Nearest => vec![1.0],
        InterpolationKind::Bilinear => vec![1.0 - frac, frac],
        InterpolationKind::Bicubic => (-1..=2)
            .map(|k| cubic_weight((k as f64 - frac).abs()))
            .collect(),
        InterpolationKind::Lanczos => {
            let a = lanczos_radius as i64;
            let w: Vec<f64> = (-(a - 1)..=a)
                .map(|k| lanczos_weight(k as f64 - frac, a as f64))
                .collect();
            let sum: f64 = w.iter().sum();
            w.into_iter().map(|v| v / sum).collect()
        }
    }
}

fn cubic_weight(d: f64) -> f64 {
    if d <= 1.0 {
        (CUBIC_A + 2.0) * d * d * d - (CUBIC_A + 3.0) * d * d + 1.0
    } else if d < 2.0 {
        CUBIC_A * d * d * d - 5.0 * CUBIC_A * d * d + 8.0 * CUBIC_A * d - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() >= a { 0.0 } else { sinc(x) * sinc(x / a) }
}

/// Round to fixed point; the last tap takes whatever keeps the sum exact.
fn quantize_taps(weights: &[f64]) -> Vec<i32> {
    let n = weights.len();
    let mut out = Vec::with_capacity(n);
    let mut acc = 0;
    for &w in &weights[..n - 1] {
        let q = (w * FILTER_UNIT_1D as f64).round() as i32;
        acc += q;
        out.push(q);
    }
    out.push(FILTER_UNIT_1D - acc);
    out
}
