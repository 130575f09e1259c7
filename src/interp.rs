//! Periodic piecewise-linear interpolation of elevation over azimuth.

use crate::coords::wrap_degrees;
use crate::profile::HorizonSample;

/// Linear interpolant over a sorted profile, periodic in 360°.
///
/// The knots are padded with the last two samples shifted by -360 and the
/// first two shifted by +360, so every azimuth in `[0, 360)` falls between
/// two knots.
pub(crate) struct PeriodicLinear {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl PeriodicLinear {
    /// `samples` must be non-empty and sorted by azimuth.
    pub(crate) fn new(samples: &[HorizonSample]) -> Self {
        let n = samples.len();
        let pad = n.min(2);
        let head = &samples[n - pad..];
        let tail = &samples[..pad];

        let mut xs = Vec::with_capacity(n + 2 * pad);
        let mut ys = Vec::with_capacity(n + 2 * pad);
        for s in head {
            xs.push(s.azimuth - 360.0);
            ys.push(s.elevation);
        }
        for s in samples {
            xs.push(s.azimuth);
            ys.push(s.elevation);
        }
        for s in tail {
            xs.push(s.azimuth + 360.0);
            ys.push(s.elevation);
        }
        Self { xs, ys }
    }

    pub(crate) fn eval(&self, azimuth: f64) -> f64 {
        let x = wrap_degrees(azimuth);
        let idx = self.xs.partition_point(|&k| k <= x);
        if idx == 0 {
            return self.ys[0];
        }
        if idx == self.xs.len() {
            return self.ys[idx - 1];
        }
        let (x0, x1) = (self.xs[idx - 1], self.xs[idx]);
        let (y0, y1) = (self.ys[idx - 1], self.ys[idx]);
        if x1 == x0 {
            return y0;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}
