//! Horizon profile values: samples, profiles, receiving-plane orientation.
//!
//! Profiles are validated once on construction and are immutable after that.
//! Every operation that transforms a profile returns a new one.

use crate::coords::wrap_degrees;
use crate::error::{GeometryWarning, Result, SvfError};

/// Two azimuths closer than this are the same direction.
const AZIMUTH_EPS: f64 = 1e-9;

/// One skyline measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonSample {
    /// Compass azimuth in degrees, `[0, 360)`.
    pub azimuth: f64,
    /// Angle above the horizontal plane; values above 90 overhang the zenith.
    pub elevation: f64,
}

impl HorizonSample {
    pub fn new(azimuth: f64, elevation: f64) -> Self {
        Self { azimuth, elevation }
    }
}

/// A skyline, sorted by azimuth and unique by azimuth.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonProfile {
    samples: Vec<HorizonSample>,
}

impl HorizonProfile {
    /// Wraps azimuths into `[0, 360)`, sorts them and drops repeated azimuths
    /// (the first occurrence wins, so an explicitly closed ring collapses).
    pub fn new(samples: Vec<HorizonSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(SvfError::TooFewAzimuths {
                required: 1,
                found: 0,
            });
        }
        if samples
            .iter()
            .any(|s| !s.azimuth.is_finite() || !s.elevation.is_finite())
        {
            return Err(SvfError::NonFinite("horizon profile"));
        }

        let mut samples: Vec<HorizonSample> = samples
            .into_iter()
            .map(|s| HorizonSample::new(wrap_degrees(s.azimuth), s.elevation))
            .collect();
        // stable, so the first duplicate survives dedup
        samples.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
        samples.dedup_by(|later, earlier| (later.azimuth - earlier.azimuth).abs() < AZIMUTH_EPS);
        // 359.9999999999 and 0.0 are the same direction too
        if samples.len() > 1 {
            let first = samples[0].azimuth;
            let last = samples[samples.len() - 1].azimuth;
            if (first + 360.0 - last).abs() < AZIMUTH_EPS {
                samples.pop();
            }
        }

        Ok(Self { samples })
    }

    pub fn from_arrays(azimuths: &[f64], elevations: &[f64]) -> Result<Self> {
        if azimuths.len() != elevations.len() {
            return Err(SvfError::LengthMismatch {
                azimuths: azimuths.len(),
                elevations: elevations.len(),
            });
        }
        Self::new(
            azimuths
                .iter()
                .zip(elevations)
                .map(|(&az, &el)| HorizonSample::new(az, el))
                .collect(),
        )
    }

    pub fn samples(&self) -> &[HorizonSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn azimuths(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.azimuth).collect()
    }

    pub fn elevations(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.elevation).collect()
    }

    /// Samples as a closed ring: the first sample repeated at the end.
    pub fn closed_ring(&self) -> Vec<HorizonSample> {
        let mut ring = self.samples.clone();
        if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
            if ring.len() == 1 || first != last {
                ring.push(first);
            }
        }
        ring
    }

    /// Polygon-based analysis needs a ring with at least three corners.
    pub fn require_distinct(&self, required: usize) -> Result<()> {
        if self.samples.len() < required {
            return Err(SvfError::TooFewAzimuths {
                required,
                found: self.samples.len(),
            });
        }
        Ok(())
    }

    /// Copy of the profile with extra samples so that consecutive azimuths
    /// (including the wrap from the last sample to the first) are at most
    /// `max_step_deg` apart. Elevations are interpolated linearly.
    pub fn densified(&self, max_step_deg: f64) -> Self {
        let n = self.samples.len();
        if n < 2 || !(max_step_deg > 0.0) {
            return self.clone();
        }
        let mut samples = Vec::with_capacity(n);
        for (i, s) in self.samples.iter().enumerate() {
            let next = self.samples[(i + 1) % n];
            let span = (next.azimuth - s.azimuth).rem_euclid(360.0);
            let steps = ((span / max_step_deg).ceil() as usize).max(1);
            for k in 0..steps {
                let t = k as f64 / steps as f64;
                samples.push(HorizonSample::new(
                    wrap_degrees(s.azimuth + t * span),
                    s.elevation + t * (next.elevation - s.elevation),
                ));
            }
        }
        // only the wrap segment can land out of order
        samples.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
        samples.dedup_by(|later, earlier| (later.azimuth - earlier.azimuth).abs() < AZIMUTH_EPS);
        Self { samples }
    }

    /// Copy of the profile with a 90° obstruction at each given azimuth.
    ///
    /// An injected point replaces any existing sample at the same azimuth.
    pub fn with_obstructions(&self, azimuths: &[f64]) -> Self {
        let mut samples: Vec<HorizonSample> = azimuths
            .iter()
            .map(|&az| HorizonSample::new(wrap_degrees(az), 90.0))
            .collect();
        samples.extend(self.samples.iter().copied());
        samples.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
        samples.dedup_by(|later, earlier| (later.azimuth - earlier.azimuth).abs() < AZIMUTH_EPS);
        Self { samples }
    }
}

/// Orientation of the receiving surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneOrientation {
    /// Azimuth of steepest descent, `[0, 360)`.
    pub aspect: f64,
    /// Inclination from horizontal, `[0, 90]`.
    pub dip: f64,
}

impl PlaneOrientation {
    pub fn new(aspect: f64, dip: f64) -> Result<Self> {
        if !aspect.is_finite() || !dip.is_finite() {
            return Err(SvfError::NonFinite("plane orientation"));
        }
        if !(0.0..=90.0).contains(&dip) {
            return Err(SvfError::DipOutOfRange(dip));
        }
        Ok(Self {
            aspect: wrap_degrees(aspect),
            dip,
        })
    }

    pub fn is_horizontal(&self) -> bool {
        self.dip == 0.0
    }
}

/// A profile re-expressed relative to a tilted plane.
///
/// Elevations were clamped at zero after rotation; samples found to be
/// overhanging were unfolded back to `(azimuth + 180, 180 - elevation)` and
/// are flagged in [`RotatedHorizonProfile::overhanging`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedHorizonProfile {
    profile: HorizonProfile,
    plane: PlaneOrientation,
    overhanging: Vec<bool>,
    warnings: Vec<GeometryWarning>,
}

impl RotatedHorizonProfile {
    pub(crate) fn from_flagged(
        flagged: Vec<(HorizonSample, bool)>,
        plane: PlaneOrientation,
        warnings: Vec<GeometryWarning>,
    ) -> Result<Self> {
        let mut flagged: Vec<(HorizonSample, bool)> = flagged
            .into_iter()
            .map(|(s, f)| (HorizonSample::new(wrap_degrees(s.azimuth), s.elevation), f))
            .collect();
        flagged.sort_by(|a, b| a.0.azimuth.total_cmp(&b.0.azimuth));

        // the highest sample at an azimuth is the one that shapes the skyline
        let before = flagged.len();
        let mut kept: Vec<(HorizonSample, bool)> = Vec::with_capacity(before);
        for entry in flagged {
            let same = kept
                .last()
                .map(|last| (entry.0.azimuth - last.0.azimuth).abs() < AZIMUTH_EPS);
            match (same, kept.len().checked_sub(1)) {
                (Some(true), Some(i)) => {
                    if entry.0.elevation > kept[i].0.elevation {
                        kept[i] = entry;
                    }
                }
                _ => kept.push(entry),
            }
        }
        if kept.len() > 1 {
            let first = kept[0].0.azimuth;
            let last = kept[kept.len() - 1];
            if (first + 360.0 - last.0.azimuth).abs() < AZIMUTH_EPS {
                kept.pop();
                if last.0.elevation > kept[0].0.elevation {
                    kept[0] = (HorizonSample::new(first, last.0.elevation), last.1);
                }
            }
        }
        if kept.len() < before {
            log::debug!(
                "dropped {} rotated samples sharing an azimuth with a higher one",
                before - kept.len()
            );
        }

        let (samples, overhanging): (Vec<_>, Vec<_>) = kept.into_iter().unzip();
        let profile = HorizonProfile::new(samples)?;
        Ok(Self {
            profile,
            plane,
            overhanging,
            warnings,
        })
    }

    pub fn profile(&self) -> &HorizonProfile {
        &self.profile
    }

    pub fn into_profile(self) -> HorizonProfile {
        self.profile
    }

    pub fn plane(&self) -> PlaneOrientation {
        self.plane
    }

    /// Overhang flag per sample, aligned with `profile().samples()`.
    pub fn overhanging(&self) -> &[bool] {
        &self.overhanging
    }

    pub fn warnings(&self) -> &[GeometryWarning] {
        &self.warnings
    }
}
