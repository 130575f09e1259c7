//! Sky view factor from a horizon profile.
//!
//! Two estimators share the same input:
//! - the discretized continuum form (Helbig et al. 2009), a `cos²` sum of
//!   the interpolated horizon angle over evenly spaced azimuths;
//! - the annulus form (Steyn 1980), which projects the visible sky to the
//!   equirectangular disk and weights the sky fraction of each concentric
//!   annulus by `sin(π(2i-1)/2N)`.
//!
//! Both return a value in `[0, 1]` rounded to five decimals.

use std::borrow::Cow;
use std::f64::consts::PI;
use std::str::FromStr;

use geo::{Area, BooleanOps, Coord, LineString, Polygon};
#[cfg(feature = "python")]
use numpy::PyReadonlyArray1;
#[cfg(feature = "python")]
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::coords::project_equirectangular;
use crate::error::{Result, SvfError};
use crate::interp::PeriodicLinear;
use crate::overhang::detect_obscured_bands;
use crate::profile::{HorizonProfile, PlaneOrientation};
use crate::rotation::{rotate_horizon, rotated_directions};

/// Consecutive ring vertices closer than this are merged.
const POINT_EPS: f64 = 1e-12;
/// A sky polygon smaller than this is treated as no sky at all.
const AREA_EPS: f64 = 1e-12;
/// Azimuth spacing of the skyline before it is rotated onto a plane.
const TILT_RESAMPLE_DEG: f64 = 1.0;

/// How azimuths that are covered from both sides are handled by
/// [`svf_discretized`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ObscuredBands {
    /// Detect them geometrically and inject 90° points before interpolating.
    InjectBeforeInterpolation,
    /// Clamp φ to 90° whenever both f(φ) and f(φ + 180) exceed 90°.
    ClampAfterInterpolation,
    #[default]
    Both,
}

impl ObscuredBands {
    fn injects(self) -> bool {
        matches!(self, Self::InjectBeforeInterpolation | Self::Both)
    }

    fn clamps(self) -> bool {
        matches!(self, Self::ClampAfterInterpolation | Self::Both)
    }
}

impl FromStr for ObscuredBands {
    type Err = SvfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inject" => Ok(Self::InjectBeforeInterpolation),
            "clamp" => Ok(Self::ClampAfterInterpolation),
            "both" => Ok(Self::Both),
            _ => Err(SvfError::UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscretizedOptions {
    /// Azimuth increment in whole degrees, `1..=360`.
    pub step_deg: u32,
    pub obscured_bands: ObscuredBands,
}

impl Default for DiscretizedOptions {
    fn default() -> Self {
        Self {
            step_deg: 1,
            obscured_bands: ObscuredBands::default(),
        }
    }
}

impl DiscretizedOptions {
    pub fn with_step(step_deg: u32) -> Self {
        Self {
            step_deg,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_step(self.step_deg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnulusOptions {
    /// Number of concentric annuli N.
    pub n_annuli: u32,
    /// Vertices used for each annulus circle.
    pub circle_segments: u32,
    /// Longest azimuth span of one sky polygon edge; longer edges are split
    /// with linearly interpolated elevation.
    pub max_edge_deg: f64,
    /// Evaluate annuli on the rayon pool.
    pub parallel: bool,
}

impl Default for AnnulusOptions {
    fn default() -> Self {
        Self {
            n_annuli: 36,
            circle_segments: 360,
            max_edge_deg: 1.0,
            parallel: true,
        }
    }
}

impl AnnulusOptions {
    pub fn with_annuli(n_annuli: u32) -> Self {
        Self {
            n_annuli,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_annuli == 0 {
            return Err(SvfError::NonPositive {
                name: "n_annuli",
                value: 0.0,
            });
        }
        if self.circle_segments < 3 {
            return Err(SvfError::TooSmall {
                name: "circle_segments",
                value: self.circle_segments,
                min: 3,
            });
        }
        if !(self.max_edge_deg > 0.0) || !self.max_edge_deg.is_finite() {
            return Err(SvfError::NonPositive {
                name: "max_edge_deg",
                value: self.max_edge_deg,
            });
        }
        Ok(())
    }
}

fn validate_step(step_deg: u32) -> Result<()> {
    if !(1..=360).contains(&step_deg) {
        return Err(SvfError::OutOfRange {
            name: "step_deg",
            value: f64::from(step_deg),
            min: 1.0,
            max: 360.0,
        });
    }
    Ok(())
}

#[inline]
fn round5(x: f64) -> f64 {
    (x * 1e5).round() / 1e5
}

fn helbig_sum(f: impl Fn(f64) -> f64, step_deg: u32, clamp_opposing: bool) -> f64 {
    let total: f64 = (0..360u32)
        .step_by(step_deg as usize)
        .map(|phi| {
            let phi = f64::from(phi);
            let mut theta = f(phi);
            if clamp_opposing && theta > 90.0 && f(phi + 180.0) > 90.0 {
                theta = 90.0;
            }
            let theta = theta.max(0.0);
            let c = theta.to_radians().cos().powi(2);
            // beyond the zenith the term is taken off the sky
            if theta <= 90.0 {
                c
            } else {
                -c
            }
        })
        .sum();
    round5(total * f64::from(step_deg) / 360.0).clamp(0.0, 1.0)
}

/// Discretized SVF of an arbitrary horizon function `f(azimuth) -> elevation`.
///
/// Evaluates `f` at `0, step, 2·step, … < 360`. Where both `f(φ)` and
/// `f(φ + 180)` exceed 90° the direction is fully covered and φ counts as
/// 90°. Negative angles count as 0°. Angles above 90° subtract their `cos²`
/// term instead of adding it; the total is clamped to `[0, 1]`.
pub fn svf_helbig(f: impl Fn(f64) -> f64, step_deg: u32) -> Result<f64> {
    validate_step(step_deg)?;
    Ok(helbig_sum(f, step_deg, true))
}

/// Discretized-continuum SVF of a horizontal receiver.
pub fn svf_discretized(profile: &HorizonProfile, options: &DiscretizedOptions) -> Result<f64> {
    options.validate()?;
    let mode = options.obscured_bands;

    let profile: Cow<'_, HorizonProfile> = if mode.injects() && profile.len() >= 3 {
        let bands = detect_obscured_bands(profile, options.step_deg)?;
        if bands.is_empty() {
            Cow::Borrowed(profile)
        } else {
            log::debug!("injecting {} obscured azimuths at 90°", bands.len());
            Cow::Owned(profile.with_obstructions(&bands))
        }
    } else {
        if mode.injects() {
            log::debug!(
                "{} samples cannot form a ring, skipping obscured-band detection",
                profile.len()
            );
        }
        Cow::Borrowed(profile)
    };

    let horizon = PeriodicLinear::new(profile.samples());
    Ok(helbig_sum(
        |azimuth| horizon.eval(azimuth),
        options.step_deg,
        mode.clamps(),
    ))
}

/// Rotate onto `plane`, then [`svf_discretized`].
///
/// The profile is resampled every degree first so that long edges bend
/// with the rotation instead of staying straight between two samples.
pub fn svf_discretized_tilted(
    profile: &HorizonProfile,
    plane: &PlaneOrientation,
    options: &DiscretizedOptions,
) -> Result<f64> {
    options.validate()?;
    let rotated = rotate_horizon(&profile.densified(TILT_RESAMPLE_DEG), plane)?;
    svf_discretized(rotated.profile(), options)
}

fn push_point(ring: &mut Vec<Coord<f64>>, azimuth: f64, elevation: f64) {
    let (x, y) = project_equirectangular(azimuth, elevation, 1.0);
    let repeated = ring
        .last()
        .is_some_and(|p| (p.x - x).hypot(p.y - y) < POINT_EPS);
    if !repeated {
        ring.push(Coord { x, y });
    }
}

/// Visible sky on the equirectangular disk.
///
/// Edges spanning more than `max_edge_deg` of azimuth are split so that a
/// coarse profile still traces the horizon rather than its chords.
fn sky_polygon(profile: &HorizonProfile, max_edge_deg: f64) -> Polygon<f64> {
    let samples = profile.samples();
    let mut ring: Vec<Coord<f64>> = Vec::new();
    for (i, cur) in samples.iter().enumerate() {
        let next = samples[(i + 1) % samples.len()];
        let delta = (next.azimuth - cur.azimuth).rem_euclid(360.0);
        let (e0, e1) = (cur.elevation.max(0.0), next.elevation.max(0.0));
        let steps = (delta / max_edge_deg).ceil().max(1.0) as usize;

        for k in 0..steps {
            let t = k as f64 / steps as f64;
            push_point(&mut ring, cur.azimuth + t * delta, e0 + t * (e1 - e0));
        }
    }
    Polygon::new(LineString::new(ring), vec![])
}

/// Visible sky of a tilted receiver on the plane's equirectangular disk.
///
/// The skyline is rotated point by point and kept in its original order, so
/// a wall that leans over the plane's zenith is traced as one continuous
/// curve. Stretches that fall below the plane follow the rim of the disk.
fn tilted_sky_polygon(
    profile: &HorizonProfile,
    plane: &PlaneOrientation,
    max_edge_deg: f64,
) -> Result<Polygon<f64>> {
    let skyline = profile.densified(max_edge_deg);
    let rotated = rotated_directions(skyline.samples(), plane)?;

    let mut ring: Vec<Coord<f64>> = Vec::with_capacity(rotated.len());
    for (i, cur) in rotated.iter().enumerate() {
        push_point(&mut ring, cur.azimuth, cur.elevation.max(0.0));
        let next = rotated[(i + 1) % rotated.len()];
        if cur.elevation < 0.0 && next.elevation < 0.0 {
            // shortest way round, the skyline never passes the plane's nadir
            let delta = (next.azimuth - cur.azimuth + 180.0).rem_euclid(360.0) - 180.0;
            let steps = (delta.abs() / max_edge_deg).ceil() as usize;
            for k in 1..steps {
                push_point(&mut ring, cur.azimuth + delta * k as f64 / steps as f64, 0.0);
            }
        }
    }
    Ok(Polygon::new(LineString::new(ring), vec![]))
}

/// Circle of the given radius, counter-clockwise, open.
fn circle(radius: f64, segments: u32) -> LineString<f64> {
    (0..segments)
        .map(|k| {
            let azimuth = f64::from(k) * 360.0 / f64::from(segments);
            let (x, y) = project_equirectangular(azimuth, 0.0, radius);
            Coord { x, y }
        })
        .collect()
}

/// Annulus `i` of `n` (1-based), covering radii `[(i-1)/n, i/n]`.
fn annulus_polygon(i: u32, n: u32, segments: u32) -> Polygon<f64> {
    let outer = circle(f64::from(i) / f64::from(n), segments);
    let holes = if i > 1 {
        let mut inner = circle(f64::from(i - 1) / f64::from(n), segments);
        inner.0.reverse();
        vec![inner]
    } else {
        vec![]
    };
    Polygon::new(outer, holes)
}

/// Annulus (Steyn 1980) SVF of a horizontal receiver.
///
/// Needs at least three distinct azimuths to form a polygon. Negative
/// elevations are treated as 0°.
pub fn svf_annulus(profile: &HorizonProfile, options: &AnnulusOptions) -> Result<f64> {
    options.validate()?;
    profile.require_distinct(3)?;
    Ok(annulus_sum(&sky_polygon(profile, options.max_edge_deg), options))
}

/// Annulus SVF of a receiver tilted onto `plane`.
///
/// The sky polygon is built from the rotated skyline directly rather than
/// from [`rotate_horizon`]'s single-valued profile, so parts of the horizon
/// that lean over the plane's zenith are measured exactly.
pub fn svf_annulus_tilted(
    profile: &HorizonProfile,
    plane: &PlaneOrientation,
    options: &AnnulusOptions,
) -> Result<f64> {
    options.validate()?;
    profile.require_distinct(3)?;
    let sky = tilted_sky_polygon(profile, plane, options.max_edge_deg)?;
    Ok(annulus_sum(&sky, options))
}

fn annulus_sum(sky: &Polygon<f64>, options: &AnnulusOptions) -> f64 {
    if sky.unsigned_area() < AREA_EPS {
        log::debug!("sky polygon has no area");
        return 0.0;
    }

    let n = options.n_annuli;
    let segments = options.circle_segments;
    let contribution = move |i: u32| -> f64 {
        let annulus = annulus_polygon(i, n, segments);
        let total = annulus.unsigned_area();
        let visible = annulus.intersection(sky).unsigned_area();
        let weight = (PI * f64::from(2 * i - 1) / (2.0 * f64::from(n))).sin();
        weight * visible / total
    };
    // collected first so the sum runs in annulus order either way
    let parts: Vec<f64> = if options.parallel {
        (1..=n).into_par_iter().map(contribution).collect()
    } else {
        (1..=n).map(contribution).collect()
    };

    let svf = PI / (2.0 * f64::from(n)) * parts.iter().sum::<f64>();
    log::debug!("annulus svf over {n} annuli: {svf:.6}");
    round5(svf).clamp(0.0, 1.0)
}

pub fn sky_view_factor_discretized(
    azimuths: &[f64],
    elevations: &[f64],
    step_deg: u32,
) -> Result<f64> {
    let profile = HorizonProfile::from_arrays(azimuths, elevations)?;
    svf_discretized(&profile, &DiscretizedOptions::with_step(step_deg))
}

pub fn sky_view_factor_annulus(azimuths: &[f64], elevations: &[f64], n_annuli: u32) -> Result<f64> {
    let profile = HorizonProfile::from_arrays(azimuths, elevations)?;
    svf_annulus(&profile, &AnnulusOptions::with_annuli(n_annuli))
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(
    name = "sky_view_factor_discretized",
    signature = (azimuths, elevations, step_deg = 1, obscured_bands = "both")
)]
pub fn sky_view_factor_discretized_py(
    py: Python<'_>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    step_deg: u32,
    obscured_bands: &str,
) -> PyResult<f64> {
    let profile = HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let options = DiscretizedOptions {
        step_deg,
        obscured_bands: obscured_bands.parse()?,
    };
    Ok(py.allow_threads(|| svf_discretized(&profile, &options))?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(
    name = "sky_view_factor_annulus",
    signature = (azimuths, elevations, n_annuli = 36, circle_segments = 360)
)]
pub fn sky_view_factor_annulus_py(
    py: Python<'_>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    n_annuli: u32,
    circle_segments: u32,
) -> PyResult<f64> {
    let profile = HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let options = AnnulusOptions {
        n_annuli,
        circle_segments,
        ..AnnulusOptions::default()
    };
    Ok(py.allow_threads(|| svf_annulus(&profile, &options))?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(
    name = "svf_discretized_tilted",
    signature = (azimuths, elevations, aspect, dip, step_deg = 1, obscured_bands = "both")
)]
pub fn svf_discretized_tilted_py(
    py: Python<'_>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    aspect: f64,
    dip: f64,
    step_deg: u32,
    obscured_bands: &str,
) -> PyResult<f64> {
    let profile = HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let plane = PlaneOrientation::new(aspect, dip)?;
    let options = DiscretizedOptions {
        step_deg,
        obscured_bands: obscured_bands.parse()?,
    };
    Ok(py.allow_threads(|| svf_discretized_tilted(&profile, &plane, &options))?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(
    name = "svf_annulus_tilted",
    signature = (azimuths, elevations, aspect, dip, n_annuli = 36)
)]
pub fn svf_annulus_tilted_py(
    py: Python<'_>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    aspect: f64,
    dip: f64,
    n_annuli: u32,
) -> PyResult<f64> {
    let profile = HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let plane = PlaneOrientation::new(aspect, dip)?;
    let options = AnnulusOptions::with_annuli(n_annuli);
    Ok(py.allow_threads(|| svf_annulus_tilted(&profile, &plane, &options))?)
}
