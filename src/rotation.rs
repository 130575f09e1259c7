//! Horizon rotation onto an inclined receiving surface.
//!
//! A horizon measured against the horizontal plane is re-expressed relative
//! to a plane of given aspect and dip. Tilting the receiver towards `aspect`
//! by `dip` is the same as rotating the sky by `-dip` about the horizontal
//! axis perpendicular to `aspect`.

use ndarray::{arr2, Array2, Axis};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::coords::{cartesian_to_horizon, fold_overhang, horizon_to_cartesian, CartesianPoint};
use crate::error::{Result, SvfError};
use crate::overhang::{overhang_report, unfold, OverhangReport};
use crate::profile::{HorizonProfile, HorizonSample, PlaneOrientation, RotatedHorizonProfile};

/// Vertical planes are tilted this many degrees short of 90 so the plane's
/// nadir stays just below the rotated skyline.
const VERTICAL_DIP_EPS: f64 = 1e-4;

/// Counter-clockwise rotation about `axis` by `angle_rad` (Euler–Rodrigues).
///
/// `axis` does not need to be normalized.
pub fn rotation_matrix(axis: [f64; 3], angle_rad: f64) -> Result<Array2<f64>> {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if !(norm > 0.0) || !norm.is_finite() {
        return Err(SvfError::ZeroAxis);
    }
    if !angle_rad.is_finite() {
        return Err(SvfError::NonFinite("rotation angle"));
    }

    let half = angle_rad / 2.0;
    let a = half.cos();
    let (b, c, d) = (
        -axis[0] / norm * half.sin(),
        -axis[1] / norm * half.sin(),
        -axis[2] / norm * half.sin(),
    );
    let (aa, bb, cc, dd) = (a * a, b * b, c * c, d * d);
    let (bc, ad, ac, ab, bd, cd) = (b * c, a * d, a * c, a * b, b * d, c * d);

    Ok(arr2(&[
        [aa + bb - cc - dd, 2.0 * (bc + ad), 2.0 * (bd - ac)],
        [2.0 * (bc - ad), aa + cc - bb - dd, 2.0 * (cd + ab)],
        [2.0 * (bd + ac), 2.0 * (cd - ab), aa + dd - bb - cc],
    ]))
}

/// Rotation by `angle_deg` about the horizontal axis perpendicular to `aspect_deg`.
pub fn rotate_towards(aspect_deg: f64, angle_deg: f64) -> Result<Array2<f64>> {
    let phi = aspect_deg.to_radians();
    rotation_matrix([-phi.cos(), phi.sin(), 0.0], angle_deg.to_radians())
}

/// Unit vectors for a batch of samples, one per column (shape 3×N).
fn to_cartesian_columns(samples: &[HorizonSample]) -> Result<Array2<f64>> {
    let points = samples
        .iter()
        .map(|s| horizon_to_cartesian(s.azimuth, s.elevation))
        .collect::<Result<Vec<CartesianPoint>>>()?;
    Ok(Array2::from_shape_fn((3, points.len()), |(row, col)| {
        let p = points[col];
        match row {
            0 => p.x,
            1 => p.y,
            _ => p.z,
        }
    }))
}

/// Directions of `samples` relative to `plane`, in input order.
///
/// Elevations are not clamped and may be negative (below the plane).
/// Overhanging inputs come back folded to `(azimuth + 180, 180 - elevation)`.
pub(crate) fn rotated_directions(
    samples: &[HorizonSample],
    plane: &PlaneOrientation,
) -> Result<Vec<HorizonSample>> {
    if plane.is_horizontal() {
        return Ok(samples
            .iter()
            .map(|s| {
                let (azimuth, elevation) = fold_overhang(s.azimuth, s.elevation);
                HorizonSample::new(azimuth, elevation)
            })
            .collect());
    }

    let dip = plane.dip.min(90.0 - VERTICAL_DIP_EPS);
    if dip < plane.dip {
        log::debug!("dip {:.4} treated as {dip:.4}", plane.dip);
    }
    let rotation = rotate_towards(plane.aspect, -dip)?;
    let rotated = rotation.dot(&to_cartesian_columns(samples)?);

    rotated
        .axis_iter(Axis(1))
        .map(|col| {
            let (azimuth, elevation) =
                cartesian_to_horizon(CartesianPoint::new(col[0], col[1], col[2]))?;
            Ok(HorizonSample::new(azimuth, elevation))
        })
        .collect()
}

/// Re-express `profile` relative to `plane`.
///
/// Rotated elevations below the new horizontal are clamped to zero (the
/// surface shades itself). Samples that end up hidden behind the rest of the
/// rotated skyline are unfolded to `(azimuth + 180, 180 - elevation)` and
/// flagged as overhanging. Where several rotated samples share an azimuth
/// the highest one is kept.
///
/// A vertical plane (dip 90) is evaluated at a dip of `90 - 1e-4` degrees.
pub fn rotate_horizon(
    profile: &HorizonProfile,
    plane: &PlaneOrientation,
) -> Result<RotatedHorizonProfile> {
    let mut samples: Vec<HorizonSample> = rotated_directions(profile.samples(), plane)?
        .into_iter()
        .map(|s| HorizonSample::new(s.azimuth, s.elevation.max(0.0)))
        .collect();
    samples.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));

    let report = if samples.len() >= 3 {
        overhang_report(&samples)
    } else {
        OverhangReport::default()
    };
    if !report.indices.is_empty() {
        log::debug!(
            "aspect {:.1} dip {:.1}: unfolding {} overhanging samples",
            plane.aspect,
            plane.dip,
            report.indices.len()
        );
    }

    let flagged = samples
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            if report.is_overhanging(i) {
                (unfold(s), true)
            } else {
                (s, false)
            }
        })
        .collect();
    RotatedHorizonProfile::from_flagged(flagged, *plane, report.warnings)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "rotate_horizon")]
pub fn rotate_horizon_py<'py>(
    py: Python<'py>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    aspect: f64,
    dip: f64,
) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
    let profile =
        HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let plane = PlaneOrientation::new(aspect, dip)?;
    let rotated = py.allow_threads(|| rotate_horizon(&profile, &plane))?;
    crate::overhang::warn_python(py, rotated.warnings())?;
    Ok((
        rotated.profile().azimuths().into_pyarray(py),
        rotated.profile().elevations().into_pyarray(py),
    ))
}
