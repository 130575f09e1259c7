//! Conversions between horizon angles, spherical angles and unit vectors.
//!
//! Conventions:
//! - azimuth is a compass bearing, clockwise from north (+Y), in degrees;
//! - theta is measured counter-clockwise from +X in the XY plane;
//! - phi is measured from +Z, so `elevation = 90 - phi`.
//!
//! Elevations above 90° describe terrain that wraps past the zenith. They are
//! folded onto `(azimuth + 180, 180 - elevation)` before any conversion, and
//! every caller goes through [`horizon_to_cartesian`] so the fold is applied
//! exactly once.

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::error::{Result, SvfError};

/// Below this radius a vector has no usable direction.
const RADIUS_EPS: f64 = 1e-12;
/// Angles this close below 360 are reported as 0.
const WRAP_EPS: f64 = 1e-10;

/// A point on (or near) the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Wrap an angle into `[0, 360)`.
///
/// Round-off just below a full turn (including the exact 360.0 that
/// `rem_euclid` returns for tiny negative inputs) maps back to zero.
#[inline]
pub(crate) fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 - WRAP_EPS {
        0.0
    } else {
        wrapped
    }
}

/// Fold an overhanging sample (elevation > 90) onto the ray it actually describes.
#[inline]
pub(crate) fn fold_overhang(azimuth: f64, elevation: f64) -> (f64, f64) {
    if elevation > 90.0 {
        (wrap_degrees(azimuth + 180.0), 180.0 - elevation)
    } else {
        (wrap_degrees(azimuth), elevation)
    }
}

pub fn spherical_to_cartesian(theta_deg: f64, phi_deg: f64, r: f64) -> Result<CartesianPoint> {
    if !(0.0..180.0).contains(&phi_deg) {
        return Err(SvfError::PhiOutOfRange(phi_deg));
    }
    let theta = wrap_degrees(theta_deg).to_radians();
    let phi = phi_deg.to_radians();
    Ok(CartesianPoint {
        x: r * phi.sin() * theta.cos(),
        y: r * phi.sin() * theta.sin(),
        z: r * phi.cos(),
    })
}

/// Returns `(theta_deg, phi_deg, r)` with theta in `[0, 360)` and phi in `[0, 180]`.
pub fn cartesian_to_spherical(point: CartesianPoint) -> Result<(f64, f64, f64)> {
    let r = point.norm();
    if !(r > RADIUS_EPS) {
        return Err(SvfError::ZeroRadius {
            x: point.x,
            y: point.y,
            z: point.z,
        });
    }
    let theta = wrap_degrees(point.y.atan2(point.x).to_degrees());
    // z / r can drift just outside [-1, 1]
    let phi = (point.z / r).clamp(-1.0, 1.0).acos().to_degrees();
    Ok((theta, phi, r))
}

/// Unit vector for a horizon sample, folding overhangs first.
pub fn horizon_to_cartesian(azimuth_deg: f64, elevation_deg: f64) -> Result<CartesianPoint> {
    let (azimuth, elevation) = fold_overhang(azimuth_deg, elevation_deg);
    spherical_to_cartesian(90.0 - azimuth, 90.0 - elevation, 1.0)
}

/// Returns `(azimuth_deg, elevation_deg)`; elevation lies in `[-90, 90]`.
pub fn cartesian_to_horizon(point: CartesianPoint) -> Result<(f64, f64)> {
    let (theta, phi, _) = cartesian_to_spherical(point)?;
    Ok((wrap_degrees(90.0 - theta), 90.0 - phi))
}

/// Equirectangular (equidistant) projection onto a disk of radius `r0`.
///
/// Distance from the origin is linear in zenith angle: the zenith maps to the
/// origin and a 0° horizon to the rim. Elevations above 90° land on the far
/// side of the origin.
pub fn project_equirectangular(azimuth_deg: f64, elevation_deg: f64, r0: f64) -> (f64, f64) {
    let azimuth = azimuth_deg.to_radians();
    let r = (90.0 - elevation_deg) * r0 / 90.0;
    (azimuth.cos() * r, azimuth.sin() * r)
}

/// Orthographic top-down projection with north on +Y.
pub fn project_top_down(azimuth_deg: f64, elevation_deg: f64) -> (f64, f64) {
    let m = elevation_deg.to_radians().cos();
    let offset = (90.0 - azimuth_deg).to_radians();
    (m * offset.cos(), m * offset.sin())
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "spherical_to_cartesian")]
pub fn spherical_to_cartesian_py(theta: f64, phi: f64, r: f64) -> PyResult<(f64, f64, f64)> {
    let p = spherical_to_cartesian(theta, phi, r)?;
    Ok((p.x, p.y, p.z))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "cartesian_to_spherical")]
pub fn cartesian_to_spherical_py(x: f64, y: f64, z: f64) -> PyResult<(f64, f64, f64)> {
    Ok(cartesian_to_spherical(CartesianPoint::new(x, y, z))?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "horizon_to_cartesian")]
pub fn horizon_to_cartesian_py(azimuth: f64, elevation: f64) -> PyResult<(f64, f64, f64)> {
    let p = horizon_to_cartesian(azimuth, elevation)?;
    Ok((p.x, p.y, p.z))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "cartesian_to_horizon")]
pub fn cartesian_to_horizon_py(x: f64, y: f64, z: f64) -> PyResult<(f64, f64)> {
    Ok(cartesian_to_horizon(CartesianPoint::new(x, y, z))?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "project_equirectangular", signature = (azimuth, elevation, r0 = 1.0))]
pub fn project_equirectangular_py(azimuth: f64, elevation: f64, r0: f64) -> (f64, f64) {
    project_equirectangular(azimuth, elevation, r0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn angular_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn horizon_round_trip_grid() {
        for az in (0..360).step_by(45) {
            for el in (0..90).step_by(15) {
                let p = horizon_to_cartesian(az as f64, el as f64).unwrap();
                let (az2, el2) = cartesian_to_horizon(p).unwrap();
                assert!(
                    angular_diff(az as f64, az2) < 1e-3,
                    "azimuth {az} came back as {az2}"
                );
                assert!((el as f64 - el2).abs() < 1e-3, "elevation {el} came back as {el2}");
            }
        }
    }

    #[test]
    fn north_is_positive_y() {
        let p = horizon_to_cartesian(0.0, 0.0).unwrap();
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);

        let east = horizon_to_cartesian(90.0, 0.0).unwrap();
        assert_abs_diff_eq!(east.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn overhang_folds_to_opposite_azimuth() {
        let folded = horizon_to_cartesian(10.0, 120.0).unwrap();
        let direct = horizon_to_cartesian(190.0, 60.0).unwrap();
        assert_abs_diff_eq!(folded.x, direct.x, epsilon = 1e-12);
        assert_abs_diff_eq!(folded.y, direct.y, epsilon = 1e-12);
        assert_abs_diff_eq!(folded.z, direct.z, epsilon = 1e-12);
    }

    #[test]
    fn phi_outside_range_is_rejected() {
        assert_eq!(
            spherical_to_cartesian(0.0, 180.0, 1.0),
            Err(SvfError::PhiOutOfRange(180.0))
        );
        assert!(spherical_to_cartesian(0.0, -1.0, 1.0).is_err());
        assert!(spherical_to_cartesian(725.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn zero_radius_is_rejected() {
        let err = cartesian_to_spherical(CartesianPoint::new(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, SvfError::ZeroRadius { .. }));
    }

    #[test]
    fn spherical_round_trip() {
        let p = spherical_to_cartesian(370.0, 30.0, 2.0).unwrap();
        let (theta, phi, r) = cartesian_to_spherical(p).unwrap();
        assert_abs_diff_eq!(theta, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(phi, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn equirectangular_zenith_and_rim() {
        let (x, y) = project_equirectangular(123.0, 90.0, 1.0);
        assert_abs_diff_eq!(x.hypot(y), 0.0, epsilon = 1e-12);

        let (x, y) = project_equirectangular(123.0, 0.0, 1.0);
        assert_abs_diff_eq!(x.hypot(y), 1.0, epsilon = 1e-12);

        let (x, y) = project_equirectangular(0.0, 45.0, 2.0);
        assert_abs_diff_eq!(x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn wrap_never_returns_360() {
        assert_eq!(wrap_degrees(-1e-18), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(-1e-13), 0.0);
        assert_abs_diff_eq!(wrap_degrees(-90.0), 270.0);
    }
}
