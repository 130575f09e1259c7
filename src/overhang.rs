//! Self-obscuration analysis of horizon profiles.
//!
//! Two questions are answered here:
//! - which samples are hidden behind other parts of the same profile once the
//!   zenith fold is taken into account ("overhanging" samples);
//! - which azimuths are covered from both sides, so that no elevation on an
//!   interpolated skyline can describe them ("obscured bands").

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Intersects, Line, LineString};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::coords::{project_equirectangular, project_top_down};
use crate::error::{GeometryWarning, Result, SvfError};
use crate::profile::{HorizonProfile, HorizonSample};

/// Rays and test lines run this far from the origin, twice the disk radius.
const RAY_LENGTH: f64 = 2.0;
/// Crossings closer than this are the same point.
const POINT_EPS: f64 = 1e-9;

/// Result of [`detect_overhang`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverhangReport {
    /// Indices into `profile.samples()` of overhanging samples, ascending.
    pub indices: Vec<usize>,
    pub warnings: Vec<GeometryWarning>,
}

impl OverhangReport {
    pub fn is_overhanging(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// One flag per sample.
    pub fn flags(&self, len: usize) -> Vec<bool> {
        (0..len).map(|i| self.is_overhanging(i)).collect()
    }
}

fn closed_ring(points: &[Coord<f64>]) -> LineString<f64> {
    let mut coords = points.to_vec();
    if let Some(&first) = points.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Distinct points where `ray` meets the ring, starting with `through`.
///
/// The sample a ray is cast through is always a crossing, even when rounding
/// puts it a hair off the ray.
fn ring_crossings(
    ray: Line<f64>,
    through: Coord<f64>,
    ring: &LineString<f64>,
) -> Vec<Coord<f64>> {
    let mut crossings: Vec<Coord<f64>> = vec![through];
    let mut push = |c: Coord<f64>| {
        if !crossings
            .iter()
            .any(|p| (p.x - c.x).hypot(p.y - c.y) < POINT_EPS)
        {
            crossings.push(c);
        }
    };
    for segment in ring.lines() {
        match line_intersection(ray, segment) {
            Some(LineIntersection::SinglePoint { intersection, .. }) => push(intersection),
            Some(LineIntersection::Collinear { intersection }) => {
                push(intersection.start);
                push(intersection.end);
            }
            None => {}
        }
    }
    // vertices sitting on the ray, which the segment tests can miss by an ulp
    let dir = ray.delta();
    let len = dir.x.hypot(dir.y);
    for v in ring.coords() {
        let offset = (dir.x * v.y - dir.y * v.x) / len;
        let along = dir.x * v.x + dir.y * v.y;
        if offset.abs() < POINT_EPS && along > 0.0 {
            push(*v);
        }
    }
    crossings
}

/// Flag samples that something else in the profile hides from the origin.
///
/// Each sample is projected to the equirectangular disk and a ray is cast
/// from the origin through it. A crossing of the horizon ring beyond the
/// sample means the sample sits in front of (below) another part of the
/// skyline, which only happens when the profile folds over the zenith.
pub fn detect_overhang(profile: &HorizonProfile) -> Result<OverhangReport> {
    profile.require_distinct(3)?;
    let report = overhang_report(profile.samples());
    log::debug!(
        "overhang analysis: {} of {} samples overhanging",
        report.indices.len(),
        profile.len()
    );
    Ok(report)
}

/// Overhang analysis over samples sorted by azimuth.
///
/// Repeated azimuths are allowed here: a folded sample can land exactly on
/// the azimuth of another sample, and both have to stay in the ring.
pub(crate) fn overhang_report(samples: &[HorizonSample]) -> OverhangReport {
    let points: Vec<Coord<f64>> = samples
        .iter()
        .map(|s| {
            let (x, y) = project_equirectangular(s.azimuth, s.elevation, 1.0);
            Coord { x, y }
        })
        .collect();
    let ring = closed_ring(&points);

    let mut report = OverhangReport::default();
    for (index, (point, sample)) in points.iter().zip(samples).enumerate() {
        let dist = point.x.hypot(point.y);
        // the zenith cannot be hidden
        if dist < POINT_EPS {
            continue;
        }
        let scale = RAY_LENGTH / dist;
        let ray = Line::new(
            Coord { x: 0.0, y: 0.0 },
            Coord {
                x: point.x * scale,
                y: point.y * scale,
            },
        );

        let crossings = ring_crossings(ray, *point, &ring);
        if crossings.len() > 2 {
            let warning = GeometryWarning {
                index,
                azimuth: sample.azimuth,
                crossings: crossings.len(),
            };
            log::warn!("{warning}");
            report.warnings.push(warning);
        }

        let farthest = crossings
            .iter()
            .map(|c| c.x.hypot(c.y))
            .fold(dist, f64::max);
        if farthest > dist + POINT_EPS {
            report.indices.push(index);
        }
    }
    report
}

/// Azimuths that are covered from both sides.
///
/// For every azimuth `a` in `[0, 180)` at `step_deg`, the line through the
/// origin along `a` / `a + 180` is tested against the horizon ring in the
/// top-down projection. A line that misses the ring entirely means the
/// skyline passes overhead in that direction, and both `a` and `a + 180` are
/// returned so they can be injected as 90° obstructions.
pub fn detect_obscured_bands(profile: &HorizonProfile, step_deg: u32) -> Result<Vec<f64>> {
    if step_deg == 0 {
        return Err(SvfError::NonPositive {
            name: "step_deg",
            value: 0.0,
        });
    }
    profile.require_distinct(3)?;

    let points: Vec<Coord<f64>> = profile
        .samples()
        .iter()
        .map(|s| {
            let (x, y) = project_top_down(s.azimuth, s.elevation);
            Coord { x, y }
        })
        .collect();
    let ring = closed_ring(&points);

    let mut obscured = Vec::new();
    for angle in (0..180).step_by(step_deg as usize) {
        let a = angle as f64;
        let (x, y) = project_top_down(a, 0.0);
        let line = Line::new(
            Coord {
                x: RAY_LENGTH * x,
                y: RAY_LENGTH * y,
            },
            Coord {
                x: -RAY_LENGTH * x,
                y: -RAY_LENGTH * y,
            },
        );
        if !ring.lines().any(|segment| segment.intersects(&line)) {
            obscured.push(a);
            obscured.push((a + 180.0) % 360.0);
        }
    }

    if !obscured.is_empty() {
        log::debug!("{} fully obscured azimuths found", obscured.len());
    }
    Ok(obscured)
}

/// Unfold each flagged sample onto the ray it describes: `(az + 180, 180 - el)`.
pub(crate) fn unfold(sample: HorizonSample) -> HorizonSample {
    HorizonSample::new(
        (sample.azimuth + 180.0) % 360.0,
        180.0 - sample.elevation,
    )
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) fn warn_python(py: Python<'_>, warnings: &[GeometryWarning]) -> PyResult<()> {
    use pyo3::exceptions::PyRuntimeWarning;
    use std::ffi::CString;

    for w in warnings {
        let message = CString::new(w.to_string())
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        PyErr::warn(py, py.get_type::<PyRuntimeWarning>().as_any(), &message, 1)?;
    }
    Ok(())
}

/// Returns `(azimuths, elevations, overhanging)` sorted by azimuth.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "detect_overhang")]
pub fn detect_overhang_py<'py>(
    py: Python<'py>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<bool>>,
)> {
    let profile =
        HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let report = py.allow_threads(|| detect_overhang(&profile))?;
    warn_python(py, &report.warnings)?;
    Ok((
        profile.azimuths().into_pyarray(py),
        profile.elevations().into_pyarray(py),
        report.flags(profile.len()).into_pyarray(py),
    ))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "detect_obscured_bands", signature = (azimuths, elevations, step_deg = 1))]
pub fn detect_obscured_bands_py<'py>(
    py: Python<'py>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    step_deg: u32,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let profile =
        HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let bands = py.allow_threads(|| detect_obscured_bands(&profile, step_deg))?;
    Ok(bands.into_pyarray(py))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(az: &[f64], el: &[f64]) -> HorizonProfile {
        HorizonProfile::from_arrays(az, el).unwrap()
    }

    #[test]
    fn uniform_horizon_has_no_overhang() {
        let az: Vec<f64> = (0..360).step_by(10).map(f64::from).collect();
        let el = vec![30.0; az.len()];
        let report = detect_overhang(&profile(&az, &el)).unwrap();
        assert!(report.indices.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn folded_sample_is_flagged() {
        // 0° at 120° elevation folds onto the 180° side, in front of the 20° skyline
        let mut az = vec![0.0];
        let mut el = vec![120.0];
        for a in (30..360).step_by(30) {
            az.push(a as f64);
            el.push(20.0);
        }
        let report = detect_overhang(&profile(&az, &el)).unwrap();
        assert_eq!(report.indices, vec![0]);
        assert!(report.is_overhanging(0));
        assert!(!report.is_overhanging(1));
    }

    #[test]
    fn tangled_profile_warns_but_continues() {
        let p = profile(
            &[0.0, 90.0, 180.0, 200.0, 205.0, 210.0, 270.0],
            &[0.0, 0.0, 0.0, 150.0, 120.0, 0.0, 0.0],
        );
        let report = detect_overhang(&p).unwrap();
        assert_eq!(report.indices, vec![3, 4]);
        assert!(report.warnings.iter().any(|w| w.index == 4 && w.crossings >= 3));
        assert_eq!(
            report.flags(p.len()),
            vec![false, false, false, true, true, false, false]
        );
    }

    #[test]
    fn overhang_needs_a_ring() {
        let p = profile(&[0.0, 180.0], &[10.0, 10.0]);
        assert!(matches!(
            detect_overhang(&p),
            Err(SvfError::TooFewAzimuths { required: 3, found: 2 })
        ));
    }

    #[test]
    fn open_sky_has_no_obscured_bands() {
        let az: Vec<f64> = (0..360).step_by(15).map(f64::from).collect();
        let el = vec![30.0; az.len()];
        assert!(detect_obscured_bands(&profile(&az, &el), 5).unwrap().is_empty());
    }

    #[test]
    fn one_sided_overhang_obscures_other_directions() {
        // every projected point lies between compass bearings 30° and 60°
        let p = profile(&[30.0, 60.0, 210.0, 240.0], &[60.0, 60.0, 110.0, 110.0]);
        let bands = detect_obscured_bands(&p, 10).unwrap();
        for a in [0.0, 10.0, 20.0, 90.0, 170.0] {
            assert!(bands.contains(&a), "{a} should be obscured: {bands:?}");
            assert!(bands.contains(&((a + 180.0) % 360.0)));
        }
        assert!(!bands.contains(&40.0));
        assert!(!bands.contains(&220.0));
    }

    #[test]
    fn zero_step_is_rejected() {
        let p = profile(&[0.0, 120.0, 240.0], &[0.0, 0.0, 0.0]);
        assert!(detect_obscured_bands(&p, 0).is_err());
    }

    #[test]
    fn unfold_reverses_the_fold() {
        let s = unfold(HorizonSample::new(200.0, 60.0));
        assert_eq!(s, HorizonSample::new(20.0, 120.0));
    }
}
