//! Monte-Carlo sky view factor.
//!
//! Directions are drawn cosine-weighted over the hemisphere, i.e. uniformly
//! over the unit disk of the top-down projection, so the hit fraction is the
//! sky view factor of a horizontal receiver directly.

#[cfg(feature = "python")]
use numpy::PyReadonlyArray1;
#[cfg(feature = "python")]
use pyo3::prelude::*;
use rand::Rng;

use crate::error::{Result, SvfError};
use crate::interp::PeriodicLinear;
use crate::profile::HorizonProfile;

/// Fraction of `samples` random directions that clear the horizon.
///
/// A direction at elevation `h` and azimuth `a` is sky when `h` is above
/// the interpolated horizon at `a` (negative horizon angles count as 0°).
/// A horizon angle of exactly 90° blocks every direction at that azimuth.
///
/// The skyline must be single valued: profiles with elevations above 90°,
/// including rotated profiles with unfolded overhangs, are rejected with
/// [`SvfError::Overhanging`].
pub fn svf_monte_carlo<R: Rng + ?Sized>(
    profile: &HorizonProfile,
    samples: usize,
    rng: &mut R,
) -> Result<f64> {
    if samples == 0 {
        return Err(SvfError::NonPositive {
            name: "samples",
            value: 0.0,
        });
    }
    if let Some(s) = profile.samples().iter().find(|s| s.elevation > 90.0) {
        return Err(SvfError::Overhanging {
            azimuth: s.azimuth,
            elevation: s.elevation,
        });
    }
    let horizon = PeriodicLinear::new(profile.samples());

    let mut visible = 0usize;
    for _ in 0..samples {
        // uniform in the disk: radius sqrt(u), and radius = cos(elevation)
        let radius = rng.gen::<f64>().sqrt();
        let azimuth = 360.0 * rng.gen::<f64>();
        let elevation = radius.acos().to_degrees();
        if elevation > horizon.eval(azimuth).max(0.0) {
            visible += 1;
        }
    }

    let svf = visible as f64 / samples as f64;
    log::debug!("monte-carlo svf from {samples} samples: {svf:.5}");
    Ok(svf)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "svf_monte_carlo", signature = (azimuths, elevations, samples = 10_000, seed = None))]
pub fn svf_monte_carlo_py(
    py: Python<'_>,
    azimuths: PyReadonlyArray1<f64>,
    elevations: PyReadonlyArray1<f64>,
    samples: usize,
    seed: Option<u64>,
) -> PyResult<f64> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let profile = HorizonProfile::from_arrays(azimuths.as_slice()?, elevations.as_slice()?)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(py.allow_threads(|| svf_monte_carlo(&profile, samples, &mut rng))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlaneOrientation;
    use crate::rotation::rotate_horizon;
    use crate::skyview::{svf_discretized, DiscretizedOptions};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform(elevation: f64) -> HorizonProfile {
        let az: Vec<f64> = (0..360).step_by(10).map(f64::from).collect();
        HorizonProfile::from_arrays(&az, &vec![elevation; az.len()]).unwrap()
    }

    #[test]
    fn open_sky_is_always_visible() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(svf_monte_carlo(&uniform(0.0), 5_000, &mut rng).unwrap(), 1.0);
        assert_eq!(svf_monte_carlo(&uniform(-5.0), 5_000, &mut rng).unwrap(), 1.0);
    }

    #[test]
    fn walls_block_everything() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(svf_monte_carlo(&uniform(90.0), 5_000, &mut rng).unwrap(), 0.0);
    }

    #[test]
    fn converges_to_the_discretized_estimate() {
        let mut rng = StdRng::seed_from_u64(42);
        let p = uniform(30.0);
        let mc = svf_monte_carlo(&p, 100_000, &mut rng).unwrap();
        let reference = svf_discretized(&p, &DiscretizedOptions::default()).unwrap();
        assert_abs_diff_eq!(mc, reference, epsilon = 1e-2);
    }

    #[test]
    fn same_seed_same_answer() {
        let az: Vec<f64> = (0..360).step_by(15).map(f64::from).collect();
        let el: Vec<f64> = az.iter().map(|a| 25.0 + 20.0 * a.to_radians().cos()).collect();
        let p = HorizonProfile::from_arrays(&az, &el).unwrap();
        let a = svf_monte_carlo(&p, 2_000, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = svf_monte_carlo(&p, 2_000, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overhanging_profiles_are_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let p =
            HorizonProfile::from_arrays(&[0.0, 90.0, 180.0, 270.0], &[120.0, 20.0, 20.0, 20.0])
                .unwrap();
        assert_eq!(
            svf_monte_carlo(&p, 1_000, &mut rng),
            Err(SvfError::Overhanging {
                azimuth: 0.0,
                elevation: 120.0
            })
        );

        // a steep plane under a high horizon unfolds part of the cap past 90°
        let plane = PlaneOrientation::new(0.0, 45.0).unwrap();
        let rotated = rotate_horizon(&uniform(60.0), &plane).unwrap();
        assert!(rotated.overhanging().iter().any(|&f| f));
        assert!(matches!(
            svf_monte_carlo(rotated.profile(), 1_000, &mut rng),
            Err(SvfError::Overhanging { .. })
        ));
    }

    #[test]
    fn zero_samples_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            svf_monte_carlo(&uniform(0.0), 0, &mut rng),
            Err(SvfError::NonPositive { name: "samples", .. })
        ));
    }
}
