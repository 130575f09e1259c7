//! Sky view factor from horizon profiles.
//!
//! A horizon profile is a skyline sampled as (azimuth, elevation) pairs. This
//! crate rotates profiles onto inclined surfaces, finds parts of a profile
//! that fold over the zenith, and integrates the visible sky with the
//! discretized (Helbig 2009), annulus (Steyn 1980) and Monte-Carlo methods.
//!
//! With the `python` feature the same operations are exposed as an extension
//! module with one submodule per algorithm family.

pub mod coords;
pub mod error;
mod interp;
pub mod overhang;
pub mod profile;
pub mod rotation;
pub mod sampling;
pub mod skyview;

pub use coords::{
    cartesian_to_horizon, cartesian_to_spherical, horizon_to_cartesian, project_equirectangular,
    project_top_down, spherical_to_cartesian, CartesianPoint,
};
pub use error::{GeometryWarning, Result, SvfError};
pub use overhang::{detect_obscured_bands, detect_overhang, OverhangReport};
pub use profile::{HorizonProfile, HorizonSample, PlaneOrientation, RotatedHorizonProfile};
pub use rotation::{rotate_horizon, rotate_towards, rotation_matrix};
pub use sampling::svf_monte_carlo;
pub use skyview::{
    sky_view_factor_annulus, sky_view_factor_discretized, svf_annulus, svf_annulus_tilted,
    svf_discretized, svf_discretized_tilted, svf_helbig, AnnulusOptions, DiscretizedOptions,
    ObscuredBands,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn horizonsvf(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    register_coords_module(py_module)?;
    register_rotation_module(py_module)?;
    register_overhang_module(py_module)?;
    register_skyview_module(py_module)?;

    py_module.add("__doc__", "Sky view factor from horizon profiles, implemented in Rust.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_coords_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "coords")?;
    submodule.add("__doc__", "Horizon, spherical and cartesian coordinate conversions.")?;
    submodule.add_function(wrap_pyfunction!(coords::spherical_to_cartesian_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(coords::cartesian_to_spherical_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(coords::horizon_to_cartesian_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(coords::cartesian_to_horizon_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(
        coords::project_equirectangular_py,
        &submodule
    )?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_rotation_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "rotation")?;
    submodule.add("__doc__", "Horizon rotation onto inclined surfaces.")?;
    submodule.add_function(wrap_pyfunction!(rotation::rotate_horizon_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_overhang_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "overhang")?;
    submodule.add("__doc__", "Overhang and obscured-band detection.")?;
    submodule.add_function(wrap_pyfunction!(overhang::detect_overhang_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(
        overhang::detect_obscured_bands_py,
        &submodule
    )?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_skyview_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "skyview")?;
    submodule.add("__doc__", "Sky View Factor calculation.")?;
    submodule.add_function(wrap_pyfunction!(
        skyview::sky_view_factor_discretized_py,
        &submodule
    )?)?;
    submodule.add_function(wrap_pyfunction!(
        skyview::sky_view_factor_annulus_py,
        &submodule
    )?)?;
    submodule.add_function(wrap_pyfunction!(skyview::svf_discretized_tilted_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(skyview::svf_annulus_tilted_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(sampling::svf_monte_carlo_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
