//! gammacube — forward modeling and Poisson fitting of binned gamma-ray sky
//! cubes.
//!
//! Purpose
//! -------
//! Implement the generic analysis loop for counts cubes (energy × latitude ×
//! longitude): build a sky and energy geometry, assemble an instrument
//! response, predict counts for a parameterized sky model, draw a
//! reproducible Poisson realization, and recover the model parameters and
//! their covariance by maximizing the Poisson likelihood.
//!
//! Key behaviors
//! -------------
//! - `maps`: energy axes, spatial grids, generic `Map<T>` containers, region
//!   masks, and JSON persistence of artifacts.
//! - `irf`: observations, the `ResponseProvider` seam, exposure/background
//!   makers, PSF kernels, energy dispersion, and the validated
//!   `ResponseBundle`.
//! - `models`: bounded parameters, spatial and spectral components, and the
//!   `SkyModel` composition.
//! - `cube`: `compute_npred`, `simulate_counts`, and the `MapFit` engine.
//! - `optimization`: argmin-backed log-likelihood maximizer and parameter
//!   transforms.
//! - `inference`: covariance from the curvature at the optimum.
//!
//! Invariants & assumptions
//! ------------------------
//! - Single-threaded and synchronous; no function mutates an input map or
//!   model, and every output is newly allocated.
//! - Calibration data enters only through `irf::ResponseProvider`.
//!
//! Conventions
//! -------------
//! - Energies in TeV, angles in degrees, exposure in cm²·s, flux in
//!   cm⁻²·s⁻¹·TeV⁻¹, counts per pixel.
//! - Cube arrays are indexed `(energy, row, column)`.
//! - Diagnostics go through `tracing`; the library never installs a
//!   subscriber and never prints.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; `tests/` exercises the
//!   simulate → fit pipeline against `irf::AnalyticResponse`.

pub mod cube;
pub mod inference;
pub mod irf;
pub mod maps;
pub mod models;
pub mod optimization;
