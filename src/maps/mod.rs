//! maps — sky/energy geometry, data cubes, masks, and persistence.
//!
//! Purpose
//! -------
//! Provide the data layer every other module builds on: validated energy
//! axes and pixel grids ([`geometry`]), geometry-tagged cubes ([`map`]), and
//! a self-describing file format for maps and response artifacts ([`io`]).
//!
//! Key behaviors
//! -------------
//! - [`Geometry`] = [`SpatialGrid`] × [`EnergyAxis`]; cube shape is
//!   `(n_energy, ny, nx)`.
//! - [`Map<T>`] enforces that its array matches its geometry and never
//!   mutates after construction; slicing returns new maps.
//! - [`write_artifact`] / [`read_artifact`] persist anything implementing
//!   [`Artifact`] and re-validate it on the way back in.
//!
//! Downstream usage
//! ----------------
//! - `irf` builds exposure/background maps and PSF kernels on a
//!   [`Geometry`]; `models` integrates sky models on one; `cube` checks
//!   operand geometries with [`Geometry::ensure_same`].

pub mod errors;
pub mod geometry;
pub mod io;
pub mod map;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{MapError, MapResult};
pub use self::geometry::{EnergyAxis, Geometry, SpatialGrid, separation};
pub use self::io::{Artifact, read_artifact, write_artifact};
pub use self::map::{CircleRegion, Map};
