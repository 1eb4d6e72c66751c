//! maps::io — self-describing JSON persistence for maps and response artifacts.
//!
//! Purpose
//! -------
//! Persist any [`Artifact`] (maps, PSF kernels, energy dispersion matrices,
//! sky models, fit options) to disk and read it back with its geometry and
//! values intact.
//!
//! Key behaviors
//! -------------
//! - Wrap the payload in an [`Envelope`] carrying a `kind` tag and a
//!   `format_version`, so a file states what it contains.
//! - Reject files whose kind or version does not match the requested type.
//! - Re-run the artifact's own invariant checks after decoding; a decoded
//!   but invalid artifact is an error, never silently accepted.
//!
//! Conventions
//! -----------
//! - Encoding is `serde_json` with the `float_roundtrip` feature, so `f64`
//!   values survive a write/read cycle bit-for-bit.
use crate::maps::{
    errors::{MapError, MapResult},
    map::Map,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Something that can be persisted with [`write_artifact`].
pub trait Artifact: Serialize + DeserializeOwned {
    /// Stable tag identifying the artifact type on disk.
    const KIND: &'static str;

    /// Re-check invariants after deserialization.
    fn validate_artifact(&self) -> MapResult<()>;
}

/// On-disk wrapper around an artifact payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub kind: String,
    pub format_version: u32,
    pub payload: T,
}

/// Header-only view used to check kind/version before decoding the payload.
#[derive(Deserialize)]
struct EnvelopeHeader {
    kind: String,
    format_version: u32,
}

/// Write `artifact` to `path` as a JSON envelope, replacing any existing file.
pub fn write_artifact<A: Artifact, P: AsRef<Path>>(path: P, artifact: &A) -> MapResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let envelope =
        Envelope { kind: A::KIND.to_string(), format_version: FORMAT_VERSION, payload: artifact };
    serde_json::to_writer(&mut writer, &envelope)?;
    writer.flush()?;
    tracing::debug!(kind = A::KIND, path = %path.as_ref().display(), "artifact written");
    Ok(())
}

/// Read an artifact of type `A` from `path`.
///
/// # Errors
/// - [`MapError::Io`] / [`MapError::Serialization`] for unreadable or
///   malformed files.
/// - [`MapError::KindMismatch`] when the file holds a different artifact.
/// - [`MapError::UnsupportedVersion`] for unknown format versions.
/// - Any invariant violation reported by [`Artifact::validate_artifact`].
pub fn read_artifact<A: Artifact, P: AsRef<Path>>(path: P) -> MapResult<A> {
    let value: serde_json::Value = {
        let file = File::open(path.as_ref())?;
        serde_json::from_reader(BufReader::new(file))?
    };
    let header: EnvelopeHeader = serde_json::from_value(value.clone())?;
    if header.kind != A::KIND {
        return Err(MapError::KindMismatch { expected: A::KIND.to_string(), found: header.kind });
    }
    if header.format_version != FORMAT_VERSION {
        return Err(MapError::UnsupportedVersion {
            found: header.format_version,
            supported: FORMAT_VERSION,
        });
    }
    let envelope: Envelope<A> = serde_json::from_value(value)?;
    envelope.payload.validate_artifact()?;
    Ok(envelope.payload)
}

impl Artifact for Map<f64> {
    const KIND: &'static str = "map_f64";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate()
    }
}

impl Artifact for Map<u64> {
    const KIND: &'static str = "map_u64";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate()
    }
}

impl Artifact for Map<bool> {
    const KIND: &'static str = "map_bool";

    fn validate_artifact(&self) -> MapResult<()> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::geometry::{EnergyAxis, Geometry, SpatialGrid};
    use ndarray::Array3;

    fn geom() -> Geometry {
        let grid = SpatialGrid::new((12.5, -3.25), 0.037, 5, 3).unwrap();
        Geometry::new(grid, EnergyAxis::logspace(0.3, 30.0, 2).unwrap())
    }

    #[test]
    // Purpose
    // -------
    // Real-valued maps with awkward floats must round-trip exactly.
    fn real_map_round_trips_bit_for_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exposure.json");
        let data = Array3::from_shape_fn(geom().shape(), |(e, y, x)| {
            (e as f64 + 1.0) * std::f64::consts::PI.powi(y as i32) / (x as f64 + 3.0) * 1e-13
        });
        let map = Map::new(geom(), data).unwrap();

        write_artifact(&path, &map).unwrap();
        let back: Map<f64> = read_artifact(&path).unwrap();

        assert_eq!(back, map);
    }

    #[test]
    // Purpose
    // -------
    // Reading a file as the wrong artifact type must fail with KindMismatch.
    fn reading_wrong_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        write_artifact(&path, &Map::<u64>::filled(geom(), 7)).unwrap();

        let err = read_artifact::<Map<f64>, _>(&path).unwrap_err();
        match err {
            MapError::KindMismatch { expected, found } => {
                assert_eq!(expected, "map_f64");
                assert_eq!(found, "map_u64");
            }
            other => panic!("Expected KindMismatch, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A payload whose data shape disagrees with its geometry decodes fine as
    // JSON but must be rejected by post-read validation.
    fn tampered_payload_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let good = Map::<u64>::filled(geom(), 1);
        let mut value = serde_json::to_value(Envelope {
            kind: "map_u64".to_string(),
            format_version: FORMAT_VERSION,
            payload: &good,
        })
        .unwrap();
        value["payload"]["geom"]["grid"]["nx"] = serde_json::json!(4);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let err = read_artifact::<Map<u64>, _>(&path).unwrap_err();
        assert!(matches!(err, MapError::ShapeMismatch { .. }), "got {err:?}");
    }
}
