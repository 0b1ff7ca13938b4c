//! Model artifact persistence
//!
//! Layout: 8-byte magic, little-endian `u32` format version, then one bincode
//! value holding the metadata, the encoder and the forest. The header is read
//! before the body so an incompatible file is reported as such instead of as
//! a bincode decode error.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::features::FEATURE_NAMES;
use super::{CategoryEncoder, ModelMetadata, PowerForest, TrainedModel};
use crate::error::{PredictorError, Result};

pub const MAGIC: [u8; 8] = *b"SOLARRF\0";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    metadata: &'a ModelMetadata,
    encoder: &'a CategoryEncoder,
    forest: &'a PowerForest,
}

#[derive(Deserialize)]
struct Artifact {
    metadata: ModelMetadata,
    encoder: CategoryEncoder,
    forest: PowerForest,
}

pub struct ModelStore;

impl ModelStore {
    /// Write the model and its encoder to `path`.
    ///
    /// The bytes go to a sibling `.tmp` file first and are renamed over
    /// `path` once flushed.
    pub fn save(model: &TrainedModel, encoder: &CategoryEncoder, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        let written = Self::write_to(&tmp, model, encoder);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        info!(
            path = %path.display(),
            model_id = %model.metadata.model_id,
            inverters = encoder.len(),
            "model artifact saved"
        );
        Ok(())
    }

    fn write_to(tmp: &Path, model: &TrainedModel, encoder: &CategoryEncoder) -> Result<()> {
        let mut writer = BufWriter::new(File::create(tmp)?);
        writer.write_all(&MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;

        let body = ArtifactRef {
            metadata: &model.metadata,
            encoder,
            forest: &model.forest,
        };
        bincode::serialize_into(&mut writer, &body)
            .map_err(|e| PredictorError::corrupt(tmp, format!("failed to encode model: {}", e)))?;

        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Read an artifact written by [`ModelStore::save`]
    pub fn load(path: &Path) -> Result<(TrainedModel, CategoryEncoder)> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PredictorError::ArtifactNotFound(path.to_path_buf()),
            _ => PredictorError::Io(e),
        })?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        read_header(&mut reader, &mut magic, path)?;
        if magic != MAGIC {
            return Err(PredictorError::corrupt(path, "not a model artifact (bad magic)"));
        }

        let mut version = [0u8; 4];
        read_header(&mut reader, &mut version, path)?;
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(PredictorError::corrupt(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    version, FORMAT_VERSION
                ),
            ));
        }

        // decoding from a slice bounds every length prefix by the bytes present
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        let artifact: Artifact = bincode::deserialize(&body)
            .map_err(|e| PredictorError::corrupt(path, format!("failed to decode model: {}", e)))?;

        if artifact.metadata.feature_names != FEATURE_NAMES {
            return Err(PredictorError::corrupt(
                path,
                format!(
                    "feature schema mismatch: artifact has {:?}",
                    artifact.metadata.feature_names
                ),
            ));
        }
        if artifact.encoder.is_empty() || !artifact.encoder.is_well_formed() {
            return Err(PredictorError::corrupt(path, "inverter encoder is malformed"));
        }
        if artifact.forest.member_count() == 0 {
            return Err(PredictorError::corrupt(path, "forest has no members"));
        }

        debug!(
            path = %path.display(),
            model_id = %artifact.metadata.model_id,
            written_by = %artifact.metadata.version,
            "model artifact loaded"
        );

        Ok((
            TrainedModel {
                metadata: artifact.metadata,
                forest: artifact.forest,
            },
            artifact.encoder,
        ))
    }
}

fn read_header(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PredictorError::corrupt(path, "file is truncated"),
        _ => PredictorError::Io(e),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::feature_names;
    use crate::ml::{ForestParams, ModelType, ValidationMetrics};

    fn tiny_model() -> (TrainedModel, CategoryEncoder) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![20.0, 30.0, (i % 10) as f64 / 10.0, 12.0, 100.0, 1.0, (i % 2) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| r[2] * 1000.0).collect();
        let params = ForestParams {
            n_trees: 4,
            max_depth: Some(5),
            min_samples_split: 2,
            ..ForestParams::default()
        };
        let forest = PowerForest::fit(&x, &y, &params, 3).unwrap();
        let metadata = ModelMetadata {
            model_id: "random_forest_test".to_string(),
            model_type: ModelType::RandomForest,
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: 40,
            test_samples: 0,
            validation_metrics: ValidationMetrics::new(0.0, 0.0, 0.0, 1.0),
            feature_names: feature_names(),
            seed: 3,
            reproducible: true,
            params,
            max_observed_power_kw: 900.0,
        };
        (
            TrainedModel { metadata, forest },
            CategoryEncoder::fit(["inv_a", "inv_b"]),
        )
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        let (model, encoder) = tiny_model();

        ModelStore::save(&model, &encoder, &path).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let (loaded, loaded_encoder) = ModelStore::load(&path).unwrap();
        assert_eq!(loaded.metadata, model.metadata);
        assert_eq!(loaded_encoder, encoder);

        let batch = vec![
            vec![20.0, 30.0, 0.0, 12.0, 100.0, 1.0, 0.0],
            vec![25.0, 40.0, 0.55, 13.0, 180.0, 2.0, 1.0],
        ];
        assert_eq!(
            loaded.forest.predict(&batch).unwrap(),
            model.forest.predict(&batch).unwrap()
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelStore::load(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"PICKLE\x80\x04 and then some").unwrap();

        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { ref reason, .. } if reason.contains("magic")));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&99u32.to_le_bytes());
        fs::write(&path, bytes).unwrap();

        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { ref reason, .. } if reason.contains("version 99")));
    }

    #[test]
    fn test_truncated_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let (model, encoder) = tiny_model();
        ModelStore::save(&model, &encoder, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { .. }));

        fs::write(&path, &bytes[..5]).unwrap();
        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { ref reason, .. } if reason.contains("truncated")));
    }

    #[test]
    fn test_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let (mut model, encoder) = tiny_model();
        model.metadata.feature_names.swap(0, 1);
        ModelStore::save(&model, &encoder, &path).unwrap();

        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { ref reason, .. } if reason.contains("schema")));
    }

    #[test]
    fn test_oversized_length_prefix_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        // length of the model id string
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(b"random_forest");
        fs::write(&path, bytes).unwrap();

        let err = ModelStore::load(&path).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactCorrupt { ref reason, .. } if reason.contains("decode")));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let path = dir.path().join("model.bin");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();
        let (model, encoder) = tiny_model();

        assert!(ModelStore::save(&model, &encoder, &path).is_err());
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }
}
