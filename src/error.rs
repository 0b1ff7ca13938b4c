use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = PredictorError> = std::result::Result<T, E>;

/// Errors produced by ingest, training, the model store and the prediction service
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Bad or out-of-range user input, naming the offending field
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Inverter id that was not part of the training data
    #[error("unknown inverter id '{0}': not seen during training")]
    UnknownCategory(String),

    #[error("model artifact not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("model artifact {} is unreadable: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// Malformed training data; `line` is the 1-based CSV line
    #[error("{}: line {line}, column {column}: {reason}", .path.display())]
    DataIngest {
        path: PathBuf,
        line: u64,
        column: String,
        reason: String,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("prediction failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PredictorError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Category name shown by the front-ends next to the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::UnknownCategory(_) => "UnknownCategoryError",
            Self::ArtifactNotFound(_) => "ArtifactNotFoundError",
            Self::ArtifactCorrupt { .. } => "ArtifactCorruptError",
            Self::DataIngest { .. } => "DataIngestError",
            Self::Training(_) => "TrainingError",
            Self::Inference(_) => "InferenceError",
            Self::Io(_) => "IoError",
        }
    }

    /// Name of the input field at fault, for validation failures
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            Self::UnknownCategory(_) => Some("inverter_id"),
            _ => None,
        }
    }
}
