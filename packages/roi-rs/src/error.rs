use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoiError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read NIfTI volume: {0}")]
    Nifti(String),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Registration tool not found: {0}")]
    ToolNotFound(String),

    #[error("Atlas alignment failed with status {status}. stdout: {stdout} stderr: {stderr}")]
    AlignmentFailed {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    #[error("Region {0} is not part of the original atlas")]
    UnexpectedLabel(u32),

    #[error("Table error: {0}")]
    Table(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<csv::Error> for RoiError {
    fn from(err: csv::Error) -> Self {
        RoiError::Table(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoiError>;
