use crate::align::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One input volume to turn into a region time-series table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub input_path: PathBuf,
    pub atlas_path: PathBuf,
    pub output_path: PathBuf,
    pub mask_path: Option<PathBuf>,
    pub transform_path: Option<PathBuf>,
}

impl ExtractRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        atlas_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            atlas_path: atlas_path.into(),
            output_path: output_path.into(),
            mask_path: None,
            transform_path: None,
        }
    }

    pub fn with_mask(mut self, mask_path: impl Into<PathBuf>) -> Self {
        self.mask_path = Some(mask_path.into());
        self
    }

    pub fn with_transform(mut self, transform_path: impl Into<PathBuf>) -> Self {
        self.transform_path = Some(transform_path.into());
        self
    }
}

/// Summary of a completed extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub input_path: PathBuf,
    pub atlas_path: PathBuf,
    pub output_path: PathBuf,
    pub mask_path: Option<PathBuf>,
    pub strategy: StrategyKind,
    pub n_timepoints: usize,
    /// Size of the atlas's canonical region set (the table width)
    pub n_regions: usize,
    /// Regions that produced signal before reconciliation
    pub n_extracted: usize,
    pub zero_filled: Vec<u32>,
    pub created_at: String,
}

impl ExtractionReport {
    pub fn new(
        request: &ExtractRequest,
        strategy: StrategyKind,
        n_timepoints: usize,
        n_regions: usize,
        n_extracted: usize,
        zero_filled: Vec<u32>,
    ) -> Self {
        Self {
            input_path: request.input_path.clone(),
            atlas_path: request.atlas_path.clone(),
            output_path: request.output_path.clone(),
            mask_path: request.mask_path.clone(),
            strategy,
            n_timepoints,
            n_regions,
            n_extracted,
            zero_filled,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.zero_filled.is_empty()
    }
}
