use crate::align::{
    AlignmentStrategy, AlignmentTarget, AtlasAligner, AtlasSource, ResampleAligner,
    TransformAligner,
};
use crate::error::{Result, RoiError};
use crate::extract::extract_region_signals;
use crate::labels::LabelVolume;
use crate::mask::BrainMask;
use crate::profile_scope;
use crate::reconcile::reconcile;
use crate::runner::{AntsRunner, RegistrationBackend, TOOL_NAME};
use crate::table;
use crate::types::{ExtractRequest, ExtractionReport};
use crate::volume::Volume;
use std::path::{Path, PathBuf};

/// Align → extract → reconcile → emit, for one input at a time.
///
/// A pipeline holds only configuration and can be shared between threads;
/// every call owns its aligned atlas and temporary files.
pub struct Pipeline {
    scratch_dir: PathBuf,
    backend: Option<Box<dyn RegistrationBackend>>,
    aligned_output: Option<PathBuf>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            backend: None,
            aligned_output: None,
        }
    }

    /// Directory for temporary reference volumes and tool outputs
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Registration tool used when a request carries a transform
    pub fn with_backend<B: RegistrationBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Also keep the aligned atlas at `path`
    pub fn with_aligned_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.aligned_output = Some(path.into());
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn backend(&self) -> Option<&dyn RegistrationBackend> {
        self.backend.as_deref()
    }

    pub fn run(&self, request: &ExtractRequest) -> Result<ExtractionReport> {
        check_inputs(request)?;

        let strategy = AlignmentStrategy::from_transform(request.transform_path.as_deref());
        let aligner = self.aligner(&strategy)?;

        log::info!("Loading 4D data: {}", request.input_path.display());
        let functional = Volume::load(&request.input_path)?;

        let atlas = LabelVolume::load(&request.atlas_path)?;
        let canonical = atlas.canonical_regions();
        if canonical.is_empty() {
            return Err(RoiError::InvalidVolume(format!(
                "Atlas {} contains no labeled regions",
                request.atlas_path.display()
            )));
        }
        log::info!("Total regions in original atlas: {}", canonical.len());

        let mask = match request.mask_path.as_deref() {
            Some(path) => {
                log::info!("Using mask: {}", path.display());
                Some(BrainMask::load(path)?)
            }
            None => None,
        };

        let aligned = {
            profile_scope!("align atlas");
            aligner.align(
                AtlasSource {
                    path: &request.atlas_path,
                    atlas: &atlas,
                },
                AlignmentTarget {
                    path: &request.input_path,
                    volume: &functional,
                },
            )?
        };

        if let Some(path) = &self.aligned_output {
            aligned.save(path)?;
            log::info!("Aligned atlas saved to: {}", path.display());
        }

        let raw = {
            profile_scope!("extract signals");
            extract_region_signals(&aligned, &functional, mask.as_ref())?
        };
        drop(aligned);

        let n_extracted = raw.n_regions();
        let reconciled = reconcile(raw, &canonical)?;

        {
            profile_scope!("write table");
            table::write_table(&request.output_path, &reconciled.signals)?;
        }
        log::info!("Saved time series to {}", request.output_path.display());

        Ok(ExtractionReport::new(
            request,
            strategy.kind(),
            reconciled.signals.n_timepoints(),
            canonical.len(),
            n_extracted,
            reconciled.zero_filled,
        ))
    }

    fn aligner<'a>(&'a self, strategy: &'a AlignmentStrategy) -> Result<Box<dyn AtlasAligner + 'a>> {
        match strategy {
            AlignmentStrategy::Resample => Ok(Box::new(ResampleAligner)),
            AlignmentStrategy::Transform(transform) => {
                let backend = self
                    .backend
                    .as_deref()
                    .ok_or_else(|| RoiError::ToolNotFound(TOOL_NAME.to_string()))?;
                Ok(Box::new(TransformAligner {
                    backend,
                    transform,
                    scratch_dir: &self.scratch_dir,
                }))
            }
        }
    }
}

fn check_inputs(request: &ExtractRequest) -> Result<()> {
    let required = [Some(&request.input_path), Some(&request.atlas_path)];
    let optional = [request.mask_path.as_ref(), request.transform_path.as_ref()];

    for path in required.into_iter().chain(optional).flatten() {
        if !path.exists() {
            return Err(RoiError::FileNotFound(path.display().to_string()));
        }
    }
    Ok(())
}

/// Extract a region time-series table with default settings.
///
/// Uses the system temp directory for scratch files and, when a transform is
/// given, the `antsApplyTransforms` found by [`crate::runner::find_tool`].
pub fn extract(
    input: &Path,
    atlas: &Path,
    output: &Path,
    mask: Option<&Path>,
    transform: Option<&Path>,
) -> Result<ExtractionReport> {
    let mut request = ExtractRequest::new(input, atlas, output);
    request.mask_path = mask.map(Path::to_path_buf);
    request.transform_path = transform.map(Path::to_path_buf);

    let mut pipeline = Pipeline::new();
    if transform.is_some() {
        pipeline = pipeline.with_backend(AntsRunner::discover()?);
    }
    pipeline.run(&request)
}
