//! Atlas-to-target alignment.
//!
//! Both strategies produce a [`LabelVolume`] on the target's 3-D grid without
//! interpolating between labels. [`AlignmentStrategy`] picks one; each is an
//! [`AtlasAligner`].

use crate::error::{Result, RoiError};
use crate::labels::LabelVolume;
use crate::runner::{RegistrationBackend, TransformJob};
use crate::scratch::TempArtifact;
use crate::volume::{affines_match, reference_volume, Volume};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the atlas is brought onto the target grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignmentStrategy {
    /// Apply a supplied spatial transform with the registration tool.
    Transform(PathBuf),
    /// Nearest-neighbor resampling through the two affines.
    Resample,
}

impl AlignmentStrategy {
    pub fn from_transform(transform: Option<&Path>) -> Self {
        match transform {
            Some(path) => Self::Transform(path.to_path_buf()),
            None => Self::Resample,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Transform(_) => StrategyKind::Transform,
            Self::Resample => StrategyKind::Resample,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Transform,
    Resample,
}

/// The original atlas, both on disk and decoded.
#[derive(Debug, Clone, Copy)]
pub struct AtlasSource<'a> {
    pub path: &'a Path,
    pub atlas: &'a LabelVolume,
}

/// The volume the atlas must match, with the file it was loaded from.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentTarget<'a> {
    pub path: &'a Path,
    pub volume: &'a Volume,
}

pub trait AtlasAligner {
    fn align(&self, source: AtlasSource<'_>, target: AlignmentTarget<'_>) -> Result<LabelVolume>;
}

/// Nearest-neighbor resampling, fully in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleAligner;

impl AtlasAligner for ResampleAligner {
    fn align(&self, source: AtlasSource<'_>, target: AlignmentTarget<'_>) -> Result<LabelVolume> {
        log::info!("No transform provided; resampling atlas with nearest-neighbor interpolation");
        let reference = reference_volume(target.volume);
        resample_nearest(source.atlas, &reference)
    }
}

/// Applies a transform through a [`RegistrationBackend`].
///
/// Temporary inputs and outputs live in `scratch_dir` and are removed before
/// `align` returns, on success or failure.
pub struct TransformAligner<'a> {
    pub backend: &'a dyn RegistrationBackend,
    pub transform: &'a Path,
    pub scratch_dir: &'a Path,
}

impl AtlasAligner for TransformAligner<'_> {
    fn align(&self, source: AtlasSource<'_>, target: AlignmentTarget<'_>) -> Result<LabelVolume> {
        if !self.transform.exists() {
            return Err(RoiError::FileNotFound(self.transform.display().to_string()));
        }

        log::info!(
            "Applying transform {} with {} ({} interpolation)",
            self.transform.display(),
            self.backend.name(),
            crate::runner::LABEL_INTERPOLATION
        );

        let reference = ReferenceImage::resolve(target, self.scratch_dir)?;
        let output = TempArtifact::new(self.scratch_dir, "aligned_atlas", ".nii");

        let job = TransformJob {
            input: source.path,
            reference: reference.path(),
            transform: self.transform,
            output: output.path(),
        };
        let tool_output = self.backend.apply_transform(&job)?;
        if !tool_output.stdout.is_empty() {
            log::debug!("{} stdout: {}", self.backend.name(), tool_output.stdout);
        }

        let aligned = LabelVolume::load(output.path())?;
        let expected = reference.volume();
        if aligned.shape() != expected.spatial_shape()
            || !affines_match(aligned.affine(), &expected.affine)
        {
            return Err(RoiError::GeometryMismatch(format!(
                "{} produced shape {:?}, reference grid is {:?}",
                self.backend.name(),
                aligned.shape(),
                expected.spatial_shape()
            )));
        }

        Ok(aligned)
    }
}

/// The 3-D reference image handed to the registration tool.
///
/// A 3-D target is used from its own file; a 4-D target has its first volume
/// written to a temporary file that is removed on drop.
pub struct ReferenceImage<'a> {
    volume: std::borrow::Cow<'a, Volume>,
    file: ReferenceFile<'a>,
}

enum ReferenceFile<'a> {
    Target(&'a Path),
    Temporary(TempArtifact),
}

impl<'a> ReferenceImage<'a> {
    pub fn resolve(target: AlignmentTarget<'a>, scratch_dir: &Path) -> Result<Self> {
        let volume = reference_volume(target.volume);
        let file = if target.volume.is_time_series() {
            let artifact = TempArtifact::new(scratch_dir, "ref_vol", ".nii");
            volume.save(artifact.path())?;
            log::debug!("Wrote temporary reference volume: {}", artifact.path().display());
            ReferenceFile::Temporary(artifact)
        } else {
            ReferenceFile::Target(target.path)
        };
        Ok(Self { volume, file })
    }

    pub fn path(&self) -> &Path {
        match &self.file {
            ReferenceFile::Target(path) => path,
            ReferenceFile::Temporary(artifact) => artifact.path(),
        }
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.file, ReferenceFile::Temporary(_))
    }
}

/// Resample `atlas` onto the grid of a 3-D `reference` by nearest neighbor.
///
/// Reference voxels that map outside the atlas field of view become background.
pub fn resample_nearest(atlas: &LabelVolume, reference: &Volume) -> Result<LabelVolume> {
    let atlas_inverse = atlas.affine().try_inverse().ok_or_else(|| {
        RoiError::InvalidVolume("Atlas affine is not invertible".to_string())
    })?;
    let reference_to_atlas = atlas_inverse * reference.affine;

    let [ax, ay, az] = atlas.shape();
    let source = atlas.labels();

    let [nx, ny, nz] = reference.spatial_shape();
    let resampled = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
        let p = reference_to_atlas * nalgebra::Vector4::new(i as f64, j as f64, k as f64, 1.0);
        match (to_index(p.x, ax), to_index(p.y, ay), to_index(p.z, az)) {
            (Some(x), Some(y), Some(z)) => source[[x, y, z]],
            _ => 0,
        }
    });

    log::debug!(
        "Resampled atlas {:?} onto reference grid {:?}",
        atlas.shape(),
        [nx, ny, nz]
    );

    Ok(LabelVolume::new(resampled, reference.affine))
}

fn to_index(coord: f64, extent: usize) -> Option<usize> {
    let rounded = coord.round();
    if rounded >= 0.0 && rounded < extent as f64 {
        Some(rounded as usize)
    } else {
        None
    }
}
