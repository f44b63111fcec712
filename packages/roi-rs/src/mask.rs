use crate::error::{Result, RoiError};
use crate::volume::Volume;
use nalgebra::Matrix4;
use ndarray::{Array3, Axis, Ix3};
use std::path::Path;

/// Binary brain mask; a voxel is inside when its value is finite and non-zero.
#[derive(Debug, Clone)]
pub struct BrainMask {
    voxels: Array3<bool>,
    affine: Matrix4<f64>,
}

impl BrainMask {
    pub fn new(voxels: Array3<bool>, affine: Matrix4<f64>) -> Self {
        Self { voxels, affine }
    }

    pub fn from_volume(volume: &Volume) -> Result<Self> {
        let data = match volume.ndim() {
            3 => volume.data.view(),
            4 if volume.n_timepoints() == 1 => volume.data.index_axis(Axis(3), 0),
            _ => {
                return Err(RoiError::InvalidVolume(format!(
                    "Mask must be 3D, got shape {:?}",
                    volume.shape()
                )))
            }
        };
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|e| RoiError::InvalidVolume(format!("Mask is not 3D: {}", e)))?;

        Ok(Self {
            voxels: data.mapv(|v| v.is_finite() && v != 0.0),
            affine: volume.affine,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let volume = Volume::load(path.as_ref())?;
        Self::from_volume(&volume)
    }

    pub fn voxels(&self) -> &Array3<bool> {
        &self.voxels
    }

    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    pub fn shape(&self) -> [usize; 3] {
        let (x, y, z) = self.voxels.dim();
        [x, y, z]
    }

    pub fn count(&self) -> usize {
        self.voxels.iter().filter(|&&inside| inside).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_binarizes_values() {
        let data = Array3::from_shape_vec((4, 1, 1), vec![0.0, 1.0, f64::NAN, 0.3]).unwrap();
        let mask = BrainMask::from_volume(&Volume::from_array3(data, Matrix4::identity())).unwrap();
        assert_eq!(mask.count(), 2);
        assert!(!mask.voxels()[[2, 0, 0]]);
    }
}
