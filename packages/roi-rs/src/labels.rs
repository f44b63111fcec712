//! Atlas label volumes and their canonical region sets.

use crate::error::{Result, RoiError};
use crate::volume::Volume;
use nalgebra::Matrix4;
use ndarray::{Array3, Axis, Ix3};
use std::collections::BTreeSet;
use std::path::Path;

/// Decode a stored voxel value into a region label.
///
/// Labels are the nearest integer to the stored value; zero, negative and
/// non-finite values are background (`0`).
pub fn decode_label(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let rounded = value.round();
    if rounded < 1.0 {
        0
    } else {
        rounded as u32
    }
}

/// A 3-D integer label image on a specific voxel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    labels: Array3<u32>,
    affine: Matrix4<f64>,
}

impl LabelVolume {
    pub fn new(labels: Array3<u32>, affine: Matrix4<f64>) -> Self {
        Self { labels, affine }
    }

    /// Decode a loaded volume. A 4-D image is accepted only with a single volume.
    pub fn from_volume(volume: &Volume) -> Result<Self> {
        let data = if volume.is_time_series() {
            if volume.n_timepoints() != 1 {
                return Err(RoiError::InvalidVolume(format!(
                    "Atlas must be 3D, got shape {:?}",
                    volume.shape()
                )));
            }
            volume.data.index_axis(Axis(3), 0)
        } else {
            volume.data.view()
        };

        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|e| RoiError::InvalidVolume(format!("Atlas is not 3D: {}", e)))?;

        Ok(Self {
            labels: data.mapv(decode_label),
            affine: volume.affine,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let volume = Volume::load(path.as_ref())?;
        Self::from_volume(&volume)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_volume().save(path)
    }

    pub fn to_volume(&self) -> Volume {
        Volume::from_array3(self.labels.mapv(|label| label as f64), self.affine)
    }

    pub fn labels(&self) -> &Array3<u32> {
        &self.labels
    }

    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    pub fn shape(&self) -> [usize; 3] {
        let (x, y, z) = self.labels.dim();
        [x, y, z]
    }

    /// Distinct positive labels present in this volume, ascending.
    pub fn canonical_regions(&self) -> CanonicalRegions {
        let set: BTreeSet<u32> = self.labels.iter().copied().filter(|&l| l > 0).collect();
        CanonicalRegions(set.into_iter().collect())
    }
}

/// The fixed, ascending list of region labels of an original (unaligned) atlas.
///
/// Every table produced against one atlas has exactly these columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRegions(Vec<u32>);

impl CanonicalRegions {
    pub fn from_labels<I: IntoIterator<Item = u32>>(labels: I) -> Self {
        let set: BTreeSet<u32> = labels.into_iter().filter(|&l| l > 0).collect();
        Self(set.into_iter().collect())
    }

    pub fn labels(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, label: u32) -> bool {
        self.0.binary_search(&label).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::scaled_affine;
    use ndarray::Array4;

    #[test]
    fn test_decode_label() {
        assert_eq!(decode_label(0.0), 0);
        assert_eq!(decode_label(3.0), 3);
        assert_eq!(decode_label(2.9999), 3);
        assert_eq!(decode_label(-4.0), 0);
        assert_eq!(decode_label(f64::NAN), 0);
        assert_eq!(decode_label(0.4), 0);
    }

    #[test]
    fn test_canonical_regions_sorted_without_background() {
        let mut labels = Array3::<u32>::zeros((3, 1, 1));
        labels[[0, 0, 0]] = 7;
        labels[[1, 0, 0]] = 2;
        labels[[2, 0, 0]] = 7;
        let atlas = LabelVolume::new(labels, Matrix4::identity());

        let regions = atlas.canonical_regions();
        assert_eq!(regions.labels(), &[2, 7]);
        assert!(regions.contains(7));
        assert!(!regions.contains(0));
    }

    #[test]
    fn test_from_volume_rejects_multi_volume_atlas() {
        let volume = Volume::from_array4(Array4::zeros((2, 2, 2, 3)), Matrix4::identity());
        assert!(LabelVolume::from_volume(&volume).is_err());
    }

    #[test]
    fn test_from_volume_accepts_single_volume_4d() {
        let volume = Volume::from_array4(Array4::from_elem((2, 2, 2, 1), 5.0), Matrix4::identity());
        let atlas = LabelVolume::from_volume(&volume).unwrap();
        assert_eq!(atlas.shape(), [2, 2, 2]);
        assert_eq!(atlas.canonical_regions().labels(), &[5]);
    }

    #[test]
    fn test_save_load_preserves_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let labels = Array3::from_shape_fn((4, 3, 2), |(x, y, _)| ((x + y) % 4) as u32);
        let atlas = LabelVolume::new(labels, scaled_affine([1.0; 3], [0.0; 3]));

        let path = tmp.path().join("atlas.nii.gz");
        atlas.save(&path).unwrap();
        let loaded = LabelVolume::load(&path).unwrap();

        assert_eq!(loaded.labels(), atlas.labels());
        assert_eq!(loaded.canonical_regions().labels(), &[1, 2, 3]);
    }
}
