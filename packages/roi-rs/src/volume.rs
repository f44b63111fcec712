//! NIfTI volume I/O and voxel-grid geometry.
//!
//! Volumes are read through the `nifti` crate and kept as dynamic-dimension
//! ndarrays indexed `[x, y, z]` or `[x, y, z, t]`. The voxel-to-world affine is
//! taken from the sform when present, otherwise the qform, otherwise a plain
//! voxel-size scaling.

use crate::error::{Result, RoiError};
use nalgebra::{Matrix3, Matrix4, Vector3};
use ndarray::{Array3, ArrayD, ArrayView4, Axis, Ix4};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::borrow::Cow;
use std::path::Path;

/// Largest per-element difference tolerated when comparing two affines (mm).
pub const AFFINE_TOLERANCE: f64 = 1e-3;

/// A 3-D or 4-D image volume with its voxel-to-world affine.
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: ArrayD<f64>,
    pub affine: Matrix4<f64>,
}

impl Volume {
    /// Wrap an array and affine, rejecting anything that is not 3-D or 4-D.
    pub fn new(data: ArrayD<f64>, affine: Matrix4<f64>) -> Result<Self> {
        let data = squeeze_trailing(data);
        match data.ndim() {
            3 | 4 => Ok(Self { data, affine }),
            n => Err(RoiError::InvalidVolume(format!(
                "Expected a 3D or 4D volume, got {}D",
                n
            ))),
        }
    }

    pub fn from_array3(data: Array3<f64>, affine: Matrix4<f64>) -> Self {
        Self {
            data: data.into_dyn(),
            affine,
        }
    }

    pub fn from_array4(data: ndarray::Array4<f64>, affine: Matrix4<f64>) -> Self {
        Self {
            data: data.into_dyn(),
            affine,
        }
    }

    /// Load a `.nii` or `.nii.gz` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RoiError::FileNotFound(path.display().to_string()));
        }

        let obj = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| RoiError::Nifti(format!("{}: {}", path.display(), e)))?;

        let affine = header_affine(obj.header());
        let data = obj
            .into_volume()
            .into_ndarray::<f64>()
            .map_err(|e| {
                RoiError::Nifti(format!(
                    "{}: failed to convert to ndarray: {}",
                    path.display(),
                    e
                ))
            })?;

        let volume = Self::new(data, affine).map_err(|e| match e {
            RoiError::InvalidVolume(msg) => {
                RoiError::InvalidVolume(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        log::debug!(
            "Loaded volume {}: shape {:?}, voxel size {:?}",
            path.display(),
            volume.shape(),
            volume.voxel_size()
        );

        Ok(volume)
    }

    /// Write the volume as NIfTI-1 float32, gzip-compressed when the path ends in `.gz`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let header = sform_header(self);
        let data = self.data.mapv(|v| v as f32);

        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&data)
            .map_err(|e| RoiError::Nifti(format!("{}: failed to write: {}", path.display(), e)))?;

        log::debug!("Wrote volume {}: shape {:?}", path.display(), self.shape());
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn spatial_shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    pub fn is_time_series(&self) -> bool {
        self.data.ndim() == 4
    }

    /// Number of time points; a 3-D volume counts as one.
    pub fn n_timepoints(&self) -> usize {
        if self.is_time_series() {
            self.data.shape()[3]
        } else {
            1
        }
    }

    /// Voxel spacing derived from the affine's column norms.
    pub fn voxel_size(&self) -> [f64; 3] {
        voxel_size(&self.affine)
    }

    /// View the data as `[x, y, z, t]`, inserting a unit time axis for 3-D volumes.
    pub fn as_time_series(&self) -> Result<ArrayView4<'_, f64>> {
        let view = if self.is_time_series() {
            self.data.view()
        } else {
            self.data.view().insert_axis(Axis(3))
        };
        view.into_dimensionality::<Ix4>()
            .map_err(|e| RoiError::InvalidVolume(format!("Not a time series: {}", e)))
    }

    /// Whether two volumes share spatial shape and affine.
    pub fn same_grid(&self, other: &Volume) -> bool {
        self.spatial_shape() == other.spatial_shape()
            && affines_match(&self.affine, &other.affine)
    }
}

/// Reduce a target volume to the 3-D geometry used for alignment.
///
/// A 4-D volume yields its first time point; a 3-D volume is returned as-is.
pub fn reference_volume(volume: &Volume) -> Cow<'_, Volume> {
    if volume.is_time_series() {
        log::debug!("Target is 4D; using first volume as alignment reference");
        let first = volume.data.index_axis(Axis(3), 0).to_owned();
        Cow::Owned(Volume {
            data: first,
            affine: volume.affine,
        })
    } else {
        Cow::Borrowed(volume)
    }
}

pub fn affines_match(a: &Matrix4<f64>, b: &Matrix4<f64>) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| (x - y).abs() <= AFFINE_TOLERANCE)
}

pub fn voxel_size(affine: &Matrix4<f64>) -> [f64; 3] {
    let linear = affine.fixed_view::<3, 3>(0, 0);
    [
        linear.column(0).norm(),
        linear.column(1).norm(),
        linear.column(2).norm(),
    ]
}

/// Build an affine with the given voxel sizes and origin and no rotation.
pub fn scaled_affine(voxel_size: [f64; 3], origin: [f64; 3]) -> Matrix4<f64> {
    Matrix4::new(
        voxel_size[0], 0.0, 0.0, origin[0],
        0.0, voxel_size[1], 0.0, origin[1],
        0.0, 0.0, voxel_size[2], origin[2],
        0.0, 0.0, 0.0, 1.0,
    )
}

// NIfTI pads unused dimensions with 1; keep at most x, y, z, t.
fn squeeze_trailing(mut data: ArrayD<f64>) -> ArrayD<f64> {
    while data.ndim() > 4 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }
    data
}

fn header_affine(header: &NiftiHeader) -> Matrix4<f64> {
    if header.sform_code > 0 {
        let x = &header.srow_x;
        let y = &header.srow_y;
        let z = &header.srow_z;
        Matrix4::new(
            x[0] as f64, x[1] as f64, x[2] as f64, x[3] as f64,
            y[0] as f64, y[1] as f64, y[2] as f64, y[3] as f64,
            z[0] as f64, z[1] as f64, z[2] as f64, z[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        )
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        let p = &header.pixdim;
        scaled_affine([p[1] as f64, p[2] as f64, p[3] as f64], [0.0; 3])
    }
}

fn qform_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let rotation = Matrix3::new(
        a * a + b * b - c * c - d * d,
        2.0 * (b * c - a * d),
        2.0 * (b * d + a * c),
        2.0 * (b * c + a * d),
        a * a + c * c - b * b - d * d,
        2.0 * (c * d - a * b),
        2.0 * (b * d - a * c),
        2.0 * (c * d + a * b),
        a * a + d * d - c * c - b * b,
    );

    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let scale = Matrix3::from_diagonal(&Vector3::new(
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64 * qfac,
    ));

    let mut affine = Matrix4::identity();
    affine
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&(rotation * scale));
    affine[(0, 3)] = header.quatern_x as f64;
    affine[(1, 3)] = header.quatern_y as f64;
    affine[(2, 3)] = header.quatern_z as f64;
    affine
}

/// Header carrying the volume's affine as an sform; the writer fills in dimensions and datatype.
fn sform_header(volume: &Volume) -> NiftiHeader {
    let [vx, vy, vz] = volume.voxel_size();
    let row = |r: usize| {
        [
            volume.affine[(r, 0)] as f32,
            volume.affine[(r, 1)] as f32,
            volume.affine[(r, 2)] as f32,
            volume.affine[(r, 3)] as f32,
        ]
    };

    NiftiHeader {
        pixdim: [1.0, vx as f32, vy as f32, vz as f32, 1.0, 1.0, 1.0, 1.0],
        scl_slope: 1.0,
        scl_inter: 0.0,
        qform_code: 0,
        sform_code: 1,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        ..NiftiHeader::default()
    }
}
