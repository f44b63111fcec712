//! Raw per-region mean signal extraction.
//!
//! Only regions with at least one contributing voxel appear in the result;
//! [`crate::reconcile`] restores the rest.

use crate::error::{Result, RoiError};
use crate::labels::LabelVolume;
use crate::mask::BrainMask;
use crate::signals::RegionSignals;
use crate::volume::{affines_match, Volume};
use std::collections::HashMap;

/// Mean signal per time point for every labeled region of `atlas`.
///
/// `atlas` and `mask` must share the functional volume's grid. A 3-D
/// functional volume is treated as a single time point.
pub fn extract_region_signals(
    atlas: &LabelVolume,
    functional: &Volume,
    mask: Option<&BrainMask>,
) -> Result<RegionSignals> {
    check_grid("Atlas", atlas.shape(), atlas.affine(), functional)?;
    if let Some(mask) = mask {
        check_grid("Mask", mask.shape(), mask.affine(), functional)?;
    }

    let series = functional.as_time_series()?;
    let n_timepoints = series.shape()[3];

    let mut order: Vec<u32> = Vec::new();
    let mut members: HashMap<u32, Vec<[usize; 3]>> = HashMap::new();

    for ((x, y, z), &label) in atlas.labels().indexed_iter() {
        if label == 0 {
            continue;
        }
        if let Some(mask) = mask {
            if !mask.voxels()[[x, y, z]] {
                continue;
            }
        }
        members
            .entry(label)
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push([x, y, z]);
    }

    let mut signals = RegionSignals::new(n_timepoints);
    for label in order {
        let voxels = &members[&label];
        let count = voxels.len() as f64;
        let means = (0..n_timepoints)
            .map(|t| {
                voxels
                    .iter()
                    .map(|&[x, y, z]| series[[x, y, z, t]])
                    .sum::<f64>()
                    / count
            })
            .collect();
        signals.push_column(label, means)?;
    }

    log::info!(
        "Extracted signals for {} regions over {} time points",
        signals.n_regions(),
        n_timepoints
    );

    Ok(signals)
}

fn check_grid(
    what: &str,
    shape: [usize; 3],
    affine: &nalgebra::Matrix4<f64>,
    functional: &Volume,
) -> Result<()> {
    if shape != functional.spatial_shape() {
        return Err(RoiError::GeometryMismatch(format!(
            "{} shape {:?} does not match functional shape {:?}",
            what,
            shape,
            functional.spatial_shape()
        )));
    }
    if !affines_match(affine, &functional.affine) {
        return Err(RoiError::GeometryMismatch(format!(
            "{} affine does not match functional affine",
            what
        )));
    }
    Ok(())
}
