//! Pads and orders extracted signals to an atlas's canonical region set.
//!
//! Raw extraction drops regions with no contributing voxels. Reconciliation
//! restores every canonical region (missing ones as all-zero columns) and
//! orders columns by ascending label, so every table for one atlas has the
//! same width and layout.

use crate::error::{Result, RoiError};
use crate::labels::CanonicalRegions;
use crate::signals::RegionSignals;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub signals: RegionSignals,
    /// Canonical labels that had no extracted signal, ascending
    pub zero_filled: Vec<u32>,
}

pub fn reconcile(raw: RegionSignals, canonical: &CanonicalRegions) -> Result<Reconciliation> {
    let n_timepoints = raw.n_timepoints();

    let mut extracted: HashMap<u32, Vec<f64>> = HashMap::with_capacity(raw.n_regions());
    for (label, values) in raw.into_columns() {
        if !canonical.contains(label) {
            return Err(RoiError::UnexpectedLabel(label));
        }
        extracted.insert(label, values);
    }

    if extracted.len() < canonical.len() {
        log::warn!(
            "Extracted {} regions, but atlas has {}; padding missing regions with zeros",
            extracted.len(),
            canonical.len()
        );
    }

    let mut signals = RegionSignals::new(n_timepoints);
    let mut zero_filled = Vec::new();
    for &label in canonical.labels() {
        let values = match extracted.remove(&label) {
            Some(values) => values,
            None => {
                log::warn!("Region {} missing; filling with 0", label);
                zero_filled.push(label);
                vec![0.0; n_timepoints]
            }
        };
        signals.push_column(label, values)?;
    }

    Ok(Reconciliation {
        signals,
        zero_filled,
    })
}
