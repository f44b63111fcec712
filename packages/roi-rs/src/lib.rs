pub mod align;
pub mod concat;
pub mod error;
pub mod extract;
pub mod labels;
pub mod mask;
pub mod naming;
pub mod pipeline;
pub mod profiling;
pub mod reconcile;
pub mod runner;
pub mod scratch;
pub mod signals;
pub mod table;
pub mod types;
pub mod volume;

pub use align::{AlignmentStrategy, AtlasAligner, StrategyKind};
pub use error::{Result, RoiError};
pub use labels::{CanonicalRegions, LabelVolume};
pub use pipeline::{extract, Pipeline};
pub use runner::{AntsRunner, RegistrationBackend};
pub use signals::RegionSignals;
pub use types::*;
pub use volume::Volume;
