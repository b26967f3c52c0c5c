//! # Proxima Algorithms
//!
//! Raster operators behind proximity analysis.
//!
//! - **distance**: feature masks and the exact Euclidean distance transform
//! - **influence**: exponential distance decay
//! - **overlay**: weighted aggregation and min-max normalization

pub mod distance;
pub mod influence;
pub(crate) mod maybe_rayon;
pub mod overlay;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::distance::{euclidean_distance, feature_mask, DistanceField, EuclideanDistance};
    pub use crate::influence::{exponential_decay, DecayParams, ExponentialDecay};
    pub use crate::overlay::{aggregate, normalize, validate_weight, CompositeScore, WeightedOverlay};
    pub use proxima_core::prelude::*;
}
