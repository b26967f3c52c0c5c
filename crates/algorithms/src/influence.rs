//! Exponential distance decay
//!
//! Turns a distance field into an influence score `exp(-k * d)`: 1 on the
//! features themselves, falling toward 0 with distance.

use proxima_core::raster::Raster;
use proxima_core::{Algorithm, Error, Result};
use tracing::debug;

use crate::distance::DistanceField;

/// Parameters for exponential decay
#[derive(Debug, Clone)]
pub struct DecayParams {
    /// Decay constant per pixel; must be finite and positive
    pub decay: f64,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self { decay: 0.01 }
    }
}

/// Check that a decay constant can be used.
pub fn validate_decay(decay: f64) -> Result<()> {
    if !decay.is_finite() || decay <= 0.0 {
        return Err(Error::invalid_parameter(
            "decay",
            decay,
            "decay must be positive",
        ));
    }
    Ok(())
}

/// Compute the influence score of a distance field.
///
/// A field without features has no finite distance anywhere, so its
/// influence is 0 everywhere (the limit of the decay as distance grows).
/// Very large `k * d` underflows to 0.
pub fn exponential_decay(field: &DistanceField, decay: f64) -> Result<Raster<f64>> {
    validate_decay(decay)?;
    let (rows, cols) = field.shape();

    if !field.has_features() {
        debug!("No features in {}x{} field, influence is zero", cols, rows);
        return Ok(Raster::filled(rows, cols, 0.0));
    }

    let scores = field.raster().data().mapv(|d| (-decay * d).exp());
    field.raster().with_same_meta(scores)
}

/// Exponential decay as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct ExponentialDecay;

impl Algorithm for ExponentialDecay {
    type Input = DistanceField;
    type Output = Raster<f64>;
    type Params = DecayParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ExponentialDecay"
    }

    fn description(&self) -> &'static str {
        "Influence score exp(-k * d) from a distance field"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        exponential_decay(&input, params.decay)
    }
}
