//! Weighted overlay and min-max normalization
//!
//! Influence scores from several layers are combined into one composite by a
//! pointwise weighted sum, then rescaled to [0, 1].

use std::collections::BTreeMap;

use ndarray::{Array2, Zip};
use proxima_core::raster::Raster;
use proxima_core::{Error, Result};
use tracing::{debug, warn};

/// Ranges within this many ulps of the larger magnitude are treated as
/// constant; only summation rounding can produce them
const DEGENERATE_ULPS: f64 = 16.0;

/// A normalized composite score
#[derive(Debug, Clone)]
pub struct CompositeScore {
    /// Scores in [0, 1]
    pub raster: Raster<f64>,
    /// Minimum of the weighted sum before normalization
    pub raw_min: f64,
    /// Maximum of the weighted sum before normalization
    pub raw_max: f64,
    /// True when the weighted sum was constant and the all-zero fallback was used
    pub degenerate: bool,
}

/// Check that a layer weight can be used.
pub fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
        return Err(Error::invalid_parameter(
            "weight",
            weight,
            "weight must be between 0 and 1",
        ));
    }
    Ok(())
}

/// Running weighted sum of influence scores.
///
/// Each `add` folds `weight * score` into the sum, so the caller can drop
/// the score grid right after. The first grid added fixes the shape.
#[derive(Debug, Default)]
pub struct WeightedOverlay {
    sum: Option<Array2<f64>>,
    layers: usize,
}

impl WeightedOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers folded in so far
    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Shape fixed by the first layer, if any
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.sum.as_ref().map(|s| s.dim())
    }

    /// Fold one layer's score into the sum
    pub fn add(&mut self, score: &Raster<f64>, weight: f64) -> Result<()> {
        validate_weight(weight)?;

        match self.sum.as_mut() {
            None => {
                self.sum = Some(score.data().mapv(|v| weight * v));
            }
            Some(sum) => {
                if sum.dim() != score.shape() {
                    let (er, ec) = sum.dim();
                    return Err(Error::SizeMismatch {
                        er,
                        ec,
                        ar: score.rows(),
                        ac: score.cols(),
                    });
                }
                Zip::from(sum)
                    .and(score.data())
                    .for_each(|s, &v| *s += weight * v);
            }
        }
        self.layers += 1;
        Ok(())
    }

    /// The raw weighted sum, before normalization
    pub fn into_sum(self) -> Option<Raster<f64>> {
        self.sum.map(Raster::from_array)
    }

    /// Normalize the sum to [0, 1]
    pub fn finish(self) -> Result<CompositeScore> {
        let layers = self.layers;
        let sum = self
            .into_sum()
            .ok_or_else(|| Error::Other("no layers were added to the overlay".into()))?;
        debug!("Normalizing weighted sum of {} layer(s)", layers);
        Ok(normalize(sum))
    }
}

/// Combine named `(score, weight)` pairs and normalize the result.
///
/// Layers are folded in key order, so the result does not depend on the
/// order the caller selected them in.
pub fn aggregate<K: Ord>(layers: BTreeMap<K, (Raster<f64>, f64)>) -> Result<CompositeScore> {
    let mut overlay = WeightedOverlay::new();
    for (score, weight) in layers.into_values() {
        overlay.add(&score, weight)?;
    }
    overlay.finish()
}

/// Min-max normalize a grid to [0, 1].
///
/// When the grid is constant the range is undefined; the result is then
/// all-zero and `degenerate` is set.
pub fn normalize(sum: Raster<f64>) -> CompositeScore {
    let (raw_min, raw_max) = sum
        .data()
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = raw_max - raw_min;
    let scale = raw_min.abs().max(raw_max.abs());
    if !range.is_finite() || range <= DEGENERATE_ULPS * f64::EPSILON * scale {
        warn!(
            "Composite score is constant ({}), falling back to all-zero output",
            raw_min
        );
        let mut raster = sum;
        raster.data_mut().fill(0.0);
        raster.set_nodata(None);
        return CompositeScore {
            raster,
            raw_min,
            raw_max,
            degenerate: true,
        };
    }

    let mut raster = sum;
    raster.data_mut().mapv_inplace(|v| {
        if v.is_finite() {
            (v - raw_min) / range
        } else {
            0.0
        }
    });
    raster.set_nodata(None);

    CompositeScore {
        raster,
        raw_min,
        raw_max,
        degenerate: false,
    }
}
