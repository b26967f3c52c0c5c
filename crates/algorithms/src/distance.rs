//! Exact Euclidean distance transform
//!
//! Computes, for every cell, the straight-line distance in pixel units to the
//! nearest feature cell. Uses the separable lower-envelope-of-parabolas
//! method of Felzenszwalb & Huttenlocher (2012): a 1-D squared-distance pass
//! down every column, a second pass along every row, then a square root.
//! All intermediate values are integer sums of squares, so the result is
//! exact and transposing the mask transposes the field.

use ndarray::{Array2, ArrayView2};
use proxima_core::raster::{Raster, RasterElement};
use proxima_core::{Algorithm, Error, Result};
use tracing::debug;

use crate::maybe_rayon::*;

/// Distance to the nearest feature for every cell of a grid.
#[derive(Debug, Clone)]
pub struct DistanceField {
    raster: Raster<f64>,
    feature_count: usize,
}

impl DistanceField {
    /// Distances in pixel units. Cells are NaN when the mask had no features.
    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    pub fn into_raster(self) -> Raster<f64> {
        self.raster
    }

    /// Number of feature cells in the mask the field was computed from
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// False when the mask was all-false and no finite distance exists
    pub fn has_features(&self) -> bool {
        self.feature_count > 0
    }

    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }
}

/// Build a feature mask from one band.
///
/// A cell is a feature when its value is finite, non-zero, and not the
/// band's nodata value.
pub fn feature_mask(band: &Raster<f64>) -> Array2<bool> {
    let nodata = band.nodata();
    band.data()
        .mapv(|v| v.is_finite() && v != 0.0 && !v.is_nodata(nodata))
}

/// Compute the exact Euclidean distance from every cell to the nearest
/// `true` cell of `mask`.
///
/// Feature cells get 0. If the mask has no `true` cell the field is
/// returned with every cell NaN and `feature_count() == 0`.
pub fn euclidean_distance(mask: ArrayView2<'_, bool>) -> Result<DistanceField> {
    let (rows, cols) = mask.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let feature_count = mask.iter().filter(|&&m| m).count();
    if feature_count == 0 {
        debug!("Distance transform on a {}x{} mask with no features", cols, rows);
        let mut raster = Raster::filled(rows, cols, f64::NAN);
        raster.set_nodata(Some(f64::NAN));
        return Ok(DistanceField {
            raster,
            feature_count,
        });
    }

    // Column pass: squared vertical distance to the nearest feature
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = mask
                .column(col)
                .iter()
                .map(|&m| if m { 0.0 } else { f64::INFINITY })
                .collect();
            let mut out = vec![0.0; rows];
            lower_envelope(&f, &mut out);
            out
        })
        .collect();

    // Row pass over the column results, then square root
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let f: Vec<f64> = columns.iter().map(|column| column[row]).collect();
            let mut out = vec![0.0; cols];
            lower_envelope(&f, &mut out);
            out.iter_mut().for_each(|d| *d = d.sqrt());
            out
        })
        .collect();

    let raster = Raster::from_vec(data, rows, cols)?;
    debug!(
        "Distance transform on {}x{} grid, {} feature cell(s)",
        cols, rows, feature_count
    );

    Ok(DistanceField {
        raster,
        feature_count,
    })
}

/// 1-D squared distance transform of a sampled function.
///
/// `out[q] = min_p ((q - p)^2 + f[p])` over every finite `f[p]`. Sites with
/// an infinite value are not part of the envelope; if none is finite, every
/// output is infinite.
fn lower_envelope(f: &[f64], out: &mut [f64]) {
    let n = f.len();
    // Parabola vertices, and the left boundary of each parabola's region
    let mut v: Vec<usize> = Vec::with_capacity(n);
    let mut z: Vec<f64> = Vec::with_capacity(n);

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        let fq = f[q] + (q * q) as f64;
        while let Some(&p) = v.last() {
            let s = (fq - (f[p] + (p * p) as f64)) / (2.0 * (q - p) as f64);
            // z is non-empty whenever v is
            if z.last().is_some_and(|&zl| s <= zl) {
                v.pop();
                z.pop();
            } else {
                z.push(s);
                break;
            }
        }
        if v.is_empty() {
            z.clear();
            z.push(f64::NEG_INFINITY);
        }
        v.push(q);
    }

    if v.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, slot) in out.iter_mut().enumerate() {
        while k + 1 < v.len() && z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f64 - p as f64;
        *slot = dq * dq + f[p];
    }
}

/// Exact Euclidean distance transform as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct EuclideanDistance;

impl Algorithm for EuclideanDistance {
    type Input = Array2<bool>;
    type Output = DistanceField;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "EuclideanDistance"
    }

    fn description(&self) -> &'static str {
        "Exact distance in pixels from every cell to the nearest feature cell"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        euclidean_distance(input.view())
    }
}
