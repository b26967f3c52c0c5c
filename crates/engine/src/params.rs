//! Per-layer user parameters and layer selections.

use std::fmt;
use std::str::FromStr;

use proxima_algorithms::influence::validate_decay;
use proxima_algorithms::overlay::validate_weight;

use crate::error::{PipelineError, Result};

/// Parameters a user sets for one selected layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParameters {
    /// Decay constant `k` of `exp(-k * d)`, per pixel; must be positive
    pub decay: f64,
    /// Contribution to the composite, in [0, 1]
    pub weight: f64,
}

impl Default for LayerParameters {
    fn default() -> Self {
        Self {
            decay: 0.01,
            weight: 1.0,
        }
    }
}

impl LayerParameters {
    pub fn new(decay: f64, weight: f64) -> Self {
        Self { decay, weight }
    }

    /// Check both parameters, naming `layer` in the error.
    pub fn validate(&self, layer: &str) -> Result<()> {
        validate_decay(self.decay).map_err(|e| PipelineError::from_core(layer, e))?;
        validate_weight(self.weight).map_err(|e| PipelineError::from_core(layer, e))?;
        Ok(())
    }
}

/// One selected layer and its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSelection {
    pub name: String,
    pub params: LayerParameters,
}

impl LayerSelection {
    pub fn new(name: impl Into<String>, params: LayerParameters) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.params.decay, self.params.weight)
    }
}

/// Parses `NAME`, `NAME:DECAY` or `NAME:DECAY:WEIGHT`.
///
/// Missing values take the defaults. Only the last two `:`-separated fields
/// are read as numbers, so names may contain colons as long as both numbers
/// are given.
impl FromStr for LayerSelection {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let defaults = LayerParameters::default();
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();

        let number = |layer: &str, parameter: &'static str, text: &str| -> Result<f64> {
            text.trim().parse::<f64>().map_err(|_| PipelineError::Parameter {
                layer: layer.to_string(),
                parameter,
                value: text.to_string(),
                reason: format!("{} must be a number", parameter),
            })
        };

        let (name, decay, weight) = match parts.as_slice() {
            [name] => (name.to_string(), defaults.decay, defaults.weight),
            [decay, name] => (name.to_string(), number(name, "decay", decay)?, defaults.weight),
            [weight, decay, name] => (
                name.to_string(),
                number(name, "decay", decay)?,
                number(name, "weight", weight)?,
            ),
            _ => return Err(PipelineError::EmptySelection),
        };

        if name.trim().is_empty() {
            return Err(PipelineError::UnknownLayer { layer: name });
        }
        Ok(LayerSelection::new(name.trim(), LayerParameters::new(decay, weight)))
    }
}
