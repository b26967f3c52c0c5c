//! User-facing error taxonomy for a proximity analysis request.
//!
//! Every variant names the layer that triggered it and says what to change.

use proxima_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no layers selected: select at least one raster layer")]
    EmptySelection,

    #[error("unknown layer '{layer}': choose one of the layers listed by the catalog")]
    UnknownLayer { layer: String },

    #[error("layer '{layer}' is a point table, not a raster: deselect it before running the analysis")]
    NotARaster { layer: String },

    #[error("invalid {parameter} for layer '{layer}': {value} ({reason})")]
    Parameter {
        layer: String,
        parameter: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not retrieve layer '{layer}' from {location}: {source}; check the reference and network access")]
    Retrieval {
        layer: String,
        location: String,
        #[source]
        source: CloudError,
    },

    #[error("layer '{layer}' at {location} is not a readable georeferenced raster: {source}")]
    Decode {
        layer: String,
        location: String,
        #[source]
        source: CloudError,
    },

    #[error(
        "layer '{layer}' is {}x{} pixels but '{reference}' is {}x{}: select layers that share one pixel grid",
        .actual.1, .actual.0, .expected.1, .expected.0
    )]
    ShapeMismatch {
        layer: String,
        reference: String,
        /// (rows, cols) of the reference layer
        expected: (usize, usize),
        /// (rows, cols) of the offending layer
        actual: (usize, usize),
    },

    #[error("layer '{layer}' cannot be used as the output reference: {message}; provide a raster with an embedded CRS and geotransform")]
    Georeferencing { layer: String, message: String },

    #[error("failed to encode the composite for '{layer}': {message}")]
    Encode { layer: String, message: String },
}

impl PipelineError {
    /// Attach a layer name to a core error raised while processing it.
    pub fn from_core(layer: &str, err: proxima_core::Error) -> Self {
        use proxima_core::Error as E;
        match err {
            E::InvalidParameter {
                name,
                value,
                reason,
            } => PipelineError::Parameter {
                layer: layer.to_string(),
                parameter: name,
                value,
                reason,
            },
            E::Georeferencing(message) => PipelineError::Georeferencing {
                layer: layer.to_string(),
                message,
            },
            other => PipelineError::Encode {
                layer: layer.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Classify a fetch failure for a layer.
    pub fn from_fetch(layer: &str, location: &str, err: CloudError) -> Self {
        if err.is_retrieval() {
            PipelineError::Retrieval {
                layer: layer.to_string(),
                location: location.to_string(),
                source: err,
            }
        } else {
            PipelineError::Decode {
                layer: layer.to_string(),
                location: location.to_string(),
                source: err,
            }
        }
    }

    /// The layer the error is about, if any.
    pub fn layer(&self) -> Option<&str> {
        match self {
            PipelineError::EmptySelection => None,
            PipelineError::UnknownLayer { layer }
            | PipelineError::NotARaster { layer }
            | PipelineError::Parameter { layer, .. }
            | PipelineError::Retrieval { layer, .. }
            | PipelineError::Decode { layer, .. }
            | PipelineError::ShapeMismatch { layer, .. }
            | PipelineError::Georeferencing { layer, .. }
            | PipelineError::Encode { layer, .. } => Some(layer.as_str()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_message_names_layer_and_fix() {
        let err = PipelineError::from_core(
            "permits.tif",
            proxima_core::Error::invalid_parameter("decay", 0.0, "decay must be positive"),
        );
        let msg = err.to_string();
        assert!(msg.contains("permits.tif"));
        assert!(msg.contains("decay must be positive"));
        assert_eq!(err.layer(), Some("permits.tif"));
    }

    #[test]
    fn shape_mismatch_message_is_width_by_height() {
        let err = PipelineError::ShapeMismatch {
            layer: "b.tif".into(),
            reference: "a.tif".into(),
            expected: (4, 4),
            actual: (5, 3),
        };
        assert_eq!(
            err.to_string(),
            "layer 'b.tif' is 3x5 pixels but 'a.tif' is 4x4: select layers that share one pixel grid"
        );
    }

    #[test]
    fn decode_failures_are_not_retrieval() {
        let err = PipelineError::from_fetch(
            "x.tif",
            "/tmp/x.tif",
            CloudError::Decode(proxima_core::Error::Decode("bad magic".into())),
        );
        assert!(matches!(err, PipelineError::Decode { .. }));
    }
}
