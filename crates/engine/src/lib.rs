//! # Proxima Engine
//!
//! Layer registry and the end-to-end proximity analysis request.
//!
//! ```no_run
//! use proxima_cloud::blocking::{load_catalog, BlockingFetcher};
//! use proxima_cloud::{FetchOptions, SourceRef};
//! use proxima_engine::{EngineOptions, LayerRegistry, LayerSelection, ProximityEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = load_catalog(&SourceRef::parse("rasters.json"), FetchOptions::default())?;
//! let registry = LayerRegistry::from_catalog(&catalog);
//!
//! let engine = ProximityEngine::new(BlockingFetcher::new(FetchOptions::default())?, EngineOptions::default());
//! let result = engine.run(&registry, &["permits.tif:0.05:0.7".parse::<LayerSelection>()?])?;
//! result.output.write_to("proximity.tif")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod params;
pub mod pipeline;
pub mod registry;

pub use error::{PipelineError, Result};
pub use params::{LayerParameters, LayerSelection};
pub use pipeline::{
    CompositeStats, DisplayHandoff, EngineOptions, LayerSummary, PreparedRequest, ProximityEngine,
    ProximityOutput,
};
pub use registry::{LayerKind, LayerRegistry, RasterLayer, RegistryPolicy};
