//! Catalog of selectable layers.
//!
//! Built once from the layer catalog and immutable afterwards. Palettes are
//! assigned at construction from the set of layer names, so they stay fixed
//! for the session.

use std::collections::BTreeMap;

use proxima_cloud::{Catalog, SourceRef};
use proxima_colormap::{assign_palettes, Palette};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// How the display renders a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Georeferenced raster; usable by the proximity engine
    Raster,
    /// Tabular points rendered as markers; never fed to the engine
    PointTable,
}

/// One selectable source
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    name: String,
    source: SourceRef,
    kind: LayerKind,
    label: String,
    palette: Palette,
}

impl RasterLayer {
    /// Unique key
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Display label; the name unless the registry policy overrides it
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn is_raster(&self) -> bool {
        self.kind == LayerKind::Raster
    }
}

/// Registry-level display policy
#[derive(Debug, Clone)]
pub struct RegistryPolicy {
    /// Names ending with this suffix are point tables
    pub point_table_suffix: String,
    /// Label overrides by layer name
    pub labels: BTreeMap<String, String>,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("final_df.csv".to_string(), "OCR France".to_string());
        Self {
            point_table_suffix: ".csv".to_string(),
            labels,
        }
    }
}

/// Ordered, immutable set of layers
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<RasterLayer>,
}

impl LayerRegistry {
    /// Build from a catalog with the default policy
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::with_policy(catalog, &RegistryPolicy::default())
    }

    pub fn with_policy(catalog: &Catalog, policy: &RegistryPolicy) -> Self {
        let names: Vec<&str> = catalog.iter().map(|(n, _)| n).collect();
        let palettes = assign_palettes(&names);

        let mut layers: Vec<RasterLayer> = Vec::with_capacity(catalog.len());
        for (name, source) in catalog.iter() {
            if layers.iter().any(|l| l.name == name) {
                continue;
            }
            let kind = if name
                .to_ascii_lowercase()
                .ends_with(&policy.point_table_suffix.to_ascii_lowercase())
            {
                LayerKind::PointTable
            } else {
                LayerKind::Raster
            };
            let label = policy
                .labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string());
            let palette = palettes
                .get(name)
                .copied()
                .unwrap_or_else(|| proxima_colormap::palette_for(name));

            debug!("Layer {} ({:?}) -> {}", name, kind, palette);
            layers.push(RasterLayer {
                name: name.to_string(),
                source: source.clone(),
                kind,
                label,
                palette,
            });
        }

        Self { layers }
    }

    /// All layers, in catalog order
    pub fn list_layers(&self) -> &[RasterLayer] {
        &self.layers
    }

    /// Layers the engine can process
    pub fn rasters(&self) -> impl Iterator<Item = &RasterLayer> {
        self.layers.iter().filter(|l| l.is_raster())
    }

    pub fn get(&self, name: &str) -> Option<&RasterLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Palette per layer name
    pub fn assign_colors(&self) -> BTreeMap<String, Palette> {
        self.layers
            .iter()
            .map(|l| (l.name.clone(), l.palette))
            .collect()
    }

    /// Look up a layer the engine is asked to process.
    pub fn resolve(&self, name: &str) -> Result<&RasterLayer> {
        let layer = self.get(name).ok_or_else(|| PipelineError::UnknownLayer {
            layer: name.to_string(),
        })?;
        if !layer.is_raster() {
            return Err(PipelineError::NotARaster {
                layer: name.to_string(),
            });
        }
        Ok(layer)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_entries([
            ("permits.tif", "https://host/permits.tif"),
            ("final_df.csv", "https://host/final_df.csv"),
            ("deposits.tif", "/data/deposits.tif"),
        ])
    }

    #[test]
    fn keeps_catalog_order_and_policy() {
        let registry = LayerRegistry::from_catalog(&catalog());
        let names: Vec<&str> = registry.list_layers().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["permits.tif", "final_df.csv", "deposits.tif"]);

        let points = registry.get("final_df.csv").unwrap();
        assert_eq!(points.kind(), LayerKind::PointTable);
        assert_eq!(points.label(), "OCR France");
        assert_eq!(registry.get("permits.tif").unwrap().label(), "permits.tif");
        assert_eq!(registry.rasters().count(), 2);
    }

    #[test]
    fn colors_are_stable_across_catalog_order() {
        let a = LayerRegistry::from_catalog(&catalog()).assign_colors();
        let reversed = Catalog::from_entries(
            catalog()
                .entries()
                .iter()
                .rev()
                .map(|(n, s)| (n.clone(), s.clone())),
        );
        let b = LayerRegistry::from_catalog(&reversed).assign_colors();
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_rejects_unknown_and_point_layers() {
        let registry = LayerRegistry::from_catalog(&catalog());
        assert!(registry.resolve("permits.tif").is_ok());
        assert!(matches!(
            registry.resolve("nope.tif"),
            Err(PipelineError::UnknownLayer { .. })
        ));
        assert!(matches!(
            registry.resolve("final_df.csv"),
            Err(PipelineError::NotARaster { .. })
        ));
    }
}
