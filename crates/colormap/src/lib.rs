//! # Proxima Colormap
//!
//! Named sequential palettes and stable palette assignment for layers.
//!
//! The display collaborator receives a palette identifier per layer
//! ([`Palette::name`]); [`assign_palettes`] picks those identifiers from a
//! fixed list using a hash of each layer name, so reruns over the same
//! catalog always color layers the same way.
//!
//! ## Usage
//!
//! ```
//! use proxima_colormap::{assign_palettes, evaluate};
//!
//! let palettes = assign_palettes(&["permits.tif", "deposits.tif"]);
//! let low = evaluate(palettes["permits.tif"], 0.0);
//! assert_eq!(low.to_hex().len(), 7);
//! ```

mod assign;
mod scheme;

pub use assign::{assign_palettes, palette_for};
pub use scheme::{evaluate, ColorStop, Palette, Rgb};
