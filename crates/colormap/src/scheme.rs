//! Named sequential palettes and the multi-stop interpolation engine.

use std::fmt;
use std::str::FromStr;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Sequential palettes a layer can be displayed with.
///
/// The identifiers are the names map viewers use for the same ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Palette {
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Cividis,
    Blues,
    Greens,
    Oranges,
    Purples,
    Reds,
    YlOrRd,
    Greys,
}

impl Palette {
    /// Fixed palette list, in assignment order.
    pub const ALL: &[Palette] = &[
        Self::Viridis,
        Self::Plasma,
        Self::Inferno,
        Self::Magma,
        Self::Cividis,
        Self::Blues,
        Self::Greens,
        Self::Oranges,
        Self::Purples,
        Self::Reds,
        Self::YlOrRd,
        Self::Greys,
    ];

    /// Identifier handed to the display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Inferno => "inferno",
            Self::Magma => "magma",
            Self::Cividis => "cividis",
            Self::Blues => "Blues",
            Self::Greens => "Greens",
            Self::Oranges => "Oranges",
            Self::Purples => "Purples",
            Self::Reds => "Reds",
            Self::YlOrRd => "YlOrRd",
            Self::Greys => "Greys",
        }
    }

    fn stops(&self) -> &'static [ColorStop] {
        match self {
            Self::Viridis => VIRIDIS_STOPS,
            Self::Plasma => PLASMA_STOPS,
            Self::Inferno => INFERNO_STOPS,
            Self::Magma => MAGMA_STOPS,
            Self::Cividis => CIVIDIS_STOPS,
            Self::Blues => BLUES_STOPS,
            Self::Greens => GREENS_STOPS,
            Self::Oranges => ORANGES_STOPS,
            Self::Purples => PURPLES_STOPS,
            Self::Reds => REDS_STOPS,
            Self::YlOrRd => YLORRD_STOPS,
            Self::Greys => GREYS_STOPS,
        }
    }

    /// `n` evenly spaced colors from the low to the high end.
    pub fn swatch(&self, n: usize) -> Vec<Rgb> {
        match n {
            0 => Vec::new(),
            1 => vec![evaluate(*self, 1.0)],
            _ => (0..n)
                .map(|i| evaluate(*self, i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown palette '{}'", s))
    }
}

// ─── Color stop definitions ───────────────────────────────────────────

const VIRIDIS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 68, 1, 84),
    ColorStop::new(0.25, 59, 82, 139),
    ColorStop::new(0.50, 33, 145, 140),
    ColorStop::new(0.75, 94, 201, 98),
    ColorStop::new(1.00, 253, 231, 37),
];

const PLASMA_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 13, 8, 135),
    ColorStop::new(0.25, 126, 3, 168),
    ColorStop::new(0.50, 204, 71, 120),
    ColorStop::new(0.75, 248, 149, 64),
    ColorStop::new(1.00, 240, 249, 33),
];

const INFERNO_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 4),
    ColorStop::new(0.25, 87, 16, 110),
    ColorStop::new(0.50, 188, 55, 84),
    ColorStop::new(0.75, 249, 142, 9),
    ColorStop::new(1.00, 252, 255, 164),
];

const MAGMA_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 4),
    ColorStop::new(0.25, 81, 18, 124),
    ColorStop::new(0.50, 183, 55, 121),
    ColorStop::new(0.75, 252, 137, 97),
    ColorStop::new(1.00, 252, 253, 191),
];

const CIVIDIS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 34, 78),
    ColorStop::new(0.25, 65, 77, 108),
    ColorStop::new(0.50, 124, 123, 120),
    ColorStop::new(0.75, 187, 175, 113),
    ColorStop::new(1.00, 254, 232, 56),
];

const BLUES_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 247, 251, 255),
    ColorStop::new(0.25, 198, 219, 239),
    ColorStop::new(0.50, 107, 174, 214),
    ColorStop::new(0.75, 33, 113, 181),
    ColorStop::new(1.00, 8, 48, 107),
];

const GREENS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 247, 252, 245),
    ColorStop::new(0.25, 199, 233, 192),
    ColorStop::new(0.50, 116, 196, 118),
    ColorStop::new(0.75, 35, 139, 69),
    ColorStop::new(1.00, 0, 68, 27),
];

const ORANGES_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 245, 235),
    ColorStop::new(0.25, 253, 208, 162),
    ColorStop::new(0.50, 253, 141, 60),
    ColorStop::new(0.75, 217, 72, 1),
    ColorStop::new(1.00, 127, 39, 4),
];

const PURPLES_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 252, 251, 253),
    ColorStop::new(0.25, 218, 218, 235),
    ColorStop::new(0.50, 158, 154, 200),
    ColorStop::new(0.75, 106, 81, 163),
    ColorStop::new(1.00, 63, 0, 125),
];

const REDS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 245, 240),
    ColorStop::new(0.25, 252, 187, 161),
    ColorStop::new(0.50, 251, 106, 74),
    ColorStop::new(0.75, 203, 24, 29),
    ColorStop::new(1.00, 103, 0, 13),
];

const YLORRD_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 255, 204),
    ColorStop::new(0.25, 254, 217, 118),
    ColorStop::new(0.50, 253, 141, 60),
    ColorStop::new(0.75, 227, 26, 28),
    ColorStop::new(1.00, 128, 0, 38),
];

const GREYS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 255, 255),
    ColorStop::new(0.25, 217, 217, 217),
    ColorStop::new(0.50, 150, 150, 150),
    ColorStop::new(0.75, 82, 82, 82),
    ColorStop::new(1.00, 0, 0, 0),
];

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    let first = stops[0].color;
    let last = stops[stops.len() - 1].color;
    if t.is_nan() || t <= 0.0 {
        return first;
    }
    if t >= 1.0 {
        return last;
    }
    stops
        .windows(2)
        .find(|w| t <= w[1].t)
        .map(|w| lerp_color(w[0].color, w[1].color, (t - w[0].t) / (w[1].t - w[0].t)))
        .unwrap_or(last)
}

/// Evaluate a palette at normalized position `t` in [0, 1].
///
/// Values outside the range clamp to the end colors; NaN maps to the low end.
pub fn evaluate(palette: Palette, t: f64) -> Rgb {
    multi_stop(palette.stops(), t)
}
