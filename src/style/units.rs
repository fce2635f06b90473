//! Size, offset and axis-scale units.
//!
//! Internally every length is carried in inches until the exporter picks a
//! dpi; offsets are resolved to display pixels only once the axes geometry
//! and data range are known.

pub const MM_PER_INCH: f64 = 25.4;
pub const POINTS_PER_INCH: f64 = 72.0;

closed_set! {
    /// Unit of the figure canvas size.
    pub enum SizeUnit {
        Inch => "in",
        Millimeter => "mm",
        Point => "pt",
    }
}

impl SizeUnit {
    pub fn to_inches(self, value: f64) -> f64 {
        match self {
            SizeUnit::Inch => value,
            SizeUnit::Millimeter => mm_to_in(value),
            SizeUnit::Point => pt_to_in(value),
        }
    }
}

impl Default for SizeUnit {
    fn default() -> Self {
        SizeUnit::Inch
    }
}

pub fn mm_to_in(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

pub fn in_to_mm(inch: f64) -> f64 {
    inch * MM_PER_INCH
}

pub fn pt_to_in(pt: f64) -> f64 {
    pt / POINTS_PER_INCH
}

pub fn in_to_pt(inch: f64) -> f64 {
    inch * POINTS_PER_INCH
}

/// Typographic points to display pixels.
pub fn pt_to_px(pt: f64, dpi: f64) -> f64 {
    pt / POINTS_PER_INCH * dpi
}

closed_set! {
    /// How a text or legend offset is interpreted.
    ///
    /// `axes` tracks the data range (zooming moves the text with the data),
    /// `points` is an absolute typographic distance.
    pub enum OffsetUnit {
        Axes => "axes",
        Points => "points",
    }
}

impl Default for OffsetUnit {
    fn default() -> Self {
        OffsetUnit::Axes
    }
}

/// One axis of a laid-out axes box: the data range shown and its pixel extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisFrame {
    pub data_min: f64,
    pub data_max: f64,
    pub pixels: f64,
}

impl AxisFrame {
    pub fn new(data_min: f64, data_max: f64, pixels: f64) -> Self {
        Self {
            data_min,
            data_max,
            pixels,
        }
    }

    /// Convert a text offset into display pixels.
    pub fn offset_to_pixels(&self, value: f64, unit: OffsetUnit, dpi: f64) -> f64 {
        match unit {
            OffsetUnit::Axes => {
                let span = self.data_max - self.data_min;
                if span == 0.0 || !span.is_finite() {
                    return 0.0;
                }
                value / span * self.pixels
            }
            OffsetUnit::Points => pt_to_px(value, dpi),
        }
    }
}

/// Legend anchor offsets: `axes` is a fraction of the axes box, `points` is absolute.
pub fn legend_offset_to_pixels(value: f64, unit: OffsetUnit, axes_pixels: f64, dpi: f64) -> f64 {
    match unit {
        OffsetUnit::Axes => value * axes_pixels,
        OffsetUnit::Points => pt_to_px(value, dpi),
    }
}

closed_set! {
    /// Axis scale.
    pub enum Scale {
        Linear => "linear",
        Log => "log",
        Symlog => "symlog",
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Linear
    }
}

impl Scale {
    /// Map a data value into the linear display space of this scale.
    ///
    /// Non-positive values on a log axis map to `None` and are not drawn.
    pub fn forward(self, v: f64) -> Option<f64> {
        match self {
            Scale::Linear => Some(v),
            Scale::Log => (v > 0.0).then(|| v.log10()),
            Scale::Symlog => Some(v.signum() * (1.0 + v.abs()).log10()),
        }
    }

    pub fn inverse(self, t: f64) -> f64 {
        match self {
            Scale::Linear => t,
            Scale::Log => 10f64.powf(t),
            Scale::Symlog => t.signum() * (10f64.powf(t.abs()) - 1.0),
        }
    }
}
