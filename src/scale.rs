use crate::units::mm_to_px;

/// Measured widths below this are treated as unreliable and floored.
pub const MIN_CAPTURE_WIDTH_PX: f64 = 900.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    pub base_scale: f64,
    pub max_scale: f64,
    pub target_dpi: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            base_scale: 2.0,
            max_scale: 4.0,
            target_dpi: 144.0,
        }
    }
}

pub fn effective_css_width(measured: f64) -> f64 {
    if measured.is_finite() && measured > MIN_CAPTURE_WIDTH_PX {
        measured
    } else {
        MIN_CAPTURE_WIDTH_PX
    }
}

// Capture scale for a region: enough pixels across the content width to meet the
// DPI target, never below base_scale, never above max_scale. max_scale bounds
// raster memory, so large targets degrade to the ceiling instead of failing.
pub fn capture_scale(css_width: f64, content_width_mm: f64, params: &ScaleParams) -> f64 {
    let css_width = effective_css_width(css_width);
    let required_px = mm_to_px(content_width_mm, params.target_dpi) as f64;
    let auto = params.base_scale.max(required_px / css_width);
    params.max_scale.min(auto)
}
