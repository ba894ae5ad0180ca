//! Pixel / millimetre / point conversions and physical page geometry.

pub const MM_PER_INCH: f64 = 25.4;
pub const PT_PER_INCH: f64 = 72.0;

/// `round(mm / 25.4 * dpi)`.
pub fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    let px = (mm / MM_PER_INCH * dpi).round();
    if !px.is_finite() || px <= 0.0 {
        return 0;
    }
    px.min(u32::MAX as f64) as u32
}

pub fn px_per_mm(content_width_px: f64, content_width_mm: f64) -> f64 {
    content_width_px / content_width_mm
}

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
    Letter,
}

impl PageFormat {
    /// Portrait (width, height) in millimetres.
    pub fn size_mm(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            // 8.5in x 11in.
            PageFormat::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
}

impl PageGeometry {
    pub fn new(format: PageFormat, orientation: Orientation, margin_mm: f64) -> Self {
        let (w, h) = format.size_mm();
        let (page_width_mm, page_height_mm) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        Self {
            page_width_mm,
            page_height_mm,
            margin_mm,
        }
    }

    pub fn content_width_mm(&self) -> f64 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn content_height_mm(&self) -> f64 {
        self.page_height_mm - 2.0 * self.margin_mm
    }
}
