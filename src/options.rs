use crate::assemble::Pagecast;
use crate::codec::ImageType;
use crate::debug::DebugLogger;
use crate::error::PagecastError;
use crate::metrics::ExportProgress;
use crate::perf::PerfLogger;
use crate::scale::ScaleParams;
use crate::types::Color;
use crate::units::{Orientation, PageFormat, PageGeometry};
use std::path::PathBuf;
use std::sync::Arc;

pub type ProgressCallback = Arc<dyn Fn(&ExportProgress) + Send + Sync>;

/// Validated export settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub base_scale: f64,
    pub margin_mm: f64,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    pub target_dpi: f64,
    pub background: Color,
    pub max_scale: f64,
    pub image_type: ImageType,
    /// JPEG quality in `0..=1`; ignored for lossless output.
    pub image_quality: f64,
    pub title: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            base_scale: 2.0,
            margin_mm: 10.0,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            target_dpi: 144.0,
            background: Color::WHITE,
            max_scale: 4.0,
            image_type: ImageType::Jpeg,
            image_quality: 0.78,
            title: None,
        }
    }
}

impl ExportOptions {
    pub fn geometry(&self) -> PageGeometry {
        PageGeometry::new(self.page_format, self.orientation, self.margin_mm)
    }

    pub fn scale_params(&self) -> ScaleParams {
        ScaleParams {
            base_scale: self.base_scale,
            max_scale: self.max_scale,
            target_dpi: self.target_dpi,
        }
    }

    pub fn validate(&self) -> Result<(), PagecastError> {
        let invalid = |message: String| Err(PagecastError::InvalidConfiguration(message));
        if !self.base_scale.is_finite() || self.base_scale <= 0.0 {
            return invalid(format!("base_scale must be > 0 (got {})", self.base_scale));
        }
        if !self.max_scale.is_finite() || self.max_scale <= 0.0 {
            return invalid(format!("max_scale must be > 0 (got {})", self.max_scale));
        }
        if self.base_scale > self.max_scale {
            return invalid(format!(
                "base_scale {} exceeds max_scale {}",
                self.base_scale, self.max_scale
            ));
        }
        if !self.target_dpi.is_finite() || self.target_dpi <= 0.0 {
            return invalid(format!("target_dpi must be > 0 (got {})", self.target_dpi));
        }
        if !(0.0..=1.0).contains(&self.image_quality) {
            return invalid(format!(
                "image_quality must be within 0..=1 (got {})",
                self.image_quality
            ));
        }
        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return invalid(format!("margin_mm must be >= 0 (got {})", self.margin_mm));
        }
        let geometry = self.geometry();
        if geometry.content_width_mm() <= 0.0 || geometry.content_height_mm() <= 0.0 {
            return invalid(format!(
                "margin {}mm leaves no content area on a {}x{}mm page",
                self.margin_mm, geometry.page_width_mm, geometry.page_height_mm
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct PagecastBuilder {
    options: ExportOptions,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
    on_progress: Option<ProgressCallback>,
}

impl PagecastBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_scale(mut self, scale: f64) -> Self {
        self.options.base_scale = scale;
        self
    }

    pub fn max_scale(mut self, scale: f64) -> Self {
        self.options.max_scale = scale;
        self
    }

    pub fn margin_mm(mut self, margin: f64) -> Self {
        self.options.margin_mm = margin;
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.options.page_format = format;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.options.orientation = orientation;
        self
    }

    pub fn target_dpi(mut self, dpi: f64) -> Self {
        self.options.target_dpi = dpi;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.options.background = color;
        self
    }

    pub fn image_type(mut self, image_type: ImageType) -> Self {
        self.options.image_type = image_type;
        self
    }

    pub fn image_quality(mut self, quality: f64) -> Self {
        self.options.image_quality = quality;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.options.title = Some(title.into());
        self
    }

    // JSONL trace of region plans and capture outcomes.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    // Stage timings; a `_hot.log` ranking is written next to it when the engine drops.
    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExportProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Pagecast, PagecastError> {
        self.options.validate()?;
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let perf = match self.perf_path {
            Some(path) => Some(Arc::new(PerfLogger::new(path)?)),
            None => None,
        };
        Ok(Pagecast::from_parts(
            self.options,
            debug,
            perf,
            self.on_progress,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejects(builder: PagecastBuilder, needle: &str) {
        match builder.build() {
            Err(PagecastError::InvalidConfiguration(message)) => {
                assert!(message.contains(needle), "{message}")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected {needle} to be rejected"),
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let options = ExportOptions::default();
        assert_eq!(options.base_scale, 2.0);
        assert_eq!(options.max_scale, 4.0);
        assert_eq!(options.margin_mm, 10.0);
        assert_eq!(options.target_dpi, 144.0);
        assert_eq!(options.image_quality, 0.78);
        assert_eq!(options.page_format, PageFormat::A4);
        assert_eq!(options.orientation, Orientation::Portrait);
        assert_eq!(options.image_type, ImageType::Jpeg);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn scale_bounds_are_checked() {
        rejects(PagecastBuilder::new().base_scale(0.0), "base_scale");
        rejects(PagecastBuilder::new().max_scale(f64::INFINITY), "max_scale");
        rejects(
            PagecastBuilder::new().base_scale(5.0).max_scale(4.0),
            "exceeds max_scale",
        );
    }

    #[test]
    fn dpi_quality_and_margin_are_checked() {
        rejects(PagecastBuilder::new().target_dpi(0.0), "target_dpi");
        rejects(PagecastBuilder::new().image_quality(1.5), "image_quality");
        rejects(PagecastBuilder::new().margin_mm(-1.0), "margin_mm");
        rejects(PagecastBuilder::new().margin_mm(105.0), "no content area");
    }

    #[test]
    fn landscape_geometry_swaps_dimensions() {
        let options = ExportOptions {
            orientation: Orientation::Landscape,
            ..ExportOptions::default()
        };
        let geometry = options.geometry();
        assert_eq!(geometry.page_width_mm, 297.0);
        assert_eq!(geometry.content_width_mm(), 277.0);
    }

    #[test]
    fn builder_carries_settings_into_the_engine() {
        let engine = PagecastBuilder::new()
            .page_format(PageFormat::Letter)
            .image_type(ImageType::Png)
            .title("Weekly")
            .build()
            .unwrap();
        assert_eq!(engine.options().page_format, PageFormat::Letter);
        assert_eq!(engine.options().image_type, ImageType::Png);
        assert_eq!(engine.options().title.as_deref(), Some("Weekly"));
    }
}
