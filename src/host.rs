//! Boundary between the engine and whatever owns the live visual tree.

use crate::chunk::CaptureJob;
use crate::error::CaptureError;
use crate::raster::RasterImage;
use crate::types::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOutline {
    pub rows: usize,
}

/// Measured, read-only view of a mounted region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub key: String,
    pub css_width: f64,
    pub css_height: f64,
    pub is_dense: bool,
    pub sections: Vec<SectionOutline>,
}

impl Region {
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(|s| s.rows).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureParams {
    pub scale: f64,
    /// Explicit pixel width forced onto the isolated copy.
    pub css_width: f64,
    pub background: Color,
}

/// A host resolves region keys and rasterizes isolated, masked copies of them.
///
/// `next_frame` and `next_tick` are the two settle points awaited before every
/// rasterization; hosts with asynchronous layout or font loading hook them.
#[allow(async_fn_in_trait)]
pub trait CaptureHost {
    fn region(&self, key: &str) -> Option<Region>;

    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }

    async fn next_tick(&self) {
        tokio::task::yield_now().await;
    }

    fn rasterize(
        &self,
        job: &CaptureJob,
        params: &CaptureParams,
    ) -> Result<RasterImage, CaptureError>;
}
