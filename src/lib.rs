//! Offscreen section rasterization and pagination.
//!
//! Named regions of rendered content are captured off-screen at print
//! resolution, dense tabular regions in row chunks, and the rasters are sliced
//! into page-height pieces and assembled into one PDF.
//!
//! ```no_run
//! # async fn run() -> Result<(), pagecast::PagecastError> {
//! use pagecast::{MarkupHost, Pagecast};
//!
//! let host = MarkupHost::from_path("report.html")?;
//! let engine = Pagecast::builder().title("Weekly scan").build()?;
//! let artifact = engine.export(&host, &["summary", "findings"], "scan.pdf").await?;
//! artifact.save_to_dir("out")?;
//! # Ok(())
//! # }
//! ```

mod artifact;
mod assemble;
mod capture;
mod chunk;
mod codec;
mod debug;
mod error;
mod host;
mod inspect;
mod markup;
mod metrics;
mod options;
mod pdf;
mod perf;
mod raster;
mod scale;
mod scene;
mod slice;
mod types;
mod units;

pub use artifact::{Artifact, DEFAULT_FILENAME};
pub use assemble::Pagecast;
pub use chunk::{CaptureJob, MAX_ROWS_PER_JOB, VisibilityMask, plan_jobs, plan_jobs_with_limit};
pub use codec::{EncodedImage, ImageType, encode_slice};
pub use error::{CaptureError, PagecastError};
pub use host::{CaptureHost, CaptureParams, Region, SectionOutline};
pub use inspect::{
    PageReport, PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes,
    inspect_pdf_path,
};
pub use markup::{DEFAULT_VIEWPORT_WIDTH, DENSE_ATTR, MarkupHost, ROW_ATTR, SECTION_ATTR};
pub use metrics::{ExportMetrics, ExportProgress, RegionMetrics};
pub use options::{ExportOptions, PagecastBuilder, ProgressCallback};
pub use pdf::{ImagePlacement, PdfDocument, PdfPage};
pub use raster::RasterImage;
pub use scale::{MIN_CAPTURE_WIDTH_PX, ScaleParams, capture_scale, effective_css_width};
pub use scene::{BoxStyle, Flow, Role, SceneChild, SceneElement};
pub use slice::{PageSlice, SliceSpan, page_height_px, plan_slices, slice_raster};
pub use types::Color;
pub use units::{Orientation, PageFormat, PageGeometry, mm_to_pt, mm_to_px, px_per_mm};
