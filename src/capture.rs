//! One capture pass: settle, rasterize an isolated copy, validate.

use crate::chunk::{CaptureJob, VisibilityMask};
use crate::debug::{DebugLogger, Field};
use crate::error::CaptureError;
use crate::host::{CaptureHost, CaptureParams};
use crate::raster::RasterImage;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Run one job against the host.
///
/// Waits one frame and one tick before rasterizing. Any failure, a panic in the
/// host included, is reported and turned into `None`; the caller moves on to
/// the next job.
pub(crate) async fn capture_job<H: CaptureHost>(
    host: &H,
    job: &CaptureJob,
    params: &CaptureParams,
    debug: Option<&DebugLogger>,
) -> Option<RasterImage> {
    host.next_frame().await;
    host.next_tick().await;

    let result = catch_unwind(AssertUnwindSafe(|| host.rasterize(job, params)))
        .unwrap_or_else(|_| Err(CaptureError::Raster("host panicked during rasterize".into())))
        .and_then(|raster| {
            if raster.is_degenerate() {
                Err(CaptureError::Degenerate {
                    width: raster.width(),
                    height: raster.height(),
                })
            } else {
                Ok(raster)
            }
        });

    let label = mask_label(&job.mask);
    match result {
        Ok(raster) => {
            log::debug!(
                "captured {} [{}] at {}x{}",
                job.region_key,
                label,
                raster.width(),
                raster.height()
            );
            if let Some(debug) = debug {
                debug.increment("jobs.captured", 1);
                debug.event(
                    "capture.job",
                    &[
                        ("region", Field::Str(&job.region_key)),
                        ("mask", Field::Str(&label)),
                        ("width", Field::Int(raster.width() as u64)),
                        ("height", Field::Int(raster.height() as u64)),
                        ("scale", Field::Num(params.scale)),
                    ],
                );
            }
            Some(raster)
        }
        Err(err) => {
            log::warn!("skipping capture of {} [{}]: {}", job.region_key, label, err);
            if let Some(debug) = debug {
                let reason = err.to_string();
                debug.increment("jobs.dropped", 1);
                debug.event(
                    "capture.dropped",
                    &[
                        ("region", Field::Str(&job.region_key)),
                        ("mask", Field::Str(&label)),
                        ("reason", Field::Str(&reason)),
                    ],
                );
            }
            None
        }
    }
}

pub(crate) fn mask_label(mask: &VisibilityMask) -> String {
    match mask {
        VisibilityMask::Whole => "whole".to_string(),
        VisibilityMask::Section { index, rows: None } => format!("section {index}"),
        VisibilityMask::Section {
            index,
            rows: Some(rows),
        } => format!("section {index} rows {}..{}", rows.start, rows.end),
    }
}
