//! Export pipeline: regions are resolved, planned into capture jobs, captured,
//! sliced into pages and appended to one PDF, strictly in request order.

use crate::artifact::Artifact;
use crate::capture::{capture_job, mask_label};
use crate::chunk::plan_jobs;
use crate::codec::encode_slice;
use crate::debug::{DebugLogger, Field};
use crate::error::PagecastError;
use crate::host::{CaptureHost, CaptureParams};
use crate::metrics::{ExportMetrics, ExportProgress, RegionMetrics};
use crate::options::{ExportOptions, PagecastBuilder, ProgressCallback};
use crate::pdf::PdfDocument;
use crate::perf::PerfLogger;
use crate::raster::RasterImage;
use crate::scale::{capture_scale, effective_css_width};
use crate::slice::slice_raster;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub struct Pagecast {
    options: ExportOptions,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
    on_progress: Option<ProgressCallback>,
}

impl Pagecast {
    pub fn builder() -> PagecastBuilder {
        PagecastBuilder::new()
    }

    pub(crate) fn from_parts(
        options: ExportOptions,
        debug: Option<Arc<DebugLogger>>,
        perf: Option<Arc<PerfLogger>>,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            options,
            debug,
            perf,
            on_progress,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }

    fn span(&self, name: &str, region: Option<&str>, started: Instant) {
        if let Some(perf) = self.perf.as_deref() {
            perf.log_span_ms(name, region, started.elapsed().as_secs_f64() * 1000.0);
        }
    }

    pub async fn export<H: CaptureHost>(
        &self,
        host: &H,
        keys: &[&str],
        filename: &str,
    ) -> Result<Artifact, PagecastError> {
        self.export_with_metrics(host, keys, filename)
            .await
            .map(|(artifact, _)| artifact)
    }

    /// Export and save into `dir`; returns the written path.
    pub async fn export_to_dir<H: CaptureHost>(
        &self,
        host: &H,
        keys: &[&str],
        filename: &str,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, PagecastError> {
        let artifact = self.export(host, keys, filename).await?;
        artifact.save_to_dir(dir)
    }

    pub async fn export_with_metrics<H: CaptureHost>(
        &self,
        host: &H,
        keys: &[&str],
        filename: &str,
    ) -> Result<(Artifact, ExportMetrics), PagecastError> {
        let started = Instant::now();
        let geometry = self.options.geometry();
        let scale_params = self.options.scale_params();
        let debug = self.debug.as_deref();

        let mut document = PdfDocument::new();
        if let Some(title) = &self.options.title {
            document = document.with_title(title.clone());
        }
        let mut metrics = ExportMetrics::default();

        for (region_index, &key) in keys.iter().enumerate() {
            let mut region_metrics = RegionMetrics {
                key: key.to_string(),
                ..RegionMetrics::default()
            };
            let Some(region) = host.region(key) else {
                log::warn!("region '{}' not found, skipping", key);
                if let Some(debug) = debug {
                    debug.increment("regions.missing", 1);
                    debug.event("region.missing", &[("region", Field::Str(key))]);
                }
                metrics.regions.push(region_metrics);
                continue;
            };
            region_metrics.found = true;

            let css_width = effective_css_width(region.css_width);
            let scale = capture_scale(region.css_width, geometry.content_width_mm(), &scale_params);
            let jobs = plan_jobs(&region);
            region_metrics.scale = scale;
            region_metrics.jobs = jobs.len();
            log::debug!(
                "region '{}': {} job(s) at scale {:.3}, width {}px",
                key,
                jobs.len(),
                scale,
                css_width
            );
            if let Some(debug) = debug {
                debug.increment("regions.found", 1);
                debug.event(
                    "region.plan",
                    &[
                        ("region", Field::Str(key)),
                        ("dense", Field::Bool(region.is_dense)),
                        ("sections", Field::Int(region.sections.len() as u64)),
                        ("rows", Field::Int(region.total_rows() as u64)),
                        ("jobs", Field::Int(jobs.len() as u64)),
                        ("css_width", Field::Num(css_width)),
                        ("css_height", Field::Num(region.css_height)),
                        ("scale", Field::Num(scale)),
                    ],
                );
            }

            let params = CaptureParams {
                scale,
                css_width,
                background: self.options.background,
            };
            for (job_index, job) in jobs.iter().enumerate() {
                let t_capture = Instant::now();
                let mut raster = capture_job(host, job, &params, debug).await;
                let capture_ms = t_capture.elapsed().as_secs_f64() * 1000.0;
                region_metrics.capture_ms += capture_ms;
                self.span("capture", Some(key), t_capture);

                if let Some(raster) = raster.as_mut() {
                    let t_slice = Instant::now();
                    let slices = slice_raster(raster, &geometry);
                    raster.release();
                    region_metrics.released += 1;
                    self.span("slice", Some(key), t_slice);

                    let t_encode = Instant::now();
                    let encoded = slices
                        .iter()
                        .map(|slice| {
                            encode_slice(
                                &slice.image,
                                self.options.image_type,
                                self.options.image_quality,
                                self.options.background,
                            )
                            .map(|image| (slice.height_mm, image))
                        })
                        .collect::<Result<Vec<_>, _>>();
                    self.span("encode", Some(key), t_encode);

                    match encoded {
                        Ok(pages) => {
                            region_metrics.captured += 1;
                            for (height_mm, image) in pages {
                                document.add_image_page(&geometry, height_mm, image);
                                region_metrics.pages += 1;
                            }
                        }
                        Err(err) => {
                            let label = mask_label(&job.mask);
                            log::warn!("skipping capture of {} [{}]: {}", key, label, err);
                            if let Some(debug) = debug {
                                let reason = err.to_string();
                                debug.increment("jobs.dropped", 1);
                                debug.event(
                                    "capture.dropped",
                                    &[
                                        ("region", Field::Str(key)),
                                        ("mask", Field::Str(&label)),
                                        ("reason", Field::Str(&reason)),
                                    ],
                                );
                            }
                            region_metrics.dropped += 1;
                        }
                    }
                } else {
                    region_metrics.dropped += 1;
                }

                if let Some(callback) = self.on_progress.as_ref() {
                    callback(&ExportProgress {
                        region_index,
                        region_count: keys.len(),
                        key: key.to_string(),
                        job_index,
                        job_count: jobs.len(),
                        pages_so_far: document.page_count(),
                        raster_bytes_held: raster.as_ref().map_or(0, RasterImage::byte_len),
                    });
                }
            }

            if let Some(perf) = self.perf.as_deref() {
                perf.log_counts(
                    "region",
                    Some(key),
                    &[
                        ("jobs", region_metrics.jobs as u64),
                        ("dropped", region_metrics.dropped as u64),
                        ("pages", region_metrics.pages as u64),
                    ],
                );
            }
            metrics.regions.push(region_metrics);
        }

        if document.page_count() == 0 {
            let missing = metrics.missing_regions();
            log::warn!(
                "export produced no pages ({} region(s) requested, {} missing)",
                keys.len(),
                missing
            );
            self.emit_debug_summary("export");
            return Err(PagecastError::NoPages {
                requested: keys.len(),
                missing,
            });
        }

        let t_finalize = Instant::now();
        let bytes = document.to_bytes()?;
        self.span("finalize", None, t_finalize);

        metrics.total_pages = document.page_count();
        metrics.pdf_bytes = bytes.len();
        metrics.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(debug) = debug {
            debug.event(
                "export.done",
                &[
                    ("pages", Field::Int(metrics.total_pages as u64)),
                    ("bytes", Field::Int(metrics.pdf_bytes as u64)),
                    ("ms", Field::Num(metrics.total_ms)),
                ],
            );
        }
        self.emit_debug_summary("export");
        Ok((Artifact::new(filename, bytes), metrics))
    }
}
