#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionMetrics {
    pub key: String,
    pub found: bool,
    pub jobs: usize,
    pub captured: usize,
    pub dropped: usize,
    /// Rasters whose pixel buffers were freed right after slicing.
    pub released: usize,
    pub pages: usize,
    pub scale: f64,
    pub capture_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportMetrics {
    pub regions: Vec<RegionMetrics>,
    pub total_pages: usize,
    pub total_ms: f64,
    pub pdf_bytes: usize,
}

impl ExportMetrics {
    pub fn missing_regions(&self) -> usize {
        self.regions.iter().filter(|r| !r.found).count()
    }

    pub fn dropped_jobs(&self) -> usize {
        self.regions.iter().map(|r| r.dropped).sum()
    }
}

/// Reported after every capture job, in plan order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    pub region_index: usize,
    pub region_count: usize,
    pub key: String,
    pub job_index: usize,
    pub job_count: usize,
    pub pages_so_far: usize,
    /// Pixel bytes the finished job still holds; zero once its raster is released.
    pub raster_bytes_held: usize,
}
