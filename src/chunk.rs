use crate::host::Region;
use std::ops::Range;

/// Rows rasterized per capture pass in a dense sub-section. Part of the marker
/// contract with the markup producer, not a tuning knob.
pub const MAX_ROWS_PER_JOB: usize = 160;

/// Which parts of a region are visible during one capture pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityMask {
    Whole,
    // Only sub-section `index`; `rows` restricts its rows, `None` keeps its static
    // content only (a section without rows).
    Section {
        index: usize,
        rows: Option<Range<usize>>,
    },
}

impl VisibilityMask {
    pub fn shows_section(&self, index: usize) -> bool {
        match self {
            VisibilityMask::Whole => true,
            VisibilityMask::Section { index: shown, .. } => *shown == index,
        }
    }

    pub fn shows_row(&self, section: usize, row: usize) -> bool {
        match self {
            VisibilityMask::Whole => true,
            VisibilityMask::Section { index, rows } => {
                *index == section && rows.as_ref().is_some_and(|r| r.contains(&row))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureJob {
    pub region_key: String,
    pub mask: VisibilityMask,
}

impl CaptureJob {
    pub fn whole(region_key: impl Into<String>) -> Self {
        Self {
            region_key: region_key.into(),
            mask: VisibilityMask::Whole,
        }
    }

    pub fn section(&self) -> Option<usize> {
        match &self.mask {
            VisibilityMask::Whole => None,
            VisibilityMask::Section { index, .. } => Some(*index),
        }
    }

    pub fn rows(&self) -> Option<Range<usize>> {
        match &self.mask {
            VisibilityMask::Whole => None,
            VisibilityMask::Section { rows, .. } => rows.clone(),
        }
    }
}

pub fn plan_jobs(region: &Region) -> Vec<CaptureJob> {
    plan_jobs_with_limit(region, MAX_ROWS_PER_JOB)
}

pub fn plan_jobs_with_limit(region: &Region, max_rows: usize) -> Vec<CaptureJob> {
    let max_rows = max_rows.max(1);
    if !region.is_dense || region.sections.is_empty() {
        return vec![CaptureJob::whole(region.key.clone())];
    }

    let mut jobs = Vec::new();
    for (index, section) in region.sections.iter().enumerate() {
        if section.rows == 0 {
            jobs.push(CaptureJob {
                region_key: region.key.clone(),
                mask: VisibilityMask::Section { index, rows: None },
            });
            continue;
        }
        let mut start = 0;
        while start < section.rows {
            let end = (start + max_rows).min(section.rows);
            jobs.push(CaptureJob {
                region_key: region.key.clone(),
                mask: VisibilityMask::Section {
                    index,
                    rows: Some(start..end),
                },
            });
            start = end;
        }
    }
    jobs
}
