use std::fmt;

#[derive(Debug)]
pub enum PagecastError {
    /// Every requested region was missing or produced only degenerate captures.
    NoPages { requested: usize, missing: usize },
    InvalidConfiguration(String),
    Encode(String),
    Io(std::io::Error),
}

impl fmt::Display for PagecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagecastError::NoPages { requested, missing } => write!(
                f,
                "no pages produced ({} region(s) requested, {} missing)",
                requested, missing
            ),
            PagecastError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            PagecastError::Encode(message) => write!(f, "encode error: {}", message),
            PagecastError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PagecastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PagecastError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PagecastError {
    fn from(value: std::io::Error) -> Self {
        PagecastError::Io(value)
    }
}

/// Failure of a single capture pass. Never aborts an export on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    Degenerate { width: u32, height: u32 },
    RegionGone(String),
    Raster(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Degenerate { width, height } => {
                write!(f, "degenerate raster {}x{}", width, height)
            }
            CaptureError::RegionGone(key) => write!(f, "region '{}' is no longer mounted", key),
            CaptureError::Raster(message) => write!(f, "rasterization failed: {}", message),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pages_message_reports_counts() {
        let err = PagecastError::NoPages {
            requested: 3,
            missing: 3,
        };
        assert_eq!(
            err.to_string(),
            "no pages produced (3 region(s) requested, 3 missing)"
        );
    }

    #[test]
    fn io_errors_expose_source() {
        let err: PagecastError = std::io::Error::other("disk full").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk full"));
    }
}
