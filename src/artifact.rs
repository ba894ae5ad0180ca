use crate::error::PagecastError;
use crate::inspect::{PdfInspectError, PdfInspectReport, inspect_pdf_bytes};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILENAME: &str = "report.pdf";

/// A finished PDF and the name it should be saved or downloaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    filename: String,
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let filename = if filename.trim().is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            filename
        };
        Self { filename, bytes }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PagecastError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }

    /// Write into `dir` (created if needed) under the last component of the
    /// artifact's filename, so the file never lands outside `dir`.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, PagecastError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let name = Path::new(&self.filename)
            .file_name()
            .unwrap_or_else(|| OsStr::new(DEFAULT_FILENAME));
        let path = dir.join(name);
        self.save(&path)?;
        Ok(path)
    }

    /// Lowercase hex SHA-256 of the PDF bytes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:application/pdf;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn inspect(&self) -> Result<PdfInspectReport, PdfInspectError> {
        inspect_pdf_bytes(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filename_falls_back_to_default() {
        assert_eq!(Artifact::new("  ", vec![1]).filename(), DEFAULT_FILENAME);
        assert_eq!(Artifact::new("scan.pdf", vec![1]).filename(), "scan.pdf");
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let artifact = Artifact::new("a.pdf", b"abc".to_vec());
        assert_eq!(
            artifact.fingerprint(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn data_uri_is_base64_pdf() {
        let artifact = Artifact::new("a.pdf", b"%PDF".to_vec());
        assert_eq!(artifact.data_uri(), "data:application/pdf;base64,JVBERg==");
    }

    #[test]
    fn save_to_dir_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("weekly");
        let artifact = Artifact::new("scan.pdf", b"%PDF-1.7".to_vec());
        let path = artifact.save_to_dir(&nested).unwrap();
        assert_eq!(path, nested.join("scan.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn save_to_dir_stays_inside_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        let escaping = Artifact::new("../escape.pdf", b"%PDF".to_vec());
        assert_eq!(escaping.save_to_dir(&out).unwrap(), out.join("escape.pdf"));
        assert!(!root.path().join("escape.pdf").exists());

        let absolute = root.path().join("elsewhere").join("abs.pdf");
        let artifact = Artifact::new(absolute.to_string_lossy(), b"%PDF".to_vec());
        assert_eq!(artifact.save_to_dir(&out).unwrap(), out.join("abs.pdf"));
        assert!(!absolute.exists());

        let dotdot = Artifact::new("..", b"%PDF".to_vec());
        assert_eq!(dotdot.save_to_dir(&out).unwrap(), out.join(DEFAULT_FILENAME));
    }
}
