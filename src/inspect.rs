//! Read-back of produced documents, used to check page geometry and image
//! placement without a viewer.

use lopdf::{Dictionary, Document as LoDocument, Object};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    /// `[x0, y0, x1, y1]` in points.
    pub media_box: [f64; 4],
    /// (width, height) in pixels of every image XObject on the page.
    pub images: Vec<(u32, u32)>,
}

impl PageReport {
    pub fn width_pt(&self) -> f64 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height_pt(&self) -> f64 {
        self.media_box[3] - self.media_box[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub file_size_bytes: usize,
    pub title: Option<String>,
    pub producer: Option<String>,
    pub pages: Vec<PageReport>,
}

impl PdfInspectReport {
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let pages = pdf
        .get_pages()
        .values()
        .map(|page_id| {
            let page = pdf.get_dictionary(*page_id).ok();
            PageReport {
                media_box: page.and_then(media_box).unwrap_or([0.0; 4]),
                images: page.map(|page| page_images(&pdf, page)).unwrap_or_default(),
            }
        })
        .collect::<Vec<_>>();

    let info = pdf
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve_dict(&pdf, obj));

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        file_size_bytes: bytes.len(),
        title: info.and_then(|d| info_string(d, b"Title")),
        producer: info.and_then(|d| info_string(d, b"Producer")),
        pages,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

fn resolve_dict<'a>(pdf: &'a LoDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => pdf.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

fn media_box(page: &Dictionary) -> Option<[f64; 4]> {
    let values = page.get(b"MediaBox").ok()?.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    Some([
        number(&values[0])?,
        number(&values[1])?,
        number(&values[2])?,
        number(&values[3])?,
    ])
}

fn page_images(pdf: &LoDocument, page: &Dictionary) -> Vec<(u32, u32)> {
    let Some(resources) = page
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve_dict(pdf, obj))
    else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(pdf, obj))
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (_, obj) in xobjects.iter() {
        let Object::Reference(id) = obj else {
            continue;
        };
        let Ok(Object::Stream(stream)) = pdf.get_object(*id) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|s| s.as_name().ok())
            == Some(b"Image".as_slice());
        if !is_image {
            continue;
        }
        let dim = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .ok()
                .and_then(number)
                .map(|v| v.max(0.0) as u32)
                .unwrap_or(0)
        };
        images.push((dim(b"Width"), dim(b"Height")));
    }
    images
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
