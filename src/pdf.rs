//! Minimal PDF writer for image-only pages.
//!
//! Every page carries exactly one image XObject drawn at the top-left corner of
//! the content box. Objects are written in one pass; the cross-reference table
//! is built from the recorded byte offsets.

use crate::codec::EncodedImage;
use crate::units::{PageGeometry, mm_to_pt};
use std::io::{self, Write};

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const OBJECTS_PER_PAGE: usize = 3;
const PRODUCER: &str = "pagecast";

/// Where the page image lands, in PDF points (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x_pt: f64,
    pub y_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
}

impl ImagePlacement {
    /// Top-anchored at the margin, spanning the content width.
    pub fn top_of_content(geometry: &PageGeometry, slice_height_mm: f64) -> Self {
        let bottom_mm = geometry.page_height_mm - geometry.margin_mm - slice_height_mm;
        Self {
            x_pt: mm_to_pt(geometry.margin_mm),
            y_pt: mm_to_pt(bottom_mm),
            width_pt: mm_to_pt(geometry.content_width_mm()),
            height_pt: mm_to_pt(slice_height_mm),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width_pt: f64,
    pub height_pt: f64,
    pub placement: ImagePlacement,
    pub image: EncodedImage,
}

#[derive(Debug, Clone, Default)]
pub struct PdfDocument {
    title: Option<String>,
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn add_image_page(
        &mut self,
        geometry: &PageGeometry,
        slice_height_mm: f64,
        image: EncodedImage,
    ) {
        self.pages.push(PdfPage {
            width_pt: mm_to_pt(geometry.page_width_mm),
            height_pt: mm_to_pt(geometry.page_height_mm),
            placement: ImagePlacement::top_of_content(geometry, slice_height_mm),
            image,
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Serialize the document; returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<usize> {
        let info_id = 3 + self.pages.len() * OBJECTS_PER_PAGE;
        let total_objects = info_id;
        let mut offsets = vec![0usize; total_objects + 1];
        let mut offset = 0usize;

        write_bytes(writer, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n", &mut offset)?;

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for (index, page) in self.pages.iter().enumerate() {
            let page_id = 3 + index * OBJECTS_PER_PAGE;
            let content_id = page_id + 1;
            let image_id = page_id + 2;
            page_ids.push(page_id);

            let page_dict = format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /XObject << /Im0 {} 0 R >> /ProcSet [/PDF /ImageC] >> /Contents {} 0 R >>",
                PDF_PAGES_ID,
                fmt_num(page.width_pt),
                fmt_num(page.height_pt),
                image_id,
                content_id
            );
            write_pdf_object(writer, &mut offset, &mut offsets, page_id, &page_dict)?;

            let placement = page.placement;
            let content = format!(
                "q\n{} 0 0 {} {} {} cm\n/Im0 Do\nQ",
                fmt_num(placement.width_pt),
                fmt_num(placement.height_pt),
                fmt_num(placement.x_pt),
                fmt_num(placement.y_pt)
            );
            write_stream_object(
                writer,
                &mut offset,
                &mut offsets,
                content_id,
                "",
                content.as_bytes(),
            )?;

            let image_dict = format!(
                " /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter {}",
                page.image.width, page.image.height, page.image.filter
            );
            write_stream_object(
                writer,
                &mut offset,
                &mut offsets,
                image_id,
                &image_dict,
                &page.image.data,
            )?;
        }

        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        write_pdf_object(
            writer,
            &mut offset,
            &mut offsets,
            PDF_PAGES_ID,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids,
                page_ids.len()
            ),
        )?;

        let mut catalog = format!("<< /Type /Catalog /Pages {} 0 R", PDF_PAGES_ID);
        if self.title.is_some() {
            catalog.push_str(" /ViewerPreferences << /DisplayDocTitle true >>");
        }
        catalog.push_str(" >>");
        write_pdf_object(writer, &mut offset, &mut offsets, PDF_CATALOG_ID, &catalog)?;
        write_pdf_object(
            writer,
            &mut offset,
            &mut offsets,
            info_id,
            &info_object(self.title.as_deref()),
        )?;

        let xref_start = offset;
        write_str(
            writer,
            &format!("xref\n0 {}\n", total_objects + 1),
            &mut offset,
        )?;
        write_bytes(writer, b"0000000000 65535 f \n", &mut offset)?;
        for obj_offset in offsets.iter().skip(1) {
            write_str(writer, &format!("{:010} 00000 n \n", obj_offset), &mut offset)?;
        }
        write_str(
            writer,
            &format!(
                "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                total_objects + 1,
                PDF_CATALOG_ID,
                info_id,
                xref_start
            ),
            &mut offset,
        )?;
        Ok(offset)
    }
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec![format!("/Producer ({})", PRODUCER)];
    if let Some(title) = title {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

// `dict_entries` goes inside the stream dictionary, after /Length.
fn write_stream_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    dict_entries: &str,
    data: &[u8],
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(
        writer,
        &format!(
            "{} 0 obj\n<< /Length {}{} >>\nstream\n",
            obj_id,
            data.len(),
            dict_entries
        ),
        offset,
    )?;
    write_bytes(writer, data, offset)?;
    write_bytes(writer, b"\nendstream\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

// Three decimals, trailing zeros trimmed.
fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.3}", value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}
