use crate::error::PagecastError;
use crate::raster::flatten_rgb;
use crate::types::Color;
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use std::io::Write;

/// Compression used for page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageType {
    #[default]
    Jpeg,
    /// Lossless; stored as deflated RGB.
    Png,
}

impl ImageType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Some(ImageType::Jpeg),
            "png" | "image/png" => Some(ImageType::Png),
            _ => None,
        }
    }

    pub fn pdf_filter(self) -> &'static str {
        match self {
            ImageType::Jpeg => "/DCTDecode",
            ImageType::Png => "/FlateDecode",
        }
    }
}

/// An encoded page image, ready to embed as an image XObject.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub filter: &'static str,
    pub data: Vec<u8>,
}

fn jpeg_quality(quality: f64) -> u8 {
    if !quality.is_finite() {
        return 78;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

pub fn encode_slice(
    image: &RgbaImage,
    image_type: ImageType,
    quality: f64,
    background: Color,
) -> Result<EncodedImage, PagecastError> {
    let (width, height) = image.dimensions();
    let rgb = flatten_rgb(image, background);
    let data = match image_type {
        ImageType::Jpeg => {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality))
                .encode(&rgb, width, height, image::ExtendedColorType::Rgb8)
                .map_err(|err| PagecastError::Encode(err.to_string()))?;
            out
        }
        ImageType::Png => flate_compress(&rgb)?,
    };
    Ok(EncodedImage {
        width,
        height,
        filter: image_type.pdf_filter(),
        data,
    })
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, PagecastError> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
