use crate::types::Color;
use image::RgbaImage;

/// Pixel output of one capture pass.
///
/// The buffer can be dropped early with [`RasterImage::release`]; large rasters
/// must not outlive their slicing since several of them at once can exhaust
/// memory on long reports.
#[derive(Debug)]
pub struct RasterImage {
    pixels: Option<RgbaImage>,
    scale: f64,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage, scale: f64) -> Self {
        Self {
            pixels: Some(pixels),
            scale,
        }
    }

    pub(crate) fn from_pixmap(pixmap: tiny_skia::Pixmap, scale: f64) -> Self {
        let width = pixmap.width();
        let height = pixmap.height();
        let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        let pixels = RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(0, 0));
        Self::new(pixels, scale)
    }

    pub fn width(&self) -> u32 {
        self.pixels.as_ref().map(|p| p.width()).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.pixels.as_ref().map(|p| p.height()).unwrap_or(0)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn is_released(&self) -> bool {
        self.pixels.is_none()
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.pixels.as_ref()
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.as_ref().map(|p| p.as_raw().len()).unwrap_or(0)
    }

    /// Drop the pixel buffer; dimensions read as zero afterwards.
    pub fn release(&mut self) {
        self.pixels = None;
    }
}

/// Flatten RGBA pixels onto an opaque background, row-major RGB8.
pub(crate) fn flatten_rgb(image: &RgbaImage, background: Color) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.as_raw().len() / 4 * 3);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&background.blend_under(r, g, b, a));
    }
    rgb
}
