use crate::raster::RasterImage;
use crate::units::{PageGeometry, px_per_mm};
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSpan {
    pub y_offset: u32,
    pub height_px: u32,
}

/// Cut `image_height` into consecutive spans of `page_height_px`; the last one
/// keeps the remainder.
pub fn plan_slices(image_height: u32, page_height_px: u32) -> Vec<SliceSpan> {
    let page_height_px = page_height_px.max(1);
    let mut spans = Vec::with_capacity(image_height.div_ceil(page_height_px) as usize);
    let mut y_offset = 0;
    while y_offset < image_height {
        let height_px = page_height_px.min(image_height - y_offset);
        spans.push(SliceSpan {
            y_offset,
            height_px,
        });
        y_offset += height_px;
    }
    spans
}

/// One page worth of raster, top-anchored in the content box.
#[derive(Debug, Clone)]
pub struct PageSlice {
    pub y_offset: u32,
    pub height_px: u32,
    pub height_mm: f64,
    pub image: RgbaImage,
}

impl PageSlice {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }
}

/// Page height in raster pixels when the raster's width maps onto the content
/// width.
pub fn page_height_px(raster_width: u32, geometry: &PageGeometry) -> u32 {
    let scale = px_per_mm(raster_width as f64, geometry.content_width_mm());
    let height = (geometry.content_height_mm() * scale).round();
    if height.is_finite() && height >= 1.0 {
        height as u32
    } else {
        1
    }
}

pub fn slice_raster(raster: &RasterImage, geometry: &PageGeometry) -> Vec<PageSlice> {
    let Some(pixels) = raster.pixels() else {
        return Vec::new();
    };
    if raster.is_degenerate() {
        return Vec::new();
    }
    let width = pixels.width();
    let scale = px_per_mm(width as f64, geometry.content_width_mm());
    plan_slices(pixels.height(), page_height_px(width, geometry))
        .into_iter()
        .map(|span| PageSlice {
            y_offset: span.y_offset,
            height_px: span.height_px,
            height_mm: span.height_px as f64 / scale,
            image: image::imageops::crop_imm(pixels, 0, span.y_offset, width, span.height_px)
                .to_image(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{Orientation, PageFormat};

    #[test]
    fn thousand_pixels_over_three_sixty_pages() {
        let spans = plan_slices(1000, 360);
        let heights: Vec<u32> = spans.iter().map(|s| s.height_px).collect();
        assert_eq!(heights, vec![360, 360, 280]);
        let offsets: Vec<u32> = spans.iter().map(|s| s.y_offset).collect();
        assert_eq!(offsets, vec![0, 360, 720]);
    }

    #[test]
    fn slice_count_is_ceiling_of_ratio() {
        for (height, page) in [(1u32, 360u32), (360, 360), (361, 360), (5000, 1), (7, 3)] {
            let spans = plan_slices(height, page);
            assert_eq!(spans.len() as u32, height.div_ceil(page));
            assert_eq!(spans.iter().map(|s| s.height_px).sum::<u32>(), height);
            assert!(spans.iter().all(|s| s.height_px >= 1 && s.height_px <= page));
        }
        assert!(plan_slices(0, 360).is_empty());
    }

    #[test]
    fn a4_page_height_follows_raster_width() {
        let geometry = PageGeometry::new(PageFormat::A4, Orientation::Portrait, 10.0);
        // 190mm wide content at 10px/mm
        assert_eq!(page_height_px(1900, &geometry), 2770);
    }

    #[test]
    fn slices_reassemble_the_raster() {
        let geometry = PageGeometry::new(PageFormat::A4, Orientation::Portrait, 10.0);
        let mut image = RgbaImage::new(190, 700);
        for (_, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = image::Rgba([(y % 251) as u8, (y / 251) as u8, 0, 255]);
        }
        let raster = RasterImage::new(image.clone(), 1.0);
        let slices = slice_raster(&raster, &geometry);
        // 277px per page at 1px/mm
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[2].height_px, 700 - 2 * 277);
        assert!((slices[0].height_mm - 277.0).abs() < 1e-9);

        let mut rebuilt = RgbaImage::new(190, 700);
        for slice in &slices {
            assert_eq!(slice.width_px(), 190);
            image::imageops::replace(&mut rebuilt, &slice.image, 0, slice.y_offset as i64);
        }
        assert_eq!(rebuilt, image);
    }

    #[test]
    fn released_raster_yields_no_pages() {
        let geometry = PageGeometry::new(PageFormat::Letter, Orientation::Portrait, 10.0);
        let mut raster = RasterImage::new(RgbaImage::new(10, 10), 1.0);
        raster.release();
        assert!(slice_raster(&raster, &geometry).is_empty());
    }
}
